/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the crypto subsystem emulator crypto library.

--*/

mod gcm;

pub use crate::gcm::{AesGcm, AES_GCM_IV_SIZE, AES_GCM_TAG_SIZE};
