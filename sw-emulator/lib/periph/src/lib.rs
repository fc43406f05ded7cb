/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the crypto subsystem emulator peripheral
    library.

--*/

mod aes;
pub mod dma;
mod root_bus;
mod sss;

pub use aes::AesCore;
pub use dma::PmcDma;
pub use root_bus::CryptoRootBus;
pub use sss::{SssPort, SssSwitch};
