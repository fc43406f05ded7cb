/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the crypto subsystem driver library.

--*/

#![cfg_attr(not(any(feature = "std", test)), no_std)]

mod aes;
mod dma;
mod key_source;
pub mod memory_layout;
pub mod printer;
mod sss;
mod wait;

pub use aes::{
    Aes, AesGcmDecryptOp, AesGcmEncryptOp, AesKey, AesState, KekType, AES_DPA_CM_DATA_SIZE,
};
pub use cryptocore_error::{CryptoError, CryptoResult, ErrorKind};
pub use cryptocore_registers::Mmio;
pub use dma::{Dma, DmaAddr, DmaChannel, DmaId, DmaTransfer, Endianness};
pub use key_source::{lookup, AesKeySize, KeyDescriptor, KeyPermissions, KeySource};
pub use printer::{HexBytes, Printer};
pub use sss::{Sss, SssEndpoint};
