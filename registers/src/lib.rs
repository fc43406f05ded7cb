/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the register map of the crypto subsystem: the AES-GCM
    core, the two-channel PMC DMA engines and the Secure Stream Switch.

--*/
#![no_std]

/// Generates one typed accessor per fixed register of a block. The block
/// must hold its registers in a `regs: RegisterBlock<M>` field.
macro_rules! register_accessors {
    ($($(#[$meta:meta])* $name:ident: $offset:expr => $layout:ty;)*) => {
        $(
            $(#[$meta])*
            #[inline(always)]
            pub fn $name(&self) -> $crate::Reg<M, $layout> {
                self.regs.reg($offset)
            }
        )*
    };
}

mod mmio;

pub mod aes;
pub mod dma;
pub mod sss;

pub use mmio::{Mmio, RealMmio, Reg, RegisterBlock};
pub use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
