/*++

Licensed under the Apache-2.0 license.

File Name:

    sss.rs

Abstract:

    Register map of the Secure Stream Switch. SSS_CFG holds one 4-bit
    field per sink; the field value is the code of the source feeding it.

--*/

use crate::{Mmio, RegisterBlock};
use tock_registers::register_bitfields;

pub const ADDR: u32 = 0xF111_0500;

pub const SSS_CFG: u32 = 0x00;

register_bitfields! [
    u32,

    /// SSS_CFG register. Each field names the source feeding that sink.
    pub Cfg [
        DMA0 OFFSET(0) NUMBITS(4) [],
        DMA1 OFFSET(4) NUMBITS(4) [],
        PTPI OFFSET(8) NUMBITS(4) [],
        AES OFFSET(12) NUMBITS(4) [],
        SHA OFFSET(16) NUMBITS(4) [],
        SBI OFFSET(20) NUMBITS(4) [],
    ],
];

/// Source codes, grouped by the sink field they are written to.
pub mod code {
    pub const DMA0_FROM_DMA0: u32 = 0xD;
    pub const DMA0_FROM_AES: u32 = 0x6;
    pub const DMA0_FROM_SBI: u32 = 0xB;

    pub const DMA1_FROM_DMA1: u32 = 0x9;
    pub const DMA1_FROM_AES: u32 = 0x7;
    pub const DMA1_FROM_SBI: u32 = 0xE;

    pub const AES_FROM_DMA0: u32 = 0xE;
    pub const AES_FROM_DMA1: u32 = 0x5;
    pub const AES_FROM_SBI: u32 = 0x3;

    pub const SHA_FROM_DMA0: u32 = 0xC;
    pub const SHA_FROM_DMA1: u32 = 0x7;
    pub const SHA_FROM_SBI: u32 = 0xA;

    pub const SBI_FROM_DMA0: u32 = 0x5;
    pub const SBI_FROM_DMA1: u32 = 0xB;
}

/// Stream switch configuration register.
#[derive(Clone, Copy)]
pub struct SssReg<M: Mmio> {
    regs: RegisterBlock<M>,
}

impl<M: Mmio> SssReg<M> {
    /// # Safety
    ///
    /// Only one `SssReg` may drive the stream switch at a time.
    pub const unsafe fn new(mmio: M) -> Self {
        Self {
            regs: RegisterBlock::new(mmio, ADDR),
        }
    }

    register_accessors! {
        cfg: SSS_CFG => Cfg::Register;
    }
}
