/*++

Licensed under the Apache-2.0 license.

File Name:

    dma.rs

Abstract:

    Register map of the PMC DMA engines. Each engine has a source channel
    (memory to stream switch) and a destination channel (stream switch to
    memory) with identical register layouts.

--*/

use crate::{Mmio, RegisterBlock};
use tock_registers::register_bitfields;

pub const DMA0_ADDR: u32 = 0xF11C_0000;
pub const DMA1_ADDR: u32 = 0xF11D_0000;

/// Channel block offsets.
pub const SRC_CHANNEL: u32 = 0x000;
pub const DST_CHANNEL: u32 = 0x800;

/// Per-channel register offsets.
pub const ADDR: u32 = 0x00;
pub const SIZE: u32 = 0x04;
pub const STS: u32 = 0x08;
pub const CTRL: u32 = 0x0C;
pub const I_STS: u32 = 0x14;
pub const I_EN: u32 = 0x18;
pub const ADDR_MSB: u32 = 0x28;

/// Largest transfer the SIZE register can describe.
pub const MAX_WORD_COUNT: u32 = (1 << 27) - 1;

register_bitfields! [
    u32,

    pub Ctrl [
        PAUSE_MEM OFFSET(0) NUMBITS(1) [],
        PAUSE_STRM OFFSET(1) NUMBITS(1) [],
        FIFO_THRESH OFFSET(2) NUMBITS(8) [],
        ENDIANNESS OFFSET(23) NUMBITS(1) [],
    ],

    pub Status [
        BUSY OFFSET(0) NUMBITS(1) [],
        FIFO_LEVEL OFFSET(8) NUMBITS(8) [],
    ],

    /// SIZE register. Writing it starts the transfer.
    pub Size [
        /// Marks the final word of a message (source channel only)
        LAST_WORD OFFSET(0) NUMBITS(1) [],
        /// Transfer length in 32-bit words
        WORD_COUNT OFFSET(2) NUMBITS(27) [],
    ],

    /// I_STS register. Write one to clear.
    pub IntStatus [
        DONE OFFSET(1) NUMBITS(1) [],
        MEM_DONE OFFSET(2) NUMBITS(1) [],
        AXI_RD_ERR OFFSET(3) NUMBITS(1) [],
        FIFO_OVERFLOW OFFSET(4) NUMBITS(1) [],
    ],
];

/// Registers of one channel of a PMC DMA engine.
#[derive(Clone, Copy)]
pub struct DmaChannelReg<M: Mmio> {
    regs: RegisterBlock<M>,
}

impl<M: Mmio> DmaChannelReg<M> {
    register_accessors! {
        addr: ADDR => ();
        addr_msb: ADDR_MSB => ();
        size: SIZE => Size::Register;
        sts: STS => Status::Register;
        ctrl: CTRL => Ctrl::Register;
        i_sts: I_STS => IntStatus::Register;
        i_en: I_EN => IntStatus::Register;
    }
}

/// Registers of one PMC DMA engine.
#[derive(Clone, Copy)]
pub struct PmcDmaReg<M: Mmio> {
    regs: RegisterBlock<M>,
}

impl<M: Mmio> PmcDmaReg<M> {
    /// # Safety
    ///
    /// `base` must be `DMA0_ADDR` or `DMA1_ADDR` and only one `PmcDmaReg`
    /// may drive that engine at a time.
    pub const unsafe fn new(mmio: M, base: u32) -> Self {
        Self {
            regs: RegisterBlock::new(mmio, base),
        }
    }

    /// The channel block at `offset`, `SRC_CHANNEL` or `DST_CHANNEL`.
    pub fn channel(&self, offset: u32) -> DmaChannelReg<M> {
        DmaChannelReg {
            regs: self.regs.sub_block(offset),
        }
    }
}
