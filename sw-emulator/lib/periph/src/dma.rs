/*++

Licensed under the Apache-2.0 license.

File Name:

    dma.rs

Abstract:

    File contains the PMC DMA peripheral model. Transfers read and write
    host memory directly; the addresses programmed by the driver are
    pointers into the test process.

--*/

use cryptocore_emu_bus::BusError;
use cryptocore_registers::dma::{self as regs, Ctrl, IntStatus, Size};
use tock_registers::LocalRegisterCopy;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DmaChannel {
    Src,
    Dst,
}

/// A transfer latched by a SIZE write.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DmaTransfer {
    pub addr: u64,
    pub len: usize,
    pub last: bool,
    pub swap: bool,
}

#[derive(Debug, Copy, Clone)]
struct DstCursor {
    addr: u64,
    remaining: usize,
    swap: bool,
}

struct ChannelRegs {
    addr: u32,
    addr_msb: u32,
    size: LocalRegisterCopy<u32, Size::Register>,
    ctrl: LocalRegisterCopy<u32, Ctrl::Register>,
    i_sts: LocalRegisterCopy<u32, IntStatus::Register>,
    i_en: u32,
}

impl Default for ChannelRegs {
    fn default() -> Self {
        Self {
            addr: 0,
            addr_msb: 0,
            size: LocalRegisterCopy::new(0),
            ctrl: LocalRegisterCopy::new(0),
            i_sts: LocalRegisterCopy::new(0),
            i_en: 0,
        }
    }
}

impl ChannelRegs {
    fn transfer(&self) -> DmaTransfer {
        DmaTransfer {
            addr: (u64::from(self.addr_msb) << 32) | u64::from(self.addr),
            len: self.size.read(Size::WORD_COUNT) as usize * 4,
            last: self.size.is_set(Size::LAST_WORD),
            swap: self.ctrl.is_set(Ctrl::ENDIANNESS),
        }
    }
}

/// Reverse the bytes of every 32-bit word.
pub fn swap_words(bytes: &mut [u8]) {
    for word in bytes.chunks_exact_mut(4) {
        word.reverse();
    }
}

/// PMC DMA engine with a source and a destination channel.
#[derive(Default)]
pub struct PmcDma {
    src: ChannelRegs,
    dst: ChannelRegs,
    started: Option<DmaChannel>,
    dst_cursor: Option<DstCursor>,

    /// When set, transfers move data but never report done.
    stall: bool,
}

impl PmcDma {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stall(&mut self, stall: bool) {
        self.stall = stall;
    }

    fn channel(&self, offset: u32) -> Option<(&ChannelRegs, u32)> {
        match offset {
            0..=0x7FF => Some((&self.src, offset - regs::SRC_CHANNEL)),
            0x800..=0xFFF => Some((&self.dst, offset - regs::DST_CHANNEL)),
            _ => None,
        }
    }

    fn channel_mut(&mut self, offset: u32) -> Option<(&mut ChannelRegs, DmaChannel, u32)> {
        match offset {
            0..=0x7FF => Some((&mut self.src, DmaChannel::Src, offset - regs::SRC_CHANNEL)),
            0x800..=0xFFF => Some((&mut self.dst, DmaChannel::Dst, offset - regs::DST_CHANNEL)),
            _ => None,
        }
    }

    pub fn read(&self, offset: u32) -> Result<u32, BusError> {
        let (ch, reg) = self.channel(offset).ok_or(BusError::LoadAccessFault)?;
        match reg {
            regs::ADDR => Ok(ch.addr),
            regs::ADDR_MSB => Ok(ch.addr_msb),
            regs::SIZE => Ok(ch.size.get()),
            regs::STS => Ok(0),
            regs::CTRL => Ok(ch.ctrl.get()),
            regs::I_STS => Ok(ch.i_sts.get()),
            regs::I_EN => Ok(ch.i_en),
            _ => Err(BusError::LoadAccessFault),
        }
    }

    pub fn write(&mut self, offset: u32, val: u32) -> Result<(), BusError> {
        let (ch, channel, reg) = self.channel_mut(offset).ok_or(BusError::StoreAccessFault)?;
        let mut started = None;
        match reg {
            regs::ADDR => ch.addr = val,
            regs::ADDR_MSB => ch.addr_msb = val,
            regs::SIZE => {
                ch.size.set(val);
                started = Some(channel);
            }
            regs::CTRL => ch.ctrl.set(val),
            regs::I_STS => ch.i_sts.set(ch.i_sts.get() & !val),
            regs::I_EN => ch.i_en = val,
            _ => Err(BusError::StoreAccessFault)?,
        }
        if started.is_some() {
            self.started = started;
        }
        Ok(())
    }

    /// Channel started by the last SIZE write, with its latched transfer.
    pub fn take_started(&mut self) -> Option<(DmaChannel, DmaTransfer)> {
        self.started.take().map(|channel| {
            let xfer = match channel {
                DmaChannel::Src => self.src.transfer(),
                DmaChannel::Dst => self.dst.transfer(),
            };
            (channel, xfer)
        })
    }

    pub fn complete(&mut self, channel: DmaChannel) {
        if self.stall {
            return;
        }
        let ch = match channel {
            DmaChannel::Src => &mut self.src,
            DmaChannel::Dst => &mut self.dst,
        };
        ch.i_sts.modify(IntStatus::DONE::SET);
    }

    /// Read the source buffer of `xfer` as it enters the stream switch.
    pub fn read_src(&self, xfer: &DmaTransfer) -> Vec<u8> {
        if xfer.len == 0 {
            return Vec::new();
        }
        // SAFETY: the driver programs the address of a live buffer of at
        // least `len` bytes and keeps it borrowed until the channel is done.
        let mut data =
            unsafe { std::slice::from_raw_parts(xfer.addr as usize as *const u8, xfer.len) }
                .to_vec();
        if xfer.swap {
            swap_words(&mut data);
        }
        data
    }

    /// Arm the destination channel to receive `xfer.len` bytes.
    pub fn arm_dst(&mut self, xfer: &DmaTransfer) {
        if xfer.len == 0 {
            self.dst_cursor = None;
            self.complete(DmaChannel::Dst);
            return;
        }
        self.dst_cursor = Some(DstCursor {
            addr: xfer.addr,
            remaining: xfer.len,
            swap: xfer.swap,
        });
    }

    /// Bytes the armed destination channel still accepts.
    pub fn dst_room(&self) -> usize {
        self.dst_cursor.map_or(0, |cursor| cursor.remaining)
    }

    /// Write stream bytes to the armed destination buffer.
    pub fn write_dst(&mut self, bytes: &[u8]) {
        let Some(mut cursor) = self.dst_cursor else {
            return;
        };
        let len = bytes.len().min(cursor.remaining);
        let mut data = bytes[..len].to_vec();
        if cursor.swap {
            swap_words(&mut data);
        }
        // SAFETY: see `read_src`; the destination buffer is exclusively
        // lent to the channel until it reports done.
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), cursor.addr as usize as *mut u8, len);
        }
        cursor.addr += len as u64;
        cursor.remaining -= len;

        if cursor.remaining == 0 {
            self.dst_cursor = None;
            self.complete(DmaChannel::Dst);
        } else {
            self.dst_cursor = Some(cursor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(dma: &mut PmcDma, base: u32, buf: *const u8, words: u32, last: bool) {
        let addr = buf as usize as u64;
        dma.write(base + regs::ADDR, addr as u32).unwrap();
        dma.write(base + regs::ADDR_MSB, (addr >> 32) as u32).unwrap();
        dma.write(base + regs::SIZE, (words << 2) | u32::from(last))
            .unwrap();
    }

    #[test]
    fn test_src_read_with_swap() {
        let mut dma = PmcDma::new();
        let buf = [1u8, 2, 3, 4, 5, 6, 7, 8];
        dma.write(regs::CTRL, 1 << 23).unwrap();
        start(&mut dma, regs::SRC_CHANNEL, buf.as_ptr(), 2, true);

        let (channel, xfer) = dma.take_started().unwrap();
        assert_eq!(channel, DmaChannel::Src);
        assert!(xfer.last);
        assert_eq!(dma.read_src(&xfer), [4, 3, 2, 1, 8, 7, 6, 5]);
        assert_eq!(dma.take_started(), None);
    }

    #[test]
    fn test_dst_completes_when_full() {
        let mut dma = PmcDma::new();
        let mut buf = [0u8; 8];
        start(&mut dma, regs::DST_CHANNEL, buf.as_mut_ptr(), 2, false);
        let (_, xfer) = dma.take_started().unwrap();
        dma.arm_dst(&xfer);

        dma.write_dst(&[1, 2, 3, 4]);
        assert_eq!(dma.read(regs::DST_CHANNEL + regs::I_STS).unwrap(), 0);
        dma.write_dst(&[5, 6, 7, 8, 9, 10, 11, 12]);
        assert_eq!(dma.read(regs::DST_CHANNEL + regs::I_STS).unwrap(), 1 << 1);
        assert_eq!(dma.dst_room(), 0);
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);

        dma.write(regs::DST_CHANNEL + regs::I_STS, 1 << 1).unwrap();
        assert_eq!(dma.read(regs::DST_CHANNEL + regs::I_STS).unwrap(), 0);
    }

    #[test]
    fn test_stalled_channel_never_completes() {
        let mut dma = PmcDma::new();
        dma.set_stall(true);
        dma.complete(DmaChannel::Src);
        assert_eq!(dma.read(regs::I_STS).unwrap(), 0);
    }
}
