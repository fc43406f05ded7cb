/*++

Licensed under the Apache-2.0 license.

File Name:

    dma.rs

Abstract:

    File contains API for the PMC DMA engines that move words between
    memory and the stream switch.

--*/

use crate::{cprintln, memory_layout, wait, CryptoError, CryptoResult};
use cryptocore_registers::dma::{
    self, Ctrl, DmaChannelReg, IntStatus, PmcDmaReg, Size, MAX_WORD_COUNT,
};
use cryptocore_registers::{Mmio, ReadWriteable, Readable, Writeable};

/// DMA engine instance.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DmaId {
    Dma0,
    Dma1,
}

impl DmaId {
    fn base(&self) -> u32 {
        match self {
            Self::Dma0 => memory_layout::PMC_DMA0_ORG,
            Self::Dma1 => memory_layout::PMC_DMA1_ORG,
        }
    }
}

/// Channel of a DMA engine.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DmaChannel {
    /// Memory to stream switch
    Src,

    /// Stream switch to memory
    Dst,
}

impl DmaChannel {
    fn offset(&self) -> u32 {
        match self {
            Self::Src => dma::SRC_CHANNEL,
            Self::Dst => dma::DST_CHANNEL,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Src => "src",
            Self::Dst => "dst",
        }
    }
}

/// Byte order of the words a channel moves.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Endianness {
    Native,

    /// Bytes of every word are reversed on the way through.
    Swapped,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DmaAddr {
    pub lo: u32,
    pub hi: u32,
}

impl From<u32> for DmaAddr {
    fn from(addr: u32) -> Self {
        Self { lo: addr, hi: 0 }
    }
}

impl From<u64> for DmaAddr {
    fn from(addr: u64) -> Self {
        Self {
            lo: addr as u32,
            hi: (addr >> 32) as u32,
        }
    }
}

impl From<DmaAddr> for u64 {
    fn from(addr: DmaAddr) -> Self {
        (addr.hi as u64) << 32 | (addr.lo as u64)
    }
}

/// One push or pull: where, how many words, and whether the source
/// channel marks the end of the message.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DmaTransfer {
    pub addr: DmaAddr,
    pub word_count: u32,
    pub last: bool,
}

impl DmaTransfer {
    /// Describe a transfer of `len` bytes at `addr`.
    ///
    /// # Returns
    ///
    /// * `DRIVER_DMA_UNALIGNED_SIZE` - `len` is not a whole number of words
    /// * `DRIVER_DMA_TRANSFER_TOO_LARGE` - `len` does not fit the SIZE register
    pub fn new(addr: impl Into<DmaAddr>, len: usize, last: bool) -> CryptoResult<Self> {
        if len % memory_layout::WORD_SIZE != 0 {
            Err(CryptoError::DRIVER_DMA_UNALIGNED_SIZE)?;
        }
        let word_count = u32::try_from(len / memory_layout::WORD_SIZE)
            .ok()
            .filter(|&words| words <= MAX_WORD_COUNT)
            .ok_or(CryptoError::DRIVER_DMA_TRANSFER_TOO_LARGE)?;
        Ok(Self {
            addr: addr.into(),
            word_count,
            last,
        })
    }

    /// Describe a push of `buf` into the stream switch.
    pub fn from_slice(buf: &[u8], last: bool) -> CryptoResult<Self> {
        Self::new(buf.as_ptr() as usize as u64, buf.len(), last)
    }

    /// Describe a pull from the stream switch into `buf`.
    pub fn from_mut_slice(buf: &mut [u8]) -> CryptoResult<Self> {
        Self::new(buf.as_mut_ptr() as usize as u64, buf.len(), false)
    }
}

/// PMC DMA engine.
pub struct Dma<M: Mmio> {
    dma: PmcDmaReg<M>,
    id: DmaId,
    poll_limit: u32,
}

impl<M: Mmio> Dma<M> {
    /// Create a new DMA instance
    ///
    /// # Safety
    ///
    /// Only one `Dma` may exist per engine.
    pub unsafe fn new(mmio: M, id: DmaId) -> Self {
        Self {
            dma: PmcDmaReg::new(mmio, id.base()),
            id,
            poll_limit: memory_layout::DMA_POLL_LIMIT,
        }
    }

    /// Bound the completion wait to `poll_limit` status reads.
    pub fn with_poll_limit(mut self, poll_limit: u32) -> Self {
        self.poll_limit = poll_limit;
        self
    }

    pub fn id(&self) -> DmaId {
        self.id
    }

    fn channel(&self, channel: DmaChannel) -> DmaChannelReg<M> {
        self.dma.channel(channel.offset())
    }

    /// Set the byte order of `channel`. Persists until changed.
    pub fn configure_endian_swap(&mut self, channel: DmaChannel, endianness: Endianness) {
        self.channel(channel).ctrl().modify(match endianness {
            Endianness::Swapped => Ctrl::ENDIANNESS::SET,
            Endianness::Native => Ctrl::ENDIANNESS::CLEAR,
        });
    }

    /// Program and start a transfer without waiting for it.
    ///
    /// Used when both channels of an engine must run at once; the caller
    /// completes each channel with `wait_and_ack`.
    pub fn start(&mut self, channel: DmaChannel, xfer: &DmaTransfer, endianness: Endianness) {
        self.configure_endian_swap(channel, endianness);

        let regs = self.channel(channel);
        regs.addr().set(xfer.addr.lo);
        regs.addr_msb().set(xfer.addr.hi);

        let last = channel == DmaChannel::Src && xfer.last;
        regs.size().write(
            Size::WORD_COUNT.val(xfer.word_count) + Size::LAST_WORD.val(u32::from(last)),
        );
    }

    /// Run a transfer to completion.
    ///
    /// # Returns
    ///
    /// * `DRIVER_DMA_TIMEOUT` - The done flag was not observed within the poll limit
    pub fn transfer(
        &mut self,
        channel: DmaChannel,
        xfer: &DmaTransfer,
        endianness: Endianness,
    ) -> CryptoResult<()> {
        self.start(channel, xfer, endianness);
        self.wait_and_ack(channel)
    }

    /// Wait for the done flag of `channel`, then acknowledge it.
    pub fn wait_and_ack(&mut self, channel: DmaChannel) -> CryptoResult<()> {
        let i_sts = self.channel(channel).i_sts();
        let result = wait::until(self.poll_limit, CryptoError::DRIVER_DMA_TIMEOUT, || {
            i_sts.is_set(IntStatus::DONE)
        });
        if result.is_err() {
            cprintln!("[dma] {} channel timeout", channel.name());
        }
        result?;
        self.clear_interrupt(channel);
        Ok(())
    }

    /// Acknowledge the done flag of `channel`.
    pub fn clear_interrupt(&mut self, channel: DmaChannel) {
        self.channel(channel).i_sts().write(IntStatus::DONE::SET);
    }
}
