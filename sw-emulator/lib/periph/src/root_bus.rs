/*++

Licensed under the Apache-2.0 license.

File Name:

    root_bus.rs

Abstract:

    File contains the root Bus implementation of the crypto subsystem
    emulator. It decodes register addresses and moves stream data between
    the DMA engines and the AES core along the routes the stream switch
    selects.

--*/

use cryptocore_emu_bus::{Bus, BusError};
use cryptocore_registers::{aes, dma, sss};

use crate::dma::{DmaChannel, DmaTransfer};
use crate::{AesCore, PmcDma, SssPort, SssSwitch};

const AES_SIZE: u32 = 0x1000;
const DMA_SIZE: u32 = 0x1000;
const SSS_SIZE: u32 = 0x4;

fn offset_in(addr: u32, base: u32, size: u32) -> Option<u32> {
    (base..base + size).contains(&addr).then(|| addr - base)
}

/// AES core, both PMC DMA engines and the stream switch.
#[derive(Default)]
pub struct CryptoRootBus {
    pub aes: AesCore,
    pub dma0: PmcDma,
    pub dma1: PmcDma,
    pub sss: SssSwitch,
}

impl CryptoRootBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn dma_mut(&mut self, port: SssPort) -> Option<&mut PmcDma> {
        match port {
            SssPort::Dma0 => Some(&mut self.dma0),
            SssPort::Dma1 => Some(&mut self.dma1),
            _ => None,
        }
    }

    fn run_dma(&mut self, port: SssPort, channel: DmaChannel, xfer: DmaTransfer) {
        match channel {
            DmaChannel::Dst => {
                if let Some(dma) = self.dma_mut(port) {
                    dma.arm_dst(&xfer);
                }
            }
            DmaChannel::Src => {
                let sink = self.sss.sink_of(port);
                let Some(dma) = self.dma_mut(port) else {
                    return;
                };
                let data = dma.read_src(&xfer);
                match sink {
                    Some(SssPort::Aes) => {
                        dma.complete(DmaChannel::Src);
                        self.aes.push(&data, xfer.last);
                    }
                    Some(loopback) if loopback == port => {
                        dma.complete(DmaChannel::Src);
                        dma.write_dst(&data);
                    }
                    // Nothing drains the stream; the channel never finishes.
                    _ => {}
                }
            }
        }
        self.drain_aes_output();
    }

    fn drain_aes_output(&mut self) {
        let Some(port) = self.sss.aes_sink() else {
            return;
        };
        let dma = match port {
            SssPort::Dma0 => &mut self.dma0,
            SssPort::Dma1 => &mut self.dma1,
            _ => return,
        };
        while dma.dst_room() > 0 && self.aes.has_output() {
            let bytes = self.aes.take_output(dma.dst_room());
            dma.write_dst(&bytes);
        }
    }
}

impl Bus for CryptoRootBus {
    fn read(&mut self, addr: u32) -> Result<u32, BusError> {
        if addr % 4 != 0 {
            return Err(BusError::LoadAddrMisaligned);
        }
        if let Some(offset) = offset_in(addr, aes::ADDR, AES_SIZE) {
            self.aes.read(offset)
        } else if let Some(offset) = offset_in(addr, dma::DMA0_ADDR, DMA_SIZE) {
            self.dma0.read(offset)
        } else if let Some(offset) = offset_in(addr, dma::DMA1_ADDR, DMA_SIZE) {
            self.dma1.read(offset)
        } else if let Some(offset) = offset_in(addr, sss::ADDR, SSS_SIZE) {
            self.sss.read(offset)
        } else {
            Err(BusError::LoadAccessFault)
        }
    }

    fn write(&mut self, addr: u32, val: u32) -> Result<(), BusError> {
        if addr % 4 != 0 {
            return Err(BusError::StoreAddrMisaligned);
        }
        if let Some(offset) = offset_in(addr, aes::ADDR, AES_SIZE) {
            self.aes.write(offset, val)
        } else if let Some(offset) = offset_in(addr, sss::ADDR, SSS_SIZE) {
            self.sss.write(offset, val)
        } else {
            let (port, offset) = if let Some(offset) = offset_in(addr, dma::DMA0_ADDR, DMA_SIZE) {
                (SssPort::Dma0, offset)
            } else if let Some(offset) = offset_in(addr, dma::DMA1_ADDR, DMA_SIZE) {
                (SssPort::Dma1, offset)
            } else {
                return Err(BusError::StoreAccessFault);
            };
            let dma = self.dma_mut(port).ok_or(BusError::StoreAccessFault)?;
            dma.write(offset, val)?;
            if let Some((channel, xfer)) = dma.take_started() {
                self.run_dma(port, channel, xfer);
            }
            Ok(())
        }
    }
}
