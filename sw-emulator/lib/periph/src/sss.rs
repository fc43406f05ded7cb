/*++

Licensed under the Apache-2.0 license.

File Name:

    sss.rs

Abstract:

    File contains the Secure Stream Switch peripheral model.

--*/

use cryptocore_emu_bus::BusError;
use cryptocore_registers::sss::{self, code, Cfg};
use tock_registers::fields::Field;
use tock_registers::LocalRegisterCopy;

/// Stream switch port.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SssPort {
    Dma0,
    Dma1,
    Aes,
    Sha,
    Sbi,
}

/// Stream switch. Holds only the routing configuration; data moves in
/// `CryptoRootBus`.
pub struct SssSwitch {
    cfg: LocalRegisterCopy<u32, Cfg::Register>,
}

impl Default for SssSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl SssSwitch {
    pub fn new() -> Self {
        Self {
            cfg: LocalRegisterCopy::new(0),
        }
    }

    pub fn cfg(&self) -> u32 {
        self.cfg.get()
    }

    pub fn read(&self, offset: u32) -> Result<u32, BusError> {
        match offset {
            sss::SSS_CFG => Ok(self.cfg.get()),
            _ => Err(BusError::LoadAccessFault),
        }
    }

    pub fn write(&mut self, offset: u32, val: u32) -> Result<(), BusError> {
        match offset {
            sss::SSS_CFG => {
                self.cfg.set(val);
                Ok(())
            }
            _ => Err(BusError::StoreAccessFault),
        }
    }

    fn field(&self, field: Field<u32, Cfg::Register>) -> u32 {
        self.cfg.read(field)
    }

    /// Sink fed by the source channel of `port`.
    pub fn sink_of(&self, port: SssPort) -> Option<SssPort> {
        let (aes, sha, own_field, loopback) = match port {
            SssPort::Dma0 => (
                code::AES_FROM_DMA0,
                code::SHA_FROM_DMA0,
                Cfg::DMA0,
                code::DMA0_FROM_DMA0,
            ),
            SssPort::Dma1 => (
                code::AES_FROM_DMA1,
                code::SHA_FROM_DMA1,
                Cfg::DMA1,
                code::DMA1_FROM_DMA1,
            ),
            _ => return None,
        };
        if self.field(Cfg::AES) == aes {
            Some(SssPort::Aes)
        } else if self.field(Cfg::SHA) == sha {
            Some(SssPort::Sha)
        } else if self.field(own_field) == loopback {
            Some(port)
        } else {
            None
        }
    }

    /// DMA engine receiving the AES output stream.
    pub fn aes_sink(&self) -> Option<SssPort> {
        if self.field(Cfg::DMA0) == code::DMA0_FROM_AES {
            Some(SssPort::Dma0)
        } else if self.field(Cfg::DMA1) == code::DMA1_FROM_AES {
            Some(SssPort::Dma1)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aes_round_trip_routing() {
        let mut sss = SssSwitch::new();
        sss.write(sss::SSS_CFG, (code::AES_FROM_DMA1 << 12) | (code::DMA1_FROM_AES << 4))
            .unwrap();
        assert_eq!(sss.sink_of(SssPort::Dma1), Some(SssPort::Aes));
        assert_eq!(sss.sink_of(SssPort::Dma0), None);
        assert_eq!(sss.aes_sink(), Some(SssPort::Dma1));
    }

    #[test]
    fn test_unrouted_switch() {
        let sss = SssSwitch::new();
        assert_eq!(sss.sink_of(SssPort::Dma0), None);
        assert_eq!(sss.aes_sink(), None);
        assert_eq!(sss.read(0x4), Err(BusError::LoadAccessFault));
    }
}
