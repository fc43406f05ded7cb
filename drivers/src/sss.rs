/*++

Licensed under the Apache-2.0 license.

File Name:

    sss.rs

Abstract:

    File contains API for the Secure Stream Switch, the shared router that
    connects DMA engines to the crypto cores.

--*/

use crate::{cprintln, DmaId, CryptoError, CryptoResult};
use cryptocore_registers::sss::{code, Cfg, SssReg};
use cryptocore_registers::{Mmio, ReadWriteable};
use tock_registers::fields::FieldValue;

/// Port of the stream switch.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SssEndpoint {
    Dma0,
    Dma1,
    Aes,
    Sha,
    Sbi,
}

impl From<DmaId> for SssEndpoint {
    fn from(id: DmaId) -> Self {
        match id {
            DmaId::Dma0 => Self::Dma0,
            DmaId::Dma1 => Self::Dma1,
        }
    }
}

impl SssEndpoint {
    fn is_dma(&self) -> bool {
        matches!(self, Self::Dma0 | Self::Dma1)
    }
}

/// SSS_CFG field value connecting `input` to `output`, if the switch
/// supports that pair.
fn route_code(input: SssEndpoint, output: SssEndpoint) -> Option<FieldValue<u32, Cfg::Register>> {
    use SssEndpoint::*;
    let field = match (output, input) {
        (Dma0, Dma0) => Cfg::DMA0.val(code::DMA0_FROM_DMA0),
        (Dma0, Aes) => Cfg::DMA0.val(code::DMA0_FROM_AES),
        (Dma0, Sbi) => Cfg::DMA0.val(code::DMA0_FROM_SBI),
        (Dma1, Dma1) => Cfg::DMA1.val(code::DMA1_FROM_DMA1),
        (Dma1, Aes) => Cfg::DMA1.val(code::DMA1_FROM_AES),
        (Dma1, Sbi) => Cfg::DMA1.val(code::DMA1_FROM_SBI),
        (Aes, Dma0) => Cfg::AES.val(code::AES_FROM_DMA0),
        (Aes, Dma1) => Cfg::AES.val(code::AES_FROM_DMA1),
        (Aes, Sbi) => Cfg::AES.val(code::AES_FROM_SBI),
        (Sha, Dma0) => Cfg::SHA.val(code::SHA_FROM_DMA0),
        (Sha, Dma1) => Cfg::SHA.val(code::SHA_FROM_DMA1),
        (Sha, Sbi) => Cfg::SHA.val(code::SHA_FROM_SBI),
        (Sbi, Dma0) => Cfg::SBI.val(code::SBI_FROM_DMA0),
        (Sbi, Dma1) => Cfg::SBI.val(code::SBI_FROM_DMA1),
        _ => return None,
    };
    Some(field)
}

/// Secure Stream Switch.
///
/// The switch holds no per-operation state; callers route again before each
/// independent operation and serialize access across crypto engines.
pub struct Sss<M: Mmio> {
    sss: SssReg<M>,
}

impl<M: Mmio> Sss<M> {
    /// # Safety
    ///
    /// Only one `Sss` may exist.
    pub unsafe fn new(mmio: M) -> Self {
        Self {
            sss: SssReg::new(mmio),
        }
    }

    /// Connect `input` to `output`, leaving other sinks untouched.
    ///
    /// # Returns
    ///
    /// * `DRIVER_SSS_ROUTING_CONFLICT` - The switch cannot connect the pair
    pub fn route(&mut self, input: SssEndpoint, output: SssEndpoint) -> CryptoResult<()> {
        let Some(field) = route_code(input, output) else {
            cprintln!("[sss] no route between requested endpoints");
            return Err(CryptoError::DRIVER_SSS_ROUTING_CONFLICT);
        };
        self.sss.cfg().modify(field);
        Ok(())
    }

    /// Route `input` through the AES core and back out to `output`.
    ///
    /// # Returns
    ///
    /// * `DRIVER_SSS_ROUTING_CONFLICT` - `output` is not a DMA engine
    /// * `DRIVER_SSS_DMA_MISMATCH` - Input and output are different DMA engines
    pub fn route_aes(&mut self, input: SssEndpoint, output: SssEndpoint) -> CryptoResult<()> {
        if !output.is_dma() {
            Err(CryptoError::DRIVER_SSS_ROUTING_CONFLICT)?;
        }
        if input.is_dma() && input != output {
            Err(CryptoError::DRIVER_SSS_DMA_MISMATCH)?;
        }
        self.route(input, SssEndpoint::Aes)?;
        self.route(SssEndpoint::Aes, output)
    }

    /// Route `input` into the SHA core. The digest is read from the core.
    pub fn route_sha(&mut self, input: SssEndpoint) -> CryptoResult<()> {
        self.route(input, SssEndpoint::Sha)
    }
}
