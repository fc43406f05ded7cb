/*++

Licensed under the Apache-2.0 license.

File Name:

    mod.rs

Abstract:

    File contains the emulated platform used by the driver integration
    tests.

--*/

#![allow(dead_code)]

use cryptocore_drivers::{Aes, Dma, DmaId, Sss};
use cryptocore_emu_bus::BusMmio;
use cryptocore_emu_periph::CryptoRootBus;

pub type EmuMmio<'a> = &'a BusMmio<CryptoRootBus>;

/// Poll budget used by tests that expect a timeout.
pub const SHORT_POLL_LIMIT: u32 = 64;

pub fn platform() -> BusMmio<CryptoRootBus> {
    BusMmio::new(CryptoRootBus::new())
}

pub fn sss(mmio: EmuMmio) -> Sss<EmuMmio> {
    unsafe { Sss::new(mmio) }
}

pub fn dma(mmio: EmuMmio, id: DmaId) -> Dma<EmuMmio> {
    unsafe { Dma::new(mmio, id) }
}

/// An engine that has not been bound to a DMA yet.
pub fn aes_uninitialized(mmio: EmuMmio) -> Aes<EmuMmio> {
    unsafe { Aes::new(mmio, sss(mmio)) }
}

/// An initialized engine streaming through DMA0.
pub fn aes(mmio: EmuMmio) -> Aes<EmuMmio> {
    aes_on(mmio, DmaId::Dma0)
}

pub fn aes_on(mmio: EmuMmio, id: DmaId) -> Aes<EmuMmio> {
    let mut aes = aes_uninitialized(mmio);
    aes.initialize(dma(mmio, id)).unwrap();
    aes
}

/// Hardware IV block for a 96-bit GCM nonce.
pub fn iv_block(nonce: &[u8; 12]) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..12].copy_from_slice(nonce);
    iv
}

pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}
