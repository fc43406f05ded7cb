/*++

Licensed under the Apache-2.0 license.

File Name:

    mmio.rs

Abstract:

    File contains the 32-bit register access primitives used by the drivers.

--*/

use core::marker::PhantomData;

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::RegisterLongName;

/// Word-sized register access.
///
/// Implementations must be cheap to copy; every register block holds its own
/// copy of the accessor.
pub trait Mmio: Copy {
    /// Loads the 32-bit register at `addr`.
    ///
    /// # Safety
    ///
    /// `addr` must be a valid, aligned register address for this accessor.
    unsafe fn read32(&self, addr: u32) -> u32;

    /// Stores `val` to the 32-bit register at `addr`.
    ///
    /// # Safety
    ///
    /// `addr` must be a valid, aligned register address for this accessor.
    unsafe fn write32(&self, addr: u32, val: u32);
}

/// Volatile access to physical registers.
#[derive(Clone, Copy, Default)]
pub struct RealMmio;

impl Mmio for RealMmio {
    #[inline(always)]
    unsafe fn read32(&self, addr: u32) -> u32 {
        core::ptr::read_volatile(addr as usize as *const u32)
    }

    #[inline(always)]
    unsafe fn write32(&self, addr: u32, val: u32) {
        core::ptr::write_volatile(addr as usize as *mut u32, val)
    }
}

/// One 32-bit register reached through `M`, with the field layout `R`.
///
/// Registers without named fields use the unit layout and are driven with
/// `get` and `set`.
pub struct Reg<M: Mmio, R: RegisterLongName = ()> {
    mmio: M,
    addr: u32,
    layout: PhantomData<R>,
}

impl<M: Mmio, R: RegisterLongName> Reg<M, R> {
    /// # Safety
    ///
    /// `addr` must be a valid register address for `mmio` whose fields are
    /// laid out as `R`.
    pub const unsafe fn new(mmio: M, addr: u32) -> Self {
        Self {
            mmio,
            addr,
            layout: PhantomData,
        }
    }

    pub fn addr(&self) -> u32 {
        self.addr
    }
}

impl<M: Mmio, R: RegisterLongName> Readable for Reg<M, R> {
    type T = u32;
    type R = R;

    #[inline(always)]
    fn get(&self) -> u32 {
        // SAFETY: `new` guarantees the address is a register of `mmio`.
        unsafe { self.mmio.read32(self.addr) }
    }
}

impl<M: Mmio, R: RegisterLongName> Writeable for Reg<M, R> {
    type T = u32;
    type R = R;

    #[inline(always)]
    fn set(&self, value: u32) {
        // SAFETY: `new` guarantees the address is a register of `mmio`.
        unsafe { self.mmio.write32(self.addr, value) }
    }
}

/// A peripheral's registers, addressed relative to its base.
#[derive(Clone, Copy)]
pub struct RegisterBlock<M: Mmio> {
    mmio: M,
    base: u32,
}

impl<M: Mmio> RegisterBlock<M> {
    /// # Safety
    ///
    /// The caller must ensure `base` addresses the peripheral through `mmio`
    /// and that no other block is used to drive the same registers
    /// concurrently.
    pub const unsafe fn new(mmio: M, base: u32) -> Self {
        Self { mmio, base }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    /// Registers of a sub-unit starting `offset` bytes past the base.
    pub(crate) fn sub_block(&self, offset: u32) -> Self {
        Self {
            mmio: self.mmio,
            base: self.base + offset,
        }
    }

    /// The register at `offset` from the base.
    #[inline(always)]
    pub fn reg<R: RegisterLongName>(&self, offset: u32) -> Reg<M, R> {
        // SAFETY: `new` guarantees the base addresses this peripheral.
        unsafe { Reg::new(self.mmio, self.base + offset) }
    }
}
