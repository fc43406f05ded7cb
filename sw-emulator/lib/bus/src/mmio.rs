// Licensed under the Apache-2.0 license

use std::cell::{Cell, RefCell, RefMut};

use cryptocore_registers::Mmio;

use crate::Bus;

/// An MMIO implementation that reads and writes to a `cryptocore_emu_bus::Bus`.
///
/// Drivers take the accessor by value, so `Mmio` is implemented for a shared
/// reference; every driver built from the same `BusMmio` sees one bus.
pub struct BusMmio<TBus: Bus> {
    bus: RefCell<TBus>,
    accesses: Cell<usize>,
}

impl<TBus: Bus> BusMmio<TBus> {
    pub fn new(bus: TBus) -> Self {
        Self {
            bus: RefCell::new(bus),
            accesses: Cell::new(0),
        }
    }

    pub fn into_inner(self) -> TBus {
        self.bus.into_inner()
    }

    /// Borrow the bus, e.g. to inspect peripheral state or inject faults.
    ///
    /// # Panics
    ///
    /// Panics if called while a register access is in flight.
    pub fn bus(&self) -> RefMut<'_, TBus> {
        self.bus.borrow_mut()
    }

    /// Number of register reads and writes performed so far.
    pub fn access_count(&self) -> usize {
        self.accesses.get()
    }
}

impl<TBus: Bus> Mmio for &BusMmio<TBus> {
    /// Loads the word at `addr` from the bus.
    ///
    /// # Panics
    ///
    /// This function panics if the bus faults.
    unsafe fn read32(&self, addr: u32) -> u32 {
        self.accesses.set(self.accesses.get() + 1);
        match self.bus.borrow_mut().read(addr) {
            Ok(val) => val,
            Err(err) => panic!("bus read fault at {addr:#010x}: {err:?}"),
        }
    }

    /// Stores `val` to `addr` on the bus.
    ///
    /// # Panics
    ///
    /// This function panics if the bus faults.
    unsafe fn write32(&self, addr: u32, val: u32) {
        self.accesses.set(self.accesses.get() + 1);
        if let Err(err) = self.bus.borrow_mut().write(addr, val) {
            panic!("bus write fault at {addr:#010x}: {err:?}");
        }
    }
}
