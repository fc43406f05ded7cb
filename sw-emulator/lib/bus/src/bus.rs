/*++

Licensed under the Apache-2.0 license.

File Name:

    bus.rs

Abstract:

    File contains definition of the Bus trait.

--*/

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BusError {
    /// Load address misaligned exception
    LoadAddrMisaligned,

    /// Load access fault exception
    LoadAccessFault,

    /// Store address misaligned exception
    StoreAddrMisaligned,

    /// Store access fault exception
    StoreAccessFault,
}

/// Represents an abstract register bus. Used to read and write peripheral
/// registers one 32-bit word at a time.
pub trait Bus {
    /// Read the word at the given address
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to read from
    ///
    /// # Error
    ///
    /// * `BusError` - `LoadAccessFault` or `LoadAddrMisaligned`
    fn read(&mut self, addr: u32) -> Result<u32, BusError>;

    /// Write a word to the given address
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to write
    /// * `val` - Data to write
    ///
    /// # Error
    ///
    /// * `BusError` - `StoreAccessFault` or `StoreAddrMisaligned`
    fn write(&mut self, addr: u32, val: u32) -> Result<(), BusError>;
}
