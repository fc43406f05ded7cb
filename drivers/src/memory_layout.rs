/*++
Licensed under the Apache-2.0 license.

File Name:

    memory_layout.rs

Abstract:

    The file contains the peripheral addresses and the poll budgets used
    by the crypto drivers.

--*/

//
// Peripheral Addresses
//
pub const AES_ORG: u32 = cryptocore_registers::aes::ADDR;
pub const PMC_DMA0_ORG: u32 = cryptocore_registers::dma::DMA0_ADDR;
pub const PMC_DMA1_ORG: u32 = cryptocore_registers::dma::DMA1_ADDR;
pub const SSS_ORG: u32 = cryptocore_registers::sss::ADDR;

//
// Poll Budgets (register reads before a wait gives up)
//
pub const DMA_POLL_LIMIT: u32 = 0x00FF_FFFF;
pub const AES_POLL_LIMIT: u32 = 0x00FF_FFFF;

//
// Transfer Geometry
//
pub const WORD_SIZE: usize = 4;
pub const AES_BLOCK_SIZE: usize = 16;
