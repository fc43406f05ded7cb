/*++

Licensed under the Apache-2.0 license.

File Name:

    aes.rs

Abstract:

    Register map of the AES-GCM core.

--*/

use crate::{Mmio, Reg, RegisterBlock};
use tock_registers::interfaces::Readable;
use tock_registers::register_bitfields;

pub const ADDR: u32 = 0xF11E_0000;

pub const STATUS: u32 = 0x000;
pub const KEY_SEL: u32 = 0x004;
pub const KEY_LOAD: u32 = 0x008;
pub const START_MSG: u32 = 0x00C;
pub const SOFT_RST: u32 = 0x010;
pub const KEY_CLEAR: u32 = 0x014;
pub const MODE: u32 = 0x018;
pub const KUP_WR: u32 = 0x01C;
pub const IV_0: u32 = 0x040;
pub const IV_3: u32 = 0x04C;
pub const KEY_SIZE: u32 = 0x050;
pub const KEY_DEC: u32 = 0x058;
pub const KEY_DEC_TRIG: u32 = 0x05C;
pub const KEY_DEC_SEL: u32 = 0x060;
pub const KEY_ZEROED_STATUS: u32 = 0x064;
pub const AAD: u32 = 0x06C;
pub const SPLIT_CFG: u32 = 0x070;
pub const DATA_SWAP: u32 = 0x074;
pub const CM_EN: u32 = 0x078;

/// Boot header key, word 0. Eight consecutive words.
pub const BH_KEY_0: u32 = 0x0F0;

/// User key 0, word 0. Each user key occupies `USER_KEY_STRIDE` bytes.
pub const USER_KEY_0_0: u32 = 0x110;
pub const USER_KEY_STRIDE: u32 = 0x20;

/// Key mask share used in split-key mode, word 0.
pub const KEY_MASK_0: u32 = 0x210;
pub const KEY_MASK_WORDS: usize = 8;

/// KEY_DEC value selecting key decryption for every key word.
pub const KEY_DEC_ALL: u32 = 0xFFFF_FFFF;

register_bitfields! [
    u32,

    /// STATUS register.
    pub Status [
        DONE OFFSET(0) NUMBITS(1) [],
        READY OFFSET(1) NUMBITS(1) [],
        GCM_TAG_PASS OFFSET(3) NUMBITS(1) [],
        KEY_INIT_DONE OFFSET(4) NUMBITS(1) [],
        BLK_KEY_DEC_DONE OFFSET(5) NUMBITS(1) [],
        CM_ENABLED OFFSET(12) NUMBITS(1) [],
    ],

    /// KEY_LOAD, START_MSG and KEY_DEC_TRIG. Writing one fires the action.
    pub Trigger [
        GO OFFSET(0) NUMBITS(1) [],
    ],

    /// SOFT_RST register. The core is held in reset while set.
    pub SoftRst [
        RESET OFFSET(0) NUMBITS(1) [],
    ],

    pub Mode [
        ENC_DEC OFFSET(0) NUMBITS(1) [
            Decrypt = 0,
            Encrypt = 1,
        ],
    ],

    pub KupWr [
        KEY_SAVE OFFSET(0) NUMBITS(1) [],
        IV_SAVE OFFSET(1) NUMBITS(1) [],
    ],

    pub KeySize [
        SIZE OFFSET(0) NUMBITS(2) [
            Bits128 = 0,
            Bits256 = 2,
        ],
    ],

    /// AAD register. Stream data is authenticated only while set.
    pub Aad [
        ACTIVE OFFSET(0) NUMBITS(1) [],
    ],

    pub SplitCfg [
        DATA_SPLIT OFFSET(0) NUMBITS(1) [],
        KEY_SPLIT OFFSET(1) NUMBITS(1) [],
    ],

    /// DATA_SWAP register. Byte-reverses each stream word inside the core.
    pub DataSwap [
        SWAP OFFSET(0) NUMBITS(1) [],
    ],

    pub CmEn [
        ENABLE OFFSET(0) NUMBITS(1) [],
    ],
];

bitflags::bitflags! {
    /// KEY_CLEAR and KEY_ZEROED_STATUS registers. One bit per key slot.
    pub struct KeyClear : u32 {
        const USER_KEY_0 = 1 << 0;
        const USER_KEY_1 = 1 << 1;
        const USER_KEY_2 = 1 << 2;
        const USER_KEY_3 = 1 << 3;
        const USER_KEY_4 = 1 << 4;
        const USER_KEY_5 = 1 << 5;
        const USER_KEY_6 = 1 << 6;
        const USER_KEY_7 = 1 << 7;
        const EFUSE_USER_RED_KEY_0 = 1 << 8;
        const EFUSE_USER_RED_KEY_1 = 1 << 9;
        const EFUSE_USER_KEY_0 = 1 << 10;
        const EFUSE_USER_KEY_1 = 1 << 11;
        const EFUSE_RED_KEY = 1 << 12;
        const EFUSE_KEY = 1 << 13;
        const BH_RED_KEY = 1 << 14;
        const BH_KEY = 1 << 15;
        const BBRAM_RED_KEY = 1 << 16;
        const BBRAM_KEY = 1 << 17;
        const PUF_KEY = 1 << 18;
        const KUP_KEY = 1 << 19;
        const FAMILY_KEY = 1 << 20;
        /// Round keys expanded inside the engine.
        const AES_KEY = 1 << 21;
    }
}

/// KEY_SEL codes.
pub mod key_sel {
    pub const BBRAM_KEY: u32 = 0xBBDE_6600;
    pub const BBRAM_RED_KEY: u32 = 0xBBDE_8200;
    pub const BH_KEY: u32 = 0xBDB0_6600;
    pub const BH_RED_KEY: u32 = 0xBDB0_8200;
    pub const EFUSE_KEY: u32 = 0xEFDE_6600;
    pub const EFUSE_RED_KEY: u32 = 0xEFDE_8200;
    pub const EFUSE_USER_KEY_0: u32 = 0xEF85_6601;
    pub const EFUSE_USER_KEY_1: u32 = 0xEF85_6602;
    pub const EFUSE_USER_RED_KEY_0: u32 = 0xEF85_8201;
    pub const EFUSE_USER_RED_KEY_1: u32 = 0xEF85_8202;
    pub const KUP_KEY: u32 = 0xBDC9_8200;
    pub const FAMILY_KEY: u32 = 0xFEDE_8200;
    pub const PUF_KEY: u32 = 0xDBDE_8200;
    pub const USER_KEY_0: u32 = 0xBD85_8201;
    pub const USER_KEY_1: u32 = 0xBD85_8202;
    pub const USER_KEY_2: u32 = 0xBD85_8203;
    pub const USER_KEY_3: u32 = 0xBD85_8204;
    pub const USER_KEY_4: u32 = 0xBD85_8205;
    pub const USER_KEY_5: u32 = 0xBD85_8206;
    pub const USER_KEY_6: u32 = 0xBD85_8207;
    pub const USER_KEY_7: u32 = 0xBD85_8208;
}

/// KEY_DEC_SEL codes naming the red slot a key decryption writes.
pub mod key_dec_sel {
    pub const BBRAM_RED: u32 = 0x0;
    pub const BH_RED: u32 = 0x1;
    pub const EFUSE_RED: u32 = 0x2;
    pub const EFUSE_USER_RED_0: u32 = 0x3;
    pub const EFUSE_USER_RED_1: u32 = 0x4;
}

/// AES core registers.
#[derive(Clone, Copy)]
pub struct AesReg<M: Mmio> {
    regs: RegisterBlock<M>,
}

impl<M: Mmio> AesReg<M> {
    /// # Safety
    ///
    /// Only one `AesReg` may drive the AES core at a time.
    pub const unsafe fn new(mmio: M) -> Self {
        Self {
            regs: RegisterBlock::new(mmio, ADDR),
        }
    }

    register_accessors! {
        status: STATUS => Status::Register;
        key_sel: KEY_SEL => ();
        key_load: KEY_LOAD => Trigger::Register;
        start_msg: START_MSG => Trigger::Register;
        soft_rst: SOFT_RST => SoftRst::Register;
        /// Holds `KeyClear` bits.
        key_clear: KEY_CLEAR => ();
        mode: MODE => Mode::Register;
        kup_wr: KUP_WR => KupWr::Register;
        key_size: KEY_SIZE => KeySize::Register;
        key_dec: KEY_DEC => ();
        key_dec_trig: KEY_DEC_TRIG => Trigger::Register;
        key_dec_sel: KEY_DEC_SEL => ();
        /// Holds `KeyClear` bits.
        key_zeroed_status: KEY_ZEROED_STATUS => ();
        aad: AAD => Aad::Register;
        split_cfg: SPLIT_CFG => SplitCfg::Register;
        data_swap: DATA_SWAP => DataSwap::Register;
        cm_en: CM_EN => CmEn::Register;
    }

    /// IV word `idx`, `0..4`.
    pub fn iv(&self, idx: u32) -> Reg<M> {
        self.regs.reg(IV_0 + idx * 4)
    }

    /// Word `idx` of the key window starting at `window`.
    pub fn key_word(&self, window: u32, idx: u32) -> Reg<M> {
        self.regs.reg(window + idx * 4)
    }

    /// Word `idx` of the split-mode key mask.
    pub fn key_mask(&self, idx: u32) -> Reg<M> {
        self.regs.reg(KEY_MASK_0 + idx * 4)
    }

    /// Slots the core reports as zeroized.
    pub fn zeroed_keys(&self) -> KeyClear {
        KeyClear::from_bits_truncate(self.key_zeroed_status().get())
    }
}
