/*++

Licensed under the Apache-2.0 license.

File Name:

    key_source.rs

Abstract:

    File contains the key source registry: the register geometry and the
    permission flags of every key slot the AES core can select.

--*/

use cryptocore_registers::aes::{self, key_dec_sel, key_sel, KeyClear, KeySize};
use tock_registers::fields::FieldValue;

bitflags::bitflags! {
    /// Operations a key source permits.
    pub struct KeyPermissions : u8 {
        /// Software may write the key through its register window
        const USER_WRITE = 1 << 0;

        /// Key may drive a decrypt session
        const DECRYPT = 1 << 1;

        /// Key may drive an encrypt session
        const ENCRYPT = 1 << 2;

        /// Slot may hold a black key that the engine decrypts in place
        const KEY_DECRYPT_SOURCE = 1 << 3;
    }
}

/// AES key size.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AesKeySize {
    Bits128,
    Bits256,
}

impl AesKeySize {
    pub fn bytes(&self) -> usize {
        match self {
            Self::Bits128 => 16,
            Self::Bits256 => 32,
        }
    }

    pub fn words(&self) -> usize {
        self.bytes() / 4
    }

    pub(crate) fn reg_value(&self) -> FieldValue<u32, KeySize::Register> {
        match self {
            Self::Bits128 => KeySize::SIZE::Bits128,
            Self::Bits256 => KeySize::SIZE::Bits256,
        }
    }
}

/// Physical key slot selectable by the AES core.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeySource {
    Bbram = 0,
    BbramRed = 1,
    BootHeader = 2,
    BootHeaderRed = 3,
    Efuse = 4,
    EfuseRed = 5,
    EfuseUser0 = 6,
    EfuseUser1 = 7,
    EfuseUserRed0 = 8,
    EfuseUserRed1 = 9,
    Kup = 10,
    Family = 11,
    Puf = 12,
    User0 = 13,
    User1 = 14,
    User2 = 15,
    User3 = 16,
    User4 = 17,
    User5 = 18,
    User6 = 19,
    User7 = 20,
}

impl KeySource {
    pub const ALL: [KeySource; 21] = [
        Self::Bbram,
        Self::BbramRed,
        Self::BootHeader,
        Self::BootHeaderRed,
        Self::Efuse,
        Self::EfuseRed,
        Self::EfuseUser0,
        Self::EfuseUser1,
        Self::EfuseUserRed0,
        Self::EfuseUserRed1,
        Self::Kup,
        Self::Family,
        Self::Puf,
        Self::User0,
        Self::User1,
        Self::User2,
        Self::User3,
        Self::User4,
        Self::User5,
        Self::User6,
        Self::User7,
    ];

    pub fn descriptor(self) -> &'static KeyDescriptor {
        lookup(self)
    }
}

/// Static description of one key source.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct KeyDescriptor {
    /// Offset of key word 0 when software may write the key.
    pub key_reg: Option<u32>,

    /// KEY_SEL code.
    pub select: u32,

    pub permissions: KeyPermissions,

    /// KEY_DEC_SEL code when the slot can receive a decrypted black key.
    pub decrypt_select: Option<u32>,

    /// KEY_CLEAR bit that zeroizes the slot.
    pub clear_mask: KeyClear,

    /// Whether a 128-bit key may be written to the slot.
    pub accepts_128: bool,
}

impl KeyDescriptor {
    pub fn user_writable(&self) -> bool {
        self.permissions.contains(KeyPermissions::USER_WRITE)
    }

    pub fn decrypt_allowed(&self) -> bool {
        self.permissions.contains(KeyPermissions::DECRYPT)
    }

    pub fn encrypt_allowed(&self) -> bool {
        self.permissions.contains(KeyPermissions::ENCRYPT)
    }

    pub fn key_decrypt_source_allowed(&self) -> bool {
        self.permissions
            .contains(KeyPermissions::KEY_DECRYPT_SOURCE)
    }
}

const DEVICE_KEY: KeyPermissions = KeyPermissions::from_bits_truncate(
    KeyPermissions::DECRYPT.bits() | KeyPermissions::ENCRYPT.bits(),
);
const BLACK_KEY_HOLDER: KeyPermissions =
    KeyPermissions::from_bits_truncate(DEVICE_KEY.bits() | KeyPermissions::KEY_DECRYPT_SOURCE.bits());
const USER_KEY: KeyPermissions =
    KeyPermissions::from_bits_truncate(DEVICE_KEY.bits() | KeyPermissions::USER_WRITE.bits());

const fn device_key(select: u32, clear_mask: KeyClear) -> KeyDescriptor {
    KeyDescriptor {
        key_reg: None,
        select,
        permissions: DEVICE_KEY,
        decrypt_select: None,
        clear_mask,
        accepts_128: true,
    }
}

const fn black_key_holder(select: u32, clear_mask: KeyClear) -> KeyDescriptor {
    KeyDescriptor {
        permissions: BLACK_KEY_HOLDER,
        ..device_key(select, clear_mask)
    }
}

const fn red_key(select: u32, decrypt_select: u32, clear_mask: KeyClear) -> KeyDescriptor {
    KeyDescriptor {
        decrypt_select: Some(decrypt_select),
        ..device_key(select, clear_mask)
    }
}

const fn user_key(index: u32, select: u32, clear_mask: KeyClear) -> KeyDescriptor {
    KeyDescriptor {
        key_reg: Some(aes::USER_KEY_0_0 + index * aes::USER_KEY_STRIDE),
        permissions: USER_KEY,
        ..device_key(select, clear_mask)
    }
}

// Indexed by `KeySource as usize`; the order must match the enum.
static KEY_TABLE: [KeyDescriptor; 21] = [
    black_key_holder(key_sel::BBRAM_KEY, KeyClear::BBRAM_KEY),
    red_key(
        key_sel::BBRAM_RED_KEY,
        key_dec_sel::BBRAM_RED,
        KeyClear::BBRAM_RED_KEY,
    ),
    KeyDescriptor {
        key_reg: Some(aes::BH_KEY_0),
        select: key_sel::BH_KEY,
        permissions: KeyPermissions::from_bits_truncate(
            BLACK_KEY_HOLDER.bits() | KeyPermissions::USER_WRITE.bits(),
        ),
        decrypt_select: None,
        clear_mask: KeyClear::BH_KEY,
        accepts_128: false,
    },
    red_key(key_sel::BH_RED_KEY, key_dec_sel::BH_RED, KeyClear::BH_RED_KEY),
    black_key_holder(key_sel::EFUSE_KEY, KeyClear::EFUSE_KEY),
    red_key(
        key_sel::EFUSE_RED_KEY,
        key_dec_sel::EFUSE_RED,
        KeyClear::EFUSE_RED_KEY,
    ),
    black_key_holder(key_sel::EFUSE_USER_KEY_0, KeyClear::EFUSE_USER_KEY_0),
    black_key_holder(key_sel::EFUSE_USER_KEY_1, KeyClear::EFUSE_USER_KEY_1),
    red_key(
        key_sel::EFUSE_USER_RED_KEY_0,
        key_dec_sel::EFUSE_USER_RED_0,
        KeyClear::EFUSE_USER_RED_KEY_0,
    ),
    red_key(
        key_sel::EFUSE_USER_RED_KEY_1,
        key_dec_sel::EFUSE_USER_RED_1,
        KeyClear::EFUSE_USER_RED_KEY_1,
    ),
    device_key(key_sel::KUP_KEY, KeyClear::KUP_KEY),
    KeyDescriptor {
        permissions: KeyPermissions::DECRYPT,
        ..device_key(key_sel::FAMILY_KEY, KeyClear::FAMILY_KEY)
    },
    device_key(key_sel::PUF_KEY, KeyClear::PUF_KEY),
    user_key(0, key_sel::USER_KEY_0, KeyClear::USER_KEY_0),
    user_key(1, key_sel::USER_KEY_1, KeyClear::USER_KEY_1),
    user_key(2, key_sel::USER_KEY_2, KeyClear::USER_KEY_2),
    user_key(3, key_sel::USER_KEY_3, KeyClear::USER_KEY_3),
    user_key(4, key_sel::USER_KEY_4, KeyClear::USER_KEY_4),
    user_key(5, key_sel::USER_KEY_5, KeyClear::USER_KEY_5),
    user_key(6, key_sel::USER_KEY_6, KeyClear::USER_KEY_6),
    user_key(7, key_sel::USER_KEY_7, KeyClear::USER_KEY_7),
];

/// Returns the descriptor of `src`.
pub fn lookup(src: KeySource) -> &'static KeyDescriptor {
    &KEY_TABLE[src as usize]
}
