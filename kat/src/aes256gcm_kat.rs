/*++

Licensed under the Apache-2.0 license.

File Name:

    aes256gcm_kat.rs

Abstract:

    File contains the Known Answer Tests (KAT) for AES-256-GCM encryption
    and decryption on the hardware engine.

--*/

use crate::{check_idle, finish, KAT_KEY_SOURCE};
use cryptocore_drivers::{
    cprintln, Aes, AesKey, AesKeySize, CryptoError, CryptoResult, HexBytes, Mmio,
};

// Vector words, each stored little-endian:
// KEY = d55455d7 2b247897 0c4bf1cd 1a2d14ed 4d3b0a53 f3c6e1ae afc2447a 7b534d99
// IV  = ccf8e3b9 11f11746 d58c03af 00000000
// CT  = f9ecc5ae 92b9b870 31299331 c4182756
// TAG = c3cfb3e5 49d4fbca d90b2bfc c87dbe9b
// PT  = 9008cfd4 3882aa74 0d635531 6c1c1f47

const KEY: [u8; 32] = [
    0xd7, 0x55, 0x54, 0xd5, 0x97, 0x78, 0x24, 0x2b, 0xcd, 0xf1, 0x4b, 0x0c, 0xed, 0x14, 0x2d, 0x1a,
    0x53, 0x0a, 0x3b, 0x4d, 0xae, 0xe1, 0xc6, 0xf3, 0x7a, 0x44, 0xc2, 0xaf, 0x99, 0x4d, 0x53, 0x7b,
];
const IV: [u8; 16] = [
    0xb9, 0xe3, 0xf8, 0xcc, 0x46, 0x17, 0xf1, 0x11, 0xaf, 0x03, 0x8c, 0xd5, 0x00, 0x00, 0x00, 0x00,
];
const CT: [u8; 16] = [
    0xae, 0xc5, 0xec, 0xf9, 0x70, 0xb8, 0xb9, 0x92, 0x31, 0x93, 0x29, 0x31, 0x56, 0x27, 0x18, 0xc4,
];
const TAG: [u8; 16] = [
    0xe5, 0xb3, 0xcf, 0xc3, 0xca, 0xfb, 0xd4, 0x49, 0xfc, 0x2b, 0x0b, 0xd9, 0x9b, 0xbe, 0x7d, 0xc8,
];
const PT: [u8; 16] = [
    0xd4, 0xcf, 0x08, 0x90, 0x74, 0xaa, 0x82, 0x38, 0x31, 0x55, 0x63, 0x0d, 0x47, 0x1f, 0x1c, 0x6c,
];

#[derive(Default, Debug)]
pub struct AesDecryptKat {}

impl AesDecryptKat {
    /// This function executes the Known Answer Test (aka KAT) for AES-256-GCM
    /// decryption.
    ///
    /// The key is written to the self-test slot, which is zeroed afterwards
    /// whatever the outcome.
    ///
    /// # Arguments
    ///
    /// * `aes` - AES driver, idle
    ///
    /// # Returns
    ///
    /// * `CryptoResult` - Result denoting the KAT outcome.
    pub fn execute<M: Mmio>(&self, aes: &mut Aes<M>) -> CryptoResult<()> {
        check_idle(aes)?;
        let result = self.decrypt(aes);
        finish(aes, result)
    }

    fn decrypt<M: Mmio>(&self, aes: &mut Aes<M>) -> CryptoResult<()> {
        aes.write_key(KAT_KEY_SOURCE, AesKey::from(&KEY))?;

        let mut plaintext = [0u8; 16];
        let mut op = aes.decrypt_init(KAT_KEY_SOURCE, AesKeySize::Bits256, &IV)?;
        op.update(&CT, &mut plaintext, true)?;
        op.finalize(&TAG)?;

        if plaintext != PT {
            cprintln!("[kat] AES-GCM decrypt got {}", HexBytes(&plaintext));
            Err(CryptoError::KAT_AES_PLAINTEXT_MISMATCH)?;
        }
        Ok(())
    }
}

#[derive(Default, Debug)]
pub struct AesEncryptKat {}

impl AesEncryptKat {
    /// This function executes the Known Answer Test (aka KAT) for AES-256-GCM
    /// encryption. Ciphertext is checked before the tag.
    ///
    /// # Arguments
    ///
    /// * `aes` - AES driver, idle
    ///
    /// # Returns
    ///
    /// * `CryptoResult` - Result denoting the KAT outcome.
    pub fn execute<M: Mmio>(&self, aes: &mut Aes<M>) -> CryptoResult<()> {
        check_idle(aes)?;
        let result = self.encrypt(aes);
        finish(aes, result)
    }

    fn encrypt<M: Mmio>(&self, aes: &mut Aes<M>) -> CryptoResult<()> {
        aes.write_key(KAT_KEY_SOURCE, AesKey::from(&KEY))?;

        let mut ciphertext = [0u8; 16];
        let mut tag = [0u8; 16];
        let mut op = aes.encrypt_init(KAT_KEY_SOURCE, AesKeySize::Bits256, &IV)?;
        op.update(&PT, &mut ciphertext, true)?;
        op.finalize(&mut tag)?;

        if ciphertext != CT {
            cprintln!("[kat] AES-GCM encrypt got {}", HexBytes(&ciphertext));
            Err(CryptoError::KAT_AES_CIPHERTEXT_MISMATCH)?;
        }
        if tag != TAG {
            cprintln!("[kat] AES-GCM tag got {}", HexBytes(&tag));
            Err(CryptoError::KAT_AES_TAG_MISMATCH)?;
        }
        Ok(())
    }
}
