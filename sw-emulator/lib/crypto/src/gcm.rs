/*++

Licensed under the Apache-2.0 license.

File Name:

    gcm.rs

Abstract:

    File contains implementation of AES-GCM with 128-bit and 256-bit keys.

--*/

use aes_gcm::{
    aead::{
        consts::{U12, U16},
        generic_array::GenericArray,
        AeadMutInPlace, KeyInit,
    },
    Aes128Gcm, Aes256Gcm,
};

pub const AES_GCM_IV_SIZE: usize = 12;
pub const AES_GCM_TAG_SIZE: usize = 16;

fn encrypt_detached<C>(
    key: &[u8],
    iv: &[u8; AES_GCM_IV_SIZE],
    aad: &[u8],
    buffer: &mut [u8],
) -> Option<[u8; AES_GCM_TAG_SIZE]>
where
    C: KeyInit + AeadMutInPlace<NonceSize = U12, TagSize = U16>,
{
    let mut cipher = C::new_from_slice(key).ok()?;
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(iv), aad, buffer)
        .ok()?;
    Some(tag.into())
}

pub enum AesGcm {}

impl AesGcm {
    /// Encrypt `buffer` in place and return the tag.
    ///
    /// Returns `None` when `key` is neither 16 nor 32 bytes.
    pub fn encrypt_in_place(
        key: &[u8],
        iv: &[u8; AES_GCM_IV_SIZE],
        aad: &[u8],
        buffer: &mut [u8],
    ) -> Option<[u8; AES_GCM_TAG_SIZE]> {
        match key.len() {
            16 => encrypt_detached::<Aes128Gcm>(key, iv, aad, buffer),
            32 => encrypt_detached::<Aes256Gcm>(key, iv, aad, buffer),
            _ => None,
        }
    }

    /// One-shot encryption.
    pub fn encrypt(
        key: &[u8],
        iv: &[u8; AES_GCM_IV_SIZE],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Option<(Vec<u8>, [u8; AES_GCM_TAG_SIZE])> {
        let mut buffer = plaintext.to_vec();
        let tag = Self::encrypt_in_place(key, iv, aad, &mut buffer)?;
        Some((buffer, tag))
    }

    /// One-shot decryption. Returns `None` if the tag does not verify.
    pub fn decrypt(
        key: &[u8],
        iv: &[u8; AES_GCM_IV_SIZE],
        aad: &[u8],
        tag: &[u8; AES_GCM_TAG_SIZE],
        ciphertext: &[u8],
    ) -> Option<Vec<u8>> {
        let plaintext = Self::apply_keystream(key, iv, ciphertext)?;
        let (_, expected) = Self::encrypt(key, iv, aad, &plaintext)?;
        if expected != *tag {
            return None;
        }
        Some(plaintext)
    }

    /// XOR `data` with the GCM counter keystream. Encryption and decryption
    /// of the text are the same operation.
    pub fn apply_keystream(
        key: &[u8],
        iv: &[u8; AES_GCM_IV_SIZE],
        data: &[u8],
    ) -> Option<Vec<u8>> {
        let mut buffer = data.to_vec();
        Self::encrypt_in_place(key, iv, &[], &mut buffer)?;
        Some(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // from https://github.com/C2SP/wycheproof/blob/master/testvectors/aes_gcm_test.json
    const KEY: [u8; 32] = [
        0x92, 0xac, 0xe3, 0xe3, 0x48, 0xcd, 0x82, 0x10, 0x92, 0xcd, 0x92, 0x1a, 0xa3, 0x54, 0x63,
        0x74, 0x29, 0x9a, 0xb4, 0x62, 0x9, 0x69, 0x1b, 0xc2, 0x8b, 0x87, 0x52, 0xd1, 0x7f, 0x12,
        0x3c, 0x20,
    ];
    const IV: [u8; 12] = [
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb,
    ];
    const AAD: [u8; 8] = [0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff];
    const PLAINTEXT: [u8; 10] = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];
    const CIPHERTEXT: [u8; 10] = [0xe2, 0x7a, 0xbd, 0xd2, 0xd2, 0xa5, 0x3d, 0x2f, 0x13, 0x6b];
    const TAG: [u8; 16] = [
        0x9a, 0x4a, 0x25, 0x79, 0x52, 0x93, 0x1, 0xbc, 0xfb, 0x71, 0xc7, 0x8d, 0x40, 0x60, 0xf5,
        0x2c,
    ];

    #[test]
    fn test_encrypt_decrypt() {
        let (ciphertext, tag) = AesGcm::encrypt(&KEY, &IV, &AAD, &PLAINTEXT).unwrap();
        assert_eq!(&CIPHERTEXT[..], &ciphertext);
        assert_eq!(TAG, tag);

        let plaintext = AesGcm::decrypt(&KEY, &IV, &AAD, &TAG, &CIPHERTEXT).unwrap();
        assert_eq!(&PLAINTEXT[..], plaintext);
    }

    #[test]
    fn test_decrypt_rejects_bad_tag() {
        let mut tag = TAG;
        tag[15] ^= 1;
        assert_eq!(AesGcm::decrypt(&KEY, &IV, &AAD, &tag, &CIPHERTEXT), None);
    }

    #[test]
    fn test_keystream_is_an_involution() {
        let ciphertext = AesGcm::apply_keystream(&KEY, &IV, &PLAINTEXT).unwrap();
        assert_eq!(&CIPHERTEXT[..], &ciphertext);
        let plaintext = AesGcm::apply_keystream(&KEY, &IV, &ciphertext).unwrap();
        assert_eq!(&PLAINTEXT[..], plaintext);
    }

    #[test]
    fn test_rejects_unsupported_key_size() {
        assert_eq!(AesGcm::encrypt(&KEY[..24], &IV, &[], &PLAINTEXT), None);
    }
}
