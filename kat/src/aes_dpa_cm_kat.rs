/*++

Licensed under the Apache-2.0 license.

File Name:

    aes_dpa_cm_kat.rs

Abstract:

    File contains the Known Answer Test (KAT) for the AES DPA
    countermeasure. The engine runs in split mode, so every output is a
    pair of masked shares; the test checks the masks as well as the
    unmasked result.

--*/

use crate::{check_idle, finish};
use cryptocore_drivers::{Aes, CryptoError, CryptoResult, Mmio, AES_DPA_CM_DATA_SIZE};

const BLOCK: usize = 16;

struct DpaVector {
    key: [u8; 32],
    iv: [u8; 12],
    msg: [u8; BLOCK],
    ct: [u8; BLOCK],
    tag: [u8; BLOCK],
}

const VECTORS: [DpaVector; 2] = [
    DpaVector {
        key: [
            0x56, 0x69, 0x07, 0x98, 0x97, 0x8c, 0x15, 0x4f, 0xf2, 0x50, 0xba, 0x78, 0xe4, 0x63,
            0x76, 0x5f, 0x2f, 0x0c, 0xe6, 0x97, 0x09, 0xa4, 0x55, 0x1b, 0xd8, 0xcb, 0x3a, 0xdd,
            0xed, 0xa0, 0x87, 0xb6,
        ],
        iv: [
            0xcf, 0x37, 0xc2, 0x86, 0xc1, 0x8a, 0xd4, 0xea, 0x3d, 0x0b, 0xa6, 0xa0,
        ],
        msg: [
            0x2d, 0x32, 0x81, 0x24, 0xa8, 0xd5, 0x8d, 0x56, 0xd0, 0x77, 0x5e, 0xed, 0x93, 0xde,
            0x1a, 0x88,
        ],
        ct: [
            0x3b, 0x0a, 0x02, 0x67, 0xf6, 0xec, 0xde, 0x3a, 0x78, 0xb3, 0x09, 0x03, 0xeb, 0xd4,
            0xca, 0x6e,
        ],
        tag: [
            0x1f, 0xd2, 0x00, 0x64, 0x09, 0xfc, 0x63, 0x63, 0x79, 0xf3, 0xd4, 0x06, 0x7e, 0xca,
            0x09, 0x88,
        ],
    },
    DpaVector {
        key: [
            0x8a, 0x02, 0xa3, 0x3b, 0xdf, 0x87, 0xe7, 0x84, 0x5d, 0x7a, 0x8a, 0xe3, 0xc8, 0x72,
            0x7e, 0x70, 0x4f, 0x4f, 0xd0, 0x8c, 0x1f, 0x20, 0x83, 0x28, 0x2d, 0x8c, 0xb3, 0xa5,
            0xd3, 0xce, 0xde, 0xe9,
        ],
        iv: [
            0x59, 0x9f, 0x58, 0x96, 0x85, 0x1c, 0x96, 0x8e, 0xd8, 0x08, 0x32, 0x3b,
        ],
        msg: [
            0x4a, 0xde, 0x8b, 0x32, 0xd5, 0x67, 0x23, 0xfb, 0x8f, 0x65, 0xce, 0x40, 0x82, 0x5e,
            0x27, 0xc9,
        ],
        ct: [
            0xcb, 0x91, 0x33, 0x79, 0x6b, 0x90, 0x75, 0x65, 0x78, 0x40, 0x42, 0x1a, 0x46, 0x02,
            0x2b, 0x63,
        ],
        tag: [
            0xa7, 0x9e, 0x45, 0x3c, 0x6f, 0xad, 0x8a, 0x5a, 0x4c, 0x2a, 0x8e, 0x87, 0x82, 0x1c,
            0x7f, 0x88,
        ],
    },
];

/// Masks of one split-mode run: ciphertext mask and tag mask.
struct Masks {
    ct: [u8; BLOCK],
    tag: [u8; BLOCK],
}

fn block(buf: &[u8; AES_DPA_CM_DATA_SIZE], index: usize) -> [u8; BLOCK] {
    let mut out = [0u8; BLOCK];
    out.copy_from_slice(&buf[index * BLOCK..(index + 1) * BLOCK]);
    out
}

fn xor(a: &[u8; BLOCK], b: &[u8; BLOCK]) -> [u8; BLOCK] {
    let mut out = [0u8; BLOCK];
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *o = x ^ y;
    }
    out
}

#[derive(Default, Debug)]
pub struct AesDpaCmKat {}

impl AesDpaCmKat {
    /// This function executes the Known Answer Test (aka KAT) for the AES
    /// DPA countermeasure.
    ///
    /// Two encryptions run in split mode. Each must produce nonzero masks,
    /// all four masks must differ, and the unmasked ciphertext and tag must
    /// match the vector.
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
        let result = self.run_all(aes);
        finish(aes, result)
    }

    fn run_all<M: Mmio>(&self, aes: &mut Aes<M>) -> CryptoResult<()> {
        let first = self.run(aes, &VECTORS[0])?;
        let second = self.run(aes, &VECTORS[1])?;

        let masks = [first.ct, first.tag, second.ct, second.tag];
        for (i, a) in masks.iter().enumerate() {
            if masks[i + 1..].iter().any(|b| a == b) {
                Err(CryptoError::KAT_AES_DPA_CM_MASK_REUSED)?;
            }
        }
        Ok(())
    }

    fn run<M: Mmio>(&self, aes: &mut Aes<M>, vector: &DpaVector) -> CryptoResult<Masks> {
        // Each value enters as a zero share followed by the value itself.
        let mut input = [0u8; AES_DPA_CM_DATA_SIZE];
        input[BLOCK..BLOCK + vector.iv.len()].copy_from_slice(&vector.iv);
        input[3 * BLOCK..].copy_from_slice(&vector.msg);

        let mut output = [0u8; AES_DPA_CM_DATA_SIZE];
        aes.dpa_cm_encrypt_data(&vector.key, &input, &mut output)?;

        let masks = Masks {
            ct: block(&output, 0),
            tag: block(&output, 2),
        };
        if masks.ct == [0u8; BLOCK] || masks.tag == [0u8; BLOCK] {
            Err(CryptoError::KAT_AES_DPA_CM_MASK_ZERO)?;
        }
        if xor(&block(&output, 1), &masks.ct) != vector.ct
            || xor(&block(&output, 3), &masks.tag) != vector.tag
        {
            Err(CryptoError::KAT_AES_DPA_CM_OUTPUT_MISMATCH)?;
        }
        Ok(masks)
    }
}
