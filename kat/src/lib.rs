/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the AES engine Known Answer Tests.

--*/

#![cfg_attr(not(test), no_std)]

mod aes256gcm_kat;
mod aes_dpa_cm_kat;

pub use aes256gcm_kat::{AesDecryptKat, AesEncryptKat};
pub use aes_dpa_cm_kat::AesDpaCmKat;
pub use cryptocore_drivers::{CryptoError, CryptoResult};

use cryptocore_drivers::{Aes, AesState, KeySource, Mmio};

/// Key slot reserved for self-tests.
const KAT_KEY_SOURCE: KeySource = KeySource::User7;

/// Self-tests need an initialized, idle engine.
fn check_idle<M: Mmio>(aes: &Aes<M>) -> CryptoResult<()> {
    match aes.state() {
        AesState::Initialized => Ok(()),
        AesState::EncryptInitialized | AesState::DecryptInitialized => {
            Err(CryptoError::KAT_AES_BUSY)
        }
        AesState::Uninitialized => Err(CryptoError::DRIVER_AES_INVALID_STATE),
    }
}

/// Zero the self-test key slot, keeping the first error.
fn finish<M: Mmio>(aes: &mut Aes<M>, result: CryptoResult<()>) -> CryptoResult<()> {
    let zeroed = aes.key_zero(KAT_KEY_SOURCE);
    result.and(zeroed)
}

/// Run every AES self-test.
pub fn execute_kats<M: Mmio>(aes: &mut Aes<M>) -> CryptoResult<()> {
    AesDecryptKat::default().execute(aes)?;
    AesEncryptKat::default().execute(aes)?;
    AesDpaCmKat::default().execute(aes)
}
