/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the crypto subsystem for error
    handling.

--*/
#![cfg_attr(not(any(feature = "std", test)), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// Crypto subsystem error. The upper half-word names the component, the
/// lower half-word the failure.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CryptoError(pub NonZeroU32);

/// Failure classes callers dispatch on.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// The key source does not permit the requested operation.
    InvalidKeySource,

    /// Hardware did not assert a completion or status bit within bound.
    Timeout,

    /// GCM authentication failure.
    TagMismatch,

    /// Zeroization acknowledgment missing.
    KeyClearFailed,

    /// Stream switch misconfiguration.
    RoutingConflict,

    /// Transfer size is not a whole number of words.
    UnalignedSize,

    /// Call is not legal in the engine's current state.
    InvalidState,

    /// Argument outside its documented domain.
    InvalidParam,

    /// Hardware did not accept a configuration write.
    HardwareFault,

    /// A self-test produced the wrong answer.
    KatFailure,

    /// Code not defined by this crate.
    Unknown,
}

/// Macro to define error constants ensuring uniqueness
///
/// Takes a list of (name, value, kind, doc) tuples and generates a constant
/// for each error code together with the code-to-kind mapping.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:literal, $kind:ident, $doc:literal)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: CryptoError = CryptoError::new_const($value);
        )*

        /// Failure class of this error.
        pub fn kind(&self) -> ErrorKind {
            match self.0.get() {
                $(
                    $value => ErrorKind::$kind,
                )*
                _ => ErrorKind::Unknown,
            }
        }

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl CryptoError {
    /// Create an error from a constant; zero is rejected at compile time.
    /// Use `CryptoError::try_from()` for runtime values.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("CryptoError cannot be 0"),
        }
    }

    define_error_constants![
        (
            DRIVER_DMA_TIMEOUT,
            0x0001_0001,
            Timeout,
            "DMA Error: channel done flag not observed"
        ),
        (
            DRIVER_DMA_UNALIGNED_SIZE,
            0x0001_0002,
            UnalignedSize,
            "DMA Error: transfer length is not a multiple of the word size"
        ),
        (
            DRIVER_DMA_TRANSFER_TOO_LARGE,
            0x0001_0003,
            InvalidParam,
            "DMA Error: transfer length exceeds the SIZE register"
        ),
        (
            DRIVER_SSS_ROUTING_CONFLICT,
            0x0002_0001,
            RoutingConflict,
            "SSS Error: source cannot feed the requested sink"
        ),
        (
            DRIVER_SSS_DMA_MISMATCH,
            0x0002_0002,
            RoutingConflict,
            "SSS Error: input and output DMA of a core differ"
        ),
        (
            DRIVER_AES_INVALID_STATE,
            0x0003_0001,
            InvalidState,
            "AES Error: call not legal in the current engine state"
        ),
        (
            DRIVER_AES_KEY_SRC_NOT_WRITABLE,
            0x0003_0002,
            InvalidKeySource,
            "AES Error: key source cannot be written by software"
        ),
        (
            DRIVER_AES_KEY_SRC_DECRYPT_NOT_ALLOWED,
            0x0003_0003,
            InvalidKeySource,
            "AES Error: key source cannot be used for decryption"
        ),
        (
            DRIVER_AES_KEY_SRC_ENCRYPT_NOT_ALLOWED,
            0x0003_0004,
            InvalidKeySource,
            "AES Error: key source cannot be used for encryption"
        ),
        (
            DRIVER_AES_KEY_SRC_KEK_NOT_ALLOWED,
            0x0003_0005,
            InvalidKeySource,
            "AES Error: key pair not permitted for key decryption"
        ),
        (
            DRIVER_AES_INVALID_KEY_SIZE,
            0x0003_0006,
            InvalidParam,
            "AES Error: key size not supported by the key source"
        ),
        (
            DRIVER_AES_UNALIGNED_SIZE,
            0x0003_0007,
            UnalignedSize,
            "AES Error: data length is not a multiple of the word size"
        ),
        (
            DRIVER_AES_INVALID_SLICE,
            0x0003_0008,
            InvalidParam,
            "AES Error: output buffer shorter than input"
        ),
        (
            DRIVER_AES_KEY_LOAD_TIMEOUT,
            0x0003_0009,
            Timeout,
            "AES Error: key load did not complete"
        ),
        (
            DRIVER_AES_DONE_TIMEOUT,
            0x0003_000A,
            Timeout,
            "AES Error: engine done not observed"
        ),
        (
            DRIVER_AES_KEK_DECRYPT_TIMEOUT,
            0x0003_000B,
            Timeout,
            "AES Error: black key decryption did not complete"
        ),
        (
            DRIVER_AES_TAG_MISMATCH,
            0x0003_000C,
            TagMismatch,
            "AES Error: GCM tag mismatch"
        ),
        (
            DRIVER_AES_KEY_CLEAR_FAILED,
            0x0003_000D,
            KeyClearFailed,
            "AES Error: key zeroization not acknowledged"
        ),
        (
            DRIVER_AES_DPA_CM_MISMATCH,
            0x0003_000E,
            HardwareFault,
            "AES Error: DPA countermeasure state differs from the request"
        ),
        (
            DRIVER_AES_AAD_AFTER_DATA,
            0x0003_000F,
            InvalidState,
            "AES Error: AAD pushed after message data"
        ),
        (
            DRIVER_AES_UNALIGNED_AAD,
            0x0003_0010,
            UnalignedSize,
            "AES Error: AAD length is not a multiple of the block size"
        ),
        (
            DRIVER_AES_UPDATE_AFTER_LAST,
            0x0003_0011,
            InvalidState,
            "AES Error: data pushed after the last block"
        ),
        (
            DRIVER_AES_FINAL_BEFORE_LAST,
            0x0003_0012,
            InvalidState,
            "AES Error: session finalized before the last block"
        ),
        (
            DRIVER_AES_KUP_CFG_MISMATCH,
            0x0003_0013,
            HardwareFault,
            "AES Error: key update save configuration not accepted"
        ),
        (
            DRIVER_AES_ZERO_PUF_KEY_NOT_ALLOWED,
            0x0003_0014,
            InvalidKeySource,
            "AES Error: PUF key slot is zeroized"
        ),
        (
            KAT_AES_BUSY,
            0x0090_0001,
            InvalidState,
            "KAT Error: AES session in progress"
        ),
        (
            KAT_AES_PLAINTEXT_MISMATCH,
            0x0090_0002,
            KatFailure,
            "KAT Error: AES-GCM decrypted output mismatch"
        ),
        (
            KAT_AES_DPA_CM_MASK_ZERO,
            0x0090_0003,
            KatFailure,
            "KAT Error: DPA countermeasure produced an all-zero mask"
        ),
        (
            KAT_AES_DPA_CM_MASK_REUSED,
            0x0090_0004,
            KatFailure,
            "KAT Error: DPA countermeasure masks are not distinct"
        ),
        (
            KAT_AES_DPA_CM_OUTPUT_MISMATCH,
            0x0090_0005,
            KatFailure,
            "KAT Error: unmasked DPA countermeasure output mismatch"
        ),
        (
            KAT_AES_CIPHERTEXT_MISMATCH,
            0x0090_0006,
            KatFailure,
            "KAT Error: AES-GCM encrypted output mismatch"
        ),
        (
            KAT_AES_TAG_MISMATCH,
            0x0090_0007,
            KatFailure,
            "KAT Error: AES-GCM tag mismatch"
        ),
    ];
}

impl From<core::num::NonZeroU32> for crate::CryptoError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::CryptoError(val)
    }
}

impl From<CryptoError> for core::num::NonZeroU32 {
    fn from(val: CryptoError) -> Self {
        val.0
    }
}

impl From<CryptoError> for u32 {
    fn from(val: CryptoError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for CryptoError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(CryptoError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
