// Licensed under the Apache-2.0 license

mod harness;

use cryptocore_drivers::{
    AesKey, AesKeySize, AesState, CryptoError, DmaId, ErrorKind, KekType, KeySource,
    AES_DPA_CM_DATA_SIZE,
};
use cryptocore_emu_crypto::AesGcm;
use cryptocore_registers::aes::{key_sel, KeyClear, KEY_CLEAR, SPLIT_CFG};
use cryptocore_registers::sss::code;
use harness::{iv_block, pattern, platform, SHORT_POLL_LIMIT};

fn key256(seed: u8) -> [u8; 32] {
    pattern(32, seed).try_into().unwrap()
}

#[test]
fn test_encrypt_decrypt_round_trip() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    let key = key256(1);
    let nonce = [0x10u8; 12];
    let aad = pattern(32, 7);
    let pt = pattern(64, 3);
    aes.write_key(KeySource::User0, AesKey::from(&key)).unwrap();

    let mut ct = vec![0u8; 64];
    let mut tag = [0u8; 16];
    let mut op = aes
        .encrypt_init(KeySource::User0, AesKeySize::Bits256, &iv_block(&nonce))
        .unwrap();
    op.update_aad(&aad).unwrap();
    op.update(&pt[..20], &mut ct[..20], false).unwrap();
    op.update(&pt[20..], &mut ct[20..], true).unwrap();
    op.finalize(&mut tag).unwrap();
    assert_eq!(aes.state(), AesState::Initialized);

    let (expected_ct, expected_tag) = AesGcm::encrypt(&key, &nonce, &aad, &pt).unwrap();
    assert_eq!(ct, expected_ct);
    assert_eq!(tag, expected_tag);

    let mut out = vec![0u8; 64];
    let mut op = aes
        .decrypt_init(KeySource::User0, AesKeySize::Bits256, &iv_block(&nonce))
        .unwrap();
    op.update_aad(&aad).unwrap();
    op.update(&ct, &mut out, true).unwrap();
    op.finalize(&tag).unwrap();
    assert_eq!(out, pt);
    assert_eq!(aes.state(), AesState::Initialized);
}

#[test]
fn test_encrypt_128_bit_key() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    let key: [u8; 16] = pattern(16, 0x40).try_into().unwrap();
    let nonce = [0xc3u8; 12];
    let pt = pattern(48, 0x41);
    aes.write_key(KeySource::User3, AesKey::from(&key)).unwrap();

    let mut ct = vec![0u8; 48];
    let mut tag = [0u8; 16];
    aes.encrypt_data(
        KeySource::User3,
        AesKeySize::Bits128,
        &iv_block(&nonce),
        &pt,
        &mut ct,
        &mut tag,
    )
    .unwrap();

    let (expected_ct, expected_tag) = AesGcm::encrypt(&key, &nonce, &[], &pt).unwrap();
    assert_eq!(ct, expected_ct);
    assert_eq!(tag, expected_tag);
}

#[test]
fn test_empty_message_produces_tag() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    let key = key256(5);
    let nonce = [0x01u8; 12];
    aes.write_key(KeySource::User4, AesKey::from(&key)).unwrap();

    let mut tag = [0u8; 16];
    aes.encrypt_data(
        KeySource::User4,
        AesKeySize::Bits256,
        &iv_block(&nonce),
        &[],
        &mut [],
        &mut tag,
    )
    .unwrap();

    let (_, expected_tag) = AesGcm::encrypt(&key, &nonce, &[], &[]).unwrap();
    assert_eq!(tag, expected_tag);
}

#[test]
fn test_tampered_ciphertext_or_tag_is_rejected() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    let key = key256(2);
    let nonce = [0x77u8; 12];
    let pt = pattern(32, 9);
    aes.write_key(KeySource::User5, AesKey::from(&key)).unwrap();
    let (ct, tag) = AesGcm::encrypt(&key, &nonce, &[], &pt).unwrap();

    let mut bad_ct = ct.clone();
    bad_ct[5] ^= 0x01;
    let mut out = vec![0u8; 32];
    let err = aes
        .decrypt_data(
            KeySource::User5,
            AesKeySize::Bits256,
            &iv_block(&nonce),
            &bad_ct,
            &mut out,
            &tag,
        )
        .unwrap_err();
    assert_eq!(err, CryptoError::DRIVER_AES_TAG_MISMATCH);
    assert_eq!(err.kind(), ErrorKind::TagMismatch);
    assert_eq!(aes.state(), AesState::Initialized);

    let mut bad_tag = tag;
    bad_tag[15] ^= 0x80;
    assert_eq!(
        aes.decrypt_data(
            KeySource::User5,
            AesKeySize::Bits256,
            &iv_block(&nonce),
            &ct,
            &mut out,
            &bad_tag,
        ),
        Err(CryptoError::DRIVER_AES_TAG_MISMATCH)
    );

    aes.decrypt_data(
        KeySource::User5,
        AesKeySize::Bits256,
        &iv_block(&nonce),
        &ct,
        &mut out,
        &tag,
    )
    .unwrap();
    assert_eq!(out, pt);
}

#[test]
fn test_key_zero_behaves_as_all_zero_key() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    let nonce = [0x21u8; 12];
    let pt = pattern(16, 0);
    aes.write_key(KeySource::User1, AesKey::from(&key256(3)))
        .unwrap();
    aes.key_zero(KeySource::User1).unwrap();
    assert!(mmio.bus().aes.key_zeroed().contains(KeyClear::USER_KEY_1));

    let mut ct = vec![0u8; 16];
    let mut tag = [0u8; 16];
    aes.encrypt_data(
        KeySource::User1,
        AesKeySize::Bits256,
        &iv_block(&nonce),
        &pt,
        &mut ct,
        &mut tag,
    )
    .unwrap();

    let (expected_ct, expected_tag) = AesGcm::encrypt(&[0u8; 32], &nonce, &[], &pt).unwrap();
    assert_eq!(ct, expected_ct);
    assert_eq!(tag, expected_tag);
}

#[test]
fn test_encrypt_final_zeroizes_kup_and_round_keys() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    aes.write_key(KeySource::User0, AesKey::from(&key256(8)))
        .unwrap();
    let mut ct = [0u8; 16];
    let mut tag = [0u8; 16];
    aes.encrypt_data(
        KeySource::User0,
        AesKeySize::Bits256,
        &iv_block(&[0u8; 12]),
        &[0u8; 16],
        &mut ct,
        &mut tag,
    )
    .unwrap();
    assert!(mmio
        .bus()
        .aes
        .key_zeroed()
        .contains(KeyClear::KUP_KEY | KeyClear::AES_KEY));
}

#[test]
fn test_key_zero_after_completed_operation() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    aes.write_key(KeySource::User0, AesKey::from(&key256(0x18)))
        .unwrap();
    let mut ct = [0u8; 16];
    let mut tag = [0u8; 16];
    aes.encrypt_data(
        KeySource::User0,
        AesKeySize::Bits256,
        &iv_block(&[0x19u8; 12]),
        &[0x1au8; 16],
        &mut ct,
        &mut tag,
    )
    .unwrap();
    assert!(mmio.bus().aes.in_reset());

    aes.key_zero(KeySource::User0).unwrap();
    assert_eq!(mmio.bus().aes.key(key_sel::USER_KEY_0, 32), Some(vec![0u8; 32]));
    assert!(mmio.bus().aes.key_zeroed().contains(KeyClear::USER_KEY_0));
    assert!(mmio.bus().aes.in_reset());
    assert_eq!(mmio.bus().aes.read(KEY_CLEAR), Ok(0));
}

#[test]
fn test_key_zero_all() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    aes.write_key(KeySource::User3, AesKey::from(&key256(0x23)))
        .unwrap();
    aes.write_key(KeySource::BootHeader, AesKey::from(&key256(0x24)))
        .unwrap();
    mmio.bus()
        .aes
        .provision_key(key_sel::PUF_KEY, &key256(0x25))
        .unwrap();

    aes.key_zero_all().unwrap();
    assert_eq!(mmio.bus().aes.key_zeroed(), KeyClear::all());
    for select in [key_sel::USER_KEY_3, key_sel::BH_KEY, key_sel::PUF_KEY] {
        assert_eq!(mmio.bus().aes.key(select, 32), Some(vec![0u8; 32]));
    }
}

#[test]
fn test_decrypt_final_zeroizes_kup_and_round_keys() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    let key = key256(0x26);
    let nonce = [0x27u8; 12];
    let pt = pattern(32, 0x28);
    let (ct, tag) = AesGcm::encrypt(&key, &nonce, &[], &pt).unwrap();
    aes.write_key(KeySource::User1, AesKey::from(&key)).unwrap();
    assert!(!mmio.bus().aes.key_zeroed().intersects(KeyClear::KUP_KEY | KeyClear::AES_KEY));

    let mut out = vec![0u8; 32];
    aes.decrypt_data(
        KeySource::User1,
        AesKeySize::Bits256,
        &iv_block(&nonce),
        &ct,
        &mut out,
        &tag,
    )
    .unwrap();
    assert_eq!(out, pt);
    assert!(mmio
        .bus()
        .aes
        .key_zeroed()
        .contains(KeyClear::KUP_KEY | KeyClear::AES_KEY));
    assert!(mmio.bus().aes.in_reset());
}

#[test]
fn test_failed_decrypt_final_zeroizes_round_keys() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    let key = key256(0x29);
    let nonce = [0x2au8; 12];
    let (ct, mut tag) = AesGcm::encrypt(&key, &nonce, &[], &[0x2bu8; 16]).unwrap();
    tag[0] ^= 1;
    aes.write_key(KeySource::User1, AesKey::from(&key)).unwrap();

    let mut out = [0u8; 16];
    assert_eq!(
        aes.decrypt_data(
            KeySource::User1,
            AesKeySize::Bits256,
            &iv_block(&nonce),
            &ct,
            &mut out,
            &tag,
        ),
        Err(CryptoError::DRIVER_AES_TAG_MISMATCH)
    );
    assert!(mmio.bus().aes.key_zeroed().contains(KeyClear::AES_KEY));
    assert!(mmio.bus().aes.in_reset());
}

#[test]
fn test_gmac_over_aad() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    let key = key256(0x2c);
    let nonce = [0x2du8; 12];
    let aad = pattern(48, 0x2e);
    aes.write_key(KeySource::User2, AesKey::from(&key)).unwrap();
    let (_, expected_tag) = AesGcm::encrypt(&key, &nonce, &aad, &[]).unwrap();

    let mut tag = [0u8; 16];
    let mut op = aes
        .encrypt_init(KeySource::User2, AesKeySize::Bits256, &iv_block(&nonce))
        .unwrap();
    op.gmac_cfg(true).unwrap();
    op.update_aad(&aad).unwrap();
    op.finalize(&mut tag).unwrap();
    assert_eq!(tag, expected_tag);

    let mut op = aes
        .decrypt_init(KeySource::User2, AesKeySize::Bits256, &iv_block(&nonce))
        .unwrap();
    op.gmac_cfg(true).unwrap();
    op.update_aad(&aad).unwrap();
    op.finalize(&tag).unwrap();

    let mut bad_tag = tag;
    bad_tag[3] ^= 0x10;
    let mut op = aes
        .decrypt_init(KeySource::User2, AesKeySize::Bits256, &iv_block(&nonce))
        .unwrap();
    op.gmac_cfg(true).unwrap();
    op.update_aad(&aad).unwrap();
    assert_eq!(
        op.finalize(&bad_tag),
        Err(CryptoError::DRIVER_AES_TAG_MISMATCH)
    );
    assert_eq!(aes.state(), AesState::Initialized);
}

#[test]
fn test_gmac_ends_the_message() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    aes.write_key(KeySource::User2, AesKey::from(&key256(0x2f)))
        .unwrap();

    let mut op = aes
        .encrypt_init(KeySource::User2, AesKeySize::Bits256, &iv_block(&[0x30u8; 12]))
        .unwrap();
    op.gmac_cfg(true).unwrap();
    op.update_aad(&[0x31u8; 16]).unwrap();
    assert_eq!(
        op.update(&[0u8; 16], &mut [0u8; 16], true),
        Err(CryptoError::DRIVER_AES_UPDATE_AFTER_LAST)
    );
    drop(op);
    assert_eq!(aes.state(), AesState::Initialized);

    // Disabled before any AAD, the session is ordinary GCM.
    let key = key256(0x2f);
    let nonce = [0x32u8; 12];
    let mut ct = [0u8; 16];
    let mut tag = [0u8; 16];
    let mut op = aes
        .encrypt_init(KeySource::User2, AesKeySize::Bits256, &iv_block(&nonce))
        .unwrap();
    op.gmac_cfg(true).unwrap();
    op.gmac_cfg(false).unwrap();
    op.update_aad(&[0x33u8; 16]).unwrap();
    op.update(&[0x34u8; 16], &mut ct, true).unwrap();
    op.finalize(&mut tag).unwrap();
    let (expected_ct, expected_tag) =
        AesGcm::encrypt(&key, &nonce, &[0x33u8; 16], &[0x34u8; 16]).unwrap();
    assert_eq!(ct.to_vec(), expected_ct);
    assert_eq!(tag, expected_tag);
}

#[test]
fn test_zeroized_puf_key_is_refused() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    let iv = iv_block(&[0x35u8; 12]);
    mmio.bus()
        .aes
        .provision_key(key_sel::PUF_KEY, &key256(0x36))
        .unwrap();
    aes.key_zero(KeySource::Puf).unwrap();

    let err = aes
        .encrypt_init(KeySource::Puf, AesKeySize::Bits256, &iv)
        .err()
        .unwrap();
    assert_eq!(err, CryptoError::DRIVER_AES_ZERO_PUF_KEY_NOT_ALLOWED);
    assert_eq!(err.kind(), ErrorKind::InvalidKeySource);
    assert_eq!(
        aes.decrypt_init(KeySource::Puf, AesKeySize::Bits256, &iv)
            .err(),
        Some(CryptoError::DRIVER_AES_ZERO_PUF_KEY_NOT_ALLOWED)
    );
    assert_eq!(aes.state(), AesState::Initialized);

    // A zeroized user key is still usable as an all-zero key.
    aes.key_zero(KeySource::User0).unwrap();
    assert!(aes
        .encrypt_init(KeySource::User0, AesKeySize::Bits256, &iv)
        .is_ok());
    aes.soft_reset();

    mmio.bus()
        .aes
        .provision_key(key_sel::PUF_KEY, &key256(0x37))
        .unwrap();
    assert!(aes
        .encrypt_init(KeySource::Puf, AesKeySize::Bits256, &iv)
        .is_ok());
}

#[test]
fn test_failed_update_ends_session_without_further_access() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    aes.write_key(KeySource::User0, AesKey::from(&key256(4)))
        .unwrap();

    let mut op = aes
        .encrypt_init(KeySource::User0, AesKeySize::Bits256, &iv_block(&[9u8; 12]))
        .unwrap();
    assert_eq!(
        op.update(&[0u8; 6], &mut [0u8; 6], false),
        Err(CryptoError::DRIVER_AES_UNALIGNED_SIZE)
    );

    let accesses = mmio.access_count();
    assert_eq!(
        op.update(&[0u8; 16], &mut [0u8; 16], true),
        Err(CryptoError::DRIVER_AES_INVALID_STATE)
    );
    assert_eq!(
        op.update_aad(&[0u8; 16]),
        Err(CryptoError::DRIVER_AES_INVALID_STATE)
    );
    assert_eq!(mmio.access_count(), accesses);
    assert_eq!(
        op.finalize(&mut [0u8; 16]),
        Err(CryptoError::DRIVER_AES_INVALID_STATE)
    );
    assert_eq!(mmio.access_count(), accesses);
    assert_eq!(aes.state(), AesState::Initialized);
}

#[test]
fn test_session_misuse() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    aes.write_key(KeySource::User6, AesKey::from(&key256(6)))
        .unwrap();
    let iv = iv_block(&[0x44u8; 12]);
    let mut out = [0u8; 32];

    let mut op = aes
        .encrypt_init(KeySource::User6, AesKeySize::Bits256, &iv)
        .unwrap();
    op.update(&[0u8; 16], &mut out, false).unwrap();
    assert_eq!(
        op.update_aad(&[0u8; 16]),
        Err(CryptoError::DRIVER_AES_AAD_AFTER_DATA)
    );
    drop(op);
    assert_eq!(aes.state(), AesState::Initialized);

    let mut op = aes
        .encrypt_init(KeySource::User6, AesKeySize::Bits256, &iv)
        .unwrap();
    assert_eq!(
        op.update_aad(&[0u8; 12]),
        Err(CryptoError::DRIVER_AES_UNALIGNED_AAD)
    );
    drop(op);

    let mut op = aes
        .decrypt_init(KeySource::User6, AesKeySize::Bits256, &iv)
        .unwrap();
    op.update(&[0u8; 16], &mut out, true).unwrap();
    assert_eq!(
        op.update(&[0u8; 16], &mut out, true),
        Err(CryptoError::DRIVER_AES_UPDATE_AFTER_LAST)
    );
    drop(op);

    let mut op = aes
        .encrypt_init(KeySource::User6, AesKeySize::Bits256, &iv)
        .unwrap();
    op.update(&[0u8; 16], &mut out, false).unwrap();
    assert_eq!(
        op.finalize(&mut [0u8; 16]),
        Err(CryptoError::DRIVER_AES_FINAL_BEFORE_LAST)
    );
    assert_eq!(aes.state(), AesState::Initialized);

    let mut op = aes
        .encrypt_init(KeySource::User6, AesKeySize::Bits256, &iv)
        .unwrap();
    assert_eq!(
        op.update(&[0u8; 16], &mut [0u8; 8], true),
        Err(CryptoError::DRIVER_AES_INVALID_SLICE)
    );
    drop(op);
    assert_eq!(aes.state(), AesState::Initialized);
}

#[test]
fn test_abandoned_session_requires_soft_reset() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    aes.write_key(KeySource::User2, AesKey::from(&key256(12)))
        .unwrap();
    let iv = iv_block(&[0x12u8; 12]);

    let op = aes
        .encrypt_init(KeySource::User2, AesKeySize::Bits256, &iv)
        .unwrap();
    drop(op);
    assert_eq!(aes.state(), AesState::EncryptInitialized);
    assert_eq!(
        aes.decrypt_init(KeySource::User2, AesKeySize::Bits256, &iv)
            .err(),
        Some(CryptoError::DRIVER_AES_INVALID_STATE)
    );

    aes.soft_reset();
    assert_eq!(aes.state(), AesState::Initialized);
    let mut ct = [0u8; 16];
    let mut tag = [0u8; 16];
    aes.encrypt_data(
        KeySource::User2,
        AesKeySize::Bits256,
        &iv,
        &[1u8; 16],
        &mut ct,
        &mut tag,
    )
    .unwrap();
}

#[test]
fn test_uninitialized_engine_rejects_operations() {
    let mmio = platform();
    let mut aes = harness::aes_uninitialized(&mmio);
    assert_eq!(aes.state(), AesState::Uninitialized);
    assert_eq!(
        aes.write_key(KeySource::User0, AesKey::from(&[0u8; 32])),
        Err(CryptoError::DRIVER_AES_INVALID_STATE)
    );
    assert_eq!(
        aes.encrypt_init(KeySource::User0, AesKeySize::Bits256, &[0u8; 16])
            .err(),
        Some(CryptoError::DRIVER_AES_INVALID_STATE)
    );
    assert_eq!(
        aes.key_zero(KeySource::User0),
        Err(CryptoError::DRIVER_AES_INVALID_STATE)
    );
    assert_eq!(mmio.access_count(), 0);

    aes.initialize(harness::dma(&mmio, DmaId::Dma0)).unwrap();
    assert_eq!(aes.state(), AesState::Initialized);
    assert_eq!(
        aes.initialize(harness::dma(&mmio, DmaId::Dma1)),
        Err(CryptoError::DRIVER_AES_INVALID_STATE)
    );
}

#[test]
fn test_key_source_permissions() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    let accesses = mmio.access_count();

    assert_eq!(
        aes.write_key(KeySource::Puf, AesKey::from(&[0u8; 32])),
        Err(CryptoError::DRIVER_AES_KEY_SRC_NOT_WRITABLE)
    );
    assert_eq!(
        aes.write_key(KeySource::BootHeader, AesKey::from(&[0u8; 16])),
        Err(CryptoError::DRIVER_AES_INVALID_KEY_SIZE)
    );
    assert_eq!(mmio.access_count(), accesses);

    // A refused session puts the core back in reset.
    assert!(!mmio.bus().aes.in_reset());
    assert_eq!(
        aes.encrypt_init(KeySource::Family, AesKeySize::Bits256, &[0u8; 16])
            .err(),
        Some(CryptoError::DRIVER_AES_KEY_SRC_ENCRYPT_NOT_ALLOWED)
    );
    assert!(mmio.bus().aes.in_reset());
    assert_eq!(aes.state(), AesState::Initialized);

    aes.write_key(KeySource::BootHeader, AesKey::from(&[0u8; 32]))
        .unwrap();
    aes.write_key(KeySource::User7, AesKey::from(&[0u8; 16]))
        .unwrap();
}

#[test]
fn test_dma_stall_times_out_and_resets() {
    let mmio = platform();
    let mut aes = harness::aes_uninitialized(&mmio);
    aes.initialize(harness::dma(&mmio, DmaId::Dma0).with_poll_limit(SHORT_POLL_LIMIT))
        .unwrap();
    aes.write_key(KeySource::User0, AesKey::from(&key256(13)))
        .unwrap();
    let iv = iv_block(&[0x3cu8; 12]);

    mmio.bus().dma0.set_stall(true);
    let err = aes
        .encrypt_init(KeySource::User0, AesKeySize::Bits256, &iv)
        .err()
        .unwrap();
    assert_eq!(err, CryptoError::DRIVER_DMA_TIMEOUT);
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(aes.state(), AesState::Initialized);
    assert!(mmio.bus().aes.in_reset());

    mmio.bus().dma0.set_stall(false);
    let mut ct = [0u8; 32];
    let mut tag = [0u8; 16];
    aes.encrypt_data(
        KeySource::User0,
        AesKeySize::Bits256,
        &iv,
        &[0x5au8; 32],
        &mut ct,
        &mut tag,
    )
    .unwrap();
}

#[test]
fn test_kek_unwrap_black_key() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    let puf = key256(0x11);
    let black = key256(0x22);
    let nonce = [0x5au8; 12];
    mmio.bus()
        .aes
        .provision_key(key_sel::PUF_KEY, &puf)
        .unwrap();
    aes.write_key(KeySource::BootHeader, AesKey::from(&black))
        .unwrap();

    aes.kek_unwrap(
        KekType::BlackKey,
        KeySource::BootHeader,
        KeySource::BootHeaderRed,
        &iv_block(&nonce),
        AesKeySize::Bits256,
    )
    .unwrap();
    assert_eq!(aes.state(), AesState::Initialized);
    assert!(mmio.bus().aes.in_reset());

    let red = AesGcm::apply_keystream(&puf, &nonce, &black).unwrap();
    assert_eq!(
        mmio.bus().aes.key(key_sel::BH_RED_KEY, 32),
        Some(red.clone())
    );

    let msg = pattern(32, 0x30);
    let msg_nonce = [0x31u8; 12];
    let mut ct = vec![0u8; 32];
    let mut tag = [0u8; 16];
    aes.encrypt_data(
        KeySource::BootHeaderRed,
        AesKeySize::Bits256,
        &iv_block(&msg_nonce),
        &msg,
        &mut ct,
        &mut tag,
    )
    .unwrap();
    let (expected_ct, expected_tag) = AesGcm::encrypt(&red, &msg_nonce, &[], &msg).unwrap();
    assert_eq!(ct, expected_ct);
    assert_eq!(tag, expected_tag);
}

#[test]
fn test_kek_unwrap_obfuscated_key() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    let family = key256(0x51);
    let obfuscated = key256(0x52);
    let nonce = [0x0fu8; 12];
    {
        let mut bus = mmio.bus();
        bus.aes.provision_key(key_sel::FAMILY_KEY, &family).unwrap();
        bus.aes.provision_key(key_sel::EFUSE_KEY, &obfuscated).unwrap();
    }

    aes.kek_unwrap(
        KekType::ObfuscatedKey,
        KeySource::Efuse,
        KeySource::EfuseRed,
        &iv_block(&nonce),
        AesKeySize::Bits256,
    )
    .unwrap();

    let red = AesGcm::apply_keystream(&family, &nonce, &obfuscated).unwrap();
    assert_eq!(mmio.bus().aes.key(key_sel::EFUSE_RED_KEY, 32), Some(red));
}

#[test]
fn test_kek_unwrap_rejects_disallowed_pairs() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    let iv = [0u8; 16];
    let red = key256(0x3a);
    mmio.bus()
        .aes
        .provision_key(key_sel::BH_RED_KEY, &red)
        .unwrap();

    assert!(!mmio.bus().aes.in_reset());
    assert_eq!(
        aes.kek_unwrap(
            KekType::BlackKey,
            KeySource::User0,
            KeySource::BootHeaderRed,
            &iv,
            AesKeySize::Bits256,
        ),
        Err(CryptoError::DRIVER_AES_KEY_SRC_KEK_NOT_ALLOWED)
    );
    assert!(mmio.bus().aes.in_reset());

    aes.set_dpa_cm(false).unwrap();
    assert!(!mmio.bus().aes.in_reset());
    assert_eq!(
        aes.kek_unwrap(
            KekType::BlackKey,
            KeySource::BootHeader,
            KeySource::User0,
            &iv,
            AesKeySize::Bits256,
        ),
        Err(CryptoError::DRIVER_AES_KEY_SRC_KEK_NOT_ALLOWED)
    );
    assert!(mmio.bus().aes.in_reset());
    assert_eq!(aes.state(), AesState::Initialized);
    assert_eq!(mmio.bus().aes.key(key_sel::BH_RED_KEY, 32), Some(red.to_vec()));
}

#[test]
fn test_key_update_save() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    let key = key256(0x61);
    let nonce = [0x62u8; 12];
    let kup_key = key256(0x77);
    let kup_nonce = [0x33u8; 12];
    let next_words: u32 = 0x100;

    let mut pt = pattern(16, 1);
    pt.extend_from_slice(&kup_key);
    pt.extend_from_slice(&kup_nonce);
    pt.extend_from_slice(&next_words.to_be_bytes());
    let (ct, tag) = AesGcm::encrypt(&key, &nonce, &[], &pt).unwrap();

    aes.write_key(KeySource::User2, AesKey::from(&key)).unwrap();
    aes.cfg_kup_key_iv(true).unwrap();
    let mut out = vec![0u8; pt.len()];
    aes.decrypt_data(
        KeySource::User2,
        AesKeySize::Bits256,
        &iv_block(&nonce),
        &ct,
        &mut out,
        &tag,
    )
    .unwrap();
    assert_eq!(out, pt);
    assert_eq!(aes.next_blk_len(), next_words * 4);
    assert_eq!(
        mmio.bus().aes.key(key_sel::KUP_KEY, 32),
        Some(kup_key.to_vec())
    );

    aes.cfg_kup_key_iv(false).unwrap();
    let msg = pattern(32, 4);
    let mut next_ct = vec![0u8; 32];
    let mut next_tag = [0u8; 16];
    aes.encrypt_data(
        KeySource::Kup,
        AesKeySize::Bits256,
        &iv_block(&kup_nonce),
        &msg,
        &mut next_ct,
        &mut next_tag,
    )
    .unwrap();
    let (expected_ct, expected_tag) = AesGcm::encrypt(&kup_key, &kup_nonce, &[], &msg).unwrap();
    assert_eq!(next_ct, expected_ct);
    assert_eq!(next_tag, expected_tag);
    assert!(mmio.bus().aes.key_zeroed().contains(KeyClear::KUP_KEY));
}

#[test]
fn test_dpa_countermeasure_configuration() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    aes.set_dpa_cm(true).unwrap();
    aes.set_dpa_cm(false).unwrap();

    mmio.bus().aes.set_cm_available(false);
    let err = aes.set_dpa_cm(true).unwrap_err();
    assert_eq!(err, CryptoError::DRIVER_AES_DPA_CM_MISMATCH);
    assert_eq!(err.kind(), ErrorKind::HardwareFault);
    aes.set_dpa_cm(false).unwrap();
}

#[test]
fn test_dpa_cm_encrypt_requires_countermeasure() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio);
    mmio.bus().aes.set_cm_available(false);

    let mut output = [0u8; AES_DPA_CM_DATA_SIZE];
    assert_eq!(
        aes.dpa_cm_encrypt_data(&key256(0x3b), &[0x3cu8; AES_DPA_CM_DATA_SIZE], &mut output),
        Err(CryptoError::DRIVER_AES_DPA_CM_MISMATCH)
    );
    assert_eq!(output, [0u8; AES_DPA_CM_DATA_SIZE]);
    assert_eq!(aes.state(), AesState::Initialized);
    assert_eq!(mmio.bus().aes.read(SPLIT_CFG), Ok(0));
    assert!(mmio.bus().aes.in_reset());
}

#[test]
fn test_stuck_zeroization_fails() {
    let mmio = platform();
    let mut aes = harness::aes(&mmio).with_poll_limit(SHORT_POLL_LIMIT);
    mmio.bus().aes.set_stuck_zeroize(true);

    let err = aes.key_zero(KeySource::User0).unwrap_err();
    assert_eq!(err, CryptoError::DRIVER_AES_KEY_CLEAR_FAILED);
    assert_eq!(err.kind(), ErrorKind::KeyClearFailed);
    assert_eq!(mmio.bus().aes.read(KEY_CLEAR), Ok(0));
    assert!(mmio.bus().aes.in_reset());

    assert_eq!(
        aes.zeroize_expanded_keys(),
        Err(CryptoError::DRIVER_AES_KEY_CLEAR_FAILED)
    );
    assert_eq!(mmio.bus().aes.read(KEY_CLEAR), Ok(0));
    assert!(mmio.bus().aes.in_reset());
    assert_eq!(aes.state(), AesState::Initialized);
}

#[test]
fn test_engine_on_dma1() {
    let mmio = platform();
    let mut aes = harness::aes_on(&mmio, DmaId::Dma1);
    let key = key256(0x90);
    let nonce = [0x91u8; 12];
    let pt = pattern(32, 0x92);
    aes.write_key(KeySource::User0, AesKey::from(&key)).unwrap();

    let mut ct = vec![0u8; 32];
    let mut tag = [0u8; 16];
    aes.encrypt_data(
        KeySource::User0,
        AesKeySize::Bits256,
        &iv_block(&nonce),
        &pt,
        &mut ct,
        &mut tag,
    )
    .unwrap();
    let (expected_ct, expected_tag) = AesGcm::encrypt(&key, &nonce, &[], &pt).unwrap();
    assert_eq!(ct, expected_ct);
    assert_eq!(tag, expected_tag);
    assert_eq!(
        mmio.bus().sss.cfg(),
        (code::AES_FROM_DMA1 << 12) | (code::DMA1_FROM_AES << 4)
    );
}
