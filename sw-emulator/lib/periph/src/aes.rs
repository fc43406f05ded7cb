/*++

Licensed under the Apache-2.0 license.

File Name:

    aes.rs

Abstract:

    File contains the AES-GCM core peripheral model: key slots, the GCM
    datapath fed by the stream switch, black key decryption and the split
    mode DPA countermeasure.

--*/

use std::collections::VecDeque;

use cryptocore_emu_bus::BusError;
use cryptocore_emu_crypto::{AesGcm, AES_GCM_IV_SIZE, AES_GCM_TAG_SIZE};
use cryptocore_registers::aes::{
    self as regs, key_dec_sel, key_sel, KeyClear, KeySize, KupWr, Mode, SplitCfg, Status,
};
use tock_registers::LocalRegisterCopy;

use crate::dma::swap_words;

const KEY_WORDS: usize = 8;
const BLOCK_SIZE: usize = 16;

/// Key, IV and next block length saved from the plaintext tail.
const KUP_RECORD_SIZE: usize = 48;
const KUP_KEY_SIZE: usize = 32;

struct KeySlot {
    select: u32,
    clear: KeyClear,
    window: Option<u32>,
    dec_sel: Option<u32>,
}

const fn slot(select: u32, clear: KeyClear) -> KeySlot {
    KeySlot {
        select,
        clear,
        window: None,
        dec_sel: None,
    }
}

const fn red_slot(select: u32, clear: KeyClear, dec_sel: u32) -> KeySlot {
    KeySlot {
        dec_sel: Some(dec_sel),
        ..slot(select, clear)
    }
}

const fn user_slot(index: u32, select: u32, clear: KeyClear) -> KeySlot {
    KeySlot {
        window: Some(regs::USER_KEY_0_0 + index * regs::USER_KEY_STRIDE),
        ..slot(select, clear)
    }
}

const KUP_SLOT: usize = 10;
const SLOT_COUNT: usize = 21;

const SLOTS: [KeySlot; SLOT_COUNT] = [
    slot(key_sel::BBRAM_KEY, KeyClear::BBRAM_KEY),
    red_slot(
        key_sel::BBRAM_RED_KEY,
        KeyClear::BBRAM_RED_KEY,
        key_dec_sel::BBRAM_RED,
    ),
    KeySlot {
        window: Some(regs::BH_KEY_0),
        ..slot(key_sel::BH_KEY, KeyClear::BH_KEY)
    },
    red_slot(key_sel::BH_RED_KEY, KeyClear::BH_RED_KEY, key_dec_sel::BH_RED),
    slot(key_sel::EFUSE_KEY, KeyClear::EFUSE_KEY),
    red_slot(
        key_sel::EFUSE_RED_KEY,
        KeyClear::EFUSE_RED_KEY,
        key_dec_sel::EFUSE_RED,
    ),
    slot(key_sel::EFUSE_USER_KEY_0, KeyClear::EFUSE_USER_KEY_0),
    slot(key_sel::EFUSE_USER_KEY_1, KeyClear::EFUSE_USER_KEY_1),
    red_slot(
        key_sel::EFUSE_USER_RED_KEY_0,
        KeyClear::EFUSE_USER_RED_KEY_0,
        key_dec_sel::EFUSE_USER_RED_0,
    ),
    red_slot(
        key_sel::EFUSE_USER_RED_KEY_1,
        KeyClear::EFUSE_USER_RED_KEY_1,
        key_dec_sel::EFUSE_USER_RED_1,
    ),
    slot(key_sel::KUP_KEY, KeyClear::KUP_KEY),
    slot(key_sel::FAMILY_KEY, KeyClear::FAMILY_KEY),
    slot(key_sel::PUF_KEY, KeyClear::PUF_KEY),
    user_slot(0, key_sel::USER_KEY_0, KeyClear::USER_KEY_0),
    user_slot(1, key_sel::USER_KEY_1, KeyClear::USER_KEY_1),
    user_slot(2, key_sel::USER_KEY_2, KeyClear::USER_KEY_2),
    user_slot(3, key_sel::USER_KEY_3, KeyClear::USER_KEY_3),
    user_slot(4, key_sel::USER_KEY_4, KeyClear::USER_KEY_4),
    user_slot(5, key_sel::USER_KEY_5, KeyClear::USER_KEY_5),
    user_slot(6, key_sel::USER_KEY_6, KeyClear::USER_KEY_6),
    user_slot(7, key_sel::USER_KEY_7, KeyClear::USER_KEY_7),
];

fn slot_by_select(select: u32) -> Option<usize> {
    SLOTS.iter().position(|slot| slot.select == select)
}

fn slot_by_dec_sel(dec_sel: u32) -> Option<usize> {
    SLOTS.iter().position(|slot| slot.dec_sel == Some(dec_sel))
}

fn slot_by_window(offset: u32) -> Option<(usize, usize)> {
    SLOTS.iter().enumerate().find_map(|(idx, slot)| {
        let base = slot.window?;
        let end = base + (KEY_WORDS * 4) as u32;
        (base..end)
            .contains(&offset)
            .then(|| (idx, ((offset - base) / 4) as usize))
    })
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| x ^ y).collect()
}

fn idle_status() -> LocalRegisterCopy<u32, Status::Register> {
    let mut status = LocalRegisterCopy::new(0);
    status.write(Status::READY::SET);
    status
}

/// Random non-zero mask block.
fn random_mask() -> [u8; BLOCK_SIZE] {
    loop {
        let mask: [u8; BLOCK_SIZE] = rand::random();
        if mask.iter().any(|&b| b != 0) {
            return mask;
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Phase {
    Idle,
    Iv,
    Text,
    Tag,
    Split,
    Done,
}

struct Session {
    phase: Phase,
    iv: Vec<u8>,
    aad: Vec<u8>,
    text: Vec<u8>,
    tag: Vec<u8>,
    split: Vec<u8>,
}

impl Session {
    fn new(phase: Phase) -> Self {
        Self {
            phase,
            iv: Vec::new(),
            aad: Vec::new(),
            text: Vec::new(),
            tag: Vec::new(),
            split: Vec::new(),
        }
    }

    fn nonce(&self) -> Option<[u8; AES_GCM_IV_SIZE]> {
        let mut nonce = [0u8; AES_GCM_IV_SIZE];
        nonce.copy_from_slice(self.iv.get(..AES_GCM_IV_SIZE)?);
        Some(nonce)
    }
}

/// AES-GCM core.
pub struct AesCore {
    status: LocalRegisterCopy<u32, Status::Register>,
    key_sel: u32,
    key_size: LocalRegisterCopy<u32, KeySize::Register>,
    mode: LocalRegisterCopy<u32, Mode::Register>,
    kup_wr: LocalRegisterCopy<u32, KupWr::Register>,
    key_clear: u32,
    key_zeroed: KeyClear,
    key_dec: u32,
    key_dec_sel: u32,
    aad: bool,
    split_cfg: LocalRegisterCopy<u32, SplitCfg::Register>,
    data_swap: bool,
    cm_en: bool,
    iv_regs: [u32; 4],
    key_mask: [u32; KEY_WORDS],
    keys: [[u32; KEY_WORDS]; SLOT_COUNT],
    in_reset: bool,

    loaded_key: Option<Vec<u8>>,
    session: Session,
    output: VecDeque<u8>,

    cm_available: bool,
    stuck_zeroize: bool,
}

impl Default for AesCore {
    fn default() -> Self {
        Self::new()
    }
}

impl AesCore {
    pub fn new() -> Self {
        Self {
            status: idle_status(),
            key_sel: 0,
            key_size: LocalRegisterCopy::new(0),
            mode: LocalRegisterCopy::new(0),
            kup_wr: LocalRegisterCopy::new(0),
            key_clear: 0,
            key_zeroed: KeyClear::empty(),
            key_dec: 0,
            key_dec_sel: 0,
            aad: false,
            split_cfg: LocalRegisterCopy::new(0),
            data_swap: false,
            cm_en: false,
            iv_regs: [0; 4],
            key_mask: [0; KEY_WORDS],
            keys: [[0; KEY_WORDS]; SLOT_COUNT],
            in_reset: true,
            loaded_key: None,
            session: Session::new(Phase::Idle),
            output: VecDeque::new(),
            cm_available: true,
            stuck_zeroize: false,
        }
    }

    /// Whether the part implements the DPA countermeasure.
    pub fn set_cm_available(&mut self, available: bool) {
        self.cm_available = available;
    }

    /// When set, zeroization requests are never acknowledged.
    pub fn set_stuck_zeroize(&mut self, stuck: bool) {
        self.stuck_zeroize = stuck;
    }

    /// Provision a device key, e.g. the PUF or an eFUSE key.
    pub fn provision_key(&mut self, select: u32, key: &[u8]) -> Option<()> {
        let idx = slot_by_select(select)?;
        self.store_key(idx, key);
        Some(())
    }

    /// Contents of the slot `select` as a key of `len` bytes.
    pub fn key(&self, select: u32, len: usize) -> Option<Vec<u8>> {
        Some(self.key_bytes(slot_by_select(select)?, len / 4))
    }

    pub fn key_zeroed(&self) -> KeyClear {
        self.key_zeroed
    }

    pub fn in_reset(&self) -> bool {
        self.in_reset
    }

    pub fn read(&self, offset: u32) -> Result<u32, BusError> {
        let val = match offset {
            regs::STATUS => {
                let mut status = self.status;
                if self.cm_en && self.cm_available {
                    status.modify(Status::CM_ENABLED::SET);
                }
                status.get()
            }
            regs::KEY_SEL => self.key_sel,
            regs::SOFT_RST => u32::from(self.in_reset),
            regs::KEY_CLEAR => self.key_clear,
            regs::MODE => self.mode.get(),
            regs::KUP_WR => self.kup_wr.get(),
            regs::IV_0..=regs::IV_3 => self.iv_regs[((offset - regs::IV_0) / 4) as usize],
            regs::KEY_SIZE => self.key_size.get(),
            regs::KEY_DEC => self.key_dec,
            regs::KEY_DEC_SEL => self.key_dec_sel,
            regs::KEY_ZEROED_STATUS => self.key_zeroed.bits(),
            regs::AAD => u32::from(self.aad),
            regs::SPLIT_CFG => self.split_cfg.get(),
            regs::DATA_SWAP => u32::from(self.data_swap),
            regs::CM_EN => u32::from(self.cm_en),
            regs::KEY_LOAD | regs::START_MSG | regs::KEY_DEC_TRIG => 0,
            // Key windows are write-only.
            _ if slot_by_window(offset).is_some() => 0,
            _ if self.key_mask_index(offset).is_some() => 0,
            _ => return Err(BusError::LoadAccessFault),
        };
        Ok(val)
    }

    pub fn write(&mut self, offset: u32, val: u32) -> Result<(), BusError> {
        match offset {
            regs::SOFT_RST => {
                if val & 1 != 0 {
                    self.reset();
                }
                self.in_reset = val & 1 != 0;
            }
            regs::KEY_SEL => self.key_sel = val,
            regs::KEY_LOAD => {
                if val & 1 != 0 {
                    self.load_key();
                }
            }
            regs::START_MSG => {
                if val & 1 != 0 {
                    self.start_msg();
                }
            }
            regs::KEY_CLEAR => self.clear_keys(val),
            regs::MODE => self.mode.set(val & 0x1),
            regs::KUP_WR => self.kup_wr.set(val & 0x3),
            regs::KEY_SIZE => self.key_size.set(val & 0x3),
            regs::KEY_DEC => self.key_dec = val,
            regs::KEY_DEC_TRIG => {
                if val & 1 != 0 {
                    self.decrypt_black_key();
                }
            }
            regs::KEY_DEC_SEL => self.key_dec_sel = val,
            regs::AAD => self.aad = val & 1 != 0,
            regs::SPLIT_CFG => self.split_cfg.set(val & 0x3),
            regs::DATA_SWAP => self.data_swap = val & 1 != 0,
            regs::CM_EN => self.cm_en = val & 1 != 0,
            _ => {
                if let Some((idx, word)) = slot_by_window(offset) {
                    self.keys[idx][word] = val;
                    self.key_zeroed.remove(SLOTS[idx].clear);
                } else if let Some(word) = self.key_mask_index(offset) {
                    self.key_mask[word] = val;
                } else {
                    return Err(BusError::StoreAccessFault);
                }
            }
        }
        Ok(())
    }

    /// Accept bytes from the stream switch.
    pub fn push(&mut self, data: &[u8], last: bool) {
        if self.in_reset {
            return;
        }
        let mut bytes = data.to_vec();
        if self.data_swap {
            swap_words(&mut bytes);
        }

        match self.session.phase {
            Phase::Iv => {
                self.session.iv.extend_from_slice(&bytes);
                if self.session.iv.len() >= BLOCK_SIZE {
                    self.session.phase = Phase::Text;
                }
            }
            Phase::Text if self.aad => {
                self.session.aad.extend_from_slice(&bytes);
                // AAD marked last is a GMAC: the message has no text.
                if last {
                    self.end_message(&[]);
                }
            }
            Phase::Text => self.process_text(&bytes, last),
            Phase::Tag => {
                self.session.tag.extend_from_slice(&bytes);
                if self.session.tag.len() >= AES_GCM_TAG_SIZE {
                    self.check_tag();
                }
            }
            Phase::Split => {
                self.session.split.extend_from_slice(&bytes);
                if last {
                    self.split_encrypt();
                }
            }
            Phase::Idle | Phase::Done => {}
        }
    }

    /// Remove up to `max` bytes of pending output.
    pub fn take_output(&mut self, max: usize) -> Vec<u8> {
        let len = max.min(self.output.len());
        self.output.drain(..len).collect()
    }

    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    fn reset(&mut self) {
        self.status = idle_status();
        self.loaded_key = None;
        self.session = Session::new(Phase::Idle);
        self.output.clear();
        self.data_swap = false;
        self.aad = false;
    }

    fn key_mask_index(&self, offset: u32) -> Option<usize> {
        let end = regs::KEY_MASK_0 + (KEY_WORDS * 4) as u32;
        (regs::KEY_MASK_0..end)
            .contains(&offset)
            .then(|| ((offset - regs::KEY_MASK_0) / 4) as usize)
    }

    fn key_words(&self) -> usize {
        if self.key_size.matches_all(KeySize::SIZE::Bits256) {
            KEY_WORDS
        } else {
            KEY_WORDS / 2
        }
    }

    // Key word i of the key is held in register n - 1 - i, big-endian.
    fn key_bytes(&self, idx: usize, words: usize) -> Vec<u8> {
        (0..words)
            .flat_map(|i| self.keys[idx][words - 1 - i].to_be_bytes())
            .collect()
    }

    fn store_key(&mut self, idx: usize, key: &[u8]) {
        let words = (key.len() / 4).min(KEY_WORDS);
        self.keys[idx] = [0; KEY_WORDS];
        for (i, word) in key.chunks_exact(4).enumerate().take(words) {
            self.keys[idx][words - 1 - i] = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
        }
        self.key_zeroed.remove(SLOTS[idx].clear);
    }

    fn load_key(&mut self) {
        if self.in_reset {
            return;
        }
        let Some(idx) = slot_by_select(self.key_sel) else {
            return;
        };
        let words = self.key_words();
        let mut key = self.key_bytes(idx, words);
        if self.split_cfg.is_set(SplitCfg::KEY_SPLIT) {
            let mask: Vec<u8> = (0..words)
                .flat_map(|i| self.key_mask[words - 1 - i].to_be_bytes())
                .collect();
            key = xor(&key, &mask);
        }
        self.loaded_key = Some(key);
        self.status.modify(Status::KEY_INIT_DONE::SET);
    }

    fn start_msg(&mut self) {
        if self.in_reset {
            return;
        }
        let split = self.split_cfg.is_set(SplitCfg::DATA_SPLIT)
            && self.split_cfg.is_set(SplitCfg::KEY_SPLIT);
        self.session = Session::new(if split { Phase::Split } else { Phase::Iv });
        self.output.clear();
        self.status
            .modify(Status::DONE::CLEAR + Status::GCM_TAG_PASS::CLEAR);
    }

    fn clear_keys(&mut self, val: u32) {
        self.key_clear = val;
        if self.in_reset {
            return;
        }
        let request = KeyClear::from_bits_truncate(val);
        for (idx, slot) in SLOTS.iter().enumerate() {
            if request.contains(slot.clear) {
                self.keys[idx] = [0; KEY_WORDS];
            }
        }
        if request.contains(KeyClear::AES_KEY) {
            self.loaded_key = None;
        }
        if !self.stuck_zeroize {
            self.key_zeroed |= request;
        }
    }

    fn emit(&mut self, data: &[u8]) {
        let mut bytes = data.to_vec();
        if self.data_swap {
            swap_words(&mut bytes);
        }
        self.output.extend(bytes);
    }

    fn process_text(&mut self, bytes: &[u8], last: bool) {
        let (Some(key), Some(nonce)) = (self.loaded_key.clone(), self.session.nonce()) else {
            return;
        };
        let start = self.session.text.len();
        self.session.text.extend_from_slice(bytes);
        let Some(out) = AesGcm::apply_keystream(&key, &nonce, &self.session.text) else {
            return;
        };
        self.emit(&out[start..]);

        if last {
            self.end_message(&out);
        }
    }

    /// Encrypt emits the tag; decrypt waits for the expected tag.
    fn end_message(&mut self, plaintext: &[u8]) {
        if self.mode.matches_all(Mode::ENC_DEC::Decrypt) {
            self.save_kup(plaintext);
            self.session.phase = Phase::Tag;
            return;
        }
        let (Some(key), Some(nonce)) = (self.loaded_key.clone(), self.session.nonce()) else {
            return;
        };
        if let Some((_, tag)) = AesGcm::encrypt(&key, &nonce, &self.session.aad, &self.session.text)
        {
            self.emit(&tag);
        }
        self.session.phase = Phase::Done;
        self.status.modify(Status::DONE::SET);
    }

    fn check_tag(&mut self) {
        let (Some(key), Some(nonce)) = (self.loaded_key.clone(), self.session.nonce()) else {
            return;
        };
        let mut tag = [0u8; AES_GCM_TAG_SIZE];
        tag.copy_from_slice(&self.session.tag[..AES_GCM_TAG_SIZE]);
        let pass = AesGcm::decrypt(
            &key,
            &nonce,
            &self.session.aad,
            &tag,
            &self.session.text,
        )
        .is_some();
        if pass {
            self.status.modify(Status::GCM_TAG_PASS::SET);
        }
        self.session.phase = Phase::Done;
        self.status.modify(Status::DONE::SET);
    }

    fn save_kup(&mut self, plaintext: &[u8]) {
        if self.kup_wr.get() == 0 || plaintext.len() < KUP_RECORD_SIZE {
            return;
        }
        let record = &plaintext[plaintext.len() - KUP_RECORD_SIZE..];
        if self.kup_wr.is_set(KupWr::KEY_SAVE) {
            self.store_key(KUP_SLOT, &record[..KUP_KEY_SIZE]);
        }
        if self.kup_wr.is_set(KupWr::IV_SAVE) {
            for (reg, word) in self
                .iv_regs
                .iter_mut()
                .zip(record[KUP_KEY_SIZE..].chunks_exact(4))
            {
                *reg = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            }
        }
    }

    fn decrypt_black_key(&mut self) {
        if self.key_dec != regs::KEY_DEC_ALL {
            return;
        }
        let (Some(kek), Some(nonce)) = (self.loaded_key.clone(), self.session.nonce()) else {
            return;
        };
        let (Some(src), Some(dst)) = (
            slot_by_select(self.key_sel),
            slot_by_dec_sel(self.key_dec_sel),
        ) else {
            return;
        };
        let black = self.key_bytes(src, self.key_words());
        if let Some(red) = AesGcm::apply_keystream(&kek, &nonce, &black) {
            self.store_key(dst, &red);
            self.status.modify(Status::BLK_KEY_DEC_DONE::SET);
        }
    }

    fn split_encrypt(&mut self) {
        let Some(key) = self.loaded_key.clone() else {
            return;
        };
        if self.session.split.len() < 4 * BLOCK_SIZE {
            return;
        }
        let shares = std::mem::take(&mut self.session.split);
        let blocks: Vec<&[u8]> = shares.chunks_exact(BLOCK_SIZE).collect();

        let mut nonce = [0u8; AES_GCM_IV_SIZE];
        nonce.copy_from_slice(&xor(blocks[0], blocks[1])[..AES_GCM_IV_SIZE]);
        let msg = xor(blocks[2], blocks[3]);
        let Some((ct, tag)) = AesGcm::encrypt(&key, &nonce, &[], &msg) else {
            return;
        };

        let (ct_mask, tag_mask) = if self.cm_en && self.cm_available {
            (random_mask(), random_mask())
        } else {
            ([0u8; BLOCK_SIZE], [0u8; BLOCK_SIZE])
        };
        let mut out = Vec::with_capacity(4 * BLOCK_SIZE);
        out.extend_from_slice(&ct_mask);
        out.extend(xor(&ct, &ct_mask));
        out.extend_from_slice(&tag_mask);
        out.extend(xor(&tag, &tag_mask));
        self.emit(&out);

        self.session.phase = Phase::Done;
        self.status.modify(Status::DONE::SET);
    }
}
