/*++

Licensed under the Apache-2.0 license.

File Name:

    aes.rs

Abstract:

    Driver for the AES-GCM core.

    Notes about how this hardware differs from other hardware:

    * Data reaches the core only through the stream switch; the core never
      sees memory. Every push and pull is a PMC DMA transfer.
    * The core expects every 32-bit word byte-reversed. The DMA and the core
      each reverse once (DATA_SWAP plus the DMA endianness bit), so message
      bytes reach the GCM datapath in memory order.
    * Key words are written last word first, each word big-endian.

--*/

use crate::dma::{Dma, DmaChannel, DmaTransfer, Endianness};
use crate::key_source::{lookup, AesKeySize, KeyDescriptor, KeySource};
use crate::sss::{Sss, SssEndpoint};
use crate::{cprintln, memory_layout, wait, CryptoError, CryptoResult};
use cryptocore_registers::aes::{
    self, Aad, AesReg, CmEn, DataSwap, KeyClear, KupWr, Mode, SoftRst, SplitCfg, Status, Trigger,
};
use cryptocore_registers::{Mmio, Readable, Writeable};
use tock_registers::fields::FieldValue;

const AES_BLOCK_SIZE_BYTES: usize = memory_layout::AES_BLOCK_SIZE;

/// Input and output length of a split-mode countermeasure run: four blocks.
pub const AES_DPA_CM_DATA_SIZE: usize = 4 * AES_BLOCK_SIZE_BYTES;

/// AES Key
#[derive(Debug, Copy, Clone)]
pub enum AesKey<'a> {
    /// Array - 16 Bytes (128 bits)
    Bits128(&'a [u8; 16]),

    /// Array - 32 Bytes (256 bits)
    Bits256(&'a [u8; 32]),
}

impl<'a> From<&'a [u8; 16]> for AesKey<'a> {
    fn from(value: &'a [u8; 16]) -> Self {
        Self::Bits128(value)
    }
}

impl<'a> From<&'a [u8; 32]> for AesKey<'a> {
    fn from(value: &'a [u8; 32]) -> Self {
        Self::Bits256(value)
    }
}

impl<'a> AesKey<'a> {
    pub fn size(&self) -> AesKeySize {
        match self {
            Self::Bits128(_) => AesKeySize::Bits128,
            Self::Bits256(_) => AesKeySize::Bits256,
        }
    }

    fn as_bytes(&self) -> &'a [u8] {
        match *self {
            Self::Bits128(key) => &key[..],
            Self::Bits256(key) => &key[..],
        }
    }
}

/// Driver-level engine state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AesState {
    Uninitialized,
    Initialized,
    EncryptInitialized,
    DecryptInitialized,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum AesOperation {
    Encrypt,
    Decrypt,
}

impl AesOperation {
    fn mode(&self) -> FieldValue<u32, Mode::Register> {
        match self {
            Self::Encrypt => Mode::ENC_DEC::Encrypt,
            Self::Decrypt => Mode::ENC_DEC::Decrypt,
        }
    }

    fn session_state(&self) -> AesState {
        match self {
            Self::Encrypt => AesState::EncryptInitialized,
            Self::Decrypt => AesState::DecryptInitialized,
        }
    }
}

/// How a black key was protected, which selects the key-encryption key.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KekType {
    /// Encrypted under the PUF key
    BlackKey,

    /// Obfuscated under the family key
    ObfuscatedKey,
}

impl KekType {
    pub fn kek_source(&self) -> KeySource {
        match self {
            Self::BlackKey => KeySource::Puf,
            Self::ObfuscatedKey => KeySource::Family,
        }
    }
}

#[derive(Debug, Default, Copy, Clone)]
struct SessionProgress {
    data_pushed: bool,
    last_pushed: bool,

    /// The next AAD push ends the message.
    gmac: bool,
}

/// AES-GCM engine.
pub struct Aes<M: Mmio> {
    aes: AesReg<M>,
    sss: Sss<M>,
    dma: Option<Dma<M>>,
    state: AesState,
    poll_limit: u32,
}

impl<M: Mmio> Aes<M> {
    /// Create a new AES instance in the `Uninitialized` state.
    ///
    /// # Safety
    ///
    /// Only one `Aes` may exist.
    pub unsafe fn new(mmio: M, sss: Sss<M>) -> Self {
        Self {
            aes: AesReg::new(mmio),
            sss,
            dma: None,
            state: AesState::Uninitialized,
            poll_limit: memory_layout::AES_POLL_LIMIT,
        }
    }

    /// Bound every engine status wait to `poll_limit` reads.
    pub fn with_poll_limit(mut self, poll_limit: u32) -> Self {
        self.poll_limit = poll_limit;
        self
    }

    pub fn state(&self) -> AesState {
        self.state
    }

    /// Bind the engine to `dma`, clear pending key-zeroize requests and take
    /// the core out of reset.
    ///
    /// # Arguments
    ///
    /// * `dma` - DMA engine used for every transfer of this engine
    ///
    /// # Returns
    ///
    /// * `DRIVER_AES_INVALID_STATE` - The engine is already initialized
    pub fn initialize(&mut self, dma: Dma<M>) -> CryptoResult<()> {
        self.check_state(AesState::Uninitialized)?;

        self.aes.key_clear().set(0);
        self.release_reset();
        self.dma = Some(dma);
        self.state = AesState::Initialized;
        cprintln!("[aes] initialized");
        Ok(())
    }

    /// Write a software-provided key into a writable key slot.
    ///
    /// # Arguments
    ///
    /// * `src` - Destination slot; only the user keys and the boot header key are writable
    /// * `key` - Key material
    pub fn write_key(&mut self, src: KeySource, key: AesKey) -> CryptoResult<()> {
        self.check_ready()?;

        let desc = lookup(src);
        let reg = desc
            .key_reg
            .filter(|_| desc.user_writable())
            .ok_or(CryptoError::DRIVER_AES_KEY_SRC_NOT_WRITABLE)?;
        if key.size() == AesKeySize::Bits128 && !desc.accepts_128 {
            Err(CryptoError::DRIVER_AES_INVALID_KEY_SIZE)?;
        }

        self.write_key_words(reg, key.as_bytes());
        Ok(())
    }

    /// Start an encrypt session.
    ///
    /// # Arguments
    ///
    /// * `src` - Key slot driving the session
    /// * `size` - Key size
    /// * `iv` - Initial counter block; the first twelve bytes are the GCM nonce
    ///
    /// # Returns
    ///
    /// * `AesGcmEncryptOp` - Object used to push AAD and data and to fetch the tag
    pub fn encrypt_init(
        &mut self,
        src: KeySource,
        size: AesKeySize,
        iv: &[u8; AES_BLOCK_SIZE_BYTES],
    ) -> CryptoResult<AesGcmEncryptOp<'_, M>> {
        self.op_init(AesOperation::Encrypt, src, size, iv)?;
        Ok(AesGcmEncryptOp {
            aes: self,
            progress: SessionProgress::default(),
        })
    }

    /// Start a decrypt session.
    ///
    /// Plaintext written during the session is untrusted until
    /// [`AesGcmDecryptOp::finalize`] accepts the tag.
    pub fn decrypt_init(
        &mut self,
        src: KeySource,
        size: AesKeySize,
        iv: &[u8; AES_BLOCK_SIZE_BYTES],
    ) -> CryptoResult<AesGcmDecryptOp<'_, M>> {
        self.op_init(AesOperation::Decrypt, src, size, iv)?;
        Ok(AesGcmDecryptOp {
            aes: self,
            progress: SessionProgress::default(),
        })
    }

    /// Encrypt `input` into `output` as a single session.
    ///
    /// # Arguments
    ///
    /// * `src` - Key slot
    /// * `size` - Key size
    /// * `iv` - Initial counter block
    /// * `input` - Plaintext, a whole number of words
    /// * `output` - Ciphertext, at least as long as `input`
    /// * `tag` - Receives the GCM tag
    pub fn encrypt_data(
        &mut self,
        src: KeySource,
        size: AesKeySize,
        iv: &[u8; AES_BLOCK_SIZE_BYTES],
        input: &[u8],
        output: &mut [u8],
        tag: &mut [u8; AES_BLOCK_SIZE_BYTES],
    ) -> CryptoResult<()> {
        let mut op = self.encrypt_init(src, size, iv)?;
        op.update(input, output, true)?;
        op.finalize(tag)
    }

    /// Decrypt `input` into `output` as a single session and verify `tag`.
    pub fn decrypt_data(
        &mut self,
        src: KeySource,
        size: AesKeySize,
        iv: &[u8; AES_BLOCK_SIZE_BYTES],
        input: &[u8],
        output: &mut [u8],
        tag: &[u8; AES_BLOCK_SIZE_BYTES],
    ) -> CryptoResult<()> {
        let mut op = self.decrypt_init(src, size, iv)?;
        op.update(input, output, true)?;
        op.finalize(tag)
    }

    /// Decrypt the black key held in `src` into the red slot `dst`.
    ///
    /// The engine decrypts with the key-encryption key named by `kek` and
    /// writes the result straight into the destination slot; the red key
    /// never reaches software. The engine is reset afterwards whether or not
    /// the unwrap succeeded.
    ///
    /// # Arguments
    ///
    /// * `kek` - Protection the black key carries
    /// * `src` - Slot holding the black key
    /// * `dst` - Red slot receiving the decrypted key
    /// * `iv` - IV the black key was encrypted with
    /// * `size` - Key size
    ///
    /// # Returns
    ///
    /// * `DRIVER_AES_KEY_SRC_KEK_NOT_ALLOWED` - `src` cannot hold a black key or `dst` is not a red slot; the core is reset
    /// * `DRIVER_AES_KEK_DECRYPT_TIMEOUT` - The core did not report completion
    pub fn kek_unwrap(
        &mut self,
        kek: KekType,
        src: KeySource,
        dst: KeySource,
        iv: &[u8; AES_BLOCK_SIZE_BYTES],
        size: AesKeySize,
    ) -> CryptoResult<()> {
        self.check_state(AesState::Initialized)?;

        let src_desc = lookup(src);
        let dst_sel = match lookup(dst).decrypt_select {
            Some(sel) if src_desc.key_decrypt_source_allowed() => sel,
            _ => {
                cprintln!("[aes] key decryption not allowed for this pair");
                self.abort();
                return Err(CryptoError::DRIVER_AES_KEY_SRC_KEK_NOT_ALLOWED);
            }
        };

        let result = self.kek_unwrap_start(kek, src_desc, dst_sel, iv, size);
        self.aes.key_dec().set(0);
        self.abort();
        if let Err(err) = result {
            cprintln!("[aes] key decryption failed: {}", u32::from(err));
        }
        result
    }

    /// Zeroize the key slot `src`.
    ///
    /// Works whether or not the core is held in reset; a core found in reset
    /// is released for the request and put back afterwards.
    ///
    /// # Returns
    ///
    /// * `DRIVER_AES_KEY_CLEAR_FAILED` - The zeroed status was not observed
    pub fn key_zero(&mut self, src: KeySource) -> CryptoResult<()> {
        self.check_ready()?;
        let result = self.zero_mask(lookup(src).clear_mask);
        self.reset_on_err(result)
    }

    /// Zeroize every key slot and the expanded round keys.
    pub fn key_zero_all(&mut self) -> CryptoResult<()> {
        self.check_ready()?;
        let result = self.zero_mask(KeyClear::all());
        self.reset_on_err(result)
    }

    /// Zeroize the round keys expanded inside the core.
    pub fn zeroize_expanded_keys(&mut self) -> CryptoResult<()> {
        self.check_ready()?;
        let result = self.zero_mask(KeyClear::AES_KEY);
        self.reset_on_err(result)
    }

    /// Enable or disable the DPA countermeasure.
    ///
    /// # Returns
    ///
    /// * `DRIVER_AES_DPA_CM_MISMATCH` - The core does not report the requested setting
    pub fn set_dpa_cm(&mut self, enable: bool) -> CryptoResult<()> {
        self.check_not_busy()?;

        self.release_reset();
        self.write_cm(enable)
    }

    /// Configure whether the next decrypt session saves the key and IV found
    /// in the trailing 48 bytes of its plaintext.
    ///
    /// The saved key lands in `KeySource::Kup`; the saved IV is read back
    /// through `next_blk_len`.
    pub fn cfg_kup_key_iv(&mut self, enable: bool) -> CryptoResult<()> {
        self.check_not_busy()?;

        let val = if enable {
            KupWr::KEY_SAVE::SET + KupWr::IV_SAVE::SET
        } else {
            KupWr::KEY_SAVE::CLEAR + KupWr::IV_SAVE::CLEAR
        };
        let kup_wr = self.aes.kup_wr();
        kup_wr.write(val);
        if kup_wr.get() != val.value {
            Err(CryptoError::DRIVER_AES_KUP_CFG_MISMATCH)?;
        }
        Ok(())
    }

    /// Length in bytes of the next encrypted block, taken from the saved IV.
    pub fn next_blk_len(&self) -> u32 {
        self.aes
            .iv(3)
            .get()
            .swap_bytes()
            .saturating_mul(memory_layout::WORD_SIZE as u32)
    }

    /// Encrypt one block with the DPA countermeasure in split mode.
    ///
    /// The key is loaded into `KeySource::User7` with an all-zero mask.
    /// `input` carries the IV and the message as XOR shares:
    /// IV = block 0 ^ block 1, message = block 2 ^ block 3.
    /// `output` receives the ciphertext and tag as shares the same way,
    /// ciphertext = block 0 ^ block 1, tag = block 2 ^ block 3.
    ///
    /// The split configuration and the previous countermeasure setting are
    /// restored afterwards. The caller zeroizes `KeySource::User7`.
    ///
    /// # Returns
    ///
    /// * `DRIVER_AES_DPA_CM_MISMATCH` - The core did not enable the countermeasure
    pub fn dpa_cm_encrypt_data(
        &mut self,
        key: &[u8; 32],
        input: &[u8; AES_DPA_CM_DATA_SIZE],
        output: &mut [u8; AES_DPA_CM_DATA_SIZE],
    ) -> CryptoResult<()> {
        self.check_state(AesState::Initialized)?;

        let cm_en = self.aes.cm_en().get();
        let result = self.dpa_cm_encrypt_start(key, input, output);

        self.aes.split_cfg().set(0);
        self.aes.cm_en().set(cm_en);
        self.abort();
        result
    }

    /// Reset the core and return to `Initialized`, abandoning any session.
    pub fn soft_reset(&mut self) {
        if self.state != AesState::Uninitialized {
            cprintln!("[aes] soft reset");
            self.abort();
        }
    }

    fn op_init(
        &mut self,
        op: AesOperation,
        src: KeySource,
        size: AesKeySize,
        iv: &[u8; AES_BLOCK_SIZE_BYTES],
    ) -> CryptoResult<()> {
        self.check_state(AesState::Initialized)?;
        if src == KeySource::Puf && self.aes.zeroed_keys().contains(KeyClear::PUF_KEY) {
            Err(CryptoError::DRIVER_AES_ZERO_PUF_KEY_NOT_ALLOWED)?;
        }

        let desc = lookup(src);
        let allowed = match op {
            AesOperation::Encrypt => desc.encrypt_allowed(),
            AesOperation::Decrypt => desc.decrypt_allowed(),
        };
        if !allowed {
            self.abort();
            return Err(match op {
                AesOperation::Encrypt => CryptoError::DRIVER_AES_KEY_SRC_ENCRYPT_NOT_ALLOWED,
                AesOperation::Decrypt => CryptoError::DRIVER_AES_KEY_SRC_DECRYPT_NOT_ALLOWED,
            });
        }

        let result = self.op_start(op, desc, size, iv);
        self.reset_on_err(result)?;
        self.state = op.session_state();
        Ok(())
    }

    fn op_start(
        &mut self,
        op: AesOperation,
        desc: &KeyDescriptor,
        size: AesKeySize,
        iv: &[u8; AES_BLOCK_SIZE_BYTES],
    ) -> CryptoResult<()> {
        self.release_reset();
        self.aes.mode().write(op.mode());
        self.key_load(desc, size)?;
        self.route()?;

        self.aes.start_msg().write(Trigger::GO::SET);
        self.aes.data_swap().write(DataSwap::SWAP::SET);

        let xfer = DmaTransfer::from_slice(iv, false)?;
        self.dma()?
            .transfer(DmaChannel::Src, &xfer, Endianness::Swapped)
    }

    fn update_aad(
        &mut self,
        expected: AesState,
        progress: &mut SessionProgress,
        aad: &[u8],
    ) -> CryptoResult<()> {
        self.check_state(expected)?;
        let result = self.push_aad(progress, aad);
        self.reset_on_err(result)
    }

    fn gmac_cfg(
        &mut self,
        expected: AesState,
        progress: &mut SessionProgress,
        enable: bool,
    ) -> CryptoResult<()> {
        self.check_state(expected)?;
        progress.gmac = enable;
        Ok(())
    }

    fn push_aad(&mut self, progress: &mut SessionProgress, aad: &[u8]) -> CryptoResult<()> {
        if progress.data_pushed {
            Err(CryptoError::DRIVER_AES_AAD_AFTER_DATA)?;
        }
        if aad.len() % AES_BLOCK_SIZE_BYTES != 0 {
            Err(CryptoError::DRIVER_AES_UNALIGNED_AAD)?;
        }
        let last = progress.gmac;
        if aad.is_empty() && !last {
            return Ok(());
        }

        let xfer = DmaTransfer::from_slice(aad, last)?;
        self.aes.aad().write(Aad::ACTIVE::SET);
        self.dma()?
            .transfer(DmaChannel::Src, &xfer, Endianness::Swapped)?;
        self.aes.aad().write(Aad::ACTIVE::CLEAR);

        if last {
            progress.gmac = false;
            progress.data_pushed = true;
            progress.last_pushed = true;
        }
        Ok(())
    }

    fn update(
        &mut self,
        expected: AesState,
        progress: &mut SessionProgress,
        input: &[u8],
        output: &mut [u8],
        is_last: bool,
    ) -> CryptoResult<()> {
        self.check_state(expected)?;
        let result = self.push_data(progress, input, output, is_last);
        self.reset_on_err(result)
    }

    fn push_data(
        &mut self,
        progress: &mut SessionProgress,
        input: &[u8],
        output: &mut [u8],
        is_last: bool,
    ) -> CryptoResult<()> {
        if progress.last_pushed {
            Err(CryptoError::DRIVER_AES_UPDATE_AFTER_LAST)?;
        }
        if input.len() % memory_layout::WORD_SIZE != 0 {
            Err(CryptoError::DRIVER_AES_UNALIGNED_SIZE)?;
        }
        let output = output
            .get_mut(..input.len())
            .ok_or(CryptoError::DRIVER_AES_INVALID_SLICE)?;

        let src = DmaTransfer::from_slice(input, is_last)?;
        let dst = DmaTransfer::from_mut_slice(output)?;

        // The output channel must be armed before the core starts producing.
        let dma = self.dma()?;
        dma.start(DmaChannel::Dst, &dst, Endianness::Swapped);
        dma.start(DmaChannel::Src, &src, Endianness::Swapped);
        dma.wait_and_ack(DmaChannel::Src)?;
        dma.wait_and_ack(DmaChannel::Dst)?;

        progress.data_pushed = true;
        progress.last_pushed = is_last;
        Ok(())
    }

    fn encrypt_final(
        &mut self,
        progress: &SessionProgress,
        tag: &mut [u8; AES_BLOCK_SIZE_BYTES],
    ) -> CryptoResult<()> {
        self.check_state(AesState::EncryptInitialized)?;

        let result = self.pull_tag(progress, tag);
        let zeroize = self.zero_mask(KeyClear::KUP_KEY | KeyClear::AES_KEY);
        self.abort();
        if let Err(err) = result {
            cprintln!("[aes] encrypt final failed: {}", u32::from(err));
        }
        result.and(zeroize)
    }

    fn pull_tag(
        &mut self,
        progress: &SessionProgress,
        tag: &mut [u8; AES_BLOCK_SIZE_BYTES],
    ) -> CryptoResult<()> {
        if !progress.last_pushed {
            Err(CryptoError::DRIVER_AES_FINAL_BEFORE_LAST)?;
        }

        self.aes.data_swap().write(DataSwap::SWAP::SET);
        let xfer = DmaTransfer::from_mut_slice(tag)?;
        self.dma()?
            .transfer(DmaChannel::Dst, &xfer, Endianness::Swapped)?;
        self.wait_done()
    }

    fn decrypt_final(
        &mut self,
        progress: &SessionProgress,
        tag: &[u8; AES_BLOCK_SIZE_BYTES],
    ) -> CryptoResult<()> {
        self.check_state(AesState::DecryptInitialized)?;

        let result = self.push_tag(progress, tag);

        // A chained key update keeps the saved key and IV for the next block.
        if result.is_ok() && self.kup_chained() {
            self.quiesce();
            return result;
        }
        let zeroize = self.zero_mask(KeyClear::KUP_KEY | KeyClear::AES_KEY);
        self.abort();
        if let Err(err) = result {
            cprintln!("[aes] decrypt final failed: {}", u32::from(err));
        }
        result.and(zeroize)
    }

    fn kup_chained(&self) -> bool {
        self.aes.kup_wr().get() != 0 && self.next_blk_len() != 0
    }

    fn push_tag(
        &mut self,
        progress: &SessionProgress,
        tag: &[u8; AES_BLOCK_SIZE_BYTES],
    ) -> CryptoResult<()> {
        if !progress.last_pushed {
            Err(CryptoError::DRIVER_AES_FINAL_BEFORE_LAST)?;
        }

        self.aes.data_swap().write(DataSwap::SWAP::SET);
        let xfer = DmaTransfer::from_slice(tag, false)?;
        self.dma()?
            .transfer(DmaChannel::Src, &xfer, Endianness::Swapped)?;
        self.wait_done()?;

        // Sampled twice; a single glitched read must not pass a bad tag.
        let first = self.aes.status().is_set(Status::GCM_TAG_PASS);
        let second = self.aes.status().is_set(Status::GCM_TAG_PASS);
        if !first || !second {
            Err(CryptoError::DRIVER_AES_TAG_MISMATCH)?;
        }
        Ok(())
    }

    fn kek_unwrap_start(
        &mut self,
        kek: KekType,
        src: &KeyDescriptor,
        dst_sel: u32,
        iv: &[u8; AES_BLOCK_SIZE_BYTES],
        size: AesKeySize,
    ) -> CryptoResult<()> {
        self.release_reset();
        self.key_load(lookup(kek.kek_source()), size)?;
        self.route()?;

        self.aes.start_msg().write(Trigger::GO::SET);
        self.aes.data_swap().write(DataSwap::SWAP::SET);
        let xfer = DmaTransfer::from_slice(iv, true)?;
        self.dma()?
            .transfer(DmaChannel::Src, &xfer, Endianness::Swapped)?;

        let regs = &self.aes;
        regs.data_swap().write(DataSwap::SWAP::CLEAR);
        regs.key_dec().set(aes::KEY_DEC_ALL);
        regs.key_dec_sel().set(dst_sel);
        regs.key_sel().set(src.select);
        regs.key_dec_trig().write(Trigger::GO::SET);

        wait::until(
            self.poll_limit,
            CryptoError::DRIVER_AES_KEK_DECRYPT_TIMEOUT,
            || regs.status().is_set(Status::BLK_KEY_DEC_DONE),
        )
    }

    fn dpa_cm_encrypt_start(
        &mut self,
        key: &[u8; 32],
        input: &[u8; AES_DPA_CM_DATA_SIZE],
        output: &mut [u8; AES_DPA_CM_DATA_SIZE],
    ) -> CryptoResult<()> {
        self.release_reset();

        self.aes.mode().write(Mode::ENC_DEC::Encrypt);
        self.aes
            .split_cfg()
            .write(SplitCfg::DATA_SPLIT::SET + SplitCfg::KEY_SPLIT::SET);
        self.write_cm(true)?;
        for i in 0..aes::KEY_MASK_WORDS as u32 {
            self.aes.key_mask(i).set(0);
        }

        let desc = lookup(KeySource::User7);
        let reg = desc
            .key_reg
            .ok_or(CryptoError::DRIVER_AES_KEY_SRC_NOT_WRITABLE)?;
        self.write_key_words(reg, key);
        self.key_load(desc, AesKeySize::Bits256)?;
        self.route()?;

        self.aes.start_msg().write(Trigger::GO::SET);
        self.aes.data_swap().write(DataSwap::SWAP::SET);

        let src = DmaTransfer::from_slice(input, true)?;
        let dst = DmaTransfer::from_mut_slice(output)?;
        let dma = self.dma()?;
        dma.start(DmaChannel::Dst, &dst, Endianness::Swapped);
        dma.start(DmaChannel::Src, &src, Endianness::Swapped);
        dma.wait_and_ack(DmaChannel::Src)?;
        dma.wait_and_ack(DmaChannel::Dst)?;
        self.wait_done()
    }

    fn write_key_words(&self, window: u32, key: &[u8]) {
        let words = key.len() / memory_layout::WORD_SIZE;
        for (i, word) in key.chunks_exact(memory_layout::WORD_SIZE).enumerate() {
            let val = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
            self.aes.key_word(window, (words - 1 - i) as u32).set(val);
        }
    }

    fn key_load(&self, desc: &KeyDescriptor, size: AesKeySize) -> CryptoResult<()> {
        let regs = &self.aes;
        regs.key_size().write(size.reg_value());
        regs.key_sel().set(desc.select);
        regs.key_load().write(Trigger::GO::SET);

        wait::until(
            self.poll_limit,
            CryptoError::DRIVER_AES_KEY_LOAD_TIMEOUT,
            || regs.status().is_set(Status::KEY_INIT_DONE),
        )
    }

    fn write_cm(&self, enable: bool) -> CryptoResult<()> {
        self.aes.cm_en().write(CmEn::ENABLE.val(u32::from(enable)));
        if self.aes.status().is_set(Status::CM_ENABLED) != enable {
            cprintln!("[aes] DPA countermeasure not accepted");
            Err(CryptoError::DRIVER_AES_DPA_CM_MISMATCH)?;
        }
        Ok(())
    }

    /// Zeroization is ignored while the core is held in reset, so a core
    /// found in reset is released for the request and put back afterwards.
    /// KEY_CLEAR is returned to zero whether or not the request completed.
    fn zero_mask(&self, mask: KeyClear) -> CryptoResult<()> {
        let regs = &self.aes;
        let in_reset = regs.soft_rst().is_set(SoftRst::RESET);
        if in_reset {
            regs.soft_rst().write(SoftRst::RESET::CLEAR);
        }

        regs.key_clear().set(mask.bits());
        let result = wait::until(
            self.poll_limit,
            CryptoError::DRIVER_AES_KEY_CLEAR_FAILED,
            || regs.zeroed_keys().contains(mask),
        );
        regs.key_clear().set(0);

        if in_reset {
            regs.soft_rst().write(SoftRst::RESET::SET);
        }
        if result.is_err() {
            cprintln!("[aes] key zeroization not acknowledged");
        }
        result
    }

    fn wait_done(&self) -> CryptoResult<()> {
        let regs = &self.aes;
        wait::until(self.poll_limit, CryptoError::DRIVER_AES_DONE_TIMEOUT, || {
            regs.status().is_set(Status::DONE)
        })
    }

    fn route(&mut self) -> CryptoResult<()> {
        let port = SssEndpoint::from(self.dma()?.id());
        self.sss.route_aes(port, port)
    }

    fn dma(&mut self) -> CryptoResult<&mut Dma<M>> {
        self.dma
            .as_mut()
            .ok_or(CryptoError::DRIVER_AES_INVALID_STATE)
    }

    fn release_reset(&self) {
        self.aes.soft_rst().write(SoftRst::RESET::SET);
        self.aes.soft_rst().write(SoftRst::RESET::CLEAR);
    }

    /// Put the core in reset, quiesce the DMA and drop any session.
    fn abort(&mut self) {
        self.quiesce();
        self.aes.soft_rst().write(SoftRst::RESET::SET);
    }

    /// Quiesce the DMA and drop any session, leaving the core out of reset.
    fn quiesce(&mut self) {
        self.aes.data_swap().write(DataSwap::SWAP::CLEAR);

        if let Some(dma) = self.dma.as_mut() {
            for channel in [DmaChannel::Src, DmaChannel::Dst] {
                dma.clear_interrupt(channel);
                dma.configure_endian_swap(channel, Endianness::Native);
            }
        }
        if self.state != AesState::Uninitialized {
            self.state = AesState::Initialized;
        }
    }

    fn reset_on_err<T>(&mut self, result: CryptoResult<T>) -> CryptoResult<T> {
        if let Err(err) = &result {
            cprintln!("[aes] failed, resetting core: {}", u32::from(*err));
            self.abort();
        }
        result
    }

    fn check_state(&self, expected: AesState) -> CryptoResult<()> {
        if self.state != expected {
            Err(CryptoError::DRIVER_AES_INVALID_STATE)?;
        }
        Ok(())
    }

    fn check_ready(&self) -> CryptoResult<()> {
        if self.state == AesState::Uninitialized {
            Err(CryptoError::DRIVER_AES_INVALID_STATE)?;
        }
        Ok(())
    }

    fn check_not_busy(&self) -> CryptoResult<()> {
        match self.state {
            AesState::EncryptInitialized | AesState::DecryptInitialized => {
                Err(CryptoError::DRIVER_AES_INVALID_STATE)
            }
            _ => Ok(()),
        }
    }
}

/// AES-GCM encrypt session.
///
/// Holds the engine for its lifetime. Dropping the session without
/// `finalize` leaves the engine in `EncryptInitialized` until
/// [`Aes::soft_reset`].
pub struct AesGcmEncryptOp<'a, M: Mmio> {
    aes: &'a mut Aes<M>,
    progress: SessionProgress,
}

impl<M: Mmio> AesGcmEncryptOp<'_, M> {
    /// Compute a GMAC over the AAD alone.
    ///
    /// When enabled, the next `update_aad` ends the message and `finalize`
    /// returns the authentication tag of that AAD; `update` is then rejected.
    pub fn gmac_cfg(&mut self, enable: bool) -> CryptoResult<()> {
        self.aes
            .gmac_cfg(AesState::EncryptInitialized, &mut self.progress, enable)
    }

    /// Push additional authenticated data. Must precede `update`.
    ///
    /// # Arguments
    ///
    /// * `aad` - AAD, a whole number of blocks
    pub fn update_aad(&mut self, aad: &[u8]) -> CryptoResult<()> {
        self.aes
            .update_aad(AesState::EncryptInitialized, &mut self.progress, aad)
    }

    /// Encrypt `input` into the front of `output`.
    ///
    /// # Arguments
    ///
    /// * `input` - Plaintext chunk, a whole number of words
    /// * `output` - Ciphertext, at least as long as `input`
    /// * `is_last` - Marks the final chunk of the message
    pub fn update(&mut self, input: &[u8], output: &mut [u8], is_last: bool) -> CryptoResult<()> {
        self.aes.update(
            AesState::EncryptInitialized,
            &mut self.progress,
            input,
            output,
            is_last,
        )
    }

    /// Fetch the tag and end the session. The core is reset and the KUP key
    /// and expanded round keys are zeroized.
    pub fn finalize(self, tag: &mut [u8; AES_BLOCK_SIZE_BYTES]) -> CryptoResult<()> {
        self.aes.encrypt_final(&self.progress, tag)
    }
}

/// AES-GCM decrypt session.
pub struct AesGcmDecryptOp<'a, M: Mmio> {
    aes: &'a mut Aes<M>,
    progress: SessionProgress,
}

impl<M: Mmio> AesGcmDecryptOp<'_, M> {
    /// Verify a GMAC over the AAD alone. See [`AesGcmEncryptOp::gmac_cfg`].
    pub fn gmac_cfg(&mut self, enable: bool) -> CryptoResult<()> {
        self.aes
            .gmac_cfg(AesState::DecryptInitialized, &mut self.progress, enable)
    }

    /// Push additional authenticated data. Must precede `update`.
    pub fn update_aad(&mut self, aad: &[u8]) -> CryptoResult<()> {
        self.aes
            .update_aad(AesState::DecryptInitialized, &mut self.progress, aad)
    }

    /// Decrypt `input` into the front of `output`.
    pub fn update(&mut self, input: &[u8], output: &mut [u8], is_last: bool) -> CryptoResult<()> {
        self.aes.update(
            AesState::DecryptInitialized,
            &mut self.progress,
            input,
            output,
            is_last,
        )
    }

    /// Verify `tag` and end the session. The core is reset and the KUP key
    /// and expanded round keys are zeroized, unless a key update saved a
    /// non-zero next block length for a chained session.
    ///
    /// # Returns
    ///
    /// * `DRIVER_AES_TAG_MISMATCH` - Authentication failed; discard the plaintext
    pub fn finalize(self, tag: &[u8; AES_BLOCK_SIZE_BYTES]) -> CryptoResult<()> {
        self.aes.decrypt_final(&self.progress, tag)
    }
}
