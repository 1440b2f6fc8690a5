use crate::Nvm;
use crate::error::Error;
use crate::platform::Platform;
use crate::raw::{
    EECD, EECD_FLUDONE, EECD_FLUPD, EERD, FLUDONE_ATTEMPTS, NVM_POLL_ATTEMPTS, NVM_POLL_DELAY_US,
    NVM_RW_ADDR_SHIFT, NVM_RW_REG_DATA, NVM_RW_REG_DONE, NVM_RW_REG_START, SRWR, SWFW_EEP_SM,
};
#[cfg(feature = "defmt")]
use defmt::trace;

impl<T: Platform> Nvm<T> {
    /// Reads `data.len()` consecutive 16-bit words starting at `offset` through the EERD
    /// register, one confirmed request at a time.
    ///
    /// Reads see the shadow RAM, which reflects staged writes of the current session; only
    /// a [`commit`](Nvm::commit) makes staged words durable. The read path does not need
    /// the sync agents held.
    pub fn read_words(&mut self, offset: u16, data: &mut [u16]) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("read_words: @{=u16:#x}[{=usize}]", offset, data.len());

        self.check_bounds(offset, data.len())?;
        if !self.flash_present {
            return Err(Error::NotReady);
        }

        for (i, word) in data.iter_mut().enumerate() {
            let eerd =
                (u32::from(offset + i as u16) << NVM_RW_ADDR_SHIFT) | NVM_RW_REG_START;
            self.hal.write_reg(EERD, eerd);
            self.poll_rw_done(EERD)?;

            *word = (self.hal.read_reg(EERD) >> NVM_RW_REG_DATA) as u16;
        }

        Ok(())
    }

    /// Stages `data` into shadow RAM at `offset` through the SRWR register.
    ///
    /// Requires [`SWFW_EEP_SM`](crate::SWFW_EEP_SM) held, since the shadow RAM write port
    /// is shared with firmware. Each word command is polled to completion before the next
    /// one is issued; the flash controller is serial and does not pipeline.
    ///
    /// Staged words are volatile until a [`commit`](Nvm::commit) succeeds.
    pub fn write_words(&mut self, offset: u16, data: &[u16]) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("write_words: @{=u16:#x}[{=usize}]", offset, data.len());

        #[cfg(feature = "debug-logs")]
        println!("flash: write_words @{offset:#06x}[{}]", data.len());

        if self.held_mask & SWFW_EEP_SM == 0 {
            return Err(Error::Locked);
        }
        self.check_bounds(offset, data.len())?;
        if !self.flash_present {
            return Err(Error::NotReady);
        }

        for (i, &word) in data.iter().enumerate() {
            let srwr = (u32::from(offset + i as u16) << NVM_RW_ADDR_SHIFT)
                | (u32::from(word) << NVM_RW_REG_DATA)
                | NVM_RW_REG_START;
            self.hal.write_reg(SRWR, srwr);
            self.poll_rw_done(SRWR)?;
        }

        Ok(())
    }

    /// Issues the sector erase-and-program cycle that copies the accumulated shadow RAM
    /// state into durable flash.
    ///
    /// This is the single point of durability for the word store. A timeout here leaves
    /// the durable image either untouched or checksum-invalid; callers should re-run
    /// [`validate_checksum`](Nvm::validate_checksum) before trusting it again.
    pub fn commit(&mut self) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("commit");

        #[cfg(feature = "debug-logs")]
        println!("flash: commit");

        if self.held_mask & SWFW_EEP_SM == 0 {
            return Err(Error::Locked);
        }
        if !self.flash_present {
            return Err(Error::NotReady);
        }

        // A previous cycle may still be draining.
        self.poll_flash_update_done()?;

        let eecd = self.hal.read_reg(EECD);
        self.hal.write_reg(EECD, eecd | EECD_FLUPD);

        self.poll_flash_update_done()
    }

    // A check for invalid values: offset too large, too many words for the offset,
    // and not enough words.
    fn check_bounds(&self, offset: u16, words: usize) -> Result<(), Error> {
        if offset >= self.word_size
            || words > usize::from(self.word_size - offset)
            || words == 0
        {
            return Err(Error::OutOfRange);
        }
        Ok(())
    }

    /// Polls the DONE bit of a word read/write request register.
    fn poll_rw_done(&mut self, reg: usize) -> Result<(), Error> {
        for _ in 0..NVM_POLL_ATTEMPTS {
            if self.hal.read_reg(reg) & NVM_RW_REG_DONE != 0 {
                return Ok(());
            }
            self.hal.delay_us(NVM_POLL_DELAY_US);
        }

        Err(Error::Timeout)
    }

    fn poll_flash_update_done(&mut self) -> Result<(), Error> {
        for _ in 0..FLUDONE_ATTEMPTS {
            if self.hal.read_reg(EECD) & EECD_FLUDONE != 0 {
                return Ok(());
            }
            self.hal.delay_us(NVM_POLL_DELAY_US);
        }

        Err(Error::Timeout)
    }
}
