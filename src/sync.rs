use crate::Nvm;
use crate::error::Error;
use crate::platform::Platform;
use crate::raw::{
    SEMAPHORE_RETRY_DELAY_US, SW_FW_SYNC, SWFW_FIRMWARE_SHIFT, SWFW_SYNC_ATTEMPTS,
    SWFW_SYNC_RETRY_DELAY_US, SWSM, SWSM_SMBI, SWSM_SWESMBI,
};
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

impl<T: Platform> Nvm<T> {
    /// Claims the requested agent bits in SW_FW_SYNC on behalf of software.
    ///
    /// The NVM device is physically shared with the always-running on-die firmware;
    /// every mutating word-store operation must be bracketed by `acquire`/`release` of
    /// [`SWFW_EEP_SM`](crate::SWFW_EEP_SM). Retries are bounded: if firmware (or another
    /// driver instance) keeps the resource past the budget this fails with
    /// [`Error::Locked`] instead of spinning forever.
    ///
    /// Acquiring a bit this handle already holds is a caller error and also fails with
    /// [`Error::Locked`]; the bit stays held.
    pub fn acquire(&mut self, mask: u16) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("acquire: {=u16:#x}", mask);

        if self.held_mask & mask != 0 {
            return Err(Error::Locked);
        }

        let swmask = u32::from(mask);
        let fwmask = swmask << SWFW_FIRMWARE_SHIFT;

        for _ in 0..SWFW_SYNC_ATTEMPTS {
            self.get_hw_semaphore()?;

            let swfw_sync = self.hal.read_reg(SW_FW_SYNC);
            if swfw_sync & (swmask | fwmask) == 0 {
                self.hal.write_reg(SW_FW_SYNC, swfw_sync | swmask);
                self.put_hw_semaphore();
                self.held_mask |= mask;
                return Ok(());
            }

            // Another agent owns the resource, back off and retry.
            self.put_hw_semaphore();
            self.hal.delay_us(SWFW_SYNC_RETRY_DELAY_US);
        }

        #[cfg(feature = "defmt")]
        warn!("acquire: resource {=u16:#x} still owned by another agent", mask);

        Err(Error::Locked)
    }

    /// Clears exactly the requested agent bits.
    ///
    /// Safe to call on every exit path, including after a failed or partial acquisition;
    /// clearing bits that are already clear is harmless. If the hardware mutex guarding
    /// SW_FW_SYNC never frees within the bound, only the handle's local ownership is
    /// dropped and the register is left alone rather than clobbering bits another agent
    /// may be mid-update on.
    pub fn release(&mut self, mask: u16) {
        #[cfg(feature = "defmt")]
        trace!("release: {=u16:#x}", mask);

        self.held_mask &= !mask;

        if self.get_hw_semaphore().is_err() {
            return;
        }

        let swfw_sync = self.hal.read_reg(SW_FW_SYNC);
        self.hal.write_reg(SW_FW_SYNC, swfw_sync & !u32::from(mask));
        self.put_hw_semaphore();
    }

    /// Runs `f` with `mask` held, releasing on both the success and the error path.
    pub fn with_lock<R>(
        &mut self,
        mask: u16,
        f: impl FnOnce(&mut Self) -> Result<R, Error>,
    ) -> Result<R, Error> {
        self.acquire(mask)?;
        let result = f(self);
        self.release(mask);
        result
    }

    /// Acquire the hardware semaphore guarding SW_FW_SYNC: first the SMBI mutex bit
    /// (set by the device on read), then the SWESMBI software/firmware bit, which only
    /// latches once firmware is not holding it.
    fn get_hw_semaphore(&mut self) -> Result<(), Error> {
        let timeout = u32::from(self.word_size) + 1;

        let mut i = 0;
        while i < timeout {
            if self.hal.read_reg(SWSM) & SWSM_SMBI == 0 {
                break;
            }
            self.hal.delay_us(SEMAPHORE_RETRY_DELAY_US);
            i += 1;
        }

        if i == timeout {
            // In rare circumstances the semaphore may be held over from a previous
            // session. Clear it once before giving up.
            if self.clear_semaphore_once {
                self.clear_semaphore_once = false;
                self.put_hw_semaphore();

                i = 0;
                while i < timeout {
                    if self.hal.read_reg(SWSM) & SWSM_SMBI == 0 {
                        break;
                    }
                    self.hal.delay_us(SEMAPHORE_RETRY_DELAY_US);
                    i += 1;
                }
            }

            if i == timeout {
                #[cfg(feature = "defmt")]
                warn!("hardware mutex unavailable, SMBI stays set");
                return Err(Error::Locked);
            }
        }

        // Latch the SW/FW semaphore bit; acquired once it reads back set.
        i = 0;
        while i < timeout {
            let swsm = self.hal.read_reg(SWSM);
            self.hal.write_reg(SWSM, swsm | SWSM_SWESMBI);

            if self.hal.read_reg(SWSM) & SWSM_SWESMBI != 0 {
                break;
            }
            self.hal.delay_us(SEMAPHORE_RETRY_DELAY_US);
            i += 1;
        }

        if i == timeout {
            self.put_hw_semaphore();
            return Err(Error::Locked);
        }

        Ok(())
    }

    /// Release the hardware semaphore by dropping both SMBI and SWESMBI.
    fn put_hw_semaphore(&mut self) {
        let swsm = self.hal.read_reg(SWSM);
        self.hal.write_reg(SWSM, swsm & !(SWSM_SMBI | SWSM_SWESMBI));
    }
}
