use crate::Nvm;
use crate::error::Error;
use crate::platform::Platform;
use crate::raw::{NVM_CHECKSUM_REG, NVM_SUM};
#[cfg(feature = "defmt")]
use defmt::warn;

impl<T: Platform> Nvm<T> {
    /// Calculates the checksum by reading and adding each word of the checksummed range,
    /// including the checksum word itself, and verifies the sum equals the required
    /// constant.
    ///
    /// Run this after any multi-word update and before trusting configuration derived
    /// from the word store (MAC address, LED defaults, init control words).
    pub fn validate_checksum(&mut self) -> Result<(), Error> {
        let mut checksum = 0u16;

        for i in 0..=NVM_CHECKSUM_REG {
            let mut nvm_data = [0];
            self.read_words(i, &mut nvm_data)?;
            checksum = checksum.wrapping_add(nvm_data[0]);
        }

        if checksum != NVM_SUM {
            #[cfg(feature = "defmt")]
            warn!("nvm checksum invalid");
            return Err(Error::ChecksumMismatch);
        }

        Ok(())
    }

    /// Recomputes the checksum word so the range sums to the required constant again,
    /// writes it, and commits the result to flash.
    ///
    /// Needs [`SWFW_EEP_SM`](crate::SWFW_EEP_SM) held for the write and commit legs; read,
    /// write and commit errors all propagate unchanged.
    pub fn update_checksum(&mut self) -> Result<(), Error> {
        #[cfg(feature = "debug-logs")]
        println!("checksum: update");

        // Confirm a word read completes before summing, so a device that never finished
        // its auto-load surfaces as an error here and not as a bogus checksum.
        let mut nvm_data = [0];
        self.read_words(0, &mut nvm_data)?;

        let mut checksum = 0u16;
        for i in 0..NVM_CHECKSUM_REG {
            self.read_words(i, &mut nvm_data)?;
            checksum = checksum.wrapping_add(nvm_data[0]);
        }

        let checksum = NVM_SUM.wrapping_sub(checksum);
        self.write_words(NVM_CHECKSUM_REG, &[checksum])?;

        self.commit()
    }
}
