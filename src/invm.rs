use crate::Nvm;
use crate::error::Error;
use crate::platform::Platform;
use crate::raw::{
    INVM_CSR_AUTOLOAD_DATA_SIZE_IN_DWORDS, INVM_MAJOR_MASK, INVM_MAJOR_SHIFT, INVM_MINOR_MASK,
    INVM_RSA_KEY_SHA256_DATA_SIZE_IN_DWORDS, INVM_SIZE, NVM_INIT_CTRL_2, NVM_INIT_CTRL_2_DEFAULT,
    NVM_INIT_CTRL_4, NVM_INIT_CTRL_4_DEFAULT, NVM_LED_0_2_CFG, NVM_LED_0_2_CFG_DEFAULT,
    NVM_LED_1_CFG, NVM_LED_1_CFG_DEFAULT, NVM_VERSION, invm_data_reg, invm_record_type,
    invm_word_address, invm_word_data,
};
use core::fmt;

/// Record tag in the low 3 bits of each iNVM dword.
///
/// `Uninitialized` and `Invalidated` terminate a scan; `CsrAutoload` and `RsaKey` carry
/// payload dwords after the header that must be skipped. Invalidated records are encoded
/// 0xF in the image with the high bit landing in reserved space, so they read back as 0x7
/// in the tag field.
#[derive(strum::FromRepr, strum::Display, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum InvmRecordType {
    Uninitialized = 0x00,
    WordAutoload = 0x01,
    CsrAutoload = 0x02,
    PhyAutoload = 0x03,
    RsaKey = 0x04,
    Invalidated = 0x07,
}

/// Firmware version decoded from the iNVM image, recomputed on every query.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FwVersion {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for FwVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

struct WordAutoload {
    word_address: u8,
    data: u16,
}

/// Bounded scan over the iNVM image yielding word-autoload records.
///
/// Skips the payload dwords of CSR-autoload and RSA-key records, stops at the first
/// uninitialized or invalidated record, and never advances past the image window even on
/// a corrupt, never-terminated image.
struct WordAutoloads<'a, T: Platform> {
    hal: &'a mut T,
    index: usize,
}

impl<'a, T: Platform> WordAutoloads<'a, T> {
    fn new(hal: &'a mut T) -> Self {
        Self { hal, index: 0 }
    }
}

impl<T: Platform> Iterator for WordAutoloads<'_, T> {
    type Item = WordAutoload;

    fn next(&mut self) -> Option<WordAutoload> {
        while self.index < INVM_SIZE {
            let dword = self.hal.read_reg(invm_data_reg(self.index));
            self.index += 1;

            let Some(record_type) = InvmRecordType::from_repr(invm_record_type(dword)) else {
                // Reserved tag, not a terminator.
                continue;
            };

            match record_type {
                InvmRecordType::Uninitialized | InvmRecordType::Invalidated => return None,
                InvmRecordType::WordAutoload => {
                    return Some(WordAutoload {
                        word_address: invm_word_address(dword),
                        data: invm_word_data(dword),
                    });
                }
                InvmRecordType::CsrAutoload => {
                    self.index += INVM_CSR_AUTOLOAD_DATA_SIZE_IN_DWORDS;
                }
                InvmRecordType::RsaKey => {
                    self.index += INVM_RSA_KEY_SHA256_DATA_SIZE_IN_DWORDS;
                }
                InvmRecordType::PhyAutoload => {}
            }
        }

        None
    }
}

impl<T: Platform> Nvm<T> {
    /// Decodes the firmware version from the iNVM image.
    ///
    /// The iNVM plane is read-only-mapped independently of the shared flash arbitration,
    /// so no sync agents are needed. Fails with [`Error::VersionNotFound`] if no
    /// version-carrying record appears before the scan terminates.
    pub fn read_firmware_version(&mut self) -> Result<FwVersion, Error> {
        let version = WordAutoloads::new(&mut self.hal)
            .find(|record| u16::from(record.word_address) == NVM_VERSION)
            .ok_or(Error::VersionNotFound)?
            .data;

        Ok(FwVersion {
            major: ((version & INVM_MAJOR_MASK) >> INVM_MAJOR_SHIFT) as u8,
            minor: (version & INVM_MINOR_MASK) as u8,
        })
    }

    /// Looks up the autoload value for NVM word `address` in the iNVM image.
    ///
    /// When the image carries no record for the word, falls back to the flash word store
    /// if one is present, and otherwise to the documented power-up defaults of the
    /// flashless i211 for the handful of words that have them.
    pub fn read_invm_word(&mut self, address: u16) -> Result<u16, Error> {
        if let Some(record) = WordAutoloads::new(&mut self.hal)
            .find(|record| u16::from(record.word_address) == address)
        {
            return Ok(record.data);
        }

        if self.flash_present {
            let mut word = [0];
            self.read_words(address, &mut word)?;
            return Ok(word[0]);
        }

        match address {
            NVM_INIT_CTRL_2 => Ok(NVM_INIT_CTRL_2_DEFAULT),
            NVM_INIT_CTRL_4 => Ok(NVM_INIT_CTRL_4_DEFAULT),
            NVM_LED_1_CFG => Ok(NVM_LED_1_CFG_DEFAULT),
            NVM_LED_0_2_CFG => Ok(NVM_LED_0_2_CFG_DEFAULT),
            _ => Err(Error::VersionNotFound),
        }
    }
}
