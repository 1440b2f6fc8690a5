#![doc = include_str ! ("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

pub mod error;
pub mod platform;

mod checksum;
mod flash;
mod invm;
mod raw;
mod sync;

pub use invm::{FwVersion, InvmRecordType};
pub use raw::{SWFW_EEP_SM, SWFW_PHY_SM};

use crate::platform::Platform;
use crate::raw::{
    EECD, EECD_FLASH_DETECTED, EECD_SIZE_EX_MASK, EECD_SIZE_EX_SHIFT, NVM_WORD_SIZE_BASE_SHIFT,
    NVM_WORD_SIZE_MAX_SHIFT,
};

/// Owned handle to the NVM block of one controller.
///
/// All operations go through this handle by exclusive borrow; one logical transaction
/// (acquire, read/write sequence, commit, release) owns the device at a time. The handle
/// tracks which sync agents it holds, so mutating operations can reject callers that
/// skipped [`Nvm::acquire`].
pub struct Nvm<T: Platform> {
    pub(crate) hal: T,
    pub(crate) word_size: u16,
    pub(crate) flash_present: bool,
    pub(crate) held_mask: u16,
    pub(crate) clear_semaphore_once: bool,
}

impl<T: Platform> Nvm<T> {
    /// Creates a handle and probes the device geometry: flash presence and the size of the
    /// word store, both reported by the EECD register.
    ///
    /// The probe is read-only and needs no synchronization; nothing is written to the
    /// device until the first mutating operation.
    pub fn new(hal: T) -> Nvm<T> {
        let mut nvm = Nvm {
            hal,
            word_size: 0,
            flash_present: false,
            held_mask: 0,
            clear_semaphore_once: true,
        };

        let eecd = nvm.hal.read_reg(EECD);
        nvm.flash_present = eecd & EECD_FLASH_DETECTED != 0;

        let mut size =
            ((eecd & EECD_SIZE_EX_MASK) >> EECD_SIZE_EX_SHIFT) as u16 + NVM_WORD_SIZE_BASE_SHIFT;
        if size > NVM_WORD_SIZE_MAX_SHIFT {
            size = NVM_WORD_SIZE_MAX_SHIFT;
        }
        nvm.word_size = 1 << size;

        nvm
    }

    /// Whether the device has populated flash behind the shadow RAM. Flashless parts
    /// (i211) answer word-store operations with [`Error::NotReady`](error::Error::NotReady)
    /// and serve their configuration from the iNVM plane instead.
    pub fn flash_present(&self) -> bool {
        self.flash_present
    }

    /// Capacity of the word store in 16-bit words.
    pub fn word_size(&self) -> u16 {
        self.word_size
    }
}
