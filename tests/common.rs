#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use i210_nvm::platform::{Delay, Registers};

// Register offsets and bits as documented in the i210 programming reference.
pub const EECD: usize = 0x00010;
pub const EERD: usize = 0x00014;
pub const SWSM: usize = 0x05B50;
pub const SW_FW_SYNC: usize = 0x05B5C;
pub const SRWR: usize = 0x12018;
pub const INVM_DATA: usize = 0x12120;
pub const INVM_SIZE: usize = 64;

pub const WORDS: usize = 64;

const EECD_FLASH_DETECTED: u32 = 0x0008_0000;
const EECD_FLUPD: u32 = 0x0080_0000;
const EECD_FLUDONE: u32 = 0x0400_0000;

const SWSM_SMBI: u32 = 0x1;
const SWSM_SWESMBI: u32 = 0x2;

const RW_START: u32 = 0x1;
const RW_DONE: u32 = 0x2;
const RW_ADDR_SHIFT: u32 = 2;
const RW_DATA_SHIFT: u32 = 16;

/// Register-accurate model of the controller's NVM block: shadow RAM in front of a
/// durable flash image, the read-to-set SMBI mutex, the SW_FW_SYNC word, and the iNVM
/// dword window. A firmware agent can be simulated by pinning semaphore bits.
pub struct SimDevice {
    /// Word store working copy; EERD reads and SRWR writes land here.
    pub shadow: Vec<u16>,
    /// Durable image; only a FLUPD cycle copies the shadow into it.
    pub flash: Vec<u16>,
    pub invm: [u32; INVM_SIZE],
    pub flash_present: bool,

    /// SW_FW_SYNC bits pinned by a simulated firmware agent (never writable by software).
    pub firmware_mask: u32,
    /// Firmware never lets go of the SMBI mutex.
    pub firmware_smbi: bool,
    /// Firmware holds SWESMBI, so the software latch never sticks.
    pub firmware_swesmbi: bool,

    pub smbi_taken: bool,
    pub swesmbi: bool,
    pub swfw_sync: u32,

    eerd_latch: u32,
    srwr_latch: u32,

    /// Word commands and commits stop completing once this many are on the log.
    pub fail_after_operation: usize,
    pub operations: Vec<Operation>,
    pub commit_count: usize,
    /// Simulated time spent in delay_us, for asserting that retry loops are bounded.
    pub delays_us: u64,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    SrRead { offset: u16 },
    SrWrite { offset: u16, data: u16 },
    Commit,
}

impl SimDevice {
    pub fn new() -> Self {
        Self {
            shadow: vec![0u16; WORDS],
            flash: vec![0u16; WORDS],
            invm: [0u32; INVM_SIZE],
            flash_present: true,
            firmware_mask: 0,
            firmware_smbi: false,
            firmware_swesmbi: false,
            smbi_taken: false,
            swesmbi: false,
            swfw_sync: 0,
            eerd_latch: 0,
            srwr_latch: 0,
            fail_after_operation: usize::MAX,
            operations: Vec::new(),
            commit_count: 0,
            delays_us: 0,
        }
    }

    pub fn new_without_flash() -> Self {
        Self {
            flash_present: false,
            ..Self::new()
        }
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    /// Drops all volatile state and auto-loads the shadow RAM from the durable image.
    pub fn power_cycle(&mut self) {
        self.shadow = self.flash.clone();
        self.smbi_taken = false;
        self.swesmbi = false;
        self.swfw_sync = 0;
        self.eerd_latch = 0;
        self.srwr_latch = 0;
    }

    fn faulted(&self) -> bool {
        self.operations.len() >= self.fail_after_operation
    }
}

impl Registers for SimDevice {
    fn read_reg(&mut self, reg: usize) -> u32 {
        match reg {
            EECD => {
                // Size field zero: 1 << 6 = 64 words.
                let mut v = 0;
                if self.flash_present {
                    v |= EECD_FLASH_DETECTED;
                }
                if !self.faulted() {
                    v |= EECD_FLUDONE;
                }
                v
            }
            EERD => self.eerd_latch,
            SRWR => self.srwr_latch,
            SWSM => {
                let mut v = 0;
                if self.firmware_smbi || self.smbi_taken {
                    v |= SWSM_SMBI;
                } else {
                    // Hardware mutex: the read that sees the bit clear takes it.
                    self.smbi_taken = true;
                }
                if self.swesmbi {
                    v |= SWSM_SWESMBI;
                }
                v
            }
            SW_FW_SYNC => self.swfw_sync | self.firmware_mask,
            r if (INVM_DATA..INVM_DATA + 4 * INVM_SIZE).contains(&r) => {
                self.invm[(r - INVM_DATA) / 4]
            }
            _ => 0,
        }
    }

    fn write_reg(&mut self, reg: usize, value: u32) {
        match reg {
            EECD => {
                if value & EECD_FLUPD != 0 && !self.faulted() {
                    self.flash = self.shadow.clone();
                    self.commit_count += 1;
                    self.operations.push(Operation::Commit);
                }
            }
            EERD => {
                if value & RW_START != 0 {
                    let offset = ((value >> RW_ADDR_SHIFT) & 0x3FFF) as usize;
                    if self.faulted() {
                        self.eerd_latch = 0;
                        return;
                    }
                    self.operations.push(Operation::SrRead {
                        offset: offset as u16,
                    });
                    let word = self.shadow.get(offset).copied().unwrap_or(0xFFFF);
                    self.eerd_latch = (u32::from(word) << RW_DATA_SHIFT) | RW_DONE;
                }
            }
            SRWR => {
                if value & RW_START != 0 {
                    let offset = ((value >> RW_ADDR_SHIFT) & 0x3FFF) as usize;
                    let data = (value >> RW_DATA_SHIFT) as u16;
                    if self.faulted() {
                        self.srwr_latch = 0;
                        return;
                    }
                    self.operations.push(Operation::SrWrite {
                        offset: offset as u16,
                        data,
                    });
                    if let Some(slot) = self.shadow.get_mut(offset) {
                        *slot = data;
                    }
                    self.srwr_latch = RW_DONE;
                }
            }
            SWSM => {
                if value & SWSM_SMBI == 0 {
                    self.smbi_taken = false;
                }
                if value & SWSM_SWESMBI == 0 {
                    self.swesmbi = false;
                } else if !self.firmware_swesmbi {
                    self.swesmbi = true;
                }
            }
            SW_FW_SYNC => {
                // Firmware-owned bits are not writable from the software side.
                self.swfw_sync = value & !self.firmware_mask;
            }
            _ => {}
        }
    }
}

impl Delay for SimDevice {
    fn delay_us(&mut self, us: u32) {
        self.delays_us += u64::from(us);
    }
}

/// Encodes a word-autoload iNVM record: 16-bit data, 7-bit word address, tag 0x1.
pub fn word_autoload(address: u8, data: u16) -> u32 {
    (u32::from(data) << 16) | (u32::from(address & 0x7F) << 9) | 0x1
}

/// Sets the word at the checksum offset so the image sums to the required constant,
/// in both the shadow RAM and the durable copy.
pub fn fix_checksum(dev: &mut SimDevice) {
    let sum = dev.shadow[..0x3F]
        .iter()
        .fold(0u16, |acc, &word| acc.wrapping_add(word));
    dev.shadow[0x3F] = 0xBABAu16.wrapping_sub(sum);
    dev.flash = dev.shadow.clone();
}
