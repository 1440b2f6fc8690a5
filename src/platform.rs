/// See README.md for an example implementation.
pub trait Platform: Registers + Delay {}

impl<T: Registers + Delay> Platform for T {}

/// 32-bit access to the controller's memory-mapped register file (BAR0).
///
/// `reg` is a byte offset into the mapping. Reads and writes are expected to be volatile
/// and must not be reordered or coalesced; the word-access and semaphore protocols depend
/// on every single access reaching the device.
pub trait Registers {
    fn read_reg(&mut self, reg: usize) -> u32;
    fn write_reg(&mut self, reg: usize, value: u32);
}

/// Busy-wait for at least `us` microseconds between polls of a device status bit.
pub trait Delay {
    fn delay_us(&mut self, us: u32);
}

impl<T: Registers> Registers for &mut T {
    fn read_reg(&mut self, reg: usize) -> u32 {
        (**self).read_reg(reg)
    }

    fn write_reg(&mut self, reg: usize, value: u32) {
        (**self).write_reg(reg, value)
    }
}

impl<T: Delay> Delay for &mut T {
    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
