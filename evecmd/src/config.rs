//! Configuration types for bring-up and for the coprocessor engine.
//!
//! The types in this module are used as arguments for some of the methods
//! of [`EVE`](super::EVE) and [`Coprocessor`](crate::commands::Coprocessor).

/// The largest chunk the bulk transfer protocol sends between drain waits.
pub const DEFAULT_CHUNK_MAX: u32 = 3840;

/// Flash programming needs each chunk to be a whole number of 256-byte
/// flash blocks.
pub const DEFAULT_FLASH_ALIGN: u32 = 256;

/// Where the system clock comes from: the chip's own oscillator, or a
/// crystal on the board.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    Internal,
    External,
}

/// The system clock frequency, set with the `CLKSEL` host command.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockFrequency {
    F24MHz,
    F36MHz,
    F48MHz,
    F60MHz,
    F72MHz,
}

impl ClockFrequency {
    pub const DEFAULT_SYSCLK_FREQ: Self = Self::F60MHz;

    /// The parameter byte for the `CLKSEL` host command.
    pub const fn cmd_clksel_args(self) -> u8 {
        match self {
            ClockFrequency::F24MHz => 2,
            ClockFrequency::F36MHz => 3,
            ClockFrequency::F48MHz => 4,
            // The FT80x only knows the default, which is selected by zero.
            ClockFrequency::F60MHz => 0,
            ClockFrequency::F72MHz => 6,
        }
    }
}

/// Bounds on the polling loops that wait for the chip to boot.
///
/// These are iteration counts with a fixed delay between iterations, not
/// wall-clock deadlines.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BootConfig {
    pub chip_id_polls: u32,
    pub reset_polls: u32,
    pub poll_delay_ms: u32,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            chip_id_polls: 400,
            reset_polls: 50,
            poll_delay_ms: 1,
        }
    }
}

/// Tunables for [`Coprocessor`](crate::commands::Coprocessor).
///
/// Start from [`Config::default`] and adjust with the chainable setters.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Config {
    chunk_max: u32,
    flash_align: u32,
    recovery_delay_ms: u32,
    flash_init_polls: u32,
    flash_poll_delay_ms: u32,
}

impl Config {
    pub fn new() -> Self {
        core::default::Default::default()
    }

    /// Sets the largest number of payload bytes a bulk transfer sends
    /// before waiting for the coprocessor to drain.
    ///
    /// The value is rounded down to a multiple of four and limited to the
    /// 4092 bytes the command FIFO can hold at once.
    pub fn chunk_max(mut self, v: u32) -> Self {
        self.chunk_max = (v.min(4092) & !3).max(4);
        self
    }

    pub fn flash_align(mut self, v: u32) -> Self {
        self.flash_align = v.max(1);
        self
    }

    /// Sets the pause between restoring the coprocessor patch pointer and
    /// re-attaching the flash during fault recovery.
    pub fn recovery_delay_ms(mut self, v: u32) -> Self {
        self.recovery_delay_ms = v;
        self
    }

    pub fn flash_init_polls(mut self, polls: u32, delay_ms: u32) -> Self {
        self.flash_init_polls = polls;
        self.flash_poll_delay_ms = delay_ms;
        self
    }

    pub fn get_chunk_max(&self) -> u32 {
        self.chunk_max
    }

    pub fn get_flash_align(&self) -> u32 {
        self.flash_align
    }

    pub(crate) fn get_recovery_delay_ms(&self) -> u32 {
        self.recovery_delay_ms
    }

    pub(crate) fn get_flash_init_polls(&self) -> (u32, u32) {
        (self.flash_init_polls, self.flash_poll_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_max: DEFAULT_CHUNK_MAX,
            flash_align: DEFAULT_FLASH_ALIGN,
            recovery_delay_ms: 5,
            flash_init_polls: 100,
            flash_poll_delay_ms: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_max_clamped() {
        assert_eq!(Config::new().get_chunk_max(), 3840);
        assert_eq!(Config::new().chunk_max(1001).get_chunk_max(), 1000);
        assert_eq!(Config::new().chunk_max(100_000).get_chunk_max(), 4092);
        assert_eq!(Config::new().chunk_max(0).get_chunk_max(), 4);
    }

    #[test]
    fn test_clksel() {
        assert_eq!(ClockFrequency::F72MHz.cmd_clksel_args(), 6);
        assert_eq!(ClockFrequency::DEFAULT_SYSCLK_FREQ.cmd_clksel_args(), 0);
    }
}
