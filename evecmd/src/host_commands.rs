use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Represents a "host command".
///
/// Host commands are a low-level mechanism for controlling the power state
/// and the system clock of the EVE chip, sent as a command byte, a parameter
/// byte and a padding byte. This is not the same thing as a coprocessor
/// command; those go through the command FIFO owned by
/// [`Coprocessor`](crate::commands::Coprocessor).
#[derive(TryFromPrimitive, IntoPrimitive, Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
#[allow(non_camel_case_types)]
pub enum HostCmd {
    ACTIVE = 0x00,
    STANDBY = 0x41,
    SLEEP = 0x42,
    PWRDOWN = 0x43,
    CLKEXT = 0x44,
    CLKINT = 0x48,
    CLKSEL = 0x61,
    RST_PULSE = 0x68,
    PINDRIVE = 0x70,
    PIN_PD_STATE = 0x71,
}

impl HostCmd {
    pub const fn to_raw(self) -> u8 {
        self as u8
    }
}
