use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Represents a register within the register file of an EVE device.
///
/// The discriminant of each variant is the register's offset from the base
/// of the register memory on the FT81x and BT81x generations. Older models
/// place some registers elsewhere, so use
/// [`Model::register`](crate::models::Model::register) to find the real
/// address on a particular model.
#[derive(TryFromPrimitive, IntoPrimitive, Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum Register {
    CMD_DL = 0x100,
    CMD_READ = 0xf8,
    CMD_WRITE = 0xfc,
    CMDB_SPACE = 0x574,
    CMDB_WRITE = 0x578,
    COPRO_PATCH_PTR = 0x7162,
    CPURESET = 0x20,
    FLASH_STATUS = 0x5f0,
    FREQUENCY = 0x0c,
    ID = 0x00,
    PCLK = 0x70,
}

impl Register {
    /// The offset of the register relative to the FT81x-family register
    /// memory base address.
    pub const fn offset(self) -> u32 {
        self as u16 as u32
    }
}
