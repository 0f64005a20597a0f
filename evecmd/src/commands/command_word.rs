/// One 32-bit word of a command record.
///
/// Coprocessor commands that take coordinates or small option values put
/// two 16-bit halves in one argument word, the first value in the low half.
/// `CommandWord::from((x, y))` does that packing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CommandWord(u32);

impl CommandWord {
    const fn pack(lo: u16, hi: u16) -> Self {
        CommandWord(lo as u32 | (hi as u32) << 16)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for CommandWord {
    #[inline]
    fn from(v: u32) -> Self {
        CommandWord(v)
    }
}

impl From<(u16, u16)> for CommandWord {
    #[inline]
    fn from((lo, hi): (u16, u16)) -> Self {
        Self::pack(lo, hi)
    }
}

// Signed halves are stored two's complement, truncated to 16 bits.
impl From<(i16, i16)> for CommandWord {
    #[inline]
    fn from((lo, hi): (i16, i16)) -> Self {
        Self::pack(lo as u16, hi as u16)
    }
}

impl From<CommandWord> for u32 {
    #[inline]
    fn from(v: CommandWord) -> Self {
        v.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packing() {
        assert_eq!(CommandWord::from((1u16, 2u16)).to_raw(), 0x0002_0001);
        assert_eq!(CommandWord::from((-1i16, 2i16)).to_raw(), 0x0002_ffff);
        assert_eq!(CommandWord::from((10i16, -20i16)).to_raw(), 0xffec_000a);
        assert_eq!(u32::from(CommandWord::from(7u32)), 7);
    }
}
