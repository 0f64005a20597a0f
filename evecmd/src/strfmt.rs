//! Trailing arguments for coprocessor commands that take a format string.
//!
//! Commands such as `CMD_TEXT` accept, after their fixed arguments, a
//! NUL-terminated string and then (with `OPT_FORMAT`) one 32-bit word per
//! format verb. [`Message`](Message) lends both parts to
//! [`Coprocessor::append_message`](crate::commands::Coprocessor::append_message).
//!
//! The usual way to make a `Message` is [`eve_format!`](crate::eve_format),
//! which checks the verbs against the arguments at compile time. When the
//! arguments are only known at runtime, [`Args`](Args) collects them into a
//! fixed-capacity buffer instead.

use crate::error::Error;
use crate::memory::{MainMem, Ptr};

/// The string part of a command record, plus the format arguments that
/// follow it when the string has conversions in it.
///
/// ```rust
/// use evecmd::strfmt::Message;
///
/// fn arg_count(msg: Message) -> usize {
///     msg.args().len()
/// }
///
/// let val = 5;
/// assert_eq!(arg_count(evecmd::eve_format!("The current value is %d", val)), 1);
/// ```
///
/// A message built from runtime values borrows a temporary argument array,
/// so it has to be passed on within the same expression rather than kept in
/// a local variable.
///
/// A literal message (one without an argument slice) is sent without
/// `OPT_FORMAT`, so `%` has no special meaning in it.
///
/// The NUL terminator is not part of `fmt`; it's added when the message is
/// written out, and a NUL inside `fmt` cuts the text short.
#[derive(Clone, Copy)]
pub struct Message<'a, 'b> {
    pub(crate) fmt: &'a [u8],
    pub(crate) args: Option<&'b [Argument]>,
}

impl core::fmt::Debug for Message<'_, '_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Message")
            .field("text", &EscapedBytes(self.text()))
            .field("args", &self.args)
            .finish()
    }
}

struct EscapedBytes<'a>(&'a [u8]);

impl core::fmt::Debug for EscapedBytes<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use core::fmt::Write;
        f.write_char('"')?;
        for c in self.0.iter().flat_map(|b| core::ascii::escape_default(*b)) {
            f.write_char(c as char)?;
        }
        f.write_char('"')
    }
}

/// An argument used as part of a `Message`.
///
/// Whatever its type, every argument occupies one 32-bit word after the
/// format string.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Argument {
    Int(i32),
    UInt(u32),
    Char(char),
    /// The address of a NUL-terminated string already in main memory, for
    /// the `%s` verb.
    String(u32),
}

impl Argument {
    /// Builds the `%s` argument for a string stored in main memory.
    pub fn string<R: MainMem>(ptr: Ptr<R>) -> Self {
        Argument::String(ptr.to_raw())
    }

    pub const fn to_word(self) -> u32 {
        match self {
            Argument::Int(v) => v as u32,
            Argument::UInt(v) => v,
            Argument::Char(v) => v as u32,
            Argument::String(addr) => addr,
        }
    }
}

impl<'a, 'b> Message<'a, 'b> {
    /// A message sent with `OPT_FORMAT`.
    ///
    /// Nothing checks that `args` matches the conversions in `fmt`; a
    /// mismatch makes the coprocessor read the wrong words.
    #[inline]
    pub const fn new(fmt: &'a [u8], args: &'b [Argument]) -> Self {
        Self {
            fmt,
            args: Some(args),
        }
    }

    /// A message whose text is drawn as-is.
    #[inline]
    pub const fn new_literal(lit: &'a [u8]) -> Self {
        Self {
            fmt: lit,
            args: None,
        }
    }

    pub const fn needs_format(&self) -> bool {
        self.args.is_some()
    }

    /// The format string up to, but not including, any NUL byte.
    pub fn text(&self) -> &'a [u8] {
        match self.fmt.iter().position(|b| *b == 0) {
            Some(end) => &self.fmt[..end],
            None => self.fmt,
        }
    }

    pub fn args(&self) -> &'b [Argument] {
        self.args.unwrap_or(&[])
    }

    /// The number of bytes the message occupies in a command record: the
    /// text, its terminator and zero padding to a word boundary, and then
    /// one word per argument.
    pub fn encoded_len(&self) -> u32 {
        padded_string_len(self.text().len()) + 4 * self.args().len() as u32
    }
}

/// The length of a string of `len` bytes once NUL-terminated and padded to
/// a multiple of four.
pub(crate) const fn padded_string_len(len: usize) -> u32 {
    ((len as u32) + 4) & !3
}

/// Returned when more arguments are pushed into an [`Args`](Args) than it
/// has room for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ArgsOverflow;

impl<E> From<ArgsOverflow> for Error<E> {
    fn from(_: ArgsOverflow) -> Self {
        Error::TooManyArguments
    }
}

/// A runtime builder for format arguments, holding up to `N` of them.
///
/// ```rust
/// use evecmd::strfmt::Args;
///
/// let args = Args::<4>::new().int(-3).uint(7).char('x');
/// let msg = args.message(b"%d %u %c").unwrap();
/// assert!(msg.needs_format());
/// ```
///
/// Pushing past the capacity doesn't fail immediately, so that the calls
/// can be chained; instead [`message`](Args::message) reports the overflow.
#[derive(Debug, Clone, Default)]
pub struct Args<const N: usize> {
    args: heapless::Vec<Argument, N>,
    overflowed: bool,
}

impl<const N: usize> Args<N> {
    pub const fn new() -> Self {
        Self {
            args: heapless::Vec::new(),
            overflowed: false,
        }
    }

    pub fn int(self, v: i32) -> Self {
        self.push(Argument::Int(v))
    }

    pub fn uint(self, v: u32) -> Self {
        self.push(Argument::UInt(v))
    }

    pub fn char(self, v: char) -> Self {
        self.push(Argument::Char(v))
    }

    pub fn string<R: MainMem>(self, ptr: Ptr<R>) -> Self {
        self.push(Argument::string(ptr))
    }

    pub fn push(mut self, arg: Argument) -> Self {
        if self.args.push(arg).is_err() {
            self.overflowed = true;
        }
        self
    }

    pub fn as_slice(&self) -> &[Argument] {
        &self.args
    }

    /// Pairs the collected arguments with a format string.
    pub fn message<'a, 'b>(&'b self, fmt: &'a [u8]) -> Result<Message<'a, 'b>, ArgsOverflow> {
        if self.overflowed {
            return Err(ArgsOverflow);
        }
        Ok(Message::new(fmt, &self.args))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::memory::MemoryRegion;
    use crate::models::{Model, BT81x};

    type Main = <BT81x as Model>::MainMem;

    #[test]
    fn test_debug() {
        use std::format;
        let got = Message::new(b"x=%d\n", &[Argument::Int(1)]);
        assert_eq!(
            format!("{:?}", got),
            "Message { text: \"x=%d\\n\", args: Some([Int(1)]) }"
        );
    }

    #[test]
    fn test_format_no_args() {
        let got = Message::new(b"hi", &[]);
        assert!(got.needs_format());
        assert_eq!(got.encoded_len(), 4);
    }

    #[test]
    fn test_format_with_arg() {
        let got = Message::new(b"%d", &[Argument::Int(3)]);
        assert_eq!(got.encoded_len(), 8);
    }

    #[test]
    fn test_literal() {
        let got = Message::new_literal(b"hello");
        assert!(!got.needs_format());
        assert!(got.args().is_empty());
        assert_eq!(got.encoded_len(), 8);
    }

    #[test]
    fn test_text_stops_at_nul() {
        let got = Message::new_literal(b"ab\0cd");
        assert_eq!(got.text(), b"ab");
        assert_eq!(got.encoded_len(), 4);
    }

    #[test]
    fn test_padded_string_len() {
        assert_eq!(padded_string_len(0), 4);
        assert_eq!(padded_string_len(3), 4);
        assert_eq!(padded_string_len(4), 8);
        assert_eq!(padded_string_len(7), 8);
    }

    #[test]
    fn test_argument_words() {
        assert_eq!(Argument::Int(-1).to_word(), 0xffff_ffff);
        assert_eq!(Argument::UInt(7).to_word(), 7);
        assert_eq!(Argument::Char('A').to_word(), 0x41);
        assert_eq!(Argument::string(Main::ptr(0x100)).to_word(), 0x100);
    }

    #[test]
    fn test_args_builder() {
        let args = Args::<3>::new().int(-3).uint(7).char('x');
        let msg = args.message(b"%d %u %c").unwrap();
        assert_eq!(
            msg.args(),
            &[Argument::Int(-3), Argument::UInt(7), Argument::Char('x')]
        );
    }

    #[test]
    fn test_args_overflow() {
        let args = Args::<1>::new().int(1).int(2);
        assert_eq!(args.message(b"%d %d").unwrap_err(), ArgsOverflow);
        let err: Error<()> = ArgsOverflow.into();
        assert!(matches!(err, Error::TooManyArguments));
    }
}
