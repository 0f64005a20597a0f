use nom::branch::alt;
use nom::bytes::complete::{tag, take_till, take_till1, take_while_m_n};
use nom::combinator::{map, recognize};
use nom::sequence::{pair, tuple};
use nom::IResult;

/// One piece of an EVE format string.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Token<'a> {
    /// Bytes to render as-is.
    Text(&'a [u8]),
    /// A conversion such as `%-08d`: the whole sequence, and the letter at
    /// its end that selects the argument type.
    Verb(&'a [u8], u8),
    /// The `%%` escape.
    Escape(&'a [u8]),
    /// A NUL byte, which the coprocessor would take as the end of the
    /// string.
    Nul,
    /// A `%` with no conversion letter after it.
    Unterminated(&'a [u8]),
}

/// Splits a format string into tokens.
pub(crate) fn tokens(mut input: &[u8]) -> impl Iterator<Item = Token<'_>> {
    core::iter::from_fn(move || {
        if input.is_empty() {
            return None;
        }
        match token(input) {
            Ok((rest, tok)) => {
                input = rest;
                Some(tok)
            }
            // Every branch of `token` except text starts with a byte that
            // text stops at, so some branch always matches.
            Err(_) => {
                let tok = Token::Unterminated(input);
                input = &[];
                Some(tok)
            }
        }
    })
}

fn is_conversion(b: u8) -> bool {
    b.is_ascii_alphabetic()
}

fn text(i: &[u8]) -> IResult<&[u8], Token<'_>> {
    map(take_till1(|b: u8| b == b'%' || b == 0), Token::Text)(i)
}

fn nul(i: &[u8]) -> IResult<&[u8], Token<'_>> {
    map(tag(&b"\0"[..]), |_| Token::Nul)(i)
}

fn escape(i: &[u8]) -> IResult<&[u8], Token<'_>> {
    map(tag(&b"%%"[..]), Token::Escape)(i)
}

fn verb(i: &[u8]) -> IResult<&[u8], Token<'_>> {
    map(
        recognize(tuple((
            tag(&b"%"[..]),
            take_till(is_conversion),
            take_while_m_n(1, 1, is_conversion),
        ))),
        verb_token,
    )(i)
}

// `recognize` guarantees the sequence ends in its conversion letter.
fn verb_token(seq: &[u8]) -> Token<'_> {
    Token::Verb(seq, seq[seq.len() - 1])
}

fn unterminated(i: &[u8]) -> IResult<&[u8], Token<'_>> {
    map(recognize(pair(tag(&b"%"[..]), take_till(is_conversion))), Token::Unterminated)(i)
}

fn token(i: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((escape, verb, unterminated, nul, text))(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(s: &[u8]) -> Vec<Token<'_>> {
        tokens(s).collect()
    }

    #[test]
    fn test_just_text() {
        assert_eq!(all(b"hello"), vec![Token::Text(b"hello")]);
    }

    #[test]
    fn test_empty() {
        assert_eq!(all(b""), vec![]);
    }

    #[test]
    fn test_nul() {
        assert_eq!(
            all(b"hello\0world"),
            vec![Token::Text(b"hello"), Token::Nul, Token::Text(b"world")]
        );
    }

    #[test]
    fn test_verb_with_flags() {
        assert_eq!(
            all(b"%-08d items"),
            vec![Token::Verb(b"%-08d", b'd'), Token::Text(b" items")]
        );
    }

    #[test]
    fn test_adjacent_verbs() {
        assert_eq!(
            all(b"%x%s"),
            vec![Token::Verb(b"%x", b'x'), Token::Verb(b"%s", b's')]
        );
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            all(b"100%%%%"),
            vec![Token::Text(b"100"), Token::Escape(b"%%"), Token::Escape(b"%%")]
        );
    }

    #[test]
    fn test_unterminated() {
        assert_eq!(all(b"%"), vec![Token::Unterminated(b"%")]);
        assert_eq!(all(b"%36%"), vec![Token::Unterminated(b"%36%")]);
    }
}
