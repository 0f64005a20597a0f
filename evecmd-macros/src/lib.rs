extern crate proc_macro;
extern crate proc_macro2;

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::parse::{Parse, ParseStream, Result};
use syn::parse_macro_input;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Expr, LitByteStr, LitStr, Token};

mod parsers;

/// Prepare a format string and associated arguments for use with an EVE
/// coprocessor widget which supports the `OPT_FORMAT` option.
///
/// Expands to an `evecmd::strfmt::Message`. The verbs are matched against
/// the arguments at compile time: `%d` and `%i` take an `i32`, `%u`, `%o`,
/// `%x` and `%X` take a `u32`, `%c` takes a `char`, and `%s` takes a pointer
/// into main memory.
#[proc_macro]
pub fn eve_format(input: TokenStream) -> TokenStream {
    let call = parse_macro_input!(input as EVEFormat);
    match expand(&call) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(call: &EVEFormat) -> Result<proc_macro2::TokenStream> {
    let fmt = &call.fmt;
    let src = fmt.value().into_bytes();
    let mut text: Vec<u8> = Vec::with_capacity(src.len());
    let mut arg_exprs: Vec<proc_macro2::TokenStream> = Vec::new();
    let mut given = call.args.iter();
    let mut formatted = false;

    for token in parsers::tokens(&src) {
        use parsers::Token;
        match token {
            Token::Text(bytes) => text.extend_from_slice(bytes),
            Token::Escape(bytes) => {
                formatted = true;
                text.extend_from_slice(bytes);
            }
            Token::Nul => {
                // A literal NUL would end the string early, so it's
                // written as a character conversion instead.
                formatted = true;
                text.extend_from_slice(b"%c");
                arg_exprs.push(quote!(::evecmd::strfmt::Argument::Char('\0')));
            }
            Token::Verb(bytes, conversion) => {
                formatted = true;
                let arg = match given.next() {
                    Some(arg) => arg,
                    None => {
                        let verb = String::from_utf8_lossy(bytes);
                        return Err(syn::Error::new(
                            fmt.span(),
                            format!("no argument for the format verb '{}'", verb),
                        ));
                    }
                };
                text.extend_from_slice(bytes);
                arg_exprs.push(match conversion {
                    b'd' | b'i' => quote!(::evecmd::strfmt::Argument::Int(#arg)),
                    b'u' | b'o' | b'x' | b'X' => quote!(::evecmd::strfmt::Argument::UInt(#arg)),
                    b'c' => quote!(::evecmd::strfmt::Argument::Char(#arg)),
                    b's' => quote!(::evecmd::strfmt::Argument::string(#arg)),
                    other => {
                        return Err(syn::Error::new(
                            fmt.span(),
                            format!("unsupported format verb '%{}'", other as char),
                        ));
                    }
                });
            }
            Token::Unterminated(_) => {
                return Err(syn::Error::new(fmt.span(), "unterminated format sequence"));
            }
        }
    }

    if let Some(extra) = given.next() {
        return Err(syn::Error::new(
            extra.span(),
            "too many arguments for format string",
        ));
    }

    // The terminating NUL is added when the message is written out.
    let text = LitByteStr::new(&text, Span::call_site());
    Ok(if formatted {
        quote!(::evecmd::strfmt::Message::new(#text, &[#(#arg_exprs),*]))
    } else {
        quote!(::evecmd::strfmt::Message::new_literal(#text))
    })
}

struct EVEFormat {
    fmt: LitStr,
    args: Punctuated<Expr, Token![,]>,
}

impl Parse for EVEFormat {
    fn parse(input: ParseStream) -> Result<Self> {
        let fmt: LitStr = input.parse()?;
        let args = if input.parse::<Token![,]>().is_ok() {
            Punctuated::parse_terminated(input)?
        } else {
            Punctuated::new()
        };
        Ok(EVEFormat { fmt, args })
    }
}
