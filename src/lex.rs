// SPDX: CC0-1.0

use crate::eval::OperatorTyp;
use core::{fmt, iter::Peekable, str::CharIndices};
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubStr {
    // shared so that every token and error can point back into the formula
    src: Arc<String>,
    start: usize,
    len: usize,
}

impl SubStr {
    #[inline]
    pub const fn new(src: Arc<String>, start: usize, len: usize) -> Self {
        Self { src, start, len }
    }

    #[inline]
    pub fn all(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, 0, len)
    }

    /// Zero-width span just past the end of the source.
    #[inline]
    pub fn end(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, len, 0)
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(&self.src)
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self) -> &str {
        &self.src[self.start..self.start + self.len]
    }

    pub fn shift_right(&mut self, by: usize) {
        self.len += by;
    }
}

impl fmt::Display for SubStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokTyp {
    Ident,
    Number,
    Op(OperatorTyp),
    Comma,
    OpenParen,
    CloseParen,

    // unsupported tokens
    XGreater,
    XLess,
    XEqual,
    XPipe,
    XOpenSquareBracket,
    XCloseSquareBracket,
    XOpenCurly,
    XCloseCurly,
    XMember,
}

impl TokTyp {
    pub const fn is_unsupported(&self) -> bool {
        match self {
            Self::Ident
            | Self::Number
            | Self::Op(_)
            | Self::Comma
            | Self::OpenParen
            | Self::CloseParen => false,

            Self::XGreater
            | Self::XLess
            | Self::XEqual
            | Self::XPipe
            | Self::XOpenSquareBracket
            | Self::XCloseSquareBracket
            | Self::XOpenCurly
            | Self::XCloseCurly
            | Self::XMember => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tok {
    pub typ: TokTyp,
    pub loc: SubStr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum LexErrTyp {
    #[error("invalid character")]
    InvalidChar,
    #[error("unsupported character")]
    Unsupported(TokTyp),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("{typ}")]
pub struct LexErr {
    pub typ: LexErrTyp,
    pub loc: SubStr,
}

#[derive(Debug)]
pub struct Lexer<'src> {
    src: &'src Arc<String>,
    cur: Peekable<CharIndices<'src>>,
    has_errored: bool, // tells iter to yield None after error
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src Arc<String>) -> Self {
        Self {
            src,
            cur: src.char_indices().peekable(),
            has_errored: false,
        }
    }

    pub fn trim_whitespace(&mut self) {
        while let Some((_, chr)) = self.cur.peek() {
            if chr.is_whitespace() {
                self.cur.next();
            } else {
                break;
            }
        }
    }

    fn consume_unambiguous(&mut self) -> Option<Tok> {
        let (idx, chr) = self.cur.peek().copied()?;
        let typ = match chr {
            '+' => TokTyp::Op(OperatorTyp::Add),
            '-' => TokTyp::Op(OperatorTyp::Sub),
            '*' => TokTyp::Op(OperatorTyp::Mul),
            '/' => TokTyp::Op(OperatorTyp::Div),
            '^' => TokTyp::Op(OperatorTyp::Pow),
            ',' => TokTyp::Comma,
            '(' => TokTyp::OpenParen,
            ')' => TokTyp::CloseParen,

            '>' => TokTyp::XGreater,
            '<' => TokTyp::XLess,
            '=' => TokTyp::XEqual,
            '|' => TokTyp::XPipe,
            '[' => TokTyp::XOpenSquareBracket,
            ']' => TokTyp::XCloseSquareBracket,
            '{' => TokTyp::XOpenCurly,
            '}' => TokTyp::XCloseCurly,
            '.' if self.src[idx + 1..].starts_with(|c: char| c.is_ascii_alphabetic()) => {
                TokTyp::XMember
            }
            _ => return None,
        };
        self.cur.next(); // consume because we only peeked
        Some(Tok {
            typ,
            loc: SubStr::new(Arc::clone(self.src), idx, chr.len_utf8()),
        })
    }

    fn consume_by<P>(&mut self, start: usize, typ: TokTyp, predicate: P) -> Option<Tok>
    where
        P: Fn(char) -> bool,
    {
        let mut tok = Tok {
            typ,
            loc: SubStr::new(Arc::clone(self.src), start, 0),
        };
        while let Some((_, chr)) = self.cur.peek().copied() {
            if predicate(chr) {
                tok.loc.shift_right(chr.len_utf8());
                self.cur.next();
            } else {
                break;
            }
        }
        if tok.loc.is_empty() {
            None
        } else {
            Some(tok)
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Tok, LexErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_errored {
            return None;
        }

        self.trim_whitespace();

        let (next_idx, next_chr) = self.cur.peek().copied()?;
        let ret = if let Some(tok) = self.consume_unambiguous() {
            Ok(tok)
        } else if next_chr.is_ascii_alphabetic() {
            // identifiers start with a letter, then may contain digits and '_'
            self.consume_by(next_idx, TokTyp::Ident, |chr| {
                chr.is_ascii_alphanumeric() || chr == '_'
            })
            .ok_or(LexErrTyp::InvalidChar)
        } else if let Some(tok) = self.consume_by(next_idx, TokTyp::Number, |chr| {
            chr.is_ascii_digit() || chr == '.'
        }) {
            Ok(tok)
        } else {
            Err(LexErrTyp::InvalidChar)
        };

        let ret = match ret {
            Ok(tok) if tok.typ.is_unsupported() => Err(LexErrTyp::Unsupported(tok.typ)),
            other => other,
        };
        Some(ret.map_err(|typ| {
            self.has_errored = true;
            LexErr {
                typ,
                loc: SubStr::new(Arc::clone(self.src), next_idx, next_chr.len_utf8()),
            }
        }))
    }
}
