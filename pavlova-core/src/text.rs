//! Character-code conversion for the ST7032 LCD controller
//!
//! The controller's character generator uses single-byte codes: the ASCII
//! range in its usual place and half-width Katakana at 0xA1-0xDF. Input
//! text arrives as a raw byte stream (ASCII plus UTF-8-encoded half-width
//! Katakana) and is converted one pass, byte by byte:
//!
//! - 0x0A (newline) becomes a line break token and is not rendered
//! - bytes below 0x7E pass through unchanged
//! - a 3-byte UTF-8 sequence EF BD xx / EF BE xx (U+FF61-U+FF9F) maps to
//!   the controller code xx / xx + 0x40
//! - anything else renders as a blank
//!
//! This is a lossy, single-pass transformation aimed at exactly this
//! controller, not a general text codec.

/// Controller code rendered for bytes the table cannot represent
pub const BLANK: u8 = 0xA0;

/// UTF-8 lead byte of the half-width Katakana block
const KATAKANA_LEAD: u8 = 0xEF;
/// Second byte selecting U+FF40-FF7F (codes map straight through)
const KATAKANA_PAGE_LOW: u8 = 0xBD;
/// Second byte selecting U+FF80-FFBF (codes map with a 0x40 offset)
const KATAKANA_PAGE_HIGH: u8 = 0xBE;
/// Controller-code offset for the high Katakana page
const KATAKANA_HIGH_OFFSET: u8 = 0x40;

/// One unit of converted output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Token {
    /// A character code to send to the controller as data
    Put(u8),
    /// Move rendering to the start of the second line
    LineBreak,
}

/// Single-pass converter from an input byte stream to controller tokens
#[derive(Debug, Clone)]
pub struct Encoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Encoder<'a> {
    /// Start converting `bytes`
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }
}

impl Iterator for Encoder<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let byte = *self.bytes.get(self.pos)?;

        // Newline first: it is below 0x7E but must not render
        if byte == b'\n' {
            self.pos += 1;
            return Some(Token::LineBreak);
        }

        if byte < 0x7E {
            self.pos += 1;
            return Some(Token::Put(byte));
        }

        if byte == KATAKANA_LEAD {
            // A Katakana sequence is consumed as one 3-byte unit. A
            // sequence cut short by the end of input renders a blank
            // rather than reading past the buffer.
            let (page, code) = match (
                self.bytes.get(self.pos + 1),
                self.bytes.get(self.pos + 2),
            ) {
                (Some(&page), Some(&code)) => (page, code),
                _ => {
                    self.pos = self.bytes.len();
                    return Some(Token::Put(BLANK));
                }
            };
            self.pos += 3;
            let converted = match page {
                KATAKANA_PAGE_LOW => code,
                KATAKANA_PAGE_HIGH => code.wrapping_add(KATAKANA_HIGH_OFFSET),
                _ => BLANK,
            };
            return Some(Token::Put(converted));
        }

        self.pos += 1;
        Some(Token::Put(BLANK))
    }
}
