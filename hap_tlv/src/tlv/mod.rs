use std::fmt;

/// Length of the tag and length prefix of every fragment
pub const TLV_HEADER_LEN: usize = 2;
/// Maximum value length of a single fragment
pub const MAX_FRAGMENT_LEN: usize = 255;
/// Upper bound of a decode/encode trace
pub const MAX_LOG_BYTES: usize = 1023;
/// Upper bound of a single value codec description
pub const MAX_DESCRIPTION_BYTES: usize = 255;

/// A single, already defragmented, TLV item
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TLV<'a> {
    pub tag: u8,
    pub value: &'a [u8],
}

impl<'a> TLV<'a> {
    pub fn new(tag: u8, value: &'a [u8]) -> Self {
        Self { tag, value }
    }
}

impl<'a> fmt::Display for TLV<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:02X}] len {}: {:02x?}", self.tag, self.value.len(), self.value)
    }
}

mod codecs;
mod decode;
mod encode;
mod format;
mod logfmt;
mod reader;
mod validate;
mod value;
mod writer;

pub use codecs::*;
pub use decode::*;
pub use format::*;
pub use logfmt::*;
pub use reader::*;
pub use value::*;
pub use writer::*;
