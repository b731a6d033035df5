use std::fmt;

use super::{Custom, StructValue};
use crate::error::*;

/// Describes the wire shape of a value.
///
/// Formats are meant to be declared as `static` items and referenced from
/// each other, forming the schema of a TLV encoded value.
pub enum Format {
    /// Empty TLV between two sequence items
    Separator,
    Enum(EnumFormat),
    UInt8(IntFormat<u8>),
    UInt16(IntFormat<u16>),
    UInt32(IntFormat<u32>),
    UInt64(IntFormat<u64>),
    Int8(IntFormat<i8>),
    Int16(IntFormat<i16>),
    Int32(IntFormat<i32>),
    Int64(IntFormat<i64>),
    Data(DataFormat),
    String(StringFormat),
    /// Opaque value with its own codec
    Value(&'static dyn ValueCodec),
    Sequence(SequenceFormat),
    Struct(StructFormat),
    Union(UnionFormat),
}

/// Codec of an opaque value
pub trait ValueCodec: Sync {
    /// Decode `bytes`, failing with `Error::InvalidData` if they are malformed
    fn decode(&self, bytes: &[u8]) -> Result<Custom, Error>;

    /// Encode `value` into `buf` and return the number of bytes used.
    /// `Error::OutOfResources` if `buf` is too small.
    fn encode(&self, value: &Custom, buf: &mut [u8]) -> Result<usize, Error>;

    fn describe(&self, value: &Custom, f: &mut dyn fmt::Write) -> fmt::Result;
}

#[derive(Copy, Clone)]
pub struct EnumFormat {
    pub is_valid: fn(u8) -> bool,
    pub description: fn(u8) -> &'static str,
}

impl EnumFormat {
    pub const fn new(is_valid: fn(u8) -> bool, description: fn(u8) -> &'static str) -> Self {
        Self {
            is_valid,
            description,
        }
    }
}

/// Integer with an inclusive range.
///
/// `description` names a value, `bit_description` names a single bit of an
/// option set. Both only show up in logs.
#[derive(Copy, Clone)]
pub struct IntFormat<T> {
    pub min: T,
    pub max: T,
    pub description: Option<fn(T) -> Option<&'static str>>,
    pub bit_description: Option<fn(T) -> Option<&'static str>>,
}

macro_rules! int_format_for {
    ($($t:ident)*) => {
        $(
            impl IntFormat<$t> {
                pub const fn new(min: $t, max: $t) -> Self {
                    Self {
                        min,
                        max,
                        description: None,
                        bit_description: None,
                    }
                }

                pub const fn full() -> Self {
                    Self::new($t::MIN, $t::MAX)
                }

                pub const fn with_description(self, f: fn($t) -> Option<&'static str>) -> Self {
                    Self {
                        description: Some(f),
                        ..self
                    }
                }

                pub const fn with_bit_description(self, f: fn($t) -> Option<&'static str>) -> Self {
                    Self {
                        bit_description: Some(f),
                        ..self
                    }
                }
            }
        )*
    };
}

int_format_for!(u8 u16 u32 u64 i8 i16 i32 i64);

#[derive(Copy, Clone)]
pub struct DataFormat {
    pub min_len: usize,
    pub max_len: usize,
}

impl DataFormat {
    pub const fn new(min_len: usize, max_len: usize) -> Self {
        Self { min_len, max_len }
    }
}

/// UTF-8 string without NUL characters
#[derive(Copy, Clone)]
pub struct StringFormat {
    pub min_len: usize,
    pub max_len: usize,
    pub is_valid: Option<fn(&str) -> bool>,
}

impl StringFormat {
    pub const fn new(min_len: usize, max_len: usize) -> Self {
        Self {
            min_len,
            max_len,
            is_valid: None,
        }
    }

    pub const fn with_validator(self, is_valid: fn(&str) -> bool) -> Self {
        Self {
            is_valid: Some(is_valid),
            ..self
        }
    }
}

/// Items of the same format, separated by empty separator TLVs
pub struct SequenceFormat {
    pub item: SequenceItem,
    pub separator: SequenceSeparator,
}

/// A flattened item must be a union, each item is then encoded as the TLV of
/// its variant.
pub struct SequenceItem {
    pub tag: u8,
    pub name: &'static str,
    pub format: &'static Format,
    pub flat: bool,
}

impl SequenceItem {
    pub const fn new(tag: u8, name: &'static str, format: &'static Format) -> Self {
        Self {
            tag,
            name,
            format,
            flat: false,
        }
    }

    /// Flattened union item, `tag` is unused
    pub const fn flat(name: &'static str, format: &'static Format) -> Self {
        Self {
            tag: 0,
            name,
            format,
            flat: true,
        }
    }
}

pub struct SequenceSeparator {
    pub tag: u8,
    pub name: &'static str,
    pub format: &'static Format,
}

impl SequenceSeparator {
    pub const fn new(tag: u8, name: &'static str, format: &'static Format) -> Self {
        Self { tag, name, format }
    }
}

pub struct StructFormat {
    pub members: &'static [StructMember],
    /// Checks constraints across members once they are all decoded
    pub is_valid: Option<fn(&StructValue) -> bool>,
}

pub struct StructMember {
    pub tag: u8,
    pub name: &'static str,
    pub format: &'static Format,
    pub optional: bool,
    /// Members of a flattened struct or union share the nesting level of
    /// their parent, they have no TLV of their own.
    pub flat: bool,
}

impl StructMember {
    pub const fn new(tag: u8, name: &'static str, format: &'static Format) -> Self {
        Self {
            tag,
            name,
            format,
            optional: false,
            flat: false,
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            optional: true,
            ..self
        }
    }

    /// Flattened member, `tag` is unused
    pub const fn flat(name: &'static str, format: &'static Format) -> Self {
        Self {
            tag: 0,
            name,
            format,
            optional: false,
            flat: true,
        }
    }
}

/// Exactly one of the variants is present, identified by its tag
pub struct UnionFormat {
    pub variants: &'static [UnionVariant],
}

pub struct UnionVariant {
    pub tag: u8,
    pub name: &'static str,
    pub format: &'static Format,
}

impl UnionVariant {
    pub const fn new(tag: u8, name: &'static str, format: &'static Format) -> Self {
        Self { tag, name, format }
    }
}

pub static SEPARATOR: Format = Format::Separator;
pub static UINT8: Format = Format::UInt8(IntFormat::<u8>::full());
pub static UINT16: Format = Format::UInt16(IntFormat::<u16>::full());
pub static UINT32: Format = Format::UInt32(IntFormat::<u32>::full());
pub static UINT64: Format = Format::UInt64(IntFormat::<u64>::full());
pub static INT8: Format = Format::Int8(IntFormat::<i8>::full());
pub static INT16: Format = Format::Int16(IntFormat::<i16>::full());
pub static INT32: Format = Format::Int32(IntFormat::<i32>::full());
pub static INT64: Format = Format::Int64(IntFormat::<i64>::full());
pub static DATA: Format = Format::Data(DataFormat::new(0, usize::MAX));
pub static STRING: Format = Format::String(StringFormat::new(0, usize::MAX));

/// Set of TLV tags
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct TagSet([u64; 4]);

impl TagSet {
    pub fn insert(&mut self, tag: u8) {
        self.0[(tag >> 6) as usize] |= 1u64 << (tag & 0x3f);
    }

    pub fn contains(&self, tag: u8) -> bool {
        self.0[(tag >> 6) as usize] & (1u64 << (tag & 0x3f)) != 0
    }

    pub fn intersects(&self, other: &TagSet) -> bool {
        self.0.iter().zip(other.0.iter()).any(|(a, b)| a & b != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }
}

impl Format {
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            Format::Sequence(_) | Format::Struct(_) | Format::Union(_)
        )
    }

    /// Tags that a value of this format occupies at its own nesting level.
    /// Empty for scalars.
    pub fn tags(&self) -> TagSet {
        let mut tags = TagSet::default();
        self.collect_tags(&mut tags);
        tags
    }

    fn collect_tags(&self, tags: &mut TagSet) {
        match self {
            Format::Sequence(f) => {
                if f.item.flat {
                    f.item.format.collect_tags(tags);
                } else {
                    tags.insert(f.item.tag);
                }
                tags.insert(f.separator.tag);
            }
            Format::Struct(f) => {
                for m in f.members {
                    if m.flat {
                        m.format.collect_tags(tags);
                    } else {
                        tags.insert(m.tag);
                    }
                }
            }
            Format::Union(f) => {
                for v in f.variants {
                    tags.insert(v.tag);
                }
            }
            _ => (),
        }
    }

    pub fn uses_tag(&self, tag: u8) -> bool {
        self.tags().contains(tag)
    }

    pub fn has_conflicting_tags(&self, other: &Format) -> bool {
        self.tags().intersects(&other.tags())
    }
}
