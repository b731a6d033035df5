use std::fmt;

use super::*;
use crate::error::*;
use byteorder::{ByteOrder, LittleEndian};
use log::info;

impl<'a> TLVReader<'a> {
    /// Decode all remaining items as a value of the aggregate `format`.
    ///
    /// Items may appear in any order, items with tags the format does not
    /// use are skipped. Data and strings of the result borrow from the
    /// reader's buffer.
    pub fn decode(self, format: &'static Format) -> Result<Value<'a>, Error> {
        assert!(
            format.is_aggregate(),
            "Top level TLV format must be a struct, union or sequence"
        );
        assert!(format.is_valid(), "Invalid TLV format");

        let mut log = LogBuilder::new();
        match decode_aggregate(self, format, &mut log, 0) {
            Ok(value) => {
                if !matches!(format, Format::Sequence(_)) {
                    log.flush("Decoded TLV");
                }
                Ok(value)
            }
            Err(e) => {
                info!("Invalid value.");
                Err(e)
            }
        }
    }
}

fn decode_aggregate<'a>(
    reader: TLVReader<'a>,
    format: &'static Format,
    log: &mut LogBuilder,
    level: usize,
) -> Result<Value<'a>, Error> {
    match format {
        Format::Sequence(f) => {
            // Items are decoded lazily, but a framing error still rejects
            // the whole value
            reader.check_framing()?;
            Ok(Value::Sequence(Sequence::Decoded(SequenceReader::new(
                reader, f,
            ))))
        }
        _ => {
            let mut index = reader.into_index(format)?;
            decode_level(&mut index, format, log, level)
        }
    }
}

// A struct or union whose items are in `index`
fn decode_level<'a>(
    index: &mut TLVIndex<'a>,
    format: &'static Format,
    log: &mut LogBuilder,
    level: usize,
) -> Result<Value<'a>, Error> {
    match format {
        Format::Struct(f) => decode_struct(index, f, log, level).map(Value::Struct),
        Format::Union(f) => decode_union(index, f, log, level).map(Value::Union),
        _ => unreachable!("Flattened formats are structs or unions"),
    }
}

fn decode_struct<'a>(
    index: &mut TLVIndex<'a>,
    format: &'static StructFormat,
    log: &mut LogBuilder,
    level: usize,
) -> Result<StructValue<'a>, Error> {
    let mut members = Vec::with_capacity(format.members.len());
    for m in format.members {
        let value = if m.flat {
            Some(decode_level(index, m.format, log, level)?)
        } else {
            match index.take(m.tag)? {
                Some(bytes) => Some(decode_tlv(m.tag, m.name, m.format, bytes, log, level)?),
                None if m.optional => None,
                None => {
                    info!("[{:02X} {}] TLV missing.", m.tag, m.name);
                    return Err(Error::InvalidData);
                }
            }
        };
        members.push(value);
    }

    let value = StructValue::new(format, members);
    if let Some(is_valid) = format.is_valid {
        if !is_valid(&value) {
            info!("Struct value is invalid.");
            return Err(Error::InvalidData);
        }
    }
    Ok(value)
}

fn decode_union<'a>(
    index: &mut TLVIndex<'a>,
    format: &'static UnionFormat,
    log: &mut LogBuilder,
    level: usize,
) -> Result<UnionValue<'a>, Error> {
    let mut present = format.variants.iter().filter(|v| index.contains(v.tag));
    let variant = match (present.next(), present.next()) {
        (Some(v), None) => v,
        (Some(first), Some(other)) => {
            info!(
                "[{:02X} {}] TLV not allowed when [{:02X} {}] TLV is present.",
                other.tag, other.name, first.tag, first.name
            );
            return Err(Error::InvalidData);
        }
        (None, _) => {
            for v in format.variants {
                info!("[{:02X} {}] TLV missing.", v.tag, v.name);
            }
            return Err(Error::InvalidData);
        }
    };

    let bytes = index.take(variant.tag)?.ok_or(Error::InvalidData)?;
    let value = decode_tlv(variant.tag, variant.name, variant.format, bytes, log, level)?;
    Ok(UnionValue::new(variant.tag, value))
}

fn decode_tlv<'a>(
    tag: u8,
    name: &str,
    format: &'static Format,
    bytes: &'a mut [u8],
    log: &mut LogBuilder,
    level: usize,
) -> Result<Value<'a>, Error> {
    if format.is_aggregate() {
        log.append_to_log(tag, name, format, None, level);
        let len = bytes.len();
        decode_aggregate(TLVReader::new(bytes, len), format, log, level + 1)
    } else {
        let value = decode_scalar(tag, name, format, bytes)?;
        log.append_to_log(tag, name, format, Some(&value), level);
        Ok(value)
    }
}

// Integers may be shorter than their type on the wire
fn read_uint(tag: u8, name: &str, bytes: &[u8], size: usize) -> Result<u64, Error> {
    if bytes.len() > size {
        info!(
            "[{:02X} {}] Value too long: {} bytes.",
            tag,
            name,
            bytes.len()
        );
        return Err(Error::InvalidData);
    }
    if bytes.is_empty() {
        Ok(0)
    } else {
        Ok(LittleEndian::read_uint(bytes, bytes.len()))
    }
}

fn check_range<T: PartialOrd + fmt::Display>(
    tag: u8,
    name: &str,
    v: T,
    min: T,
    max: T,
) -> Result<T, Error> {
    if v < min || v > max {
        info!(
            "[{:02X} {}] Value {} outside of range [{}, {}].",
            tag, name, v, min, max
        );
        return Err(Error::InvalidData);
    }
    Ok(v)
}

fn check_len(tag: u8, name: &str, len: usize, min: usize, max: usize) -> Result<(), Error> {
    if len < min || len > max {
        info!(
            "[{:02X} {}] Value length {} outside of range [{}, {}].",
            tag, name, len, min, max
        );
        return Err(Error::InvalidData);
    }
    Ok(())
}

macro_rules! decode_int {
    ($tag:expr, $name:expr, $bytes:expr, $f:expr, $variant:ident, $t:ty, $ut:ty) => {{
        let v = read_uint($tag, $name, $bytes, std::mem::size_of::<$t>())? as $ut as $t;
        Ok(Value::$variant(check_range($tag, $name, v, $f.min, $f.max)?))
    }};
}

fn decode_scalar<'a>(
    tag: u8,
    name: &str,
    format: &'static Format,
    bytes: &'a [u8],
) -> Result<Value<'a>, Error> {
    match format {
        Format::Enum(f) => {
            let v = read_uint(tag, name, bytes, 1)? as u8;
            if !(f.is_valid)(v) {
                info!("[{:02X} {}] Value {} invalid.", tag, name, v);
                return Err(Error::InvalidData);
            }
            Ok(Value::Enum(v))
        }
        Format::UInt8(f) => decode_int!(tag, name, bytes, f, UInt8, u8, u8),
        Format::UInt16(f) => decode_int!(tag, name, bytes, f, UInt16, u16, u16),
        Format::UInt32(f) => decode_int!(tag, name, bytes, f, UInt32, u32, u32),
        Format::UInt64(f) => decode_int!(tag, name, bytes, f, UInt64, u64, u64),
        Format::Int8(f) => decode_int!(tag, name, bytes, f, Int8, i8, u8),
        Format::Int16(f) => decode_int!(tag, name, bytes, f, Int16, i16, u16),
        Format::Int32(f) => decode_int!(tag, name, bytes, f, Int32, i32, u32),
        Format::Int64(f) => decode_int!(tag, name, bytes, f, Int64, i64, u64),
        Format::Data(f) => {
            check_len(tag, name, bytes.len(), f.min_len, f.max_len)?;
            Ok(Value::Data(bytes))
        }
        Format::String(f) => {
            check_len(tag, name, bytes.len(), f.min_len, f.max_len)?;
            if bytes.contains(&0) {
                info!("[{:02X} {}] Value contains a NUL character.", tag, name);
                return Err(Error::InvalidData);
            }
            let s = std::str::from_utf8(bytes).map_err(|e| {
                info!("[{:02X} {}] Value is not UTF-8.", tag, name);
                Error::from(e)
            })?;
            if let Some(is_valid) = f.is_valid {
                if !is_valid(s) {
                    info!("[{:02X} {}] Value invalid.", tag, name);
                    return Err(Error::InvalidData);
                }
            }
            Ok(Value::String(s))
        }
        Format::Value(codec) => codec.decode(bytes).map(Value::Custom).map_err(|e| {
            info!("[{:02X} {}] Value invalid: {}.", tag, name, e);
            Error::InvalidData
        }),
        Format::Separator | Format::Sequence(_) | Format::Struct(_) | Format::Union(_) => {
            unreachable!("Not a scalar format")
        }
    }
}

/// Lazily decodes the items of a sequence, one at a time.
///
/// Separators and items with unknown tags are skipped. Iteration stops after
/// the first error.
pub struct SequenceReader<'a> {
    reader: TLVReader<'a>,
    format: &'static SequenceFormat,
    done: bool,
}

impl<'a> SequenceReader<'a> {
    fn new(reader: TLVReader<'a>, format: &'static SequenceFormat) -> Self {
        SequenceReader {
            reader,
            format,
            done: false,
        }
    }

    fn next_value(&mut self) -> Result<Option<Value<'a>>, Error> {
        let format = self.format;
        let item = &format.item;
        let separator = &format.separator;
        while let Some((tag, bytes)) = self.reader.next_item()? {
            let mut log = LogBuilder::new();
            let value = if item.flat && item.format.uses_tag(tag) {
                decode_flat_item(tag, item.format, bytes, &mut log)?
            } else if !item.flat && tag == item.tag {
                decode_tlv(tag, item.name, item.format, bytes, &mut log, 0)?
            } else if tag == separator.tag {
                if !bytes.is_empty() {
                    info!(
                        "[{:02X} {}] Ignoring separator value.",
                        tag, separator.name
                    );
                }
                continue;
            } else {
                info!("[{:02X}] Ignored TLV.", tag);
                continue;
            };
            log.flush("Decoded sequence TLV");
            return Ok(Some(value));
        }
        Ok(None)
    }
}

// A flattened sequence item is a union, encoded as the TLV of its variant
fn decode_flat_item<'a>(
    tag: u8,
    format: &'static Format,
    bytes: &'a mut [u8],
    log: &mut LogBuilder,
) -> Result<Value<'a>, Error> {
    let variant = match format {
        Format::Union(f) => f.variants.iter().find(|v| v.tag == tag),
        _ => None,
    };
    match variant {
        Some(v) => {
            let value = decode_tlv(v.tag, v.name, v.format, bytes, log, 0)?;
            Ok(Value::Union(UnionValue::new(v.tag, value)))
        }
        None => unreachable!("Flattened sequence items are unions"),
    }
}

impl<'a> Iterator for SequenceReader<'a> {
    type Item = Result<Value<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_value() {
            Ok(Some(v)) => Some(Ok(v)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<'a> std::iter::FusedIterator for SequenceReader<'a> {}
