use std::fmt;

use super::*;
use crate::error::*;
use byteorder::{ByteOrder, LittleEndian};
use log::info;

impl<'a> TLVWriter<'a> {
    /// Append `value` encoded as the aggregate `format`.
    ///
    /// The value must match the format and satisfy all of its constraints.
    /// Only value codecs and sequence sources can make this fail, apart from
    /// running out of space.
    pub fn encode(&mut self, format: &'static Format, value: &Value) -> Result<(), Error> {
        assert!(
            format.is_aggregate(),
            "Top level TLV format must be a struct, union or sequence"
        );
        assert!(format.is_valid(), "Invalid TLV format");

        let mut log = LogBuilder::new();
        let result = encode_aggregate(self, format, value, &mut log, 0);
        match result {
            Ok(()) => {
                if !matches!(format, Format::Sequence(_)) {
                    log.flush("Encoded TLV");
                }
            }
            Err(e) => {
                if e == Error::OutOfResources {
                    self.mark_failed();
                }
                info!("Encoding failed: {}.", e);
            }
        }
        result
    }
}

fn mismatch(format: &Format, value: &Value) -> ! {
    panic!(
        "Value {:?} does not match the {} format",
        value,
        kind_name(format)
    )
}

fn kind_name(format: &Format) -> &'static str {
    match format {
        Format::Separator => "separator",
        Format::Enum(_) => "enum",
        Format::UInt8(_) => "uint8",
        Format::UInt16(_) => "uint16",
        Format::UInt32(_) => "uint32",
        Format::UInt64(_) => "uint64",
        Format::Int8(_) => "int8",
        Format::Int16(_) => "int16",
        Format::Int32(_) => "int32",
        Format::Int64(_) => "int64",
        Format::Data(_) => "data",
        Format::String(_) => "string",
        Format::Value(_) => "value",
        Format::Sequence(_) => "sequence",
        Format::Struct(_) => "struct",
        Format::Union(_) => "union",
    }
}

fn encode_aggregate(
    w: &mut TLVWriter,
    format: &'static Format,
    value: &Value,
    log: &mut LogBuilder,
    level: usize,
) -> Result<(), Error> {
    match (format, value) {
        (Format::Sequence(f), Value::Sequence(Sequence::Source(source))) => {
            encode_sequence(w, f, source.as_ref())
        }
        (Format::Sequence(_), Value::Sequence(Sequence::Decoded(_))) => {
            panic!("A decoded sequence can not be encoded again")
        }
        (Format::Struct(f), Value::Struct(v)) => encode_struct(w, f, v, log, level),
        (Format::Union(f), Value::Union(v)) => encode_union(w, f, v, log, level),
        _ => mismatch(format, value),
    }
}

fn encode_sequence(
    w: &mut TLVWriter,
    format: &'static SequenceFormat,
    source: &dyn SequenceSource,
) -> Result<(), Error> {
    let item = &format.item;
    let separator = &format.separator;
    let mut first = true;
    source.enumerate(&mut |value| {
        let mut log = LogBuilder::new();
        if !first {
            log.append_to_log(separator.tag, separator.name, separator.format, None, 0);
            w.append(separator.tag, &[])?;
        }
        first = false;

        if item.flat {
            encode_aggregate(w, item.format, value, &mut log, 0)?;
        } else {
            encode_tlv(w, item.tag, item.name, item.format, value, &mut log, 0)?;
        }
        log.flush("Encoded sequence TLV");
        Ok(())
    })
}

fn encode_struct(
    w: &mut TLVWriter,
    format: &'static StructFormat,
    value: &StructValue,
    log: &mut LogBuilder,
    level: usize,
) -> Result<(), Error> {
    if let Some(is_valid) = format.is_valid {
        assert!(is_valid(value), "Struct value is invalid");
    }
    let mut count = 0;
    for (m, member_value) in value.members() {
        count += 1;
        match member_value {
            None => assert!(m.optional, "[{:02X} {}] TLV not set", m.tag, m.name),
            Some(v) if m.flat => encode_aggregate(w, m.format, v, log, level)?,
            Some(v) => encode_tlv(w, m.tag, m.name, m.format, v, log, level)?,
        }
    }
    assert_eq!(count, format.members.len(), "Struct value of another format");
    Ok(())
}

fn encode_union(
    w: &mut TLVWriter,
    format: &'static UnionFormat,
    value: &UnionValue,
    log: &mut LogBuilder,
    level: usize,
) -> Result<(), Error> {
    let variant = format
        .variants
        .iter()
        .find(|v| v.tag == value.tag)
        .unwrap_or_else(|| panic!("[{:02X}] Not a variant of the union", value.tag));
    encode_tlv(
        w,
        variant.tag,
        variant.name,
        variant.format,
        &value.value,
        log,
        level,
    )
}

fn encode_tlv(
    w: &mut TLVWriter,
    tag: u8,
    name: &str,
    format: &'static Format,
    value: &Value,
    log: &mut LogBuilder,
    level: usize,
) -> Result<(), Error> {
    if format.is_aggregate() {
        log.append_to_log(tag, name, format, None, level);
        w.append_nested(tag, |sub| {
            encode_aggregate(sub, format, value, log, level + 1)
        })
    } else {
        log.append_to_log(tag, name, format, Some(value), level);
        let len = encode_scalar(tag, name, format, value, w.scratch_for_tlv())?;
        w.finalize_scratch(tag, len)
    }
}

fn ensure_space(tag: u8, name: &str, buf: &[u8], len: usize) -> Result<(), Error> {
    if buf.len() < len {
        info!("[{:02X} {}] Not enough space to encode value.", tag, name);
        return Err(Error::OutOfResources);
    }
    Ok(())
}

fn put_bytes(tag: u8, name: &str, buf: &mut [u8], bytes: &[u8]) -> Result<usize, Error> {
    ensure_space(tag, name, buf, bytes.len())?;
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}

fn assert_range<T: PartialOrd + fmt::Display>(tag: u8, name: &str, v: T, min: T, max: T) {
    assert!(
        v >= min && v <= max,
        "[{:02X} {}] Value {} outside of range [{}, {}]",
        tag,
        name,
        v,
        min,
        max
    );
}

macro_rules! encode_int {
    ($tag:expr, $name:expr, $buf:expr, $f:expr, $v:expr, $size:expr, $write:expr) => {{
        assert_range($tag, $name, $v, $f.min, $f.max);
        ensure_space($tag, $name, $buf, $size)?;
        $write(&mut $buf[..$size], $v);
        Ok($size)
    }};
}

// Integers are always written at their full width
fn encode_scalar(
    tag: u8,
    name: &str,
    format: &'static Format,
    value: &Value,
    buf: &mut [u8],
) -> Result<usize, Error> {
    match (format, value) {
        (Format::Enum(f), Value::Enum(v)) => {
            assert!((f.is_valid)(*v), "[{:02X} {}] Value {} invalid", tag, name, v);
            put_bytes(tag, name, buf, &[*v])
        }
        (Format::UInt8(f), Value::UInt8(v)) => {
            encode_int!(tag, name, buf, f, *v, 1, |b: &mut [u8], v: u8| b[0] = v)
        }
        (Format::UInt16(f), Value::UInt16(v)) => {
            encode_int!(tag, name, buf, f, *v, 2, LittleEndian::write_u16)
        }
        (Format::UInt32(f), Value::UInt32(v)) => {
            encode_int!(tag, name, buf, f, *v, 4, LittleEndian::write_u32)
        }
        (Format::UInt64(f), Value::UInt64(v)) => {
            encode_int!(tag, name, buf, f, *v, 8, LittleEndian::write_u64)
        }
        (Format::Int8(f), Value::Int8(v)) => {
            encode_int!(tag, name, buf, f, *v, 1, |b: &mut [u8], v: i8| b[0] = v as u8)
        }
        (Format::Int16(f), Value::Int16(v)) => {
            encode_int!(tag, name, buf, f, *v, 2, LittleEndian::write_i16)
        }
        (Format::Int32(f), Value::Int32(v)) => {
            encode_int!(tag, name, buf, f, *v, 4, LittleEndian::write_i32)
        }
        (Format::Int64(f), Value::Int64(v)) => {
            encode_int!(tag, name, buf, f, *v, 8, LittleEndian::write_i64)
        }
        (Format::Data(f), Value::Data(d)) => {
            assert_range(tag, name, d.len(), f.min_len, f.max_len);
            put_bytes(tag, name, buf, d)
        }
        (Format::String(f), Value::String(s)) => {
            assert_range(tag, name, s.len(), f.min_len, f.max_len);
            assert!(
                !s.as_bytes().contains(&0),
                "[{:02X} {}] Value contains a NUL character",
                tag,
                name
            );
            if let Some(is_valid) = f.is_valid {
                assert!(is_valid(s), "[{:02X} {}] Value invalid", tag, name);
            }
            put_bytes(tag, name, buf, s.as_bytes())
        }
        (Format::Value(codec), Value::Custom(c)) => {
            let len = codec.encode(c, buf)?;
            assert!(len <= buf.len(), "[{:02X} {}] Value codec overflow", tag, name);
            Ok(len)
        }
        _ => mismatch(format, value),
    }
}
