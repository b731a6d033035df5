use std::fmt::{self, Write};

use super::{Custom, Format, IntFormat, ValueCodec, Value, MAX_DESCRIPTION_BYTES, MAX_LOG_BYTES};
use log::{debug, error};

/// Bounded, human readable trace of a decoded or encoded value.
///
/// Text beyond [`MAX_LOG_BYTES`] is dropped and the log is marked as
/// overflowed.
pub struct LogBuilder {
    buf: heapless::String<MAX_LOG_BYTES>,
    overflowed: bool,
}

impl LogBuilder {
    pub fn new() -> Self {
        LogBuilder {
            buf: heapless::String::new(),
            overflowed: false,
        }
    }

    pub fn as_str(&self) -> &str {
        self.buf.as_str()
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Add an entry for the TLV `tag` at nesting depth `level`.
    ///
    /// Aggregates only get a header line, their members are added as they
    /// are processed.
    pub fn append_to_log(
        &mut self,
        tag: u8,
        name: &str,
        format: &Format,
        value: Option<&Value>,
        level: usize,
    ) {
        let _ = self.write_entry(tag, name, format, value, level);
    }

    fn write_entry(
        &mut self,
        tag: u8,
        name: &str,
        format: &Format,
        value: Option<&Value>,
        level: usize,
    ) -> fmt::Result {
        self.write_str("\n")?;
        for _ in 0..level {
            self.write_str("  ")?;
        }
        write!(self, "- [{:02X} {}] ", tag, name)?;

        if let Format::Sequence(_) = format {
            return self.write_str("<Sequence>");
        }
        let value = match value {
            Some(v) => v,
            None => return Ok(()),
        };
        match (format, value) {
            (Format::Enum(f), Value::Enum(v)) => write!(self, "{} ({})", (f.description)(*v), v),
            (Format::UInt8(f), Value::UInt8(v)) => self.write_u8(f, *v),
            (Format::UInt16(f), Value::UInt16(v)) => self.write_u16(f, *v),
            (Format::UInt32(f), Value::UInt32(v)) => self.write_u32(f, *v),
            (Format::UInt64(f), Value::UInt64(v)) => self.write_u64(f, *v),
            (Format::Int8(f), Value::Int8(v)) => self.write_i8(f, *v),
            (Format::Int16(f), Value::Int16(v)) => self.write_i16(f, *v),
            (Format::Int32(f), Value::Int32(v)) => self.write_i32(f, *v),
            (Format::Int64(f), Value::Int64(v)) => self.write_i64(f, *v),
            (Format::Data(_), Value::Data(d)) => self.write_data(d),
            (Format::String(_), Value::String(s)) => self.write_str(s),
            (Format::Value(codec), Value::Custom(c)) => self.write_custom(*codec, c),
            _ => Ok(()),
        }
    }

    fn write_data(&mut self, data: &[u8]) -> fmt::Result {
        self.write_str("<")?;
        for (i, b) in data.iter().enumerate() {
            if i != 0 && i % 4 == 0 {
                self.write_str(" ")?;
            }
            write!(self, "{:02X}", b)?;
        }
        self.write_str(">")
    }

    fn write_custom(&mut self, codec: &dyn ValueCodec, value: &Custom) -> fmt::Result {
        let mut description: heapless::String<MAX_DESCRIPTION_BYTES> = heapless::String::new();
        match codec.describe(value, &mut description) {
            Ok(()) => self.write_str(&description),
            Err(_) => self.write_str("<Description too long>"),
        }
    }

    /// Emit the log at debug level under `title`
    pub fn flush(&self, title: &str) {
        if self.overflowed {
            error!("Logs were truncated.");
        }
        debug!("{}:{}", title, self.buf);
    }
}

// Use the value description if there is one, else list the names of the set
// bits, else just print the number
macro_rules! write_int_for {
    ($($name:ident: $t:ty),*) => {
        $(
            fn $name(&mut self, f: &IntFormat<$t>, v: $t) -> fmt::Result {
                if let Some(description) = f.description.and_then(|d| d(v)) {
                    return write!(self, "{} ({})", description, v);
                }
                if let Some(bit_description) = f.bit_description {
                    self.write_str("[")?;
                    let mut needs_separator = false;
                    for i in 0..<$t>::BITS {
                        let option: $t = 1 << i;
                        if v & option == 0 {
                            continue;
                        }
                        if needs_separator {
                            self.write_str(", ")?;
                        }
                        needs_separator = true;
                        match bit_description(option) {
                            Some(d) => self.write_str(d)?,
                            None => self.write_str("<Unknown bit>")?,
                        }
                        write!(self, " (bit {})", i)?;
                    }
                    return self.write_str("]");
                }
                write!(self, "{}", v)
            }
        )*
    };
}

impl LogBuilder {
    write_int_for!(
        write_u8: u8,
        write_u16: u16,
        write_u32: u32,
        write_u64: u64,
        write_i8: i8,
        write_i16: i16,
        write_i32: i32,
        write_i64: i64
    );
}

impl Default for LogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for LogBuilder {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.overflowed {
            return Ok(());
        }
        for c in s.chars() {
            if self.buf.push(c).is_err() {
                self.overflowed = true;
                break;
            }
        }
        Ok(())
    }
}

impl fmt::Display for LogBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.buf)
    }
}

#[cfg(test)]
mod tests {
    use crate::tlv::*;
    use std::fmt::Write;

    fn lock_state(v: u8) -> &'static str {
        match v {
            0 => "Unsecured",
            1 => "Secured",
            _ => "Unknown",
        }
    }

    fn is_lock_state(v: u8) -> bool {
        v <= 1
    }

    fn feature_bit(v: u16) -> Option<&'static str> {
        match v {
            0x0001 => Some("Pairing"),
            0x0004 => Some("Notifications"),
            _ => None,
        }
    }

    fn level_name(v: i8) -> Option<&'static str> {
        if v == 0 {
            Some("Neutral")
        } else {
            None
        }
    }

    static STATE: Format = Format::Enum(EnumFormat::new(is_lock_state, lock_state));
    static FEATURES: Format =
        Format::UInt16(IntFormat::<u16>::full().with_bit_description(feature_bit));
    static LEVEL: Format = Format::Int8(IntFormat::<i8>::full().with_description(level_name));

    #[test]
    fn test_scalars() {
        let mut log = LogBuilder::new();
        log.append_to_log(0x01, "state", &STATE, Some(&Value::Enum(1)), 0);
        log.append_to_log(0x02, "features", &FEATURES, Some(&Value::UInt16(0x000d)), 1);
        log.append_to_log(0x03, "level", &LEVEL, Some(&Value::Int8(0)), 1);
        log.append_to_log(0x04, "level", &LEVEL, Some(&Value::Int8(-3)), 2);
        log.append_to_log(0x05, "count", &UINT32, Some(&Value::UInt32(70000)), 0);
        assert_eq!(
            log.as_str(),
            "\n- [01 state] Secured (1)\
             \n  - [02 features] [Pairing (bit 0), Notifications (bit 2), <Unknown bit> (bit 3)]\
             \n  - [03 level] Neutral (0)\
             \n    - [04 level] -3\
             \n- [05 count] 70000"
        );
        assert!(!log.overflowed());
    }

    #[test]
    fn test_data_and_string() {
        let mut log = LogBuilder::new();
        log.append_to_log(0x0a, "key", &DATA, Some(&Value::Data(&[1, 2, 3, 4, 5, 0xab])), 0);
        log.append_to_log(0x0b, "name", &STRING, Some(&Value::String("Door")), 0);
        log.append_to_log(0x0c, "empty", &DATA, Some(&Value::Data(&[])), 0);
        assert_eq!(
            log.as_str(),
            "\n- [0A key] <01020304 05AB>\n- [0B name] Door\n- [0C empty] <>"
        );
    }

    #[test]
    fn test_aggregates() {
        static ITEMS: Format = Format::Sequence(SequenceFormat {
            item: SequenceItem::new(0x01, "item", &UINT8),
            separator: SequenceSeparator::new(0x00, "separator", &SEPARATOR),
        });
        let mut log = LogBuilder::new();
        log.append_to_log(0x07, "items", &ITEMS, None, 0);
        log.append_to_log(0x08, "address", &IP_ADDRESS_EXAMPLE, None, 1);
        assert_eq!(log.as_str(), "\n- [07 items] <Sequence>\n  - [08 address] ");
    }

    static IP_ADDRESS_EXAMPLE: Format = Format::Union(UnionFormat {
        variants: &[UnionVariant::new(0x01, "ipv4", &IPV4_ADDRESS)],
    });

    #[test]
    fn test_custom() {
        let mut log = LogBuilder::new();
        let mac = Value::Custom(Custom::new(MacAddress([0, 0x11, 0x22, 0x33, 0x44, 0xff])));
        log.append_to_log(0x01, "mac", &MAC_ADDRESS, Some(&mac), 0);
        assert_eq!(log.as_str(), "\n- [01 mac] 00:11:22:33:44:FF");
    }

    struct Verbose;

    impl ValueCodec for Verbose {
        fn decode(&self, _bytes: &[u8]) -> Result<Custom, crate::error::Error> {
            Ok(Custom::new(0u8))
        }

        fn encode(&self, _value: &Custom, _buf: &mut [u8]) -> Result<usize, crate::error::Error> {
            Ok(0)
        }

        fn describe(&self, _value: &Custom, f: &mut dyn std::fmt::Write) -> std::fmt::Result {
            for _ in 0..300 {
                f.write_char('x')?;
            }
            Ok(())
        }
    }

    static VERBOSE: Format = Format::Value(&Verbose);

    #[test]
    fn test_description_too_long() {
        let mut log = LogBuilder::new();
        log.append_to_log(0x01, "v", &VERBOSE, Some(&Value::Custom(Custom::new(0u8))), 0);
        assert_eq!(log.as_str(), "\n- [01 v] <Description too long>");
    }

    #[test]
    fn test_overflow() {
        let mut log = LogBuilder::new();
        let data = [0x5a; 600];
        log.append_to_log(0x01, "blob", &DATA, Some(&Value::Data(&data)), 0);
        assert!(log.overflowed());
        assert_eq!(log.as_str().len(), MAX_LOG_BYTES);
        assert!(log.as_str().starts_with("\n- [01 blob] <5A5A5A5A 5A5A"));
    }
}
