//! Format-driven TLV codec for accessory characteristic and control values.
//!
//! Values are described by `'static` [`tlv::Format`] graphs. A
//! [`tlv::TLVWriter`] encodes a [`tlv::Value`] tree against a format and a
//! [`tlv::TLVReader`] decodes one back, borrowing data and strings from the
//! input buffer.

pub mod error;
pub mod tlv;
