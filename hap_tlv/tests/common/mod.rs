#![allow(dead_code)]

use std::net::{Ipv4Addr, Ipv6Addr};

use hap_tlv::tlv::*;

pub fn init() {
    let _ = env_logger::try_init();
}

fn is_client_name(s: &str) -> bool {
    !s.starts_with(' ')
}

pub static NAME: Format = Format::String(StringFormat::new(1, 64).with_validator(is_client_name));
pub static LEVEL: Format = Format::UInt8(IntFormat::<u8>::new(1, 10));

pub static IP_ADDRESS: Format = Format::Union(UnionFormat {
    variants: &[
        UnionVariant::new(0x01, "ipv4", &IPV4_ADDRESS),
        UnionVariant::new(0x02, "ipv6", &IPV6_ADDRESS),
    ],
});

pub static CLIENT: Format = Format::Struct(StructFormat {
    members: &[
        StructMember::new(0x03, "identifier", &UINT32),
        StructMember::new(0x04, "name", &NAME).optional(),
        StructMember::new(0x05, "key", &DATA).optional(),
        StructMember::new(0x06, "mac", &MAC_ADDRESS).optional(),
        StructMember::flat("address", &IP_ADDRESS),
    ],
    is_valid: None,
});

pub static CLIENT_LIST: Format = Format::Sequence(SequenceFormat {
    item: SequenceItem::new(0x01, "client", &CLIENT),
    separator: SequenceSeparator::new(0x00, "separator", &SEPARATOR),
});

pub static CONFIG: Format = Format::Struct(StructFormat {
    members: &[
        StructMember::new(0x01, "clients", &CLIENT_LIST),
        StructMember::new(0x02, "level", &LEVEL).optional(),
    ],
    is_valid: None,
});

pub static HOST_LIST: Format = Format::Sequence(SequenceFormat {
    item: SequenceItem::flat("host", &IP_ADDRESS),
    separator: SequenceSeparator::new(0xff, "separator", &SEPARATOR),
});

pub static FLAT_INNER: Format = Format::Struct(StructFormat {
    members: &[
        StructMember::new(0x02, "b", &UINT8),
        StructMember::new(0x03, "c", &UINT8).optional(),
    ],
    is_valid: None,
});

pub static FLAT_OUTER: Format = Format::Struct(StructFormat {
    members: &[
        StructMember::new(0x01, "a", &UINT8),
        StructMember::flat("inner", &FLAT_INNER),
    ],
    is_valid: None,
});

// Member 0x01 collides with the ipv4 variant of the flattened address
pub static COLLIDING: Format = Format::Struct(StructFormat {
    members: &[
        StructMember::new(0x01, "identifier", &UINT32),
        StructMember::flat("address", &IP_ADDRESS),
    ],
    is_valid: None,
});

pub fn ipv4(a: u8, b: u8, c: u8, d: u8) -> Value<'static> {
    Value::Union(UnionValue::new(
        0x01,
        Value::Custom(Custom::new(Ipv4Addr::new(a, b, c, d))),
    ))
}

pub fn ipv6(addr: Ipv6Addr) -> Value<'static> {
    Value::Union(UnionValue::new(0x02, Value::Custom(Custom::new(addr))))
}

pub fn client<'a>(identifier: u32, address: Value<'a>) -> StructBuilder<'a> {
    StructValue::builder(&CLIENT)
        .set("identifier", Value::UInt32(identifier))
        .set("address", address)
}

/// Encode `value` into a fresh buffer and return the bytes written
pub fn encode(format: &'static Format, value: &Value) -> Vec<u8> {
    let mut buf = vec![0; 4096];
    let mut wb = TLVWriter::new(&mut buf);
    wb.encode(format, value).unwrap();
    wb.as_slice().to_vec()
}

pub fn into_struct<'a>(value: Value<'a>) -> StructValue<'a> {
    match value {
        Value::Struct(s) => s,
        v => panic!("Expected a struct, got {:?}", v),
    }
}
