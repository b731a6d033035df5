use std::net::{Ipv4Addr, Ipv6Addr};

use hap_tlv::{error::Error, tlv::*};

mod common;
use common::*;

fn kitchen() -> StructValue<'static> {
    client(7, ipv4(192, 168, 1, 20))
        .set("name", Value::String("Kitchen"))
        .build()
}

fn hallway() -> StructValue<'static> {
    client(8, ipv6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)))
        .set("key", Value::Data(&[1, 2, 3]))
        .build()
}

#[test]
fn test_round_trip() {
    init();
    let config = StructValue::builder(&CONFIG)
        .set(
            "clients",
            Value::Sequence(Sequence::from_values(vec![
                Value::Struct(kitchen()),
                Value::Struct(hallway()),
            ])),
        )
        .set("level", Value::UInt8(4))
        .build();

    let bytes = encode(&CONFIG, &Value::Struct(config));
    print_tlv_list(&bytes);
    assert_eq!(bytes.len(), 61);
    // The clients sequence holds two items and a separator
    assert_eq!(&bytes[..2], [0x01, 56]);
    assert_eq!(
        &bytes[2..10],
        [0x01, 21, 0x03, 0x04, 0x07, 0x00, 0x00, 0x00]
    );
    assert_eq!(&bytes[25..29], [0x00, 0x00, 0x01, 29]);
    assert_eq!(&bytes[58..], [0x02, 0x01, 0x04]);

    let mut b = bytes.clone();
    let mut config = into_struct(TLVReader::from_slice(&mut b).decode(&CONFIG).unwrap());
    assert_eq!(config.get("level"), Some(&Value::UInt8(4)));
    let clients: Vec<Value> = config
        .take("clients")
        .and_then(Value::into_sequence)
        .and_then(Sequence::decoded)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        clients,
        vec![Value::Struct(kitchen()), Value::Struct(hallway())]
    );
}

#[test]
fn test_out_of_order() {
    init();
    let mut b = [0x01, 0x04, 192, 168, 1, 20, 0x03, 0x04, 0x07, 0x00, 0x00, 0x00];
    let value = into_struct(TLVReader::from_slice(&mut b).decode(&CLIENT).unwrap());
    assert_eq!(value, client(7, ipv4(192, 168, 1, 20)).build());
}

#[test]
fn test_unknown_tags_ignored() {
    init();
    let mut b = [
        0x7e, 0x02, 0xaa, 0xbb, 0x03, 0x01, 0x07, 0x01, 0x04, 10, 0, 0, 1,
    ];
    let value = into_struct(TLVReader::from_slice(&mut b).decode(&CLIENT).unwrap());
    assert_eq!(value.get("identifier"), Some(&Value::UInt32(7)));
    assert_eq!(
        value
            .get("address")
            .and_then(|a| a.as_union())
            .and_then(|u| u.value.as_custom::<Ipv4Addr>()),
        Some(&Ipv4Addr::new(10, 0, 0, 1))
    );
}

#[test]
fn test_duplicate_tag() {
    init();
    let mut b = [
        0x03, 0x01, 0x07, 0x01, 0x04, 10, 0, 0, 1, 0x03, 0x01, 0x08,
    ];
    assert_eq!(
        TLVReader::from_slice(&mut b).decode(&CLIENT),
        Err(Error::InvalidData)
    );
}

#[test]
fn test_union_exclusive() {
    init();
    let mut none = [0x03, 0x01, 0x07];
    assert_eq!(
        TLVReader::from_slice(&mut none).decode(&CLIENT),
        Err(Error::InvalidData)
    );

    let mut both = vec![0x03, 0x01, 0x07, 0x01, 0x04, 10, 0, 0, 1, 0x02, 0x10];
    both.extend_from_slice(&[0; 16]);
    assert_eq!(
        TLVReader::from_slice(&mut both).decode(&CLIENT),
        Err(Error::InvalidData)
    );

    let mut one = vec![0x03, 0x01, 0x07, 0x02, 0x10];
    one.extend_from_slice(&[0; 16]);
    let value = into_struct(TLVReader::from_slice(&mut one).decode(&CLIENT).unwrap());
    assert_eq!(value.get("address").and_then(|a| a.as_union()).map(|u| u.tag), Some(0x02));
}

#[test]
fn test_range() {
    init();
    let mut b = [0x01, 0x00, 0x02, 0x01, 0x0b];
    assert_eq!(
        TLVReader::from_slice(&mut b).decode(&CONFIG),
        Err(Error::InvalidData)
    );

    let mut b = [0x01, 0x00, 0x02, 0x01, 0x0a];
    let config = into_struct(TLVReader::from_slice(&mut b).decode(&CONFIG).unwrap());
    assert_eq!(config.get("level"), Some(&Value::UInt8(10)));
}

#[test]
fn test_string_validator() {
    init();
    let mut b = [
        0x03, 0x01, 0x07, 0x04, 0x02, b' ', b'x', 0x01, 0x04, 10, 0, 0, 1,
    ];
    assert_eq!(
        TLVReader::from_slice(&mut b).decode(&CLIENT),
        Err(Error::InvalidData)
    );
}

#[test]
fn test_formats_valid() {
    assert!(CLIENT.is_valid());
    assert!(CONFIG.is_valid());
    assert!(HOST_LIST.is_valid());
    assert!(!COLLIDING.is_valid());
}

#[test]
#[should_panic]
fn test_colliding_format() {
    let mut b = [0x01, 0x04, 10, 0, 0, 1];
    let _ = TLVReader::from_slice(&mut b).decode(&COLLIDING);
}

#[test]
fn test_flat_sequence() {
    init();
    let hosts = Value::Sequence(Sequence::from_values(vec![
        ipv4(10, 0, 0, 1),
        ipv6(Ipv6Addr::LOCALHOST),
        ipv4(10, 0, 0, 2),
    ]));
    let bytes = encode(&HOST_LIST, &hosts);
    assert_eq!(bytes.len(), 34);
    assert_eq!(&bytes[..8], [0x01, 0x04, 10, 0, 0, 1, 0xff, 0x00]);
    assert_eq!(&bytes[8..10], [0x02, 0x10]);
    assert_eq!(&bytes[26..], [0xff, 0x00, 0x01, 0x04, 10, 0, 0, 2]);

    let mut b = bytes.clone();
    let items: Vec<Value> = TLVReader::from_slice(&mut b)
        .decode(&HOST_LIST)
        .unwrap()
        .into_sequence()
        .and_then(Sequence::decoded)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        items,
        vec![
            ipv4(10, 0, 0, 1),
            ipv6(Ipv6Addr::LOCALHOST),
            ipv4(10, 0, 0, 2)
        ]
    );
}

#[test]
fn test_sequence_skips_unknown() {
    init();
    let mut b = [
        0x01, 0x04, 10, 0, 0, 1, 0x7e, 0x01, 0x00, 0xff, 0x00, 0x01, 0x04, 10, 0, 0, 2,
    ];
    let items = TLVReader::from_slice(&mut b)
        .decode(&HOST_LIST)
        .unwrap()
        .into_sequence()
        .and_then(Sequence::decoded)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(items, vec![ipv4(10, 0, 0, 1), ipv4(10, 0, 0, 2)]);
}

#[test]
fn test_sequence_item_invalid() {
    init();
    let mut b = [0x01, 0x04, 10, 0, 0, 1, 0xff, 0x00, 0x01, 0x03, 1, 2, 3];
    let mut items = TLVReader::from_slice(&mut b)
        .decode(&HOST_LIST)
        .unwrap()
        .into_sequence()
        .and_then(Sequence::decoded)
        .unwrap();
    assert_eq!(items.next(), Some(Ok(ipv4(10, 0, 0, 1))));
    assert_eq!(items.next(), Some(Err(Error::InvalidData)));
    assert_eq!(items.next(), None);
}

#[test]
fn test_out_of_resources() {
    init();
    let named = Value::Struct(
        client(1, ipv4(10, 0, 0, 1))
            .set("name", Value::String("Living room"))
            .build(),
    );
    let plain = Value::Struct(client(1, ipv4(10, 0, 0, 1)).build());

    let mut buf = [0; 20];
    let mut wb = TLVWriter::new(&mut buf);
    assert_eq!(wb.encode(&CLIENT, &named), Err(Error::OutOfResources));
    wb.reset();
    assert_eq!(wb.encode(&CLIENT, &plain), Ok(()));
    assert_eq!(
        wb.as_slice(),
        [0x03, 0x04, 0x01, 0x00, 0x00, 0x00, 0x01, 0x04, 10, 0, 0, 1]
    );
}

#[test]
#[should_panic]
fn test_reuse_after_failure() {
    let plain = Value::Struct(client(1, ipv4(10, 0, 0, 1)).build());
    let mut buf = [0; 8];
    let mut wb = TLVWriter::new(&mut buf);
    assert_eq!(wb.encode(&CLIENT, &plain), Err(Error::OutOfResources));
    let _ = wb.encode(&CLIENT, &plain);
}

#[test]
fn test_flat_struct_member() {
    init();
    let inner = StructValue::builder(&FLAT_INNER)
        .set("b", Value::UInt8(2))
        .build();
    let outer = Value::Struct(
        StructValue::builder(&FLAT_OUTER)
            .set("a", Value::UInt8(1))
            .set("inner", Value::Struct(inner))
            .build(),
    );
    let bytes = encode(&FLAT_OUTER, &outer);
    assert_eq!(bytes, [0x01, 0x01, 0x01, 0x02, 0x01, 0x02]);

    let mut b = bytes.clone();
    let decoded = TLVReader::from_slice(&mut b).decode(&FLAT_OUTER).unwrap();
    assert_eq!(decoded, outer);
}

#[test]
fn test_flat_struct_member_out_of_order() {
    init();
    let mut b = [0x03, 0x01, 0x07, 0x02, 0x01, 0x02, 0x01, 0x01, 0x01];
    let outer = into_struct(TLVReader::from_slice(&mut b).decode(&FLAT_OUTER).unwrap());
    assert_eq!(outer.get("a"), Some(&Value::UInt8(1)));
    let inner = outer.get("inner").and_then(|v| v.as_struct()).unwrap();
    assert_eq!(inner.get("b"), Some(&Value::UInt8(2)));
    assert_eq!(inner.get("c"), Some(&Value::UInt8(7)));
}

#[test]
fn test_flat_struct_member_missing() {
    init();
    let mut b = [0x01, 0x01, 0x01, 0x03, 0x01, 0x07];
    assert_eq!(
        TLVReader::from_slice(&mut b).decode(&FLAT_OUTER),
        Err(Error::InvalidData)
    );
}

#[test]
fn test_nested_sequence_bad_framing() {
    init();
    // The only client claims 9 bytes but has 1
    let mut b = [0x01, 0x03, 0x01, 0x09, 0xaa];
    assert_eq!(
        TLVReader::from_slice(&mut b).decode(&CONFIG),
        Err(Error::InvalidData)
    );

    let mut b = [0x01, 0x01, 0x02, 0x00, 0x00, 0x01, 0x05, 0x03];
    assert_eq!(
        TLVReader::from_slice(&mut b).decode(&HOST_LIST),
        Err(Error::InvalidData)
    );
}

#[test]
fn test_source_sequences_compare_by_items() {
    let hosts = || {
        Value::Sequence(Sequence::from_values(vec![
            ipv4(10, 0, 0, 1),
            ipv6(Ipv6Addr::LOCALHOST),
        ]))
    };
    assert_eq!(hosts(), hosts());
    assert_ne!(
        hosts(),
        Value::Sequence(Sequence::from_values(vec![ipv4(10, 0, 0, 1)]))
    );
}
