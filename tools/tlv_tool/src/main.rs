extern crate clap;
use clap::{App, Arg};
use hap_tlv::tlv::{self, TLVReader};
use simple_logger::SimpleLogger;
use std::process;
use std::u8;

const MAX_INPUT_BYTES: usize = 1024;

// A value counts as nested if it is a non-empty, well formed TLV list
fn is_tlv_list(value: &[u8]) -> bool {
    if value.is_empty() {
        return false;
    }
    let mut copy = value.to_vec();
    let mut reader = TLVReader::from_slice(&mut copy);
    loop {
        match reader.get_next() {
            Ok(Some(_)) => (),
            Ok(None) => return true,
            Err(_) => return false,
        }
    }
}

fn print_nested(buf: &mut [u8], depth: usize) {
    let mut reader = TLVReader::from_slice(buf);
    loop {
        match reader.get_next() {
            Ok(Some(tlv)) => {
                println!("{:width$}{}", "", tlv, width = depth * 2);
                if is_tlv_list(tlv.value) {
                    print_nested(&mut tlv.value.to_vec(), depth + 1);
                }
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("Invalid TLV list: {}", e);
                break;
            }
        }
    }
}

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Trace)
        .with_colors(true)
        .without_timestamps()
        .init()
        .unwrap();

    let m = App::new("tlv_tool")
        .arg(
            Arg::with_name("hex")
                .short("h")
                .long("hex")
                .help("The input is in Hexadecimal (Default)"),
        )
        .arg(
            Arg::with_name("dec")
                .short("d")
                .long("dec")
                .help("The input is in Decimal"),
        )
        .arg(
            Arg::with_name("nested")
                .short("n")
                .long("nested")
                .help("Also list the items of values that are TLV lists"),
        )
        .arg(Arg::with_name("tlvs").help("List of TLVs").required(true))
        .get_matches();

    // Assume hexadecimal by-default
    let base = if m.is_present("dec") { 10 } else { 16 };

    let list = m.value_of("tlvs").unwrap().split_whitespace();
    let mut tlv_list: [u8; MAX_INPUT_BYTES] = [0; MAX_INPUT_BYTES];
    let mut index = 0;
    for byte in list {
        if index >= MAX_INPUT_BYTES {
            eprintln!("Input too long");
            process::exit(1);
        }
        let byte = byte.strip_prefix("0x").unwrap_or(byte);
        let byte = byte.strip_suffix(',').unwrap_or(byte);
        if let Ok(b) = u8::from_str_radix(byte, base) {
            tlv_list[index] = b;
            index += 1;
        } else {
            eprintln!("Error parsing input byte: {}", byte);
            process::exit(1);
        }
    }

    if m.is_present("nested") {
        print_nested(&mut tlv_list[..index], 0);
    } else {
        tlv::print_tlv_list(&tlv_list[..index]);
    }
}
