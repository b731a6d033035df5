use std::collections::BTreeMap;

use super::{Format, MAX_FRAGMENT_LEN, TLV, TLV_HEADER_LEN};
use crate::error::*;
use log::{info, trace};

/// Reads TLV items out of a caller provided buffer.
///
/// Fragmented values are reassembled in place, so the reader needs mutable
/// access to the buffer. Values handed out borrow from it.
pub struct TLVReader<'a> {
    // Unread data, followed by unused capacity
    buf: &'a mut [u8],
    left: usize,
}

impl<'a> TLVReader<'a> {
    /// `buf[..len]` holds TLV data, anything after that is scratch space
    pub fn new(buf: &'a mut [u8], len: usize) -> Self {
        assert!(len <= buf.len(), "TLV data longer than its buffer");
        TLVReader { buf, left: len }
    }

    pub fn from_slice(buf: &'a mut [u8]) -> Self {
        let len = buf.len();
        Self::new(buf, len)
    }

    /// Number of bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.left
    }

    pub fn is_empty(&self) -> bool {
        self.left == 0
    }

    /// Unused capacity after the unread data
    pub fn scratch(&mut self) -> &mut [u8] {
        &mut self.buf[self.left..]
    }

    /// Read the next TLV item, reassembling it if it is fragmented
    pub fn get_next(&mut self) -> Result<Option<TLV<'a>>, Error> {
        Ok(self
            .next_item()?
            .map(|(tag, value): (u8, &'a mut [u8])| TLV::new(tag, value)))
    }

    pub(crate) fn next_item(&mut self) -> Result<Option<(u8, &'a mut [u8])>, Error> {
        if self.left == 0 {
            return Ok(None);
        }
        let (consumed, value_len) = scan_run(&self.buf[..self.left])?;
        let buf = std::mem::take(&mut self.buf);
        let (item, rest) = buf.split_at_mut(consumed);
        self.buf = rest;
        self.left -= consumed;
        let tag = item[0];
        Ok(Some((tag, defragment(item, value_len))))
    }

    /// Check that the unread data is a well formed TLV list, without
    /// consuming or reassembling any of it
    pub fn check_framing(&self) -> Result<(), Error> {
        let mut pos = 0;
        while pos < self.left {
            let (consumed, _) = scan_run(&self.buf[pos..self.left])?;
            pos += consumed;
        }
        Ok(())
    }

    /// Read all remaining items, returning the value of each requested tag.
    ///
    /// Items with other tags are ignored, a requested tag that shows up twice
    /// is an error.
    pub fn get_all<const N: usize>(
        &mut self,
        tags: [u8; N],
    ) -> Result<[Option<&'a [u8]>; N], Error> {
        for (i, t) in tags.iter().enumerate() {
            assert!(!tags[..i].contains(t), "TLV [{:02X}] requested twice", t);
        }

        let mut values = [None; N];
        while let Some(tlv) = self.get_next()? {
            match tags.iter().position(|t| *t == tlv.tag) {
                Some(i) => {
                    if values[i].is_some() {
                        info!("[{:02X}] Duplicate TLV.", tlv.tag);
                        return Err(Error::InvalidData);
                    }
                    values[i] = Some(tlv.value);
                }
                None => info!("[{:02X}] TLV item ignored.", tlv.tag),
            }
        }
        Ok(values)
    }

    /// Consume the reader into an index for out of order lookups.
    ///
    /// Items with a tag that `format` never uses at this nesting level are
    /// logged and dropped.
    pub fn into_index(mut self, format: &Format) -> Result<TLVIndex<'a>, Error> {
        let tags = format.tags();
        let mut items: BTreeMap<u8, Vec<&'a mut [u8]>> = BTreeMap::new();
        while let Some((tag, value)) = self.next_item()? {
            if tags.contains(tag) {
                items.entry(tag).or_insert_with(Vec::new).push(value);
            } else {
                info!("[{:02X}] Ignored TLV.", tag);
                trace!("{:02x?}", value);
            }
        }
        Ok(TLVIndex { items })
    }
}

// Validate the fragmentation run at the start of `bytes`, returning the
// number of bytes it spans and its reassembled value length
fn scan_run(bytes: &[u8]) -> Result<(usize, usize), Error> {
    let tag = bytes[0];
    let mut pos = 0;
    let mut value_len = 0;
    loop {
        if bytes.len() - pos < TLV_HEADER_LEN {
            info!("[{:02X}] Incomplete TLV header.", tag);
            return Err(Error::InvalidData);
        }
        let frag_len = bytes[pos + 1] as usize;
        pos += TLV_HEADER_LEN;
        if bytes.len() - pos < frag_len {
            info!("[{:02X}] TLV value truncated.", tag);
            return Err(Error::InvalidData);
        }
        pos += frag_len;
        value_len += frag_len;
        if pos == bytes.len() || bytes[pos] != tag {
            break;
        }
        if frag_len != MAX_FRAGMENT_LEN {
            info!(
                "[{:02X}] TLV fragment follows a fragment of {} bytes.",
                tag, frag_len
            );
            return Err(Error::InvalidData);
        }
    }
    Ok((pos, value_len))
}

// Shift fragment bodies left over the headers. The freed tail is zeroed.
fn defragment(item: &mut [u8], value_len: usize) -> &mut [u8] {
    let mut read = 0;
    let mut write = 0;
    while read < item.len() {
        let frag_len = item[read + 1] as usize;
        let start = read + TLV_HEADER_LEN;
        item.copy_within(start..start + frag_len, write);
        write += frag_len;
        read = start + frag_len;
    }
    let (value, tail) = item.split_at_mut(value_len);
    for b in tail.iter_mut() {
        *b = 0;
    }
    value
}

/// Items of one nesting level, looked up by tag in any order
pub struct TLVIndex<'a> {
    items: BTreeMap<u8, Vec<&'a mut [u8]>>,
}

impl<'a> TLVIndex<'a> {
    /// Remove the item with `tag`. Finding more than one such item is an error.
    pub fn take(&mut self, tag: u8) -> Result<Option<&'a mut [u8]>, Error> {
        match self.items.remove(&tag) {
            None => Ok(None),
            Some(mut values) => {
                if values.len() > 1 {
                    info!("[{:02X}] Duplicate TLV.", tag);
                    Err(Error::InvalidData)
                } else {
                    Ok(values.pop())
                }
            }
        }
    }

    pub fn contains(&self, tag: u8) -> bool {
        self.items.contains_key(&tag)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Log all items of a TLV list
pub fn print_tlv_list(b: &[u8]) {
    let mut buf = b.to_vec();
    let mut reader = TLVReader::from_slice(&mut buf);

    info!("TLV list:");
    loop {
        match reader.get_next() {
            Ok(Some(tlv)) => info!("{}", tlv),
            Ok(None) => break,
            Err(e) => {
                info!("Invalid TLV list: {}", e);
                break;
            }
        }
    }
    info!("---------");
}
