use super::{MAX_FRAGMENT_LEN, TLV_HEADER_LEN};
use crate::error::*;
use log::{debug, info};

/// Serializes TLV items into a caller provided buffer.
///
/// Values longer than [`MAX_FRAGMENT_LEN`] are split into a run of same-tag
/// fragments. Two items with the same tag may therefore never be appended
/// back to back, as they would be merged on the receiving side.
pub struct TLVWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
    last_tag: u8,
    failed: bool,
}

impl<'a> TLVWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        TLVWriter {
            buf,
            len: 0,
            last_tag: 0,
            failed: false,
        }
    }

    pub fn reset(&mut self) {
        self.len = 0;
        self.last_tag = 0;
        self.failed = false;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn into_slice(self) -> &'a [u8] {
        let buf: &'a [u8] = self.buf;
        &buf[..self.len]
    }

    pub fn log_buffer(&self, name: &str) {
        debug!("{}: {:02x?}", name, self.as_slice());
    }

    fn check_append(&self, tag: u8) {
        assert!(
            !self.failed,
            "TLV writer reused after running out of resources"
        );
        assert!(
            self.len == 0 || tag != self.last_tag,
            "TLV [{:02X}] appended right after a TLV with the same tag",
            tag
        );
    }

    fn out_of_resources(&mut self) -> Error {
        info!("Not enough space to serialize TLV.");
        self.failed = true;
        Error::OutOfResources
    }

    pub(crate) fn mark_failed(&mut self) {
        self.failed = true;
    }

    /// Append a TLV item, fragmenting the value if required
    pub fn append(&mut self, tag: u8, value: &[u8]) -> Result<(), Error> {
        self.check_append(tag);

        // An empty value still produces a single empty fragment
        let mut rest = value;
        loop {
            let frag_len = rest.len().min(MAX_FRAGMENT_LEN);
            if self.buf.len() - self.len < TLV_HEADER_LEN + frag_len {
                return Err(self.out_of_resources());
            }
            let (frag, tail) = rest.split_at(frag_len);
            let start = self.len + TLV_HEADER_LEN;
            self.buf[self.len] = tag;
            self.buf[self.len + 1] = frag_len as u8;
            self.buf[start..start + frag_len].copy_from_slice(frag);
            self.len = start + frag_len;
            rest = tail;
            if rest.is_empty() {
                break;
            }
        }
        self.last_tag = tag;
        Ok(())
    }

    /// Copy already serialized TLV items ending with `last_tag`
    pub fn extend(&mut self, bytes: &[u8], last_tag: u8) -> Result<(), Error> {
        assert!(
            !self.failed,
            "TLV writer reused after running out of resources"
        );
        if bytes.is_empty() {
            return Ok(());
        }
        if self.buf.len() - self.len < bytes.len() {
            return Err(self.out_of_resources());
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        self.last_tag = last_tag;
        Ok(())
    }

    /// All of the remaining capacity
    pub fn scratch(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    // Offset and length of the area a TLV value can be staged in, leaving
    // room for the headers of every fragment it may need
    fn tlv_scratch_range(&self) -> (usize, usize) {
        let max = self.buf.len() - self.len;
        let full = MAX_FRAGMENT_LEN + TLV_HEADER_LEN;
        if max < TLV_HEADER_LEN {
            (self.len, 0)
        } else if max <= full {
            (self.len + TLV_HEADER_LEN, max - TLV_HEADER_LEN)
        } else {
            let fragments = (max + full - 1) / full;
            let last = (max - full * (fragments - 1)).saturating_sub(TLV_HEADER_LEN);
            (
                self.len + TLV_HEADER_LEN,
                MAX_FRAGMENT_LEN * (fragments - 1) + last,
            )
        }
    }

    /// Space to stage a TLV value in before calling [`Self::finalize_scratch`]
    pub fn scratch_for_tlv(&mut self) -> &mut [u8] {
        let (start, len) = self.tlv_scratch_range();
        &mut self.buf[start..start + len]
    }

    /// Turn the first `len` bytes staged in [`Self::scratch_for_tlv`] into a
    /// TLV item, inserting fragment headers in place.
    pub fn finalize_scratch(&mut self, tag: u8, len: usize) -> Result<(), Error> {
        self.check_append(tag);
        assert!(
            len <= self.tlv_scratch_range().1,
            "TLV value larger than the scratch space"
        );

        let mut pos = self.len;
        let mut left = len;
        if self.buf.len() - pos < TLV_HEADER_LEN {
            return Err(self.out_of_resources());
        }
        loop {
            let frag_len = left.min(MAX_FRAGMENT_LEN);
            self.buf[pos] = tag;
            self.buf[pos + 1] = frag_len as u8;
            pos += TLV_HEADER_LEN + frag_len;
            left -= frag_len;
            if left == 0 {
                break;
            }
            if self.buf.len() - pos < TLV_HEADER_LEN + left {
                return Err(self.out_of_resources());
            }
            // Open a gap for the next fragment header
            self.buf.copy_within(pos..pos + left, pos + TLV_HEADER_LEN);
        }
        self.len = pos;
        self.last_tag = tag;
        Ok(())
    }

    /// A writer over the TLV scratch space, for building a nested value
    /// that is then wrapped with [`Self::finalize_sub_writer`].
    pub fn sub_writer(&mut self) -> TLVWriter<'_> {
        let (start, len) = self.tlv_scratch_range();
        let len = if len < TLV_HEADER_LEN { 0 } else { len };
        TLVWriter::new(&mut self.buf[start..start + len])
    }

    pub fn finalize_sub_writer(&mut self, tag: u8, len: usize) -> Result<(), Error> {
        self.finalize_scratch(tag, len)
    }

    /// Build a nested value with `f` and append it under `tag`
    pub fn append_nested<F>(&mut self, tag: u8, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut TLVWriter) -> Result<(), Error>,
    {
        let result = {
            let mut sub = self.sub_writer();
            f(&mut sub).map(|()| sub.len())
        };
        match result {
            Ok(len) => self.finalize_sub_writer(tag, len),
            Err(e) => {
                if e == Error::OutOfResources {
                    self.mark_failed();
                }
                Err(e)
            }
        }
    }
}
