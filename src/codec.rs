//! Compact serialization.
//!
//! The stream is a 12-byte little-endian header followed by the raw buffer:
//!
//! | offset | size | field                   |
//! |--------|------|-------------------------|
//! | 0      | 4    | length in bits (i32)    |
//! | 4      | 4    | word count (i32)        |
//! | 8      | 4    | active marker pos (i32) |
//! | 12     | 8×n  | buffer words (u64)      |
//!
//! Integers are little-endian regardless of host byte order. There is no
//! version tag, magic number or checksum; the reader validates only the
//! header bounds and the marker chain.

use crate::bitmap::Bitmap;
use crate::error::{Error, Result};
use crate::marker::Marker;
use std::io::{Read, Write};

const HEADER_BYTES: usize = 12;

/// Granularity for reading the word buffer; bounds the allocation a lying
/// header can force before the stream runs dry.
const DECODE_CHUNK_BYTES: usize = 1 << 20;

impl Bitmap {
    /// Write the compact form into `out`.
    ///
    /// Fails with [`Error::OutOfRange`] if the length, word count or active
    /// marker position does not fit the format's signed 32-bit fields.
    pub fn serialize_into<W: Write>(&self, mut out: W) -> Result<()> {
        let len = i32::try_from(self.len()).map_err(|_| Error::OutOfRange)?;
        let words = i32::try_from(self.word_count()).map_err(|_| Error::OutOfRange)?;
        let active = i32::try_from(self.active_marker_pos()).map_err(|_| Error::OutOfRange)?;
        out.write_all(&len.to_le_bytes())?;
        out.write_all(&words.to_le_bytes())?;
        out.write_all(&active.to_le_bytes())?;
        if cfg!(target_endian = "little") {
            out.write_all(bytemuck::cast_slice(self.words()))?;
        } else {
            for &w in self.words() {
                out.write_all(&w.to_le_bytes())?;
            }
        }
        Ok(())
    }

    /// The compact form as a byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(HEADER_BYTES + self.size_in_bytes());
        self.serialize_into(&mut out)?;
        Ok(out)
    }

    /// Read a bitmap back from its compact form.
    pub fn deserialize_from<R: Read>(mut src: R) -> Result<Bitmap> {
        let mut header = [0u8; HEADER_BYTES];
        src.read_exact(&mut header)?;
        let len_bits = decode_field(&header[0..4])?;
        let word_count = decode_field(&header[4..8])?;
        let active_pos = decode_field(&header[8..12])?;
        if word_count == 0 || active_pos >= word_count {
            return Err(Error::InvalidFormat);
        }
        let total_bytes = word_count * 8;
        let mut bytes = Vec::with_capacity(total_bytes.min(DECODE_CHUNK_BYTES));
        while bytes.len() < total_bytes {
            let start = bytes.len();
            let chunk = (total_bytes - start).min(DECODE_CHUNK_BYTES);
            bytes.resize(start + chunk, 0);
            src.read_exact(&mut bytes[start..])?;
        }
        let buf: Vec<u64> = bytes
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        validate_layout(&buf, len_bits, active_pos)?;
        Ok(Bitmap::from_raw_parts(buf, len_bits, active_pos))
    }

    /// Read a bitmap from a compact byte slice.
    pub fn from_bytes(bytes: &[u8]) -> Result<Bitmap> {
        Bitmap::deserialize_from(bytes)
    }

    /// Bytes the compact form occupies: the fixed header plus the buffer.
    #[inline]
    pub fn serialized_size_in_bytes(&self) -> usize {
        HEADER_BYTES + self.size_in_bytes()
    }
}

#[inline]
fn decode_field(bytes: &[u8]) -> Result<usize> {
    let v = i32::from_le_bytes(bytes.try_into().map_err(|_| Error::InvalidFormat)?);
    usize::try_from(v).map_err(|_| Error::InvalidFormat)
}

/// Check that the buffer partitions into marker blocks whose last block
/// starts at `active_pos`, and that the implied uncompressed size covers
/// `len_bits` by less than one word.
fn validate_layout(buf: &[u64], len_bits: usize, active_pos: usize) -> Result<()> {
    let mut pos = 0;
    let mut implied = 0u64;
    loop {
        let m = Marker::from_word(buf[pos]);
        implied += m.total();
        let next = pos + 1 + m.lit_cnt as usize;
        if next > buf.len() {
            return Err(Error::InvalidFormat);
        }
        if next == buf.len() {
            if pos != active_pos {
                return Err(Error::InvalidFormat);
            }
            break;
        }
        pos = next;
    }
    let implied_bits = implied.saturating_mul(64);
    if implied_bits < len_bits as u64 || implied_bits - len_bits as u64 > 63 {
        return Err(Error::InvalidFormat);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::pack;
    use rand::Rng;

    #[test]
    fn test_bytes_are_bit_exact() {
        let bm = Bitmap::of(&[0]);
        let bytes = bm.to_bytes().unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(&1i32.to_le_bytes()); // one bit long
        expected.extend_from_slice(&2i32.to_le_bytes()); // marker + literal
        expected.extend_from_slice(&0i32.to_le_bytes());
        expected.extend_from_slice(&pack(false, 0, 1).to_le_bytes());
        expected.extend_from_slice(&1u64.to_le_bytes());
        assert_eq!(expected, bytes);
    }

    #[test]
    fn test_roundtrip_simple() {
        for bm in [
            Bitmap::new(),
            Bitmap::of(&[0, 5, 500, 1 << 20]),
            {
                let mut dense = Bitmap::new();
                dense.resize(777, true);
                dense
            },
        ] {
            let mut shrunk = bm.clone();
            shrunk.shrink();
            let back = Bitmap::from_bytes(&shrunk.to_bytes().unwrap()).unwrap();
            assert_eq!(shrunk, back);
            back.check_invariants();
        }
    }

    #[test]
    fn test_roundtrip_rand() {
        let mut rng = rand::thread_rng();
        for _ in 0..128 {
            let size: usize = rng.gen_range(0..2048);
            let bm: Bitmap = (0..size).map(|_| rng.gen::<f64>() < 0.2).collect();
            let back = Bitmap::from_bytes(&bm.to_bytes().unwrap()).unwrap();
            assert_eq!(bm, back);
            assert_eq!(bm.positions(), back.positions());
        }
    }

    #[test]
    fn test_truncated_stream_fails() {
        let bytes = Bitmap::of(&[1, 2, 3]).to_bytes().unwrap();
        for cut in [0, 5, HEADER_BYTES, bytes.len() - 1] {
            assert!(matches!(
                Bitmap::from_bytes(&bytes[..cut]),
                Err(Error::IOError)
            ));
        }
    }

    #[test]
    fn test_bad_header_fails() {
        // zero word count
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        assert!(matches!(
            Bitmap::from_bytes(&bytes),
            Err(Error::InvalidFormat)
        ));

        // active marker position out of bounds
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        assert!(matches!(
            Bitmap::from_bytes(&bytes),
            Err(Error::InvalidFormat)
        ));

        // negative length
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        assert!(matches!(
            Bitmap::from_bytes(&bytes),
            Err(Error::InvalidFormat)
        ));
    }

    #[test]
    fn test_lying_word_count_fails_early() {
        // header claims the maximum word count but carries one word; the
        // decoder must fail on the missing data, not allocate for the claim
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&i32::MAX.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        assert!(matches!(
            Bitmap::from_bytes(&bytes),
            Err(Error::IOError)
        ));
    }

    #[test]
    fn test_inconsistent_marker_chain_fails() {
        // marker claims two literal words, buffer carries one
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&128i32.to_le_bytes());
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&pack(false, 0, 2).to_le_bytes());
        bytes.extend_from_slice(&7u64.to_le_bytes());
        assert!(matches!(
            Bitmap::from_bytes(&bytes),
            Err(Error::InvalidFormat)
        ));

        // length not covered by the implied words
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1000i32.to_le_bytes());
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&pack(false, 0, 1).to_le_bytes());
        bytes.extend_from_slice(&7u64.to_le_bytes());
        assert!(matches!(
            Bitmap::from_bytes(&bytes),
            Err(Error::InvalidFormat)
        ));
    }

    #[test]
    fn test_serialized_size() {
        for bm in [Bitmap::new(), Bitmap::of(&[0, 1, 2, 90_000])] {
            assert_eq!(bm.serialized_size_in_bytes(), bm.to_bytes().unwrap().len());
        }
    }

    #[test]
    fn test_deserialized_bitmap_extends() {
        // the active marker handle must be live after a round trip
        let mut bm = Bitmap::of(&[3, 64]);
        let mut back = Bitmap::from_bytes(&bm.to_bytes().unwrap()).unwrap();
        bm.set(200);
        back.set(200);
        assert_eq!(bm, back);
        back.check_invariants();
    }
}
