//! Packed marker words.
//!
//! Every block of the compressed buffer opens with a marker word carrying
//! three fields, least significant bit first:
//!
//! | bits     | field         |
//! |----------|---------------|
//! | 0        | run value     |
//! | 1..=32   | run length    |
//! | 33..=63  | literal count |
//!
//! A marker describes `run_len` uniform words of the run value, followed in
//! the buffer by `lit_cnt` literal words stored verbatim. Longer extents are
//! expressed as a sequence of markers.

const RUN_LEN_BITS: u32 = 32;
const LIT_CNT_BITS: u32 = 31;
const RUN_LEN_SHIFT: u32 = 1;
const LIT_CNT_SHIFT: u32 = 1 + RUN_LEN_BITS;

/// Maximum number of uniform words a single marker can describe.
pub(crate) const LARGEST_RUN_LEN: u64 = (1 << RUN_LEN_BITS) - 1;
/// Maximum number of literal words a single marker can carry.
pub(crate) const LARGEST_LIT_CNT: u64 = (1 << LIT_CNT_BITS) - 1;

#[inline]
pub(crate) fn run_bit(w: u64) -> bool {
    w & 1 != 0
}

#[inline]
pub(crate) fn run_len(w: u64) -> u64 {
    (w >> RUN_LEN_SHIFT) & LARGEST_RUN_LEN
}

#[inline]
pub(crate) fn lit_cnt(w: u64) -> u64 {
    w >> LIT_CNT_SHIFT
}

/// Set the run value, preserving the other two fields.
#[inline]
pub(crate) fn set_run_bit(w: &mut u64, bit: bool) {
    *w = (*w & !1) | bit as u64;
}

/// Set the run length, preserving the other two fields.
#[inline]
pub(crate) fn set_run_len(w: &mut u64, n: u64) {
    debug_assert!(n <= LARGEST_RUN_LEN);
    *w = (*w & !(LARGEST_RUN_LEN << RUN_LEN_SHIFT)) | (n << RUN_LEN_SHIFT);
}

/// Set the literal count, preserving the other two fields.
#[inline]
pub(crate) fn set_lit_cnt(w: &mut u64, n: u64) {
    debug_assert!(n <= LARGEST_LIT_CNT);
    *w = (*w & !(LARGEST_LIT_CNT << LIT_CNT_SHIFT)) | (n << LIT_CNT_SHIFT);
}

#[cfg(test)]
pub(crate) fn pack(bit: bool, run_len: u64, lit_cnt: u64) -> u64 {
    assert!(run_len <= LARGEST_RUN_LEN);
    assert!(lit_cnt <= LARGEST_LIT_CNT);
    bit as u64 | (run_len << RUN_LEN_SHIFT) | (lit_cnt << LIT_CNT_SHIFT)
}

/// Decoded copy of a marker word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Marker {
    pub bit: bool,
    pub run_len: u64,
    pub lit_cnt: u64,
}

impl Marker {
    #[inline]
    pub fn from_word(w: u64) -> Self {
        Marker {
            bit: run_bit(w),
            run_len: run_len(w),
            lit_cnt: lit_cnt(w),
        }
    }

    /// Number of uncompressed words this marker describes.
    #[inline]
    pub fn total(&self) -> u64 {
        self.run_len + self.lit_cnt
    }
}
