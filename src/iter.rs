use crate::bitmap::Bitmap;
use crate::cursor::MarkerCursor;
use smallvec::SmallVec;

/// Pending positions decoded ahead of the consumer: one full literal word's
/// worth, so a dense word drains in a single refill.
const PREFETCH: usize = 64;

/// Lazy ascending iterator over the set positions of a [`Bitmap`].
///
/// Holds a read borrow of the bitmap's buffer for its lifetime. Single
/// pass; [`reset`](PositionIter::reset) restarts it from position zero.
pub struct PositionIter<'a> {
    cursor: MarkerCursor<'a>,
    len_bits: usize,
    /// Bits left to emit from the current ones-run.
    ones_left: u64,
    /// Literal words of the current block not yet drained.
    lits: &'a [u64],
    /// Literal word being drained; emitted bits are cleared as they go.
    word: u64,
    word_base: usize,
    /// Bit offset of the next undecoded word.
    pos: usize,
    buf: SmallVec<[usize; PREFETCH]>,
    head: usize,
}

impl<'a> PositionIter<'a> {
    pub(crate) fn new(bitmap: &'a Bitmap) -> Self {
        PositionIter {
            cursor: MarkerCursor::new(bitmap.words()),
            len_bits: bitmap.len(),
            ones_left: 0,
            lits: &[],
            word: 0,
            word_base: 0,
            pos: 0,
            buf: SmallVec::new(),
            head: 0,
        }
    }

    /// Restart the iteration from position zero.
    pub fn reset(&mut self) {
        self.cursor.rewind();
        self.ones_left = 0;
        self.lits = &[];
        self.word = 0;
        self.word_base = 0;
        self.pos = 0;
        self.buf.clear();
        self.head = 0;
    }

    fn refill(&mut self) {
        self.buf.clear();
        self.head = 0;
        while self.buf.len() < PREFETCH {
            if self.ones_left > 0 {
                if self.pos >= self.len_bits {
                    // a ones-run may overhang the length only as the padding
                    // of a trailing partial word
                    self.ones_left = 0;
                    continue;
                }
                self.buf.push(self.pos);
                self.pos += 1;
                self.ones_left -= 1;
            } else if self.word != 0 {
                let k = self.word.trailing_zeros() as usize;
                self.word &= self.word - 1;
                let p = self.word_base + k;
                if p < self.len_bits {
                    self.buf.push(p);
                }
            } else if let Some((&w, rest)) = self.lits.split_first() {
                self.lits = rest;
                self.word = w;
                self.word_base = self.pos;
                self.pos += 64;
            } else if self.cursor.has_next() {
                let m = self.cursor.advance();
                self.lits = self.cursor.literals();
                if m.bit {
                    self.ones_left = 64 * m.run_len;
                } else {
                    self.pos += 64 * m.run_len as usize;
                }
            } else {
                break;
            }
        }
    }
}

impl Iterator for PositionIter<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.head == self.buf.len() {
            self.refill();
            if self.buf.is_empty() {
                return None;
            }
        }
        let p = self.buf[self.head];
        self.head += 1;
        Some(p)
    }
}

impl<'a> IntoIterator for &'a Bitmap {
    type Item = usize;
    type IntoIter = PositionIter<'a>;

    #[inline]
    fn into_iter(self) -> PositionIter<'a> {
        self.iter()
    }
}

/// Iterator over maximal runs of equal bits, as `(value, length)` pairs.
///
/// Adjacent segments of the same value are merged even when they straddle
/// marker blocks or literal words, so consecutive items always alternate in
/// value. The final run is clamped to the bitmap's length.
pub struct RunIter<'a> {
    cursor: MarkerCursor<'a>,
    len_bits: usize,
    lits: &'a [u64],
    /// Remainder of the literal word being scanned, shifted as bits are
    /// consumed.
    word: u64,
    word_bits: usize,
    /// Bit offset up to which words have been claimed from the buffer.
    pos: usize,
    /// Pending run value and length, not yet emitted.
    prev: bool,
    n: usize,
}

impl<'a> RunIter<'a> {
    pub(crate) fn new(bitmap: &'a Bitmap) -> Self {
        RunIter {
            cursor: MarkerCursor::new(bitmap.words()),
            len_bits: bitmap.len(),
            lits: &[],
            word: 0,
            word_bits: 0,
            pos: 0,
            prev: false,
            n: 0,
        }
    }

    /// Next uniform stretch straight from the buffer: a run's worth of
    /// words, or the leading equal bits of the current literal word.
    fn next_segment(&mut self) -> Option<(bool, usize)> {
        loop {
            if self.word_bits > 0 {
                let v = self.word & 1 != 0;
                let t = if v {
                    self.word.trailing_ones()
                } else {
                    self.word.trailing_zeros()
                } as usize;
                let c = t.min(self.word_bits);
                if c >= 64 {
                    self.word = 0;
                } else {
                    self.word >>= c;
                }
                self.word_bits -= c;
                return Some((v, c));
            }
            if let Some((&w, rest)) = self.lits.split_first() {
                self.lits = rest;
                self.word = w;
                self.word_bits = (self.len_bits - self.pos).min(64);
                self.pos += self.word_bits;
                continue;
            }
            if self.cursor.has_next() {
                let m = self.cursor.advance();
                self.lits = self.cursor.literals();
                let run_bits = (64 * m.run_len as usize).min(self.len_bits - self.pos);
                self.pos += run_bits;
                if run_bits > 0 {
                    return Some((m.bit, run_bits));
                }
                continue;
            }
            return None;
        }
    }
}

impl Iterator for RunIter<'_> {
    type Item = (bool, usize);

    fn next(&mut self) -> Option<(bool, usize)> {
        loop {
            match self.next_segment() {
                Some((v, c)) => {
                    if self.n == 0 {
                        self.prev = v;
                        self.n = c;
                    } else if v == self.prev {
                        self.n += c;
                    } else {
                        let out = (self.prev, self.n);
                        self.prev = v;
                        self.n = c;
                        return Some(out);
                    }
                }
                None => {
                    if self.n > 0 {
                        let out = (self.prev, self.n);
                        self.n = 0;
                        return Some(out);
                    }
                    return None;
                }
            }
        }
    }
}
