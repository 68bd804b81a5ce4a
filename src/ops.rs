//! Pairwise set algebra over compressed buffers.
//!
//! All four combinators share one loop that walks both operands through a
//! marker cursor and a consumable run record. Per iteration the operand
//! with the smaller remaining extent (the prey) is consumed entirely: its
//! run against the other side (the predator), the predator's run against
//! its literals, and finally literals pairwise. When one operand runs out
//! of markers the other is drained according to the operator's identity.

use crate::bitmap::Bitmap;
use crate::cursor::{BufferedRun, MarkerCursor};
use std::ops::{BitAnd, BitOr, BitXor, ControlFlow, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    And,
    Or,
    Xor,
    AndNot,
}

/// Output side of the combinator engine. A fresh [`Bitmap`] grows through
/// it; the intersection probe short-circuits through `Break`.
pub(crate) trait WordSink {
    fn uniform_words(&mut self, bit: bool, n: u64) -> ControlFlow<()>;
    /// One word, classified into a run when uniform.
    fn word(&mut self, w: u64) -> ControlFlow<()>;
    /// Literal words spliced verbatim.
    fn literals(&mut self, words: &[u64]) -> ControlFlow<()>;
    /// Literal words spliced complemented.
    fn literals_not(&mut self, words: &[u64]) -> ControlFlow<()>;
}

impl WordSink for Bitmap {
    #[inline]
    fn uniform_words(&mut self, bit: bool, n: u64) -> ControlFlow<()> {
        self.push_uniform_words(bit, n);
        ControlFlow::Continue(())
    }

    #[inline]
    fn word(&mut self, w: u64) -> ControlFlow<()> {
        self.push_word(w);
        ControlFlow::Continue(())
    }

    #[inline]
    fn literals(&mut self, words: &[u64]) -> ControlFlow<()> {
        self.push_literals(words);
        ControlFlow::Continue(())
    }

    #[inline]
    fn literals_not(&mut self, words: &[u64]) -> ControlFlow<()> {
        self.push_literals_not(words);
        ControlFlow::Continue(())
    }
}

/// Sink that tallies set bits instead of materializing the result.
struct CountingSink {
    ones: u64,
}

impl WordSink for CountingSink {
    #[inline]
    fn uniform_words(&mut self, bit: bool, n: u64) -> ControlFlow<()> {
        if bit {
            self.ones += 64 * n;
        }
        ControlFlow::Continue(())
    }

    #[inline]
    fn word(&mut self, w: u64) -> ControlFlow<()> {
        self.ones += w.count_ones() as u64;
        ControlFlow::Continue(())
    }

    #[inline]
    fn literals(&mut self, words: &[u64]) -> ControlFlow<()> {
        for &w in words {
            self.ones += w.count_ones() as u64;
        }
        ControlFlow::Continue(())
    }

    #[inline]
    fn literals_not(&mut self, words: &[u64]) -> ControlFlow<()> {
        for &w in words {
            self.ones += w.count_zeros() as u64;
        }
        ControlFlow::Continue(())
    }
}

/// Sink that stops the engine at the first word carrying a set bit.
struct IntersectProbe;

impl WordSink for IntersectProbe {
    #[inline]
    fn uniform_words(&mut self, bit: bool, n: u64) -> ControlFlow<()> {
        if bit && n > 0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    #[inline]
    fn word(&mut self, w: u64) -> ControlFlow<()> {
        if w != 0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    #[inline]
    fn literals(&mut self, words: &[u64]) -> ControlFlow<()> {
        if words.iter().any(|&w| w != 0) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    #[inline]
    fn literals_not(&mut self, words: &[u64]) -> ControlFlow<()> {
        if words.iter().any(|&w| w != u64::MAX) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// Walk `x` and `y` in lockstep, emitting `x op y` word by word into the
/// sink. For `AndNot` the second operand's run value is complemented at
/// load and refill, and its literals wherever they are spliced, reducing
/// the operator to `And` over `(x, !y)`.
fn combine<S: WordSink>(x: &Bitmap, y: &Bitmap, op: Op, sink: &mut S) -> ControlFlow<()> {
    let xw = x.words();
    let yw = y.words();
    let mut cx = MarkerCursor::new(xw);
    let mut cy = MarkerCursor::new(yw);
    let mut rx = BufferedRun::load(&mut cx);
    let mut ry = BufferedRun::load(&mut cy);
    if op == Op::AndNot {
        ry.bit = !ry.bit;
    }
    loop {
        let x_is_prey = rx.total() < ry.total();
        let prey_is_y = !x_is_prey;
        let (prey, pred, prey_words, pred_words) = if x_is_prey {
            (&mut rx, &mut ry, xw, yw)
        } else {
            (&mut ry, &mut rx, yw, xw)
        };

        // the prey's run first
        let prey_run = prey.run_len;
        if prey_run > 0 {
            let decided = match op {
                Op::And | Op::AndNot => !prey.bit,
                Op::Or => prey.bit,
                Op::Xor => false,
            };
            if decided {
                // the run value decides the output on its own
                sink.uniform_words(op == Op::Or, prey_run)?;
                pred.consume(prey_run);
            } else {
                // the predator's next words dominate the prey's run
                let negate = op == Op::Xor && prey.bit;
                let from_run = prey_run.min(pred.run_len);
                sink.uniform_words(pred.bit ^ negate, from_run)?;
                let from_lit = (prey_run - from_run) as usize;
                let src = &pred_words[pred.lit_base..pred.lit_base + from_lit];
                if negate || (op == Op::AndNot && !prey_is_y) {
                    sink.literals_not(src)?;
                } else {
                    sink.literals(src)?;
                }
                pred.consume(prey_run);
            }
            prey.run_len = 0;
        }

        // the predator's remaining run against the prey's literals
        if pred.run_len > 0 && prey.lit_cnt > 0 {
            let k = pred.run_len.min(prey.lit_cnt);
            let decided = match op {
                Op::And | Op::AndNot => !pred.bit,
                Op::Or => pred.bit,
                Op::Xor => false,
            };
            if decided {
                sink.uniform_words(op == Op::Or, k)?;
            } else {
                let negate = (op == Op::Xor && pred.bit) || (op == Op::AndNot && prey_is_y);
                let src = &prey_words[prey.lit_base..prey.lit_base + k as usize];
                if negate {
                    sink.literals_not(src)?;
                } else {
                    sink.literals(src)?;
                }
            }
            pred.consume(k);
            prey.consume(k);
        }

        // literals pairwise
        let k = rx.lit_cnt.min(ry.lit_cnt) as usize;
        for j in 0..k {
            let a = xw[rx.lit_base + j];
            let b = yw[ry.lit_base + j];
            let w = match op {
                Op::And => a & b,
                Op::Or => a | b,
                Op::Xor => a ^ b,
                Op::AndNot => a & !b,
            };
            sink.word(w)?;
        }
        rx.consume(k as u64);
        ry.consume(k as u64);

        // refill whichever side ran dry; stop once a source is exhausted
        if rx.total() == 0 {
            if !cx.has_next() {
                break;
            }
            rx = BufferedRun::load(&mut cx);
        }
        if ry.total() == 0 {
            if !cy.has_next() {
                break;
            }
            ry = BufferedRun::load(&mut cy);
            if op == Op::AndNot {
                ry.bit = !ry.bit;
            }
        }
    }

    // drain the side that still has content
    let (rest, cursor, words, rest_is_y) = if rx.total() > 0 || cx.has_next() {
        (rx, cx, xw, false)
    } else {
        (ry, cy, yw, true)
    };
    let verbatim = match op {
        Op::Or | Op::Xor => true,
        Op::And => false,
        Op::AndNot => !rest_is_y,
    };
    let mut rest = rest;
    let mut cursor = cursor;
    loop {
        if verbatim {
            sink.uniform_words(rest.bit, rest.run_len)?;
            sink.literals(&words[rest.lit_base..rest.lit_base + rest.lit_cnt as usize])?;
        } else {
            sink.uniform_words(false, rest.total())?;
        }
        if !cursor.has_next() {
            break;
        }
        rest = BufferedRun::load(&mut cursor);
    }
    ControlFlow::Continue(())
}

fn run_combinator(x: &Bitmap, y: &Bitmap, op: Op, reserve_words: usize) -> Bitmap {
    let mut out = Bitmap::with_capacity(64 * reserve_words);
    let flow = combine(x, y, op, &mut out);
    debug_assert!(flow.is_continue());
    out.set_len_bits(x.len().max(y.len()));
    out
}

impl Bitmap {
    /// Positions set in both bitmaps. Pure; the result's length is the
    /// longer of the two.
    pub fn and(&self, other: &Bitmap) -> Bitmap {
        let hint = self.word_count().max(other.word_count());
        run_combinator(self, other, Op::And, hint)
    }

    /// Positions set in either bitmap.
    pub fn or(&self, other: &Bitmap) -> Bitmap {
        let hint = self.word_count() + other.word_count();
        run_combinator(self, other, Op::Or, hint)
    }

    /// Positions set in exactly one of the two bitmaps.
    pub fn xor(&self, other: &Bitmap) -> Bitmap {
        let hint = self.word_count() + other.word_count();
        run_combinator(self, other, Op::Xor, hint)
    }

    /// Positions set in `self` but not in `other`.
    pub fn and_not(&self, other: &Bitmap) -> Bitmap {
        let hint = self.word_count().max(other.word_count());
        run_combinator(self, other, Op::AndNot, hint)
    }

    /// True iff the two bitmaps share at least one set position. Runs the
    /// intersection walk without allocating and stops at the first hit.
    pub fn intersects(&self, other: &Bitmap) -> bool {
        combine(self, other, Op::And, &mut IntersectProbe).is_break()
    }

    /// Cardinality of `self.and(other)` without materializing it.
    pub fn and_cardinality(&self, other: &Bitmap) -> u64 {
        count_combinator(self, other, Op::And)
    }

    /// Cardinality of `self.or(other)` without materializing it.
    pub fn or_cardinality(&self, other: &Bitmap) -> u64 {
        count_combinator(self, other, Op::Or)
    }

    /// Cardinality of `self.xor(other)` without materializing it.
    pub fn xor_cardinality(&self, other: &Bitmap) -> u64 {
        count_combinator(self, other, Op::Xor)
    }

    /// Cardinality of `self.and_not(other)` without materializing it.
    pub fn and_not_cardinality(&self, other: &Bitmap) -> u64 {
        count_combinator(self, other, Op::AndNot)
    }

    /// Union of any number of bitmaps. No operands yield an empty bitmap.
    pub fn or_all<'a, I>(bitmaps: I) -> Bitmap
    where
        I: IntoIterator<Item = &'a Bitmap>,
    {
        let mut iter = bitmaps.into_iter();
        let mut acc = match iter.next() {
            Some(first) => first.clone(),
            None => return Bitmap::new(),
        };
        for bm in iter {
            acc = acc.or(bm);
        }
        acc
    }

    /// Intersection of any number of bitmaps. No operands yield an empty
    /// bitmap.
    pub fn and_all<'a, I>(bitmaps: I) -> Bitmap
    where
        I: IntoIterator<Item = &'a Bitmap>,
    {
        let mut iter = bitmaps.into_iter();
        let mut acc = match iter.next() {
            Some(first) => first.clone(),
            None => return Bitmap::new(),
        };
        for bm in iter {
            acc = acc.and(bm);
        }
        acc
    }
}

fn count_combinator(x: &Bitmap, y: &Bitmap, op: Op) -> u64 {
    let mut sink = CountingSink { ones: 0 };
    let flow = combine(x, y, op, &mut sink);
    debug_assert!(flow.is_continue());
    sink.ones
}

impl BitAnd for &Bitmap {
    type Output = Bitmap;

    #[inline]
    fn bitand(self, rhs: &Bitmap) -> Bitmap {
        self.and(rhs)
    }
}

impl BitOr for &Bitmap {
    type Output = Bitmap;

    #[inline]
    fn bitor(self, rhs: &Bitmap) -> Bitmap {
        self.or(rhs)
    }
}

impl BitXor for &Bitmap {
    type Output = Bitmap;

    #[inline]
    fn bitxor(self, rhs: &Bitmap) -> Bitmap {
        self.xor(rhs)
    }
}

impl Sub for &Bitmap {
    type Output = Bitmap;

    #[inline]
    fn sub(self, rhs: &Bitmap) -> Bitmap {
        self.and_not(rhs)
    }
}
