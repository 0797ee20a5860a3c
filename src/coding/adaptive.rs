//! Run codings, which split a band into a head run and a tail
//!
//! The head length `K` is not free-form: it must have the shape
//! `(KB + 1) * 16^KX` so that two small fields can carry it in the coding's
//! meta bytes. Chaining runs in the tail position splits a band into any
//! number of segments.

use super::CodingMethod;
use crate::errors::{Error, FormatError};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io;

/// Largest expressible head run, `256 * 16^3`
pub(crate) const MAX_RUN: usize = 1 << 20;

/// One coding for the first `head_len` values, another for the rest
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AdaptiveCoding {
    pub(crate) head_len: usize,
    pub(crate) head: Box<CodingMethod>,
    pub(crate) tail: Box<CodingMethod>,
}

impl AdaptiveCoding {
    pub fn new(head_len: usize, head: CodingMethod, tail: CodingMethod) -> AdaptiveCoding {
        assert!(
            run_k_fields(head_len).is_some(),
            "head run of {} values has no meta form",
            head_len
        );
        AdaptiveCoding { head_len, head: Box::new(head), tail: Box::new(tail) }
    }

    pub fn write_values<W: WriteBytesExt>(&self, out: &mut W, values: &[i32]) -> io::Result<()> {
        assert!(self.head_len <= values.len(), "head run outruns the band");
        let (head, tail) = values.split_at(self.head_len);
        self.head.write_values(out, head)?;
        self.tail.write_values(out, tail)
    }

    pub fn read_values<R: ReadBytesExt>(
        &self,
        inp: &mut R,
        count: usize,
        into: &mut Vec<i32>,
    ) -> Result<(), Error> {
        if self.head_len > count {
            return Err(FormatError::RunTooLong { run: self.head_len, remaining: count }.into());
        }
        self.head.read_values(inp, self.head_len, into)?;
        self.tail.read_values(inp, count - self.head_len, into)
    }

    pub fn can_represent(&self, values: &[i32]) -> bool {
        if self.head_len > values.len() {
            return false;
        }
        let (head, tail) = values.split_at(self.head_len);
        self.head.can_represent(head) && self.tail.can_represent(tail)
    }
}

/// The `(KX, KB)` meta fields for a head run, with `KB` omitted when it
/// takes its default of 3
pub(crate) fn run_k_fields(k: usize) -> Option<(u8, Option<u8>)> {
    for kx in 0..=3u8 {
        if k == 4usize << (4 * kx) {
            return Some((kx, None));
        }
    }
    for kx in 0..=3u8 {
        let unit = 1usize << (4 * kx);
        if k % unit == 0 {
            let steps = k / unit;
            if (1..=256).contains(&steps) {
                return Some((kx, Some((steps - 1) as u8)));
            }
        }
    }
    None
}

/// Largest expressible head run of at most `n` values
pub(crate) fn run_length_at_most(n: usize) -> usize {
    if n <= 256 {
        return n;
    }
    let mut best = 256;
    for kx in 1..=3u8 {
        let unit = 1usize << (4 * kx);
        let k = n.min(256 * unit) / unit * unit;
        if k >= unit && k > best {
            best = k;
        }
    }
    best
}
