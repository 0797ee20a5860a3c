//! Band transport: variable-length integer codings and their selection
//!
//! Attribute values cross the stream in _bands_, homogeneous runs of 32-bit
//! integers. This module owns everything about how a band's values become
//! bytes:
//!
//!   - [`bhsd`](self) codings, the `(B, H, S, D)` family of byte-oriented
//!     variable-length integer encodings ([`Coding`])
//!
//!   - compound [`CodingMethod`]s built from them: [`PopulationCoding`]
//!     for bands dominated by a few hot values and [`AdaptiveCoding`] for
//!     bands whose character shifts partway through
//!
//!   - the meta-coding ([`write_band`], [`read_band`]), a self-describing
//!     header scheme that lets each band either use its default coding at
//!     zero cost or announce a different one in-stream
//!
//!   - the [`CodingChooser`], which spends a configurable effort searching
//!     for the method that deflates smallest
//!
//! ### Escape protocol
//!
//! A band has a _regular_ coding fixed by its definition. When the band is
//! transmitted under any other method, its first transmitted number is an
//! escape value that the regular coding cannot produce for ordinary data,
//! followed by the meta bytes of the replacement method and then the
//! payload. Bands whose regular coding leaves no room for escapes (one-byte
//! codings in particular) always travel in their regular form.

mod adaptive;
mod bhsd;
mod chooser;
mod histogram;
mod meta;
mod population;

#[cfg(test)]
mod stress;

pub use adaptive::AdaptiveCoding;
pub use bhsd::{
    canonical_coding, canonical_index, Coding, BCI5, BRANCH5, BYTE1, DELTA5, MDELTA5, SIGNED5,
    UDELTA5, UNSIGNED5,
};
pub use chooser::{Choice, CodingChooser, DEFAULT_EFFORT, MAX_EFFORT, MIN_EFFORT};
pub use histogram::Histogram;
pub use meta::{read_band, write_band};
pub use population::{PopulationCoding, TokenCoding};

pub(crate) use bhsd::CodingReader;

use crate::errors::Error;
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io;

/// A complete strategy for moving one band of integers through the stream
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum CodingMethod {
    /// One `(B, H, S, D)` coding applied to every value
    Plain(Coding),

    /// Frequent values tokenized against a favored list
    Population(PopulationCoding),

    /// One coding for a head run, another for the tail
    Adaptive(AdaptiveCoding),
}

impl CodingMethod {
    /// Write `values` as payload bytes, without any band header
    pub fn write_values<W: WriteBytesExt>(&self, out: &mut W, values: &[i32]) -> io::Result<()> {
        match self {
            CodingMethod::Plain(c) => c.write_values(out, values),
            CodingMethod::Population(p) => p.write_values(out, values),
            CodingMethod::Adaptive(a) => a.write_values(out, values),
        }
    }

    /// Read `count` values of payload, without any band header
    pub fn read_values<R: ReadBytesExt>(
        &self,
        inp: &mut R,
        count: usize,
        into: &mut Vec<i32>,
    ) -> Result<(), Error> {
        match self {
            CodingMethod::Plain(c) => Ok(c.read_values(inp, count, into)?),
            CodingMethod::Population(p) => p.read_values(inp, count, into),
            CodingMethod::Adaptive(a) => a.read_values(inp, count, into),
        }
    }

    pub fn can_represent(&self, values: &[i32]) -> bool {
        match self {
            CodingMethod::Plain(c) => c.can_represent(values),
            CodingMethod::Population(p) => p.can_represent(values),
            CodingMethod::Adaptive(a) => a.can_represent(values),
        }
    }
}

impl From<Coding> for CodingMethod {
    fn from(coding: Coding) -> CodingMethod {
        CodingMethod::Plain(coding)
    }
}
