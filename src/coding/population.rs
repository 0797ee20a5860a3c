//! Population codings, which tokenize a band around its most common values
//!
//! A band whose values cluster on a few hot spots travels as three sub-bands:
//! the favored values themselves, one token per original value naming a
//! favored value (zero for a miss), and finally the misses. The favored band
//! ends with a value equal to its predecessor, so the list length never
//! appears on the wire.

use super::bhsd::{Coding, CodingReader, BYTE1};
use super::CodingMethod;
use crate::errors::{Error, FormatError};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::io;

/// Largest favored list a stream may carry
pub(crate) const MAX_FAVORED: usize = 0x10000;

/// How the token sub-band is coded
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenCoding {
    /// Derived from the favored count: a single byte when the count fits,
    /// otherwise the narrowest `(B, 256 - l)` that spans it
    Fitted { l: i32 },

    /// Spelled out in the stream
    Given(Coding),
}

/// A favored-value list plus the three codings that move it
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PopulationCoding {
    /// Favored values in transmission order. Codings parsed from a stream
    /// leave this empty and recover the list from the band payload.
    pub(crate) fvalues: Vec<i32>,
    pub(crate) fcode: Coding,
    pub(crate) tcode: TokenCoding,
    pub(crate) ucode: Box<CodingMethod>,
}

impl PopulationCoding {
    pub fn new(
        fvalues: Vec<i32>,
        fcode: Coding,
        tcode: TokenCoding,
        ucode: CodingMethod,
    ) -> PopulationCoding {
        assert!(!fvalues.is_empty(), "population coding with no favored values");
        PopulationCoding { fvalues, fcode, tcode, ucode: Box::new(ucode) }
    }

    pub fn favored_values(&self) -> &[i32] {
        &self.fvalues
    }

    /// Resolve the token coding for a favored list of `fval` entries
    pub(crate) fn token_coding(&self, fval: usize) -> Result<Coding, FormatError> {
        match self.tcode {
            TokenCoding::Given(c) => Ok(c),
            TokenCoding::Fitted { l } => fit_token_coding(fval, l).ok_or(FormatError::BadPopulation {
                detail: "no token coding spans the favored values",
            }),
        }
    }

    pub fn write_values<W: WriteBytesExt>(&self, out: &mut W, values: &[i32]) -> io::Result<()> {
        let tcode = match self.token_coding(self.fvalues.len()) {
            Ok(c) => c,
            Err(_) => panic!("token coding cannot span {} favored values", self.fvalues.len()),
        };

        let mut token_of: HashMap<i32, i32> = HashMap::new();
        for (i, &v) in self.fvalues.iter().enumerate() {
            token_of.entry(v).or_insert(i as i32 + 1);
        }

        // the terminator repeats the last favored value
        let mut fband = self.fvalues.clone();
        match fband.last().copied() {
            Some(last) => fband.push(last),
            None => unreachable!(),
        }
        self.fcode.write_values(out, &fband)?;

        let tokens: Vec<i32> =
            values.iter().map(|v| token_of.get(v).copied().unwrap_or(0)).collect();
        tcode.write_values(out, &tokens)?;

        let unfavored: Vec<i32> =
            values.iter().filter(|v| !token_of.contains_key(*v)).copied().collect();
        self.ucode.write_values(out, &unfavored)
    }

    pub fn read_values<R: ReadBytesExt>(
        &self,
        inp: &mut R,
        count: usize,
        into: &mut Vec<i32>,
    ) -> Result<(), Error> {
        // favored values arrive until one repeats its predecessor
        let mut fvalues = Vec::new();
        let mut reader = CodingReader::new(self.fcode, inp);
        let mut prev = None;
        loop {
            let v = reader.next()?;
            if prev == Some(v) {
                break;
            }
            if fvalues.len() >= MAX_FAVORED {
                return Err(FormatError::BadPopulation { detail: "favored value list too long" }.into());
            }
            fvalues.push(v);
            prev = Some(v);
        }

        let tcode = self.token_coding(fvalues.len())?;
        let mut tokens = Vec::new();
        tcode.read_values(inp, count, &mut tokens)?;
        let mut misses = 0usize;
        for &t in &tokens {
            if t == 0 {
                misses += 1;
            } else if t < 0 || t as usize > fvalues.len() {
                return Err(FormatError::BadPopulation { detail: "token out of range" }.into());
            }
        }

        let mut unfavored = Vec::new();
        self.ucode.read_values(inp, misses, &mut unfavored)?;

        let mut unfavored = unfavored.into_iter();
        into.reserve(tokens.len());
        for t in tokens {
            if t == 0 {
                match unfavored.next() {
                    Some(v) => into.push(v),
                    None => unreachable!(),
                }
            } else {
                into.push(fvalues[t as usize - 1]);
            }
        }
        Ok(())
    }

    pub fn can_represent(&self, values: &[i32]) -> bool {
        let mut fband = self.fvalues.clone();
        match fband.last().copied() {
            Some(last) => fband.push(last),
            None => return false,
        }
        if self.token_coding(self.fvalues.len()).is_err() || !self.fcode.can_represent(&fband) {
            return false;
        }

        // adjacent repeats would terminate the favored list early
        if self.fvalues.windows(2).any(|w| w[0] == w[1]) {
            return false;
        }

        let favored: HashMap<i32, ()> = self.fvalues.iter().map(|&v| (v, ())).collect();
        let unfavored: Vec<i32> =
            values.iter().filter(|v| !favored.contains_key(*v)).copied().collect();
        self.ucode.can_represent(&unfavored)
    }
}

/// Narrowest coding whose range covers tokens `0..=fval` at limit `l`
pub(crate) fn fit_token_coding(fval: usize, l: i32) -> Option<Coding> {
    if fval <= 255 {
        return Some(BYTE1);
    }
    if !(1..=255).contains(&(256 - l)) {
        return None;
    }
    for b in 2..=5 {
        let c = Coding::of(b, 256 - l);
        if c.max() as i64 >= fval as i64 {
            return Some(c);
        }
    }
    None
}
