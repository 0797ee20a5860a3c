//! Meta-coding: band headers that name a replacement coding in-stream
//!
//! ### Meta bytes
//!
//! A coding method serializes to a short byte string. The first byte places
//! the method in one of five blocks:
//!
//! | byte      | meaning                                                   |
//! |-----------|-----------------------------------------------------------|
//! | 0         | the band's default coding                                 |
//! | 1..=115   | a canonically numbered `(B, H, S, D)` coding              |
//! | 116       | an arbitrary `(B, H, S, D)` coding, spelled out           |
//! | 117..=140 | a run coding; fields `KX`, `KB`-present, `AB`-default     |
//! | 141..=188 | a population coding; fields `F`-default, `U`-default, `L` |
//!
//! Compound methods append the meta bytes of their non-default sub-codings
//! in a fixed order.
//!
//! ### Escapes
//!
//! The header only exists when a band varies from its default. The reader
//! decodes the band's first number under the default coding with any delta
//! dimension switched off: values in a reserved range (negative ones for
//! signed codings, just past the one-byte limit for unsigned) cannot occur
//! as ordinary first values and instead carry the first meta byte. A band
//! whose honest first value lands in the reserved range is forced to carry
//! an explicit header naming its own default.

use super::adaptive::{run_k_fields, AdaptiveCoding};
use super::bhsd::{canonical_coding, canonical_index, Coding, CodingReader};
use super::population::{PopulationCoding, TokenCoding};
use super::CodingMethod;
use crate::errors::{Error, FormatError};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io;

const ARB: u8 = 116;
const RUN_BASE: u8 = 117;
const RUN_LIMIT: u8 = 140;
const POP_BASE: u8 = 141;
const POP_LIMIT: u8 = 188;

/// Token limits a population meta byte can imply; index 0 means the token
/// coding is spelled out instead
const TOKEN_L_VALUES: [i32; 12] = [-1, 4, 8, 16, 32, 64, 128, 192, 224, 240, 248, 252];

/// Meta parsing recurses once per sub-coding; streams never need more
const MAX_META_DEPTH: usize = 16;

/// Whether `regular` leaves room for escape values at all
pub(crate) fn can_escape(regular: Coding) -> bool {
    if regular.b() == 1 || regular.l() == 0 {
        return false;
    }
    if regular.s() != 0 {
        regular.min() <= -256
    } else {
        regular.max() >= regular.l() + 255
    }
}

/// The escape byte carried by a first value, if it is an escape
pub(crate) fn decode_escape_value(x: i32, regular: Coding) -> Option<u8> {
    if regular.b() == 1 || regular.l() == 0 {
        return None;
    }
    if regular.s() != 0 {
        if (-256..=-1).contains(&x) && regular.min() <= -256 {
            Some((-1 - x) as u8)
        } else {
            None
        }
    } else {
        let l = regular.l();
        if (l..=l + 255).contains(&x) && regular.max() >= l + 255 {
            Some((x - l) as u8)
        } else {
            None
        }
    }
}

/// The first value that carries escape byte `xb`
pub(crate) fn encode_escape_value(xb: u8, regular: Coding) -> i32 {
    assert!(can_escape(regular), "no escape room under {:?}", regular);
    if regular.s() != 0 {
        -1 - xb as i32
    } else {
        regular.l() + xb as i32
    }
}

/// Append the meta bytes of `method` relative to the band default `dflt`
pub(crate) fn write_meta(method: &CodingMethod, dflt: Coding, out: &mut Vec<u8>) {
    match method {
        CodingMethod::Plain(c) if *c == dflt => out.push(0),
        CodingMethod::Plain(c) => match canonical_index(*c) {
            Some(ix) => out.push(ix),
            None => {
                out.push(ARB);
                out.push((c.d() + 2 * c.s() + 8 * (c.b() - 1)) as u8);
                out.push((c.h() - 1) as u8);
            }
        },
        CodingMethod::Adaptive(a) => {
            let (kx, kb) = match run_k_fields(a.head_len) {
                Some(fields) => fields,
                None => unreachable!(),
            };
            let head_dflt = *a.head == CodingMethod::Plain(dflt);
            let tail_dflt = *a.tail == CodingMethod::Plain(dflt);
            let abdef: u8 = if head_dflt {
                1
            } else if tail_dflt {
                2
            } else {
                0
            };
            out.push(RUN_BASE + kx + if kb.is_some() { 4 } else { 0 } + 8 * abdef);
            if let Some(kb) = kb {
                out.push(kb);
            }
            if abdef != 1 {
                write_meta(&a.head, dflt, out);
            }
            if abdef != 2 {
                write_meta(&a.tail, dflt, out);
            }
        }
        CodingMethod::Population(p) => {
            let fdef = p.fcode == dflt;
            let udef = *p.ucode == CodingMethod::Plain(dflt);
            let tdefl_ix = match p.tcode {
                TokenCoding::Given(_) => 0,
                TokenCoding::Fitted { l } => {
                    match TOKEN_L_VALUES.iter().position(|&x| x == l) {
                        Some(ix) if ix > 0 => ix,
                        _ => panic!("token limit {} has no meta form", l),
                    }
                }
            };
            out.push(POP_BASE + fdef as u8 + 2 * udef as u8 + 4 * tdefl_ix as u8);
            if !fdef {
                write_meta(&CodingMethod::Plain(p.fcode), dflt, out);
            }
            if let TokenCoding::Given(t) = p.tcode {
                write_meta(&CodingMethod::Plain(t), dflt, out);
            }
            if !udef {
                write_meta(&p.ucode, dflt, out);
            }
        }
    }
}

/// Parse a method from its first meta byte plus following stream bytes
pub(crate) fn parse_meta<R: ReadBytesExt>(
    inp: &mut R,
    first: u8,
    dflt: Coding,
    in_pop: bool,
    depth: usize,
) -> Result<CodingMethod, Error> {
    if depth > MAX_META_DEPTH {
        return Err(FormatError::NestingTooDeep.into());
    }
    match first {
        0 => Ok(CodingMethod::Plain(dflt)),
        1..=115 => match canonical_coding(first) {
            Some(c) => Ok(CodingMethod::Plain(c)),
            None => unreachable!(),
        },
        ARB => {
            let dsb = inp.read_u8()?;
            let h = inp.read_u8()? as i32 + 1;
            let del = (dsb & 1) as i32;
            let s = ((dsb >> 1) & 3) as i32;
            let b = (dsb >> 3) as i32 + 1;
            if s == 3 || !Coding::is_codable(b, h, s, del) {
                return Err(FormatError::BadMetaCoding(dsb).into());
            }
            Ok(CodingMethod::Plain(Coding::new(b, h, s, del)))
        }
        RUN_BASE..=RUN_LIMIT => {
            let bits = first - RUN_BASE;
            let kx = bits & 3;
            let kb = if bits & 4 != 0 { inp.read_u8()? } else { 3 };
            let abdef = bits >> 3;
            let head_len = (kb as usize + 1) << (4 * kx);
            let head = if abdef == 1 {
                CodingMethod::Plain(dflt)
            } else {
                parse_sub(inp, dflt, in_pop, depth + 1)?
            };
            let tail = if abdef == 2 {
                CodingMethod::Plain(dflt)
            } else {
                parse_sub(inp, dflt, in_pop, depth + 1)?
            };
            Ok(CodingMethod::Adaptive(AdaptiveCoding::new(head_len, head, tail)))
        }
        POP_BASE..=POP_LIMIT => {
            if in_pop {
                return Err(FormatError::BadPopulation {
                    detail: "population codings may not nest",
                }
                .into());
            }
            let bits = first - POP_BASE;
            let fdef = bits & 1 != 0;
            let udef = bits & 2 != 0;
            let tdefl_ix = (bits >> 2) as usize;
            let fcode = if fdef {
                dflt
            } else {
                match parse_sub(inp, dflt, true, depth + 1)? {
                    CodingMethod::Plain(c) => c,
                    _ => {
                        return Err(FormatError::BadPopulation {
                            detail: "favored coding must be a plain coding",
                        }
                        .into())
                    }
                }
            };
            let tcode = if tdefl_ix == 0 {
                match parse_sub(inp, dflt, true, depth + 1)? {
                    CodingMethod::Plain(c) => TokenCoding::Given(c),
                    _ => {
                        return Err(FormatError::BadPopulation {
                            detail: "token coding must be a plain coding",
                        }
                        .into())
                    }
                }
            } else {
                TokenCoding::Fitted { l: TOKEN_L_VALUES[tdefl_ix] }
            };
            let ucode = if udef {
                CodingMethod::Plain(dflt)
            } else {
                parse_sub(inp, dflt, true, depth + 1)?
            };
            Ok(CodingMethod::Population(PopulationCoding {
                fvalues: Vec::new(),
                fcode,
                tcode,
                ucode: Box::new(ucode),
            }))
        }
        _ => Err(FormatError::BadMetaCoding(first).into()),
    }
}

fn parse_sub<R: ReadBytesExt>(
    inp: &mut R,
    dflt: Coding,
    in_pop: bool,
    depth: usize,
) -> Result<CodingMethod, Error> {
    let first = inp.read_u8()?;
    parse_meta(inp, first, dflt, in_pop, depth)
}

/// Stream bytes a header for `method` would cost on a band whose default
/// coding is `regular`
pub(crate) fn header_cost(method: &CodingMethod, regular: Coding) -> usize {
    let mut meta = Vec::new();
    write_meta(method, regular, &mut meta);
    let escape = encode_escape_value(meta[0], regular);
    regular.set_d(0).length_of(escape) + meta.len() - 1
}

/// Write one band: a header when `method` is not the default, then payload
pub fn write_band<W: WriteBytesExt>(
    out: &mut W,
    method: &CodingMethod,
    values: &[i32],
    regular: Coding,
) -> io::Result<()> {
    if values.is_empty() {
        return Ok(());
    }
    if let CodingMethod::Plain(c) = method {
        if *c == regular {
            let collision =
                can_escape(regular) && decode_escape_value(values[0], regular).is_some();
            if !collision {
                return regular.write_values(out, values);
            }
        }
    }
    assert!(can_escape(regular), "cannot vary a band whose regular coding is {:?}", regular);
    let mut meta = Vec::new();
    write_meta(method, regular, &mut meta);
    regular.set_d(0).write_value(out, encode_escape_value(meta[0], regular))?;
    out.write_all(&meta[1..])?;
    method.write_values(out, values)
}

/// Read one band of `count` values, honoring any header
pub fn read_band<R: ReadBytesExt>(
    inp: &mut R,
    count: usize,
    regular: Coding,
    into: &mut Vec<i32>,
) -> Result<(), Error> {
    if count == 0 {
        return Ok(());
    }
    if !can_escape(regular) {
        return Ok(regular.read_values(inp, count, into)?);
    }
    let first = regular.set_d(0).read_value(inp)?;
    match decode_escape_value(first, regular) {
        Some(xb) => {
            let method = parse_meta(inp, xb, regular, false, 0)?;
            method.read_values(inp, count, into)
        }
        None => {
            into.push(first);
            let mut reader = CodingReader::new(regular, inp);
            reader.prime(first);
            for _ in 1..count {
                into.push(reader.next()?);
            }
            Ok(())
        }
    }
}
