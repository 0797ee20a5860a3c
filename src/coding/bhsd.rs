//! The `(B, H, S, D)` family of variable-length integer codings
//!
//! ### Wire form
//!
//! A coding turns a 32-bit integer into one to `B` bytes. Byte values below
//! the limit `L = 256 - H` end a value; byte values of `L` and above mean
//! another byte follows, except that the `B`-th byte always ends the value.
//! Reading the bytes `x0, x1, .., xn` back yields the unsigned form
//! `x0 + x1*H + x2*H^2 + ..`.
//!
//! ### Sign and delta
//!
//! With `S` of 1 or 2, the low `S` bits of the unsigned form carry the sign:
//! a value whose low `S` bits are all set decodes as negative. This keeps
//! small magnitudes of either sign short. With `D` of 1, each transmitted
//! value is the difference from its predecessor (starting from zero), taken
//! modulo the coding's cardinality when `S` is zero.

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io;

/// One member of the `(B, H, S, D)` coding family
///
/// `B` ranges over 1 to 5, `H` over 1 to 256, `S` over 0 to 2 and `D` is a
/// single bit. The named constants below cover the members that act as band
/// defaults; [`canonical_coding`] enumerates every member a one-byte band
/// header can name.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coding {
    b: i32,
    h: i32,
    s: i32,
    del: i32,
}

/// Single unsigned bytes
pub const BYTE1: Coding = Coding::of(1, 256);

/// The universal default: any 32-bit value in at most five bytes
pub const UNSIGNED5: Coding = Coding::of(5, 64);

/// Signed counterpart of [`UNSIGNED5`]
pub const SIGNED5: Coding = Coding::of_s(5, 64, 1);

/// [`UNSIGNED5`] over successive differences
pub const UDELTA5: Coding = UNSIGNED5.delta();

/// [`SIGNED5`] over successive differences
pub const DELTA5: Coding = SIGNED5.delta();

/// Mostly-positive differences, for monotonic-with-glitches sequences
pub const MDELTA5: Coding = Coding::of_s(5, 64, 2).delta();

/// Default for bytecode index bands: biased heavily toward small values
pub const BCI5: Coding = Coding::of(5, 4);

/// Default for branch offset and bytecode delta bands
pub const BRANCH5: Coding = Coding::of_s(5, 4, 2);

impl Coding {
    /// An unsigned, non-delta coding
    pub const fn of(b: i32, h: i32) -> Coding {
        Coding::new(b, h, 0, 0)
    }

    /// A non-delta coding with an explicit sign width
    pub const fn of_s(b: i32, h: i32, s: i32) -> Coding {
        Coding::new(b, h, s, 0)
    }

    pub const fn new(b: i32, h: i32, s: i32, del: i32) -> Coding {
        assert!(Coding::is_codable(b, h, s, del));
        Coding { b, h, s, del }
    }

    /// The same coding applied to successive differences
    pub const fn delta(self) -> Coding {
        Coding { b: self.b, h: self.h, s: self.s, del: 1 }
    }

    /// Whether the four parameters name a member of the coding family
    pub const fn is_codable(b: i32, h: i32, s: i32, del: i32) -> bool {
        1 <= b && b <= 5 && 1 <= h && h <= 256 && 0 <= s && s <= 2 && 0 <= del && del <= 1
    }

    pub fn b(self) -> i32 {
        self.b
    }

    pub fn h(self) -> i32 {
        self.h
    }

    pub fn s(self) -> i32 {
        self.s
    }

    pub fn d(self) -> i32 {
        self.del
    }

    /// First byte value that does not end a value
    pub fn l(self) -> i32 {
        256 - self.h
    }

    pub fn is_delta(self) -> bool {
        self.del != 0
    }

    pub fn set_b(self, b: i32) -> Coding {
        Coding::new(b, self.h, self.s, self.del)
    }

    pub fn set_d(self, del: i32) -> Coding {
        Coding::new(self.b, self.h, self.s, del)
    }

    /// Largest transmittable unsigned form
    fn umax(self) -> i64 {
        let h = self.h as i64;
        let mut pow = 1i64;
        let mut sum = 0i64;
        for _ in 0..self.b {
            sum += 255 * pow;
            pow *= h;
        }
        sum
    }

    /// Number of distinct transmittable values, capped at `2^32`
    pub(crate) fn cardinality(self) -> i64 {
        let card = self.umax() + 1;
        if card > 1i64 << 32 {
            1i64 << 32
        } else {
            card
        }
    }

    /// Whether every 32-bit value is transmittable
    pub fn is_full_range(self) -> bool {
        if self.s == 0 {
            self.umax() >= u32::MAX as i64
        } else {
            let (lo, hi) = self.signed_range();
            lo <= i32::MIN as i64 && hi >= i32::MAX as i64
        }
    }

    pub(crate) fn signed_range(self) -> (i64, i64) {
        let umax = self.umax();
        let mask = (1i64 << self.s) - 1;
        let negatives = if umax >= mask { (umax - mask) / (1 << self.s) + 1 } else { 0 };
        (-negatives, umax - negatives)
    }

    /// Smallest representable value
    pub fn min(self) -> i32 {
        if self.s == 0 {
            // full-range unsigned codings take any value modulo 2^32
            if self.is_full_range() {
                i32::MIN
            } else {
                0
            }
        } else {
            let (lo, _) = self.signed_range();
            if lo < i32::MIN as i64 {
                i32::MIN
            } else {
                lo as i32
            }
        }
    }

    /// Largest representable value
    pub fn max(self) -> i32 {
        let hi = if self.s == 0 { self.umax() } else { self.signed_range().1 };
        if hi > i32::MAX as i64 {
            i32::MAX
        } else {
            hi as i32
        }
    }

    pub fn can_represent_value(self, value: i32) -> bool {
        self.min() <= value && value <= self.max()
    }

    /// Whether the whole sequence is transmittable, differences included
    ///
    /// Differences are taken exactly, so a signed delta coding may fail on a
    /// pair of values whose gap exceeds the coding's span even though both
    /// endpoints fit.
    pub fn can_represent(self, values: &[i32]) -> bool {
        if !self.is_delta() {
            let (lo, hi) = (self.min(), self.max());
            values.iter().all(|&v| lo <= v && v <= hi)
        } else if self.s != 0 {
            let (lo, hi) = self.signed_range();
            let mut prev = 0i64;
            values.iter().all(|&v| {
                let diff = v as i64 - prev;
                prev = v as i64;
                lo <= diff && diff <= hi
            })
        } else {
            let card = self.cardinality();
            card == 1i64 << 32 || values.iter().all(|&v| 0 <= v && (v as i64) < card)
        }
    }

    /// Map a value into its unsigned form
    ///
    /// Takes an `i64` so that signed delta codings can transmit exact
    /// differences wider than 32 bits.
    fn encode_u(self, value: i64) -> i64 {
        if self.s == 0 {
            value as u32 as i64
        } else if value >= 0 {
            value + value / ((1i64 << self.s) - 1)
        } else {
            ((-value) << self.s) - 1
        }
    }

    /// Recover a value from its unsigned form
    fn decode_u(self, u: i64) -> i64 {
        if self.s == 0 {
            u
        } else {
            let mask = (1i64 << self.s) - 1;
            if u & mask == mask {
                -(u >> self.s) - 1
            } else {
                u - (u >> self.s)
            }
        }
    }

    pub(crate) fn write_u<W: WriteBytesExt>(self, out: &mut W, mut u: i64) -> io::Result<()> {
        debug_assert!(0 <= u && u <= self.umax());
        let l = self.l() as i64;
        let h = self.h as i64;
        for i in 0..self.b {
            if i == self.b - 1 || u < l {
                assert!(u <= 255, "unsigned form left over after {} bytes", self.b);
                return out.write_u8(u as u8);
            }
            let digit = l + (u - l) % h;
            out.write_u8(digit as u8)?;
            u = (u - digit) / h;
        }
        unreachable!()
    }

    pub(crate) fn read_u<R: ReadBytesExt>(self, inp: &mut R) -> io::Result<i64> {
        let l = self.l() as i64;
        let h = self.h as i64;
        let mut u = 0i64;
        let mut pow = 1i64;
        for i in 0..self.b {
            let x = inp.read_u8()? as i64;
            u += x * pow;
            if i == self.b - 1 || x < l {
                break;
            }
            pow *= h;
        }
        Ok(u)
    }

    /// Write one value, ignoring any delta dimension
    pub fn write_value<W: WriteBytesExt>(self, out: &mut W, value: i32) -> io::Result<()> {
        let u = self.encode_u(value as i64);
        assert!(
            0 <= u && u <= self.umax(),
            "value {} beyond coding {:?}",
            value,
            self
        );
        self.write_u(out, u)
    }

    /// Read one value, ignoring any delta dimension
    pub fn read_value<R: ReadBytesExt>(self, inp: &mut R) -> io::Result<i32> {
        Ok(self.decode_u(self.read_u(inp)?) as i32)
    }

    /// Write a whole sequence, applying the delta dimension
    pub fn write_values<W: WriteBytesExt>(self, out: &mut W, values: &[i32]) -> io::Result<()> {
        if !self.is_delta() {
            for &v in values {
                self.write_value(out, v)?;
            }
        } else if self.s != 0 {
            let (lo, hi) = self.signed_range();
            let mut prev = 0i64;
            for &v in values {
                let diff = v as i64 - prev;
                prev = v as i64;
                assert!(
                    lo <= diff && diff <= hi,
                    "difference {} beyond coding {:?}",
                    diff,
                    self
                );
                self.write_u(out, self.encode_u(diff))?;
            }
        } else {
            let card = self.cardinality();
            let mut prev = 0i64;
            for &v in values {
                let uv = (v as u32 as i64) % card;
                let mut diff = uv - prev;
                if diff < 0 {
                    diff += card;
                }
                prev = uv;
                self.write_u(out, diff)?;
            }
        }
        Ok(())
    }

    /// Read a whole sequence, applying the delta dimension
    pub fn read_values<R: ReadBytesExt>(
        self,
        inp: &mut R,
        count: usize,
        into: &mut Vec<i32>,
    ) -> io::Result<()> {
        let mut reader = CodingReader::new(self, inp);
        into.reserve(count);
        for _ in 0..count {
            let v = reader.next()?;
            into.push(v);
        }
        Ok(())
    }

    /// Byte length of one transmitted value
    pub fn length_of(self, transmitted: i32) -> usize {
        self.length_of_u(self.encode_u(transmitted as i64))
    }

    fn length_of_u(self, mut u: i64) -> usize {
        let l = self.l() as i64;
        let h = self.h as i64;
        for i in 0..self.b {
            if i == self.b - 1 || u < l {
                return i as usize + 1;
            }
            let digit = l + (u - l) % h;
            u = (u - digit) / h;
        }
        unreachable!()
    }

    /// Byte length of a whole sequence, without materializing it
    pub fn length_of_values(self, values: &[i32]) -> usize {
        if !self.is_delta() {
            values.iter().map(|&v| self.length_of(v)).sum()
        } else if self.s != 0 {
            let mut prev = 0i64;
            values
                .iter()
                .map(|&v| {
                    let diff = v as i64 - prev;
                    prev = v as i64;
                    self.length_of_u(self.encode_u(diff))
                })
                .sum()
        } else {
            let card = self.cardinality();
            let mut prev = 0i64;
            values
                .iter()
                .map(|&v| {
                    let uv = (v as u32 as i64) % card;
                    let mut diff = uv - prev;
                    if diff < 0 {
                        diff += card;
                    }
                    prev = uv;
                    self.length_of_u(diff)
                })
                .sum()
        }
    }

    /// Per-value byte lengths for a whole sequence
    pub(crate) fn length_of_each(self, values: &[i32]) -> Vec<usize> {
        if !self.is_delta() {
            values.iter().map(|&v| self.length_of(v)).collect()
        } else if self.s != 0 {
            let mut prev = 0i64;
            values
                .iter()
                .map(|&v| {
                    let diff = v as i64 - prev;
                    prev = v as i64;
                    self.length_of_u(self.encode_u(diff))
                })
                .collect()
        } else {
            let card = self.cardinality();
            let mut prev = 0i64;
            values
                .iter()
                .map(|&v| {
                    let uv = (v as u32 as i64) % card;
                    let mut diff = uv - prev;
                    if diff < 0 {
                        diff += card;
                    }
                    prev = uv;
                    self.length_of_u(diff)
                })
                .collect()
        }
    }

    /// How different two codings are, for ordering the chooser's probes
    pub(crate) fn distance(self, other: Coding) -> i32 {
        let mut d = (self.b - other.b).abs() + (self.s - other.s).abs() + (self.del - other.del).abs();
        let (mut lo, hi) = if self.h < other.h { (self.h, other.h) } else { (other.h, self.h) };
        while lo < hi {
            lo *= 2;
            d += 1;
        }
        d
    }
}

impl fmt::Debug for Coding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{},{},{})", self.b, self.h, self.s, self.del)
    }
}

/// Streaming reader that tracks the running delta state of one band
pub(crate) struct CodingReader<'a, R: ?Sized> {
    coding: Coding,
    prev: i64,
    inp: &'a mut R,
}

impl<'a, R: ReadBytesExt> CodingReader<'a, R> {
    pub fn new(coding: Coding, inp: &'a mut R) -> CodingReader<'a, R> {
        CodingReader { coding, prev: 0, inp }
    }

    /// Restore the state left by a first value that was read out of band
    pub fn prime(&mut self, first: i32) {
        if !self.coding.is_delta() {
            return;
        }
        if self.coding.s() != 0 {
            self.prev = first as i64;
        } else {
            self.prev = (first as u32 as i64) % self.coding.cardinality();
        }
    }

    pub fn next(&mut self) -> io::Result<i32> {
        let c = self.coding;
        if !c.is_delta() {
            return c.read_value(self.inp);
        }
        if c.s() != 0 {
            let diff = c.decode_u(c.read_u(self.inp)?);
            let v = (self.prev + diff) as i32;
            self.prev = v as i64;
            Ok(v)
        } else {
            let diff = c.read_u(self.inp)?;
            let x = (self.prev + diff) % c.cardinality();
            self.prev = x;
            Ok(x as u32 as i32)
        }
    }
}

/// The canonically numbered codings, exactly as band headers count them
///
/// Index 0 is reserved for "use the band default", so the table is queried
/// with 1-based indices via [`canonical_coding`].
#[rustfmt::skip]
static CANONICAL: [Coding; 115] = [
    // Fixed-length codings
    Coding::of(1, 256),          Coding::of_s(1, 256, 1),
    Coding::of(1, 256).delta(),  Coding::of_s(1, 256, 1).delta(),
    Coding::of(2, 256),          Coding::of_s(2, 256, 1),
    Coding::of(2, 256).delta(),  Coding::of_s(2, 256, 1).delta(),
    Coding::of(3, 256),          Coding::of_s(3, 256, 1),
    Coding::of(3, 256).delta(),  Coding::of_s(3, 256, 1).delta(),
    Coding::of(4, 256),          Coding::of_s(4, 256, 1),
    Coding::of(4, 256).delta(),  Coding::of_s(4, 256, 1).delta(),

    // Full-range variable-length codings
    Coding::of(5, 4),   Coding::of_s(5, 4, 1),   Coding::of_s(5, 4, 2),
    Coding::of(5, 16),  Coding::of_s(5, 16, 1),  Coding::of_s(5, 16, 2),
    Coding::of(5, 32),  Coding::of_s(5, 32, 1),  Coding::of_s(5, 32, 2),
    Coding::of(5, 64),  Coding::of_s(5, 64, 1),  Coding::of_s(5, 64, 2),
    Coding::of(5, 128), Coding::of_s(5, 128, 1), Coding::of_s(5, 128, 2),
    Coding::of(5, 4).delta(),   Coding::of_s(5, 4, 1).delta(),   Coding::of_s(5, 4, 2).delta(),
    Coding::of(5, 16).delta(),  Coding::of_s(5, 16, 1).delta(),  Coding::of_s(5, 16, 2).delta(),
    Coding::of(5, 32).delta(),  Coding::of_s(5, 32, 1).delta(),  Coding::of_s(5, 32, 2).delta(),
    Coding::of(5, 64).delta(),  Coding::of_s(5, 64, 1).delta(),  Coding::of_s(5, 64, 2).delta(),
    Coding::of(5, 128).delta(), Coding::of_s(5, 128, 1).delta(), Coding::of_s(5, 128, 2).delta(),

    // Variable-length subrange codings
    Coding::of(2, 192), Coding::of(2, 224), Coding::of(2, 240),
    Coding::of(2, 248), Coding::of(2, 252),
    Coding::of(2, 8).delta(),   Coding::of_s(2, 8, 1).delta(),
    Coding::of(2, 16).delta(),  Coding::of_s(2, 16, 1).delta(),
    Coding::of(2, 32).delta(),  Coding::of_s(2, 32, 1).delta(),
    Coding::of(2, 64).delta(),  Coding::of_s(2, 64, 1).delta(),
    Coding::of(2, 128).delta(), Coding::of_s(2, 128, 1).delta(),
    Coding::of(2, 192).delta(), Coding::of_s(2, 192, 1).delta(),
    Coding::of(2, 224).delta(), Coding::of_s(2, 224, 1).delta(),
    Coding::of(2, 240).delta(), Coding::of_s(2, 240, 1).delta(),
    Coding::of(2, 248).delta(), Coding::of_s(2, 248, 1).delta(),

    Coding::of(3, 192), Coding::of(3, 224), Coding::of(3, 240),
    Coding::of(3, 248), Coding::of(3, 252),
    Coding::of(3, 8).delta(),   Coding::of_s(3, 8, 1).delta(),
    Coding::of(3, 16).delta(),  Coding::of_s(3, 16, 1).delta(),
    Coding::of(3, 32).delta(),  Coding::of_s(3, 32, 1).delta(),
    Coding::of(3, 64).delta(),  Coding::of_s(3, 64, 1).delta(),
    Coding::of(3, 128).delta(), Coding::of_s(3, 128, 1).delta(),
    Coding::of(3, 192).delta(), Coding::of_s(3, 192, 1).delta(),
    Coding::of(3, 224).delta(), Coding::of_s(3, 224, 1).delta(),
    Coding::of(3, 240).delta(), Coding::of_s(3, 240, 1).delta(),
    Coding::of(3, 248).delta(), Coding::of_s(3, 248, 1).delta(),

    Coding::of(4, 192), Coding::of(4, 224), Coding::of(4, 240),
    Coding::of(4, 248), Coding::of(4, 252),
    Coding::of(4, 8).delta(),   Coding::of_s(4, 8, 1).delta(),
    Coding::of(4, 16).delta(),  Coding::of_s(4, 16, 1).delta(),
    Coding::of(4, 32).delta(),  Coding::of_s(4, 32, 1).delta(),
    Coding::of(4, 64).delta(),  Coding::of_s(4, 64, 1).delta(),
    Coding::of(4, 128).delta(), Coding::of_s(4, 128, 1).delta(),
    Coding::of(4, 192).delta(), Coding::of_s(4, 192, 1).delta(),
    Coding::of(4, 224).delta(), Coding::of_s(4, 224, 1).delta(),
    Coding::of(4, 240).delta(), Coding::of_s(4, 240, 1).delta(),
    Coding::of(4, 248).delta(), Coding::of_s(4, 248, 1).delta(),
];

/// Look up a canonically numbered coding; index 0 and 116+ name none
pub fn canonical_coding(index: u8) -> Option<Coding> {
    if index == 0 {
        None
    } else {
        CANONICAL.get(index as usize - 1).copied()
    }
}

/// The 1-based canonical number of a coding, if it has one
pub fn canonical_index(coding: Coding) -> Option<u8> {
    CANONICAL.iter().position(|&c| c == coding).map(|i| i as u8 + 1)
}

pub(crate) fn canonical_codings() -> &'static [Coding; 115] {
    &CANONICAL
}

#[cfg(test)]
mod test {
    use super::*;

    fn roundtrip(c: Coding, values: &[i32]) -> Vec<u8> {
        let mut buf = Vec::new();
        c.write_values(&mut buf, values).unwrap();
        let mut out = Vec::new();
        c.read_values(&mut &buf[..], values.len(), &mut out).unwrap();
        assert_eq!(values, &out[..], "under {:?}", c);
        buf
    }

    #[test]
    fn byte1_is_plain_bytes() {
        let buf = roundtrip(BYTE1, &[0, 1, 127, 200, 255]);
        assert_eq!(buf, vec![0, 1, 127, 200, 255]);
    }

    #[test]
    fn unsigned5_length_thresholds() {
        // L = 192, so 0..=191 fit in one byte
        assert_eq!(UNSIGNED5.length_of(191), 1);
        assert_eq!(UNSIGNED5.length_of(192), 2);
        assert_eq!(UNSIGNED5.length_of(-1), 5);
        let buf = roundtrip(UNSIGNED5, &[0, 191, 192, 100_000, i32::MAX, -1, i32::MIN]);
        assert_eq!(
            buf.len(),
            UNSIGNED5.length_of_values(&[0, 191, 192, 100_000, i32::MAX, -1, i32::MIN])
        );
    }

    #[test]
    fn signed_zigzag_order() {
        // small magnitudes of either sign stay short and interleave
        let mut buf = Vec::new();
        for v in [0, -1, 1, -2, 2] {
            SIGNED5.write_value(&mut buf, v).unwrap();
        }
        assert_eq!(buf, vec![0, 1, 2, 3, 4]);
        roundtrip(SIGNED5, &[0, -1, 1, i32::MIN, i32::MAX, -64, 64]);
    }

    #[test]
    fn two_sign_bits() {
        // S=2 reserves every fourth code for negatives
        assert_eq!(BRANCH5.length_of(0), 1);
        roundtrip(BRANCH5, &[-2, -1, 0, 1, 2, 3, 4, -10_000, 10_000]);
    }

    #[test]
    fn delta_wraps_within_subrange() {
        let c = Coding::of(2, 192).delta();
        // umax = 255 + 255*192, so the band cardinality is 49216
        assert_eq!(c.max(), 49215);
        roundtrip(c, &[49000, 100, 49215, 0, 0, 25000]);
    }

    #[test]
    fn delta_wraps_full_range() {
        roundtrip(UDELTA5, &[i32::MAX, i32::MIN, -1, 0, 5, -5]);
        roundtrip(DELTA5, &[5, 10, 3, -7, 0, 1_000_000]);
    }

    #[test]
    fn representable_ranges() {
        assert_eq!(UNSIGNED5.min(), i32::MIN);
        assert_eq!(UNSIGNED5.max(), i32::MAX);
        assert_eq!(SIGNED5.min(), i32::MIN);
        assert_eq!(SIGNED5.max(), i32::MAX);
        assert_eq!(BCI5.min(), 0);
        assert_eq!(BCI5.max(), 86955);
        assert_eq!(BYTE1.min(), 0);
        assert_eq!(BYTE1.max(), 255);

        let c = Coding::of_s(2, 8, 1);
        assert_eq!(c.min(), -1148);
        assert_eq!(c.max(), 1147);

        assert!(!BCI5.can_represent(&[-1]));
        assert!(BCI5.can_represent(&[0, 86955]));
        assert!(UNSIGNED5.can_represent(&[-1]));
    }

    #[test]
    fn delta_representability_is_about_differences() {
        let c = Coding::of_s(2, 8, 1).delta();
        assert!(c.can_represent(&[0, 1000, 0, -1000, 0]));
        assert!(!c.can_represent(&[0, 2000]));
    }

    #[test]
    #[should_panic(expected = "beyond coding")]
    fn rejects_unrepresentable_writes() {
        let mut buf = Vec::new();
        BCI5.write_value(&mut buf, -1).unwrap();
    }

    #[test]
    fn canonical_table_well_formed() {
        for i in 1..=115u8 {
            let c = canonical_coding(i).unwrap();
            assert_eq!(canonical_index(c), Some(i));
        }
        assert_eq!(canonical_coding(0), None);
        assert_eq!(canonical_coding(116), None);

        // spot checks against the numbering the family defines
        assert_eq!(canonical_coding(1), Some(BYTE1));
        assert_eq!(canonical_coding(26), Some(UNSIGNED5));
        assert_eq!(canonical_coding(27), Some(SIGNED5));
        assert_eq!(canonical_coding(41), Some(UDELTA5));
        assert_eq!(canonical_coding(42), Some(DELTA5));
        assert_eq!(canonical_coding(17), Some(BCI5));
        assert_eq!(canonical_coding(19), Some(BRANCH5));
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let a = UNSIGNED5;
        let b = Coding::of(2, 192).delta();
        assert_eq!(a.distance(a), 0);
        assert_eq!(a.distance(b), b.distance(a));
        assert!(a.distance(b) > 0);
    }
}
