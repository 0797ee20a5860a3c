//! Randomized cross-checks of the coding layer
//!
//! Deterministic xorshift data keeps any failure reproducible from the
//! seed baked into each test.

use super::adaptive::{run_length_at_most, AdaptiveCoding};
use super::bhsd::canonical_codings;
use super::meta::{parse_meta, write_meta};
use super::population::{PopulationCoding, TokenCoding};
use super::*;

struct TestRng(u64);

impl TestRng {
    fn new(seed: u64) -> TestRng {
        TestRng(seed | 1)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn below(&mut self, n: u32) -> u32 {
        self.next_u32() % n
    }

    fn range(&mut self, lo: i64, hi: i64) -> i32 {
        let span = (hi - lo + 1) as u64;
        (lo + (self.next_u64() % span) as i64) as i32
    }
}

/// A sequence the coding is guaranteed to represent
fn representable_values(rng: &mut TestRng, c: Coding, n: usize) -> Vec<i32> {
    if !c.is_delta() {
        (0..n).map(|_| rng.range(c.min() as i64, c.max() as i64)).collect()
    } else if c.s() != 0 {
        let (lo, hi) = c.signed_range();
        let (lo, hi) = (lo.max(-1000), hi.min(1000));
        let mut v = 0i64;
        (0..n)
            .map(|_| {
                v += rng.range(lo, hi) as i64;
                v as i32
            })
            .collect()
    } else if c.is_full_range() {
        (0..n).map(|_| rng.next_u32() as i32).collect()
    } else {
        let card = c.cardinality();
        (0..n).map(|_| rng.range(0, card - 1)).collect()
    }
}

#[test]
fn every_canonical_coding_roundtrips() {
    let mut rng = TestRng::new(0x5eed);
    for &c in canonical_codings() {
        for n in [1usize, 7, 200] {
            let values = representable_values(&mut rng, c, n);
            let mut buf = Vec::new();
            c.write_values(&mut buf, &values).unwrap();
            assert_eq!(buf.len(), c.length_of_values(&values), "length model for {:?}", c);

            let mut out = Vec::new();
            c.read_values(&mut &buf[..], n, &mut out).unwrap();
            assert_eq!(values, out, "under {:?}", c);
        }
    }
}

fn shaped_band(rng: &mut TestRng, n: usize) -> Vec<i32> {
    match rng.below(4) {
        // uniform noise at a random magnitude
        0 => {
            let bits = 1 + rng.below(16);
            (0..n).map(|_| (rng.next_u32() >> (32 - bits)) as i32).collect()
        }
        // a ramp with glitches
        1 => {
            let step = rng.below(5) as i32;
            (0..n as i32).map(|i| i * step + (rng.below(3) as i32)).collect()
        }
        // a few hot values with occasional outliers
        2 => {
            let hot = [7, 3, 900, -2];
            (0..n)
                .map(|_| {
                    if rng.below(10) < 8 {
                        hot[rng.below(4) as usize]
                    } else {
                        rng.next_u32() as i32 % 1_000_000
                    }
                })
                .collect()
        }
        // two regimes back to back
        _ => {
            let split = n / 3;
            (0..n)
                .map(|i| {
                    if i < split {
                        rng.below(10) as i32
                    } else {
                        100_000 + rng.below(1000) as i32
                    }
                })
                .collect()
        }
    }
}

fn random_method(rng: &mut TestRng, regular: Coding, values: &[i32]) -> Option<CodingMethod> {
    let method = match rng.below(4) {
        0 => CodingMethod::Plain(regular),
        1 => CodingMethod::Plain(random_coding(rng)),
        2 => {
            let mut favored: Vec<i32> = values.to_vec();
            favored.sort_unstable();
            favored.dedup();
            favored.truncate(1 + rng.below(3) as usize);
            CodingMethod::Population(PopulationCoding::new(
                favored,
                UNSIGNED5,
                TokenCoding::Fitted { l: 64 },
                CodingMethod::Plain(UNSIGNED5),
            ))
        }
        _ => {
            if values.len() < 2 {
                return None;
            }
            let k = run_length_at_most(1 + rng.below(values.len() as u32 - 1) as usize);
            CodingMethod::Adaptive(AdaptiveCoding::new(
                k,
                CodingMethod::Plain(UNSIGNED5),
                CodingMethod::Plain(SIGNED5),
            ))
        }
    };
    if method.can_represent(values) {
        Some(method)
    } else {
        None
    }
}

#[test]
fn band_protocol_roundtrips_random_methods() {
    let mut rng = TestRng::new(0xbad_5eed);
    let regulars = [UNSIGNED5, SIGNED5, UDELTA5, DELTA5, MDELTA5, BCI5, BRANCH5];
    let mut exercised = 0;
    for _ in 0..300 {
        let regular = regulars[rng.below(regulars.len() as u32) as usize];
        let n = 1 + rng.below(120) as usize;
        let values = shaped_band(&mut rng, n);
        let method = match random_method(&mut rng, regular, &values) {
            Some(m) => m,
            None => continue,
        };

        let mut buf = Vec::new();
        write_band(&mut buf, &method, &values, regular).unwrap();
        let mut out = Vec::new();
        read_band(&mut &buf[..], n, regular, &mut out).unwrap();
        assert_eq!(values, out, "under {:?} with regular {:?}", method, regular);
        exercised += 1;
    }
    assert!(exercised > 100, "only {} rounds exercised", exercised);
}

fn random_coding(rng: &mut TestRng) -> Coding {
    let table = canonical_codings();
    table[rng.below(table.len() as u32) as usize]
}

#[test]
fn meta_bytes_roundtrip_random_methods() {
    let mut rng = TestRng::new(0x137f);
    for round in 0..500 {
        let dflt = UNSIGNED5;
        let method = match round % 3 {
            0 => CodingMethod::Plain(random_coding(&mut rng)),
            1 => {
                let head_len = run_length_at_most(1 + rng.below(100_000) as usize);
                CodingMethod::Adaptive(AdaptiveCoding::new(
                    head_len,
                    CodingMethod::Plain(random_coding(&mut rng)),
                    CodingMethod::Plain(random_coding(&mut rng)),
                ))
            }
            _ => {
                // parsed populations carry no favored list yet
                CodingMethod::Population(PopulationCoding {
                    fvalues: Vec::new(),
                    fcode: random_coding(&mut rng),
                    tcode: if rng.below(2) == 0 {
                        TokenCoding::Fitted { l: [4, 64, 252][rng.below(3) as usize] }
                    } else {
                        TokenCoding::Given(BYTE1)
                    },
                    ucode: Box::new(CodingMethod::Plain(random_coding(&mut rng))),
                })
            }
        };

        let mut meta = Vec::new();
        write_meta(&method, dflt, &mut meta);
        let mut rest = &meta[1..];
        let parsed = parse_meta(&mut rest, meta[0], dflt, false, 0).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, method);
    }
}

#[test]
fn chooser_results_always_roundtrip() {
    let mut rng = TestRng::new(7);
    for _ in 0..20 {
        let n = 50 + rng.below(400) as usize;
        let values = shaped_band(&mut rng, n);
        for effort in [1, 4, 6, 9] {
            let choice = CodingChooser::new(effort).choose(&values, UNSIGNED5);
            let mut buf = Vec::new();
            write_band(&mut buf, &choice.method, &values, UNSIGNED5).unwrap();
            let mut out = Vec::new();
            read_band(&mut &buf[..], n, UNSIGNED5, &mut out).unwrap();
            assert_eq!(values, out, "effort {} on {} values", effort, n);
        }
    }
}
