//! Searching for the coding that deflates a band smallest
//!
//! ### Effort
//!
//! The dial runs from 1 (take the default) to 9 (exhaustive). It controls
//! how many plain codings get measured, whether population and run codings
//! are considered at all, and how wide their parameter grids are. Raising
//! the effort never produces a larger result for the same band: every gate
//! only loosens, every grid only grows, the probe order never changes, and
//! a candidate replaces the incumbent only when it is strictly smaller.
//!
//! ### Cost model
//!
//! Candidates are ranked analytically first, then the survivors are written
//! out for real and deflated, since the band bytes ride inside a compressed
//! stream. The measured cost also charges for the band header an escaped
//! coding would need.

use super::adaptive::{run_length_at_most, AdaptiveCoding};
use super::bhsd::{canonical_codings, Coding, UNSIGNED5};
use super::histogram::Histogram;
use super::meta::{can_escape, decode_escape_value, header_cost};
use super::population::{fit_token_coding, PopulationCoding, TokenCoding, MAX_FAVORED};
use super::CodingMethod;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::collections::HashSet;
use std::io::Write;

pub const MIN_EFFORT: i32 = 1;
pub const DEFAULT_EFFORT: i32 = 5;
pub const MAX_EFFORT: i32 = 9;

/// Bands shorter than this are not worth a search at ordinary efforts
const SHORT_BAND: usize = 100;

/// Compound codings stop nesting sub-searches here
const MAX_DEPTH: usize = 4;

/// The outcome of a coding search
#[derive(Clone, Debug)]
pub struct Choice {
    pub method: CodingMethod,

    /// Payload bytes, excluding any band header
    pub byte_size: usize,

    /// Deflated payload plus header bytes, the quantity the search minimizes
    pub zip_size: usize,
}

pub struct CodingChooser {
    effort: i32,
    use_population: bool,
    use_adaptive: bool,
}

impl CodingChooser {
    pub fn new(effort: i32) -> CodingChooser {
        let effort = effort.clamp(MIN_EFFORT, MAX_EFFORT);
        CodingChooser { effort, use_population: effort >= 4, use_adaptive: effort >= 6 }
    }

    pub fn effort(&self) -> i32 {
        self.effort
    }

    /// Pick a coding for one band whose default coding is `regular`
    pub fn choose(&self, values: &[i32], regular: Coding) -> Choice {
        self.choose_in(values, regular, 0, true)
    }

    fn choose_in(&self, values: &[i32], regular: Coding, depth: usize, allow_pop: bool) -> Choice {
        if values.is_empty() {
            return Choice { method: CodingMethod::Plain(regular), byte_size: 0, zip_size: 0 };
        }
        if !can_escape(regular) {
            return measure(CodingMethod::Plain(regular), values, regular);
        }
        let baseline = if regular.can_represent(values) { regular } else { UNSIGNED5 };
        if self.effort <= 1 || (values.len() < SHORT_BAND && self.effort < MAX_EFFORT) {
            return measure(CodingMethod::Plain(baseline), values, regular);
        }

        let hist = Histogram::new(values);
        let stats = Stats::of(values);

        // candidates that look at most 25% worse than the baseline, analytically
        let baseline_est = estimate(baseline, &hist, values);
        let prune_at = baseline_est + baseline_est / 4 + 8;
        let mut candidates: Vec<Candidate> = canonical_codings()
            .iter()
            .filter(|&&c| c != baseline && stats.representable(c))
            .map(|&c| Candidate { coding: c, est: estimate(c, &hist, values) })
            .filter(|cand| cand.est <= prune_at)
            .collect();

        let mut best = measure(CodingMethod::Plain(baseline), values, regular);

        // probe outward from the baseline, in windows that narrow as the
        // budget is spent
        let max_dist = candidates.iter().map(|c| c.coding.distance(baseline)).fold(0, i32::max);
        let budget = (4 + 3 * self.effort) as usize;
        let patience = (2 + self.effort / 2) as usize;
        let mut evaluated = vec![baseline];
        let mut fails = 0;
        for k in 0..budget {
            if candidates.is_empty() {
                break;
            }
            let window = i32::max(1, max_dist >> (k as u32 / 3));
            let mut pick = 0;
            let mut pick_key = (i32::MAX, usize::MAX);
            for (i, cand) in candidates.iter().enumerate() {
                let dist =
                    evaluated.iter().map(|&e| cand.coding.distance(e)).fold(i32::MAX, i32::min);
                let key = ((dist - window).abs(), cand.est);
                if key < pick_key {
                    pick = i;
                    pick_key = key;
                }
            }
            let cand = candidates.remove(pick);
            evaluated.push(cand.coding);
            let choice = measure(CodingMethod::Plain(cand.coding), values, regular);
            if choice.zip_size < best.zip_size {
                best = choice;
                fails = 0;
            } else {
                fails += 1;
                if fails >= patience {
                    break;
                }
            }
        }

        if self.use_population && allow_pop && depth < MAX_DEPTH {
            if let Some(choice) = self.search_population(values, regular, &hist, depth) {
                if choice.zip_size < best.zip_size {
                    log::debug!(
                        "population coding wins: {} vs {} deflated bytes",
                        choice.zip_size,
                        best.zip_size
                    );
                    best = choice;
                }
            }
        }
        if self.use_adaptive && depth < MAX_DEPTH {
            if let Some(choice) = self.search_adaptive(values, regular, baseline, depth) {
                if choice.zip_size < best.zip_size {
                    log::debug!(
                        "run coding wins: {} vs {} deflated bytes",
                        choice.zip_size,
                        best.zip_size
                    );
                    best = choice;
                }
            }
        }
        if depth == 0 {
            log::trace!(
                "coding search over {} values settled on {:?} ({} deflated)",
                values.len(),
                best.method,
                best.zip_size
            );
        }
        best
    }

    fn search_population(
        &self,
        values: &[i32],
        regular: Coding,
        hist: &Histogram,
        depth: usize,
    ) -> Option<Choice> {
        if hist.distinct() < 2 {
            return None;
        }
        let freq: Vec<(i32, u32)> = hist.by_frequency().collect();
        let cap = freq.len().min(MAX_FAVORED);
        let n = values.len();

        // greedy scan for the favored count with the best estimated cost
        let mut fav_bytes = 0usize;
        let mut unf_bytes: usize =
            freq.iter().map(|&(v, c)| c as usize * UNSIGNED5.length_of(v)).sum();
        let mut best_k = 0usize;
        let mut best_est = usize::MAX;
        for k in 1..=cap {
            let (v, count) = freq[k - 1];
            fav_bytes += UNSIGNED5.length_of(v);
            unf_bytes -= count as usize * UNSIGNED5.length_of(v);
            let tlen = match fit_token_coding(k, 64) {
                Some(t) => t.length_of(k as i32),
                None => break,
            };
            let est = fav_bytes + n * tlen + unf_bytes;
            if est < best_est {
                best_est = est;
                best_k = k;
            }
        }
        if best_k == 0 {
            return None;
        }

        // refine around the greedy count, wider at higher effort
        let mut ks = vec![best_k];
        if self.effort >= 5 {
            ks.push(best_k * 3 / 4);
            ks.push(best_k + best_k / 4);
        }
        if self.effort >= 7 {
            ks.push(best_k / 2);
            ks.push(best_k * 2);
        }
        let ls: &[i32] = if self.effort >= 7 {
            &[4, 8, 16, 64, 192, 252]
        } else if self.effort >= 5 {
            &[8, 64, 252]
        } else {
            &[64]
        };

        let sub = CodingChooser::new(self.effort - 1);
        let mut seen = HashSet::new();
        let mut best: Option<Choice> = None;
        for &k in &ks {
            let k = k.clamp(1, cap);
            if !seen.insert(k) {
                continue;
            }
            let hot: Vec<i32> = freq[..k].iter().map(|&(v, _)| v).collect();
            let favored: HashSet<i32> = hot.iter().copied().collect();
            let unfavored: Vec<i32> =
                values.iter().copied().filter(|v| !favored.contains(v)).collect();
            let ucode = sub.choose_in(&unfavored, regular, depth + 1, false).method;

            let mut lists = vec![hot.clone()];
            if self.effort >= 5 {
                let mut asc = hot;
                asc.sort_unstable();
                lists.push(asc);
            }
            for fvalues in lists {
                let mut fband = fvalues.clone();
                fband.push(fvalues[fvalues.len() - 1]);
                let fcode = best_plain_coding(&fband, regular);
                for &l in ls {
                    if fit_token_coding(k, l).is_none() {
                        continue;
                    }
                    let pop = PopulationCoding::new(
                        fvalues.clone(),
                        fcode,
                        TokenCoding::Fitted { l },
                        ucode.clone(),
                    );
                    let choice = measure(CodingMethod::Population(pop), values, regular);
                    match &best {
                        Some(b) if b.zip_size <= choice.zip_size => {}
                        _ => best = Some(choice),
                    }
                }
            }
        }
        best
    }

    fn search_adaptive(
        &self,
        values: &[i32],
        regular: Coding,
        baseline: Coding,
        depth: usize,
    ) -> Option<Choice> {
        let n = values.len();
        if n < 2 * SHORT_BAND {
            return None;
        }
        let lens = baseline.length_of_each(values);
        let total: usize = lens.iter().sum();
        let mean = total as f64 / n as f64;

        // lower tiers admit only sharply priced bulges
        const THRESHOLDS: [f64; 4] = [2.0, 1.5, 1.0, 0.5];
        let tiers = (((self.effort - 6).max(0) as usize) + 1).min(THRESHOLDS.len());

        let sub = CodingChooser::new(self.effort - 1);
        let mut tried = HashSet::new();
        let mut best: Option<Choice> = None;
        for &thr in &THRESHOLDS[..tiers] {
            for dir in [1.0f64, -1.0] {
                let (a, b, gain) = max_segment(&lens, mean, dir, thr);
                if gain < 32.0 || b <= a || (a == 0 && b == n) {
                    continue;
                }
                if !tried.insert((a, b)) {
                    continue;
                }
                let method = if a == 0 {
                    let k = run_length_at_most(b);
                    if k == 0 || k >= n {
                        continue;
                    }
                    let head = sub.choose_in(&values[..k], regular, depth + 1, false).method;
                    let tail = sub.choose_in(&values[k..], regular, depth + 1, false).method;
                    CodingMethod::Adaptive(AdaptiveCoding::new(k, head, tail))
                } else {
                    let k1 = run_length_at_most(a);
                    let k2 = run_length_at_most(b - k1);
                    let head = sub.choose_in(&values[..k1], regular, depth + 1, false).method;
                    if k1 + k2 >= n {
                        let tail = sub.choose_in(&values[k1..], regular, depth + 1, false).method;
                        CodingMethod::Adaptive(AdaptiveCoding::new(k1, head, tail))
                    } else {
                        let mid =
                            sub.choose_in(&values[k1..k1 + k2], regular, depth + 1, false).method;
                        let tail =
                            sub.choose_in(&values[k1 + k2..], regular, depth + 1, false).method;
                        CodingMethod::Adaptive(AdaptiveCoding::new(
                            k1,
                            head,
                            CodingMethod::Adaptive(AdaptiveCoding::new(k2, mid, tail)),
                        ))
                    }
                };
                let choice = measure(method, values, regular);
                match &best {
                    Some(b) if b.zip_size <= choice.zip_size => {}
                    _ => best = Some(choice),
                }
            }
        }
        best
    }
}

struct Candidate {
    coding: Coding,
    est: usize,
}

/// Cheap representability bounds, computed once per band
struct Stats {
    vmin: i32,
    vmax: i32,
    dmin: i64,
    dmax: i64,
}

impl Stats {
    fn of(values: &[i32]) -> Stats {
        let mut stats = Stats { vmin: i32::MAX, vmax: i32::MIN, dmin: i64::MAX, dmax: i64::MIN };
        let mut prev = 0i64;
        for &v in values {
            stats.vmin = stats.vmin.min(v);
            stats.vmax = stats.vmax.max(v);
            let diff = v as i64 - prev;
            prev = v as i64;
            stats.dmin = stats.dmin.min(diff);
            stats.dmax = stats.dmax.max(diff);
        }
        stats
    }

    fn representable(&self, c: Coding) -> bool {
        if !c.is_delta() {
            c.min() <= self.vmin && self.vmax <= c.max()
        } else if c.s() != 0 {
            let (lo, hi) = c.signed_range();
            lo <= self.dmin && self.dmax <= hi
        } else {
            c.is_full_range() || (self.vmin >= 0 && (self.vmax as i64) < c.cardinality())
        }
    }
}

/// Analytic cost: histogram-weighted for direct codings, a full walk for
/// delta codings
fn estimate(c: Coding, hist: &Histogram, values: &[i32]) -> usize {
    if !c.is_delta() {
        hist.values().iter().zip(hist.counts()).map(|(&v, &n)| n as usize * c.length_of(v)).sum()
    } else {
        c.length_of_values(values)
    }
}

/// Cheapest plain coding by exact payload length, without deflation
fn best_plain_coding(values: &[i32], regular: Coding) -> Coding {
    let dflt = if regular.can_represent(values) { regular } else { UNSIGNED5 };
    let stats = Stats::of(values);
    let hist = Histogram::new(values);
    let mut best = dflt;
    let mut best_est = estimate(dflt, &hist, values);
    for &c in canonical_codings() {
        if c == dflt || !stats.representable(c) {
            continue;
        }
        let est = estimate(c, &hist, values);
        if est < best_est {
            best = c;
            best_est = est;
        }
    }
    best
}

/// Strongest contiguous run whose per-value cost deviates from the mean by
/// more than `thr` in direction `dir`, by maximum subarray sum
fn max_segment(lens: &[usize], mean: f64, dir: f64, thr: f64) -> (usize, usize, f64) {
    let mut best = (0usize, 0usize, 0.0f64);
    let mut start = 0usize;
    let mut sum = 0.0f64;
    for (i, &len) in lens.iter().enumerate() {
        sum += dir * (len as f64 - mean) - thr;
        if sum <= 0.0 {
            sum = 0.0;
            start = i + 1;
            continue;
        }
        if sum > best.2 {
            best = (start, i + 1, sum);
        }
    }
    best
}

/// Write `method` out for real and price the result
fn measure(method: CodingMethod, values: &[i32], regular: Coding) -> Choice {
    let mut payload = Vec::new();
    if method.write_values(&mut payload, values).is_err() {
        return Choice { method, byte_size: usize::MAX, zip_size: usize::MAX };
    }
    let header = match &method {
        CodingMethod::Plain(c) if *c == regular => {
            if can_escape(regular) && decode_escape_value(values[0], regular).is_some() {
                header_cost(&method, regular)
            } else {
                0
            }
        }
        _ => header_cost(&method, regular),
    };
    let zip_size = deflate_len(&payload) + header;
    Choice { method, byte_size: payload.len(), zip_size }
}

fn deflate_len(bytes: &[u8]) -> usize {
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    if enc.write_all(bytes).is_err() {
        return bytes.len();
    }
    match enc.finish() {
        Ok(out) => out.len(),
        Err(_) => bytes.len(),
    }
}
