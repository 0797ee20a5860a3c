//! Value frequency statistics for band data
//!
//! The coding chooser consults a [`Histogram`] to estimate how many bytes a
//! candidate coding would spend on a band, and to rank values when seeding a
//! population coding with favored values.

use std::collections::BTreeMap;

/// Frequency summary of one band's values
pub struct Histogram {
    /// Distinct values, ascending
    values: Vec<i32>,

    /// Occurrence counts parallel to `values`
    counts: Vec<u32>,

    /// Rows of `[count, v1, v2, ..]` by descending count, values ascending
    /// within a row
    matrix: Vec<Vec<i32>>,

    total: usize,
}

impl Histogram {
    pub fn new(data: &[i32]) -> Histogram {
        let mut sorted = data.to_vec();
        sorted.sort_unstable();

        let mut values = Vec::new();
        let mut counts: Vec<u32> = Vec::new();
        let mut i = 0;
        while i < sorted.len() {
            let v = sorted[i];
            let mut n = 0u32;
            while i < sorted.len() && sorted[i] == v {
                n += 1;
                i += 1;
            }
            values.push(v);
            counts.push(n);
        }

        let mut rows: BTreeMap<u32, Vec<i32>> = BTreeMap::new();
        for (&v, &c) in values.iter().zip(&counts) {
            rows.entry(c).or_default().push(v);
        }
        let matrix = rows
            .into_iter()
            .rev()
            .map(|(c, vs)| {
                let mut row = Vec::with_capacity(vs.len() + 1);
                row.push(c as i32);
                row.extend(vs);
                row
            })
            .collect();

        Histogram { values, counts, matrix, total: data.len() }
    }

    /// Number of values summarized, counting repeats
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of distinct values
    pub fn distinct(&self) -> usize {
        self.values.len()
    }

    /// Distinct values in ascending order
    pub fn values(&self) -> &[i32] {
        &self.values
    }

    /// Counts parallel to [`Histogram::values`]
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// How often `value` occurs, zero if absent
    pub fn frequency(&self, value: i32) -> u32 {
        match self.values.binary_search(&value) {
            Ok(i) => self.counts[i],
            Err(_) => 0,
        }
    }

    /// `[count, v1, v2, ..]` rows by descending count
    pub fn matrix(&self) -> &[Vec<i32>] {
        &self.matrix
    }

    /// `(value, count)` pairs from most to least frequent, ties in ascending
    /// value order
    pub fn by_frequency(&self) -> impl Iterator<Item = (i32, u32)> + '_ {
        self.matrix.iter().flat_map(|row| {
            let count = row[0] as u32;
            row[1..].iter().map(move |&v| (v, count))
        })
    }

    /// Total information content in bits: `sum(c * log2(n / c))`
    pub fn entropy(&self) -> f64 {
        let n = self.total as f64;
        self.counts
            .iter()
            .map(|&c| {
                let c = c as f64;
                c * (n / c).log2()
            })
            .sum()
    }
}
