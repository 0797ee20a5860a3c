//! Renumbering of bytecode indices
//!
//! Attributes store bytecode positions as raw byte offsets into the code
//! array. Those offsets compress poorly, so before transmission they are
//! renumbered against the list of instruction boundaries: an offset landing
//! exactly on the `i`th boundary becomes `i`, and an offset falling between
//! boundaries becomes a value past every ordinal, ordered the same way the
//! raw offsets are. The mapping is a bijection on `u32`, so even offsets
//! pointing outside the code array survive a round trip.

/// Instruction boundary table for one method's code array
///
/// Holds every instruction start plus one end marker just past the last
/// instruction, strictly ascending. An empty table renumbers nothing and
/// maps every offset to itself.
#[derive(Clone, Debug)]
pub struct BciMap {
    starts: Vec<u32>,
}

impl BciMap {
    pub fn new(starts: Vec<u32>) -> BciMap {
        assert!(
            starts.windows(2).all(|w| w[0] < w[1]),
            "instruction boundaries must be strictly ascending",
        );
        BciMap { starts }
    }

    /// Renumber a byte offset into instruction coordinates
    pub fn encode(&self, bci: u32) -> u32 {
        let len = self.starts.len() as u32;
        match self.starts.binary_search(&bci) {
            Ok(ordinal) => ordinal as u32,
            // Offsets between boundaries sort after every ordinal, shifted
            // down by the boundaries below them.
            Err(below) => len.wrapping_add(bci - below as u32),
        }
    }

    /// Recover the byte offset a renumbered value denotes
    pub fn decode(&self, coded: u32) -> u32 {
        let len = self.starts.len() as u32;
        if coded < len {
            return self.starts[coded as usize];
        }
        let key = coded - len;
        // starts[i] - i never decreases, so the count below is a partition
        let mut lo = 0;
        let mut hi = self.starts.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.starts[mid] - mid as u32 <= key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        key + lo as u32
    }
}
