//! Deferred patching of reference fields
//!
//! When an attribute is rebuilt from band values, its reference fields
//! cannot be filled in right away: the local constant pool is numbered only
//! after every attribute has declared which entries it uses. A rebuilt
//! attribute therefore carries [`Fixups`], the byte locations still waiting
//! for the index of the entry they name, to be patched once the local pool
//! is final.

use crate::errors::FormatError;
use crate::pool::{Entry, Index};
use byteorder::{BigEndian, ByteOrder};

/// Width of the field a reference index is patched into
///
/// Four-byte reference fields keep their upper half zero, so even those
/// take a two-byte patch.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RefWidth {
    One,
    Two,
}

impl RefWidth {
    fn bytes(self) -> u32 {
        match self {
            RefWidth::One => 1,
            RefWidth::Two => 2,
        }
    }
}

/// One byte location waiting for a pool index
#[derive(Clone, Copy, Debug)]
pub struct Fixup<'g> {
    pub location: u32,
    pub width: RefWidth,
    pub entry: Entry<'g>,
}

/// The ordered fixup list of one attribute's content bytes
#[derive(Debug)]
pub struct Fixups<'g> {
    fixups: Vec<Fixup<'g>>,
}

impl<'g> Fixups<'g> {
    pub fn new() -> Fixups<'g> {
        Fixups { fixups: Vec::new() }
    }

    /// The fixups of a bare reference attribute: one two-byte index at
    /// offset zero
    pub fn of_ref(entry: Entry<'g>) -> Fixups<'g> {
        Fixups {
            fixups: vec![Fixup {
                location: 0,
                width: RefWidth::Two,
                entry,
            }],
        }
    }

    /// Record that the bytes at `location` must receive `entry`'s index
    ///
    /// Locations must be added in ascending order and may not overlap.
    pub fn add(&mut self, location: u32, width: RefWidth, entry: Entry<'g>) {
        if let Some(last) = self.fixups.last() {
            assert!(
                last.location + last.width.bytes() <= location,
                "fixup locations must ascend without overlapping",
            );
        }
        self.fixups.push(Fixup {
            location,
            width,
            entry,
        });
    }

    pub fn len(&self) -> usize {
        self.fixups.len()
    }

    /// The records in location order
    pub fn iter(&self) -> impl Iterator<Item = Fixup<'g>> + '_ {
        self.fixups.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.fixups.is_empty()
    }

    /// Every entry these fixups name, in location order
    pub fn visit_refs(&self, mut visit: impl FnMut(Entry<'g>)) {
        for fixup in &self.fixups {
            visit(fixup.entry);
        }
    }

    /// Patch every recorded location with its entry's index, then forget
    /// the list
    ///
    /// Panics if an entry has no place in `index`: references must be
    /// collected into the local pool before any attribute is finished.
    pub fn finish_refs(&mut self, index: &Index<'g>, bytes: &mut [u8]) -> Result<(), FormatError> {
        for fixup in &self.fixups {
            let rank = match index.index_of(fixup.entry) {
                Some(rank) => rank,
                None => panic!("no index in {:?} for referenced entry {}", index.name(), fixup.entry),
            };
            let at = fixup.location as usize;
            match fixup.width {
                RefWidth::One => {
                    if rank > u32::from(u8::MAX) {
                        return Err(FormatError::RefOverflow { index: rank, len: 1 });
                    }
                    bytes[at] = rank as u8;
                }
                RefWidth::Two => {
                    if rank > u32::from(u16::MAX) {
                        return Err(FormatError::RefOverflow { index: rank, len: 2 });
                    }
                    BigEndian::write_u16(&mut bytes[at..at + 2], rank as u16);
                }
            }
        }
        self.fixups.clear();
        Ok(())
    }
}
