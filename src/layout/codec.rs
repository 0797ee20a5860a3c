//! Walking a layout to move one attribute between bytes and band values
//!
//! The two directions are symmetric walks of the same element tree:
//!
//!   - [`parse`] consumes the attribute's content bytes and pushes every
//!     field's value into a [`ValueSink`], band by band
//!
//!   - [`unparse`] pulls values back out of a [`ValueSource`] and rebuilds
//!     the content bytes, leaving reference fields as zero placeholders
//!     recorded in the returned [`Fixups`]
//!
//! [`BandBuffer`] implements both traits over in-memory bands, so a parse
//! followed by a rewind and an unparse reproduces the original bytes.
//!
//! Bytecode positions are renumbered on the way through: `P` and `PO`
//! fields hold renumbered instruction coordinates in their bands, and `O`
//! fields hold coordinate differences, with the walk threading the previous
//! index and position through each body exactly once per replication
//! iteration.

use super::bci::BciMap;
use super::element::{Case, Element, ElementFlags, ElementKind, RefKind};
use super::fixups::{Fixups, RefWidth};
use super::Layout;
use crate::errors::FormatError;
use crate::pool::{ConstantPool, Entry, Index};
use byteorder::{BigEndian, ByteOrder};

/// Bodies nested deeper than this abort the walk
const MAX_DEPTH: u32 = 128;

/// Receiver for the values [`parse`] extracts from attribute bytes
pub trait ValueSink<'g> {
    fn put_int(&mut self, band: u32, value: i32);

    fn put_ref(&mut self, band: u32, entry: Option<Entry<'g>>);

    /// Renumber a byte offset into instruction coordinates
    fn encode_bci(&mut self, bci: u32) -> u32;

    /// The walk descended into callable `target` through a backward call
    fn note_back_call(&mut self, target: usize);
}

/// Supplier of the values [`unparse`] rebuilds attribute bytes from
///
/// Implementations may panic when drained past the values they hold; band
/// counts are fixed by the walk that filled them.
pub trait ValueSource<'g> {
    fn get_int(&mut self, band: u32) -> i32;

    fn get_ref(&mut self, band: u32) -> Option<Entry<'g>>;

    /// Recover the byte offset a renumbered coordinate denotes
    fn decode_bci(&mut self, coded: u32) -> u32;

    /// The walk descended into callable `target` through a backward call
    fn note_back_call(&mut self, target: usize);
}

/// Read one attribute's content bytes, pushing every field into `sink`
///
/// Reference fields resolve through `local_cp`, with plain Utf8 entries
/// promoted to signatures where the layout expects one. The walk must
/// consume `bytes` exactly.
pub fn parse<'g, S: ValueSink<'g>>(
    layout: &Layout,
    bytes: &[u8],
    pool: &ConstantPool<'g>,
    local_cp: &Index<'g>,
    sink: &mut S,
) -> Result<(), FormatError> {
    let mut parser = Parser {
        layout,
        bytes,
        pos: 0,
        pool,
        local_cp,
        sink,
        depth: 0,
    };
    parser.walk_body(layout.entry_body())?;
    if parser.pos != bytes.len() {
        return Err(FormatError::AttributeLengthMismatch {
            name: layout.name().to_string(),
            declared: bytes.len(),
            consumed: parser.pos,
        });
    }
    Ok(())
}

/// Rebuild one attribute's content bytes from the values in `source`
///
/// Bytes are appended to `out`; reference fields are written as zero and
/// returned as [`Fixups`] with locations relative to the first appended
/// byte.
pub fn unparse<'g, S: ValueSource<'g>>(
    layout: &Layout,
    source: &mut S,
    out: &mut Vec<u8>,
) -> Result<Fixups<'g>, FormatError> {
    let base = out.len();
    let mut unparser = Unparser {
        layout,
        source,
        out,
        fixups: Fixups::new(),
        base,
        depth: 0,
    };
    unparser.walk_body(layout.entry_body())?;
    Ok(unparser.fixups)
}

fn band_of(elem: &Element) -> u32 {
    match elem.band {
        Some(band) => band,
        None => unreachable!("value elements always carry a band"),
    }
}

fn select_case<'l>(cases: &'l [Case], value: i32) -> &'l Case {
    let selected = cases
        .iter()
        .find(|case| case.tags.contains(&value))
        .or_else(|| cases.last());
    match selected {
        Some(case) => case,
        None => unreachable!("unions always end with a default case"),
    }
}

struct Parser<'g, 'l, S: ValueSink<'g>> {
    layout: &'l Layout,
    bytes: &'l [u8],
    pos: usize,
    pool: &'l ConstantPool<'g>,
    local_cp: &'l Index<'g>,
    sink: &'l mut S,
    depth: u32,
}

impl<'g, 'l, S: ValueSink<'g>> Parser<'g, 'l, S> {
    fn walk_body(&mut self, body: &'l [Element]) -> Result<(), FormatError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormatError::NestingTooDeep);
        }
        let mut prev_bii: i64 = -1;
        let mut prev_bci: i64 = -1;
        for elem in body {
            self.walk_element(elem, &mut prev_bii, &mut prev_bci)?;
        }
        self.depth -= 1;
        Ok(())
    }

    fn walk_element(
        &mut self,
        elem: &'l Element,
        prev_bii: &mut i64,
        prev_bci: &mut i64,
    ) -> Result<(), FormatError> {
        match &elem.kind {
            ElementKind::Int | ElementKind::Flag => {
                let signed = elem.flags.contains(ElementFlags::SIGNED);
                let value = self.read_fixed(elem.len, signed)?;
                self.sink.put_int(band_of(elem), value);
            }
            ElementKind::Bci => {
                let raw = self.read_fixed(elem.len, false)? as u32;
                let code = i64::from(self.sink.encode_bci(raw));
                let value = if elem.flags.contains(ElementFlags::DELTA) {
                    (code - *prev_bii) as i32
                } else {
                    code as i32
                };
                *prev_bii = code;
                *prev_bci = i64::from(raw);
                self.sink.put_int(band_of(elem), value);
            }
            ElementKind::Bco => {
                let signed = elem.flags.contains(ElementFlags::SIGNED);
                let delta = self.read_fixed(elem.len, signed)?;
                let bci = *prev_bci + i64::from(delta);
                let code = i64::from(self.sink.encode_bci(bci as u32));
                self.sink.put_int(band_of(elem), (code - *prev_bii) as i32);
                *prev_bii = code;
                *prev_bci = bci;
            }
            ElementKind::Replication { body } => {
                let count = self.read_fixed(elem.len, false)?;
                self.sink.put_int(band_of(elem), count);
                for _ in 0..count.max(0) {
                    self.walk_body(body)?;
                }
            }
            ElementKind::Union { cases } => {
                let signed = elem.flags.contains(ElementFlags::SIGNED);
                let value = self.read_fixed(elem.len, signed)?;
                self.sink.put_int(band_of(elem), value);
                self.walk_body(&select_case(cases, value).body)?;
            }
            ElementKind::Call { target } => {
                if elem.flags.contains(ElementFlags::BACKWARD) {
                    self.sink.note_back_call(*target);
                }
                let body = &self.layout.callables()[*target].body;
                self.walk_body(body)?;
            }
            ElementKind::Ref { kind } => {
                if elem.len == 0 {
                    self.sink.put_ref(band_of(elem), None);
                } else {
                    let idx = self.read_fixed(elem.len, false)? as u32;
                    self.resolve_ref(band_of(elem), *kind, elem.flags, idx)?;
                }
            }
        }
        Ok(())
    }

    fn resolve_ref(
        &mut self,
        band: u32,
        kind: RefKind,
        flags: ElementFlags,
        idx: u32,
    ) -> Result<(), FormatError> {
        if idx == 0 {
            if !flags.contains(ElementFlags::NULLABLE) {
                return Err(FormatError::NullRef);
            }
            self.sink.put_ref(band, None);
            return Ok(());
        }
        let entry = match self.local_cp.get(idx) {
            Some(entry) => entry,
            None => return Err(FormatError::BadLocalRef(idx)),
        };
        // Signature fields may arrive spelled as plain Utf8
        let entry = match (kind, entry) {
            (RefKind::Signature, Entry::Utf8(utf8)) => {
                Entry::Signature(self.pool.get_signature(&utf8.value))
            }
            _ => entry,
        };
        if !kind.admits(entry.tag()) {
            return Err(FormatError::RefKindMismatch {
                expected: kind.expected(),
                actual: entry.tag().name(),
            });
        }
        self.sink.put_ref(band, Some(entry));
        Ok(())
    }

    fn read_fixed(&mut self, len: u8, signed: bool) -> Result<i32, FormatError> {
        let need = usize::from(len);
        if self.bytes.len() - self.pos < need {
            return Err(FormatError::AttributeLengthMismatch {
                name: self.layout.name().to_string(),
                declared: self.bytes.len(),
                consumed: self.pos + need,
            });
        }
        let at = self.pos;
        self.pos += need;
        Ok(match (len, signed) {
            (0, _) => 0,
            (1, false) => i32::from(self.bytes[at]),
            (1, true) => i32::from(self.bytes[at] as i8),
            (2, false) => i32::from(BigEndian::read_u16(&self.bytes[at..])),
            (2, true) => i32::from(BigEndian::read_i16(&self.bytes[at..])),
            (4, _) => BigEndian::read_u32(&self.bytes[at..]) as i32,
            _ => unreachable!("layout widths are 0, 1, 2 or 4"),
        })
    }
}

struct Unparser<'g, 'l, S: ValueSource<'g>> {
    layout: &'l Layout,
    source: &'l mut S,
    out: &'l mut Vec<u8>,
    fixups: Fixups<'g>,
    base: usize,
    depth: u32,
}

impl<'g, 'l, S: ValueSource<'g>> Unparser<'g, 'l, S> {
    fn walk_body(&mut self, body: &'l [Element]) -> Result<(), FormatError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormatError::NestingTooDeep);
        }
        let mut prev_bii: i64 = -1;
        let mut prev_bci: i64 = -1;
        for elem in body {
            self.walk_element(elem, &mut prev_bii, &mut prev_bci)?;
        }
        self.depth -= 1;
        Ok(())
    }

    fn walk_element(
        &mut self,
        elem: &'l Element,
        prev_bii: &mut i64,
        prev_bci: &mut i64,
    ) -> Result<(), FormatError> {
        match &elem.kind {
            ElementKind::Int | ElementKind::Flag => {
                let signed = elem.flags.contains(ElementFlags::SIGNED);
                let value = self.source.get_int(band_of(elem));
                self.put_fixed(value, elem.len, signed)?;
            }
            ElementKind::Bci => {
                let x = self.source.get_int(band_of(elem));
                let code = if elem.flags.contains(ElementFlags::DELTA) {
                    *prev_bii + i64::from(x)
                } else {
                    i64::from(x as u32)
                };
                let bci = i64::from(self.source.decode_bci(code as u32));
                *prev_bii = code;
                *prev_bci = bci;
                self.put_fixed(bci as i32, elem.len, false)?;
            }
            ElementKind::Bco => {
                let signed = elem.flags.contains(ElementFlags::SIGNED);
                let x = self.source.get_int(band_of(elem));
                *prev_bii += i64::from(x);
                let decoded = i64::from(self.source.decode_bci(*prev_bii as u32));
                let field = (decoded - *prev_bci) as i32;
                *prev_bci += i64::from(field);
                self.put_fixed(field, elem.len, signed)?;
            }
            ElementKind::Replication { body } => {
                let count = self.source.get_int(band_of(elem));
                self.put_fixed(count, elem.len, false)?;
                for _ in 0..count.max(0) {
                    self.walk_body(body)?;
                }
            }
            ElementKind::Union { cases } => {
                let signed = elem.flags.contains(ElementFlags::SIGNED);
                let value = self.source.get_int(band_of(elem));
                self.put_fixed(value, elem.len, signed)?;
                self.walk_body(&select_case(cases, value).body)?;
            }
            ElementKind::Call { target } => {
                if elem.flags.contains(ElementFlags::BACKWARD) {
                    self.source.note_back_call(*target);
                }
                let body = &self.layout.callables()[*target].body;
                self.walk_body(body)?;
            }
            ElementKind::Ref { .. } => {
                let entry = self.source.get_ref(band_of(elem));
                self.put_ref(entry, elem.len);
            }
        }
        Ok(())
    }

    /// Write a reference field as zeros, recording a fixup when an entry
    /// must be patched in later
    fn put_ref(&mut self, entry: Option<Entry<'g>>, len: u8) {
        let entry = match entry {
            Some(entry) if len > 0 => entry,
            // null stays all zeros; zero-width fields transmit nothing
            _ => {
                self.out.extend(std::iter::repeat(0).take(usize::from(len)));
                return;
            }
        };
        match len {
            1 => {
                let location = self.rel_pos();
                self.out.push(0);
                self.fixups.add(location, RefWidth::One, entry);
            }
            2 => {
                let location = self.rel_pos();
                self.out.extend_from_slice(&[0, 0]);
                self.fixups.add(location, RefWidth::Two, entry);
            }
            4 => {
                // the upper half of a four-byte index is always zero
                self.out.extend_from_slice(&[0, 0]);
                let location = self.rel_pos();
                self.out.extend_from_slice(&[0, 0]);
                self.fixups.add(location, RefWidth::Two, entry);
            }
            _ => unreachable!("layout widths are 0, 1, 2 or 4"),
        }
    }

    fn rel_pos(&self) -> u32 {
        (self.out.len() - self.base) as u32
    }

    fn put_fixed(&mut self, value: i32, len: u8, signed: bool) -> Result<(), FormatError> {
        let fits = match (len, signed) {
            (0, _) => value == 0,
            (1, false) => (0..=0xFF).contains(&value),
            (1, true) => (-0x80..=0x7F).contains(&value),
            (2, false) => (0..=0xFFFF).contains(&value),
            (2, true) => (-0x8000..=0x7FFF).contains(&value),
            (4, _) => true,
            _ => unreachable!("layout widths are 0, 1, 2 or 4"),
        };
        if !fits {
            return Err(FormatError::ValueOutOfRange { value, len });
        }
        match len {
            0 => {}
            1 => self.out.push(value as u8),
            2 => {
                let mut buf = [0u8; 2];
                BigEndian::write_u16(&mut buf, value as u16);
                self.out.extend_from_slice(&buf);
            }
            4 => {
                let mut buf = [0u8; 4];
                BigEndian::write_u32(&mut buf, value as u32);
                self.out.extend_from_slice(&buf);
            }
            _ => unreachable!(),
        }
        Ok(())
    }
}

/// In-memory band storage implementing both walk directions
///
/// [`parse`] fills it as a [`ValueSink`]; after a
/// [`rewind`](BandBuffer::rewind) the same values replay through the
/// [`ValueSource`] side for [`unparse`].
pub struct BandBuffer<'g> {
    ints: Vec<Vec<i32>>,
    refs: Vec<Vec<Option<Entry<'g>>>>,
    int_cursor: Vec<usize>,
    ref_cursor: Vec<usize>,
    back_calls: Vec<u32>,
    bci_map: Option<BciMap>,
}

impl<'g> BandBuffer<'g> {
    pub fn for_layout(layout: &Layout) -> BandBuffer<'g> {
        let bands = layout.band_count() as usize;
        BandBuffer {
            ints: vec![Vec::new(); bands],
            refs: vec![Vec::new(); bands],
            int_cursor: vec![0; bands],
            ref_cursor: vec![0; bands],
            back_calls: vec![0; layout.callables().len()],
            bci_map: None,
        }
    }

    /// Renumber bytecode positions through `map` instead of the identity
    pub fn set_bci_map(&mut self, map: BciMap) {
        self.bci_map = Some(map);
    }

    /// Reset replay cursors and backward call counts
    pub fn rewind(&mut self) {
        for cursor in &mut self.int_cursor {
            *cursor = 0;
        }
        for cursor in &mut self.ref_cursor {
            *cursor = 0;
        }
        for count in &mut self.back_calls {
            *count = 0;
        }
    }

    pub fn ints(&self, band: u32) -> &[i32] {
        &self.ints[band as usize]
    }

    pub fn refs(&self, band: u32) -> &[Option<Entry<'g>>] {
        &self.refs[band as usize]
    }

    /// How many times each callable was entered through a backward call
    pub fn back_calls(&self) -> &[u32] {
        &self.back_calls
    }
}

impl<'g> ValueSink<'g> for BandBuffer<'g> {
    fn put_int(&mut self, band: u32, value: i32) {
        self.ints[band as usize].push(value);
    }

    fn put_ref(&mut self, band: u32, entry: Option<Entry<'g>>) {
        self.refs[band as usize].push(entry);
    }

    fn encode_bci(&mut self, bci: u32) -> u32 {
        match &self.bci_map {
            Some(map) => map.encode(bci),
            None => bci,
        }
    }

    fn note_back_call(&mut self, target: usize) {
        self.back_calls[target] += 1;
    }
}

impl<'g> ValueSource<'g> for BandBuffer<'g> {
    fn get_int(&mut self, band: u32) -> i32 {
        let at = self.int_cursor[band as usize];
        self.int_cursor[band as usize] = at + 1;
        match self.ints[band as usize].get(at) {
            Some(&value) => value,
            None => panic!("integer band {} exhausted", band),
        }
    }

    fn get_ref(&mut self, band: u32) -> Option<Entry<'g>> {
        let at = self.ref_cursor[band as usize];
        self.ref_cursor[band as usize] = at + 1;
        match self.refs[band as usize].get(at) {
            Some(&entry) => entry,
            None => panic!("reference band {} exhausted", band),
        }
    }

    fn decode_bci(&mut self, coded: u32) -> u32 {
        match &self.bci_map {
            Some(map) => map.decode(coded),
            None => coded,
        }
    }

    fn note_back_call(&mut self, target: usize) {
        self.back_calls[target] += 1;
    }
}
