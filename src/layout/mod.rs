//! Attribute layouts: the mini-language naming what an attribute contains
//!
//! Every attribute the transcoder understands is described by a _layout_, a
//! compact string spelling out the attribute's byte-level structure field by
//! field. Layouts for the standard attributes are built in, and archives can
//! define new ones for attributes the transcoder has never seen.
//!
//! ### The language
//!
//! ```text
//! layout:  element*  |  callable+
//! element:
//!   integral:     'B' | 'H' | 'I' | 'V'        (1, 2, 4, 0 bytes)
//!                 | 'S' integral                (stored signed)
//!   bc_index:     'P' uint | 'PO' uint          (bytecode index)
//!   bc_offset:    'O' uint | 'OS' uint          (offset from last index)
//!   flag:         'F' uint
//!   replication:  'N' uint '[' element* ']'
//!   union:        'T' integral case* '(' ')' '[' element* ']'
//!   case:         '(' tag (',' tag)* ')' '[' element* ']'
//!   tag:          numeral | numeral '-' numeral
//!   call:         '(' numeral ')'
//!   reference:    ('K' | 'R') kind_letter 'N'? uint
//! callable:      '[' element* ']'
//! ```
//!
//! A layout is either one anonymous run of elements or a list of bracketed
//! callables that call each other by relative number, which is how the
//! recursive annotation attributes are spelled. Tokenizing a layout yields
//! the [`Element`] tree plus a band index for every value-carrying element;
//! the [`codec`](self) then walks that tree to move one attribute between
//! its class file bytes and its band values.

mod attribute;
mod bci;
mod codec;
mod element;
mod fixups;
mod normalize;

pub use attribute::{AttrDefs, Attribute};
pub use bci::BciMap;
pub use codec::{parse, unparse, BandBuffer, ValueSink, ValueSource};
pub use element::{Callable, Case, Element, ElementFlags, ElementKind, RefKind};
pub use fixups::{Fixup, Fixups, RefWidth};
pub use normalize::{expand_case_dash_notation, normalize};

use crate::errors::{LayoutError, LayoutErrorKind};
use std::collections::HashSet;

/// The kind of class file structure an attribute is attached to
///
/// The same attribute name can mean different things in different contexts,
/// so layouts are always defined per context.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum AttrContext {
    Class,
    Field,
    Method,
    Code,
}

impl AttrContext {
    pub fn name(self) -> &'static str {
        match self {
            AttrContext::Class => "class",
            AttrContext::Field => "field",
            AttrContext::Method => "method",
            AttrContext::Code => "code",
        }
    }
}

/// A tokenized attribute layout
///
/// Holds the normalized definition string and the element tree it denotes.
/// A layout with no explicit callables is stored as a single callable that
/// nothing calls, so the attribute's top-level body is always
/// [`entry_body`](Layout::entry_body).
#[derive(Debug)]
pub struct Layout {
    context: AttrContext,
    name: Box<str>,
    layout: Box<str>,
    callables: Vec<Callable>,
    band_count: u32,
}

impl Layout {
    /// Normalize and tokenize one attribute definition
    pub fn define(context: AttrContext, name: &str, layout: &str) -> Result<Layout, LayoutError> {
        let fail = |layout: String, kind| LayoutError {
            ctxt: context,
            name: name.to_string(),
            layout,
            kind,
        };
        let normalized = match normalize(layout) {
            Ok(normalized) => normalized.into_owned(),
            Err(kind) => return Err(fail(layout.to_string(), kind)),
        };
        match tokenize(&normalized) {
            Ok((callables, band_count)) => Ok(Layout {
                context,
                name: name.into(),
                layout: normalized.into_boxed_str(),
                callables,
                band_count,
            }),
            Err(kind) => Err(fail(normalized, kind)),
        }
    }

    pub fn context(&self) -> AttrContext {
        self.context
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalized definition string
    pub fn layout(&self) -> &str {
        &self.layout
    }

    /// How many bands this layout's values travel in
    pub fn band_count(&self) -> u32 {
        self.band_count
    }

    pub fn callables(&self) -> &[Callable] {
        &self.callables
    }

    /// The body the attribute starts in
    pub fn entry_body(&self) -> &[Element] {
        &self.callables[0].body
    }

    /// Whether the attribute carries no content bytes at all
    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }
}

/// Parse a normalized definition into callables plus the band count
fn tokenize(text: &str) -> Result<(Vec<Callable>, u32), LayoutErrorKind> {
    let mut tk = Tokenizer {
        text,
        pos: 0,
        bands: 0,
        calls: Vec::new(),
    };

    let bracketed = tk.peek() == Some(b'[');
    let mut callables = Vec::new();
    if bracketed {
        let mut index: i64 = 0;
        loop {
            match tk.peek() {
                None => break,
                Some(b'[') => {
                    tk.pos += 1;
                    let body = tk.parse_elements(index, true)?;
                    callables.push(Callable {
                        body,
                        backward: false,
                    });
                    index += 1;
                }
                Some(b']') => return Err(LayoutErrorKind::TrailingText),
                Some(_) => return Err(LayoutErrorKind::MisplacedCallable),
            }
        }
    } else {
        let body = tk.parse_elements(-1, false)?;
        callables.push(Callable {
            body,
            backward: false,
        });
    }

    // Calls resolve against the explicit callables only; a layout without
    // brackets has nothing to call.
    let explicit = if bracketed { callables.len() } else { 0 };
    for &(target, backward) in &tk.calls {
        if target >= explicit {
            let clamped = target.min(i32::MAX as usize) as i32;
            return Err(LayoutErrorKind::BadCallTarget(clamped));
        }
        if backward {
            callables[target].backward = true;
        }
    }

    Ok((callables, tk.bands))
}

struct Tokenizer<'s> {
    text: &'s str,
    pos: usize,
    bands: u32,
    /// Resolved call targets, with whether each call is backward
    calls: Vec<(usize, bool)>,
}

impl<'s> Tokenizer<'s> {
    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn take(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, b: u8) -> Result<(), LayoutErrorKind> {
        if self.take(b) {
            Ok(())
        } else {
            Err(self.fail_here())
        }
    }

    /// The error for rejecting whatever is at the cursor
    fn fail_here(&self) -> LayoutErrorKind {
        match self.text[self.pos..].chars().next() {
            Some(c) => LayoutErrorKind::UnexpectedChar(c),
            None => LayoutErrorKind::UnexpectedEnd,
        }
    }

    fn next_band(&mut self) -> u32 {
        let band = self.bands;
        self.bands += 1;
        band
    }

    /// Elements up to `]` (consumed) when `closed`, else up to end of text
    fn parse_elements(
        &mut self,
        cur_callable: i64,
        closed: bool,
    ) -> Result<Vec<Element>, LayoutErrorKind> {
        let mut body = Vec::new();
        let mut last_was_bci = false;
        loop {
            match self.peek() {
                None if closed => return Err(LayoutErrorKind::UnexpectedEnd),
                None => return Ok(body),
                Some(b']') if closed => {
                    self.pos += 1;
                    return Ok(body);
                }
                Some(b']') => return Err(LayoutErrorKind::TrailingText),
                Some(_) => {
                    let elem = self.parse_element(cur_callable, last_was_bci)?;
                    last_was_bci = elem.is_bci_anchor();
                    body.push(elem);
                }
            }
        }
    }

    fn parse_element(
        &mut self,
        cur_callable: i64,
        last_was_bci: bool,
    ) -> Result<Element, LayoutErrorKind> {
        match self.peek() {
            Some(b'B' | b'H' | b'I' | b'V' | b'S') => {
                let (len, signed) = self.parse_int_width(true)?;
                Ok(self.banded(ElementKind::Int, sign_flag(signed), len))
            }
            Some(b'P') => {
                self.pos += 1;
                let delta = self.take(b'O');
                if delta && !last_was_bci {
                    return Err(LayoutErrorKind::MissingBciAnchor);
                }
                let (len, _) = self.parse_int_width(false)?;
                let flags = if delta {
                    ElementFlags::DELTA
                } else {
                    ElementFlags::empty()
                };
                Ok(self.banded(ElementKind::Bci, flags, len))
            }
            Some(b'O') => {
                self.pos += 1;
                if !last_was_bci {
                    return Err(LayoutErrorKind::MissingBciAnchor);
                }
                let (len, signed) = self.parse_int_width(true)?;
                Ok(self.banded(ElementKind::Bco, ElementFlags::DELTA | sign_flag(signed), len))
            }
            Some(b'F') => {
                self.pos += 1;
                let len = self.parse_uint_width()?;
                Ok(self.banded(ElementKind::Flag, ElementFlags::empty(), len))
            }
            Some(b'N') => {
                self.pos += 1;
                let len = self.parse_uint_width()?;
                let band = self.next_band();
                self.expect(b'[')?;
                let body = self.parse_elements(cur_callable, true)?;
                Ok(Element {
                    kind: ElementKind::Replication { body },
                    flags: ElementFlags::empty(),
                    len,
                    band: Some(band),
                })
            }
            Some(b'T') => self.parse_union(cur_callable),
            Some(b'K') => {
                self.pos += 1;
                let kind = match self.peek() {
                    Some(b'I') => RefKind::Integer,
                    Some(b'J') => RefKind::Long,
                    Some(b'F') => RefKind::Float,
                    Some(b'D') => RefKind::Double,
                    Some(b'S') => RefKind::String,
                    Some(b'Q') => RefKind::Literal,
                    _ => return Err(self.fail_here()),
                };
                self.pos += 1;
                self.finish_ref(kind)
            }
            Some(b'R') => {
                self.pos += 1;
                let kind = match self.peek() {
                    Some(b'C') => RefKind::Class,
                    Some(b'S') => RefKind::Signature,
                    Some(b'D') => RefKind::Descriptor,
                    Some(b'F') => RefKind::Field,
                    Some(b'M') => RefKind::Method,
                    Some(b'I') => RefKind::InterfaceMethod,
                    Some(b'U') => RefKind::Utf8,
                    Some(b'Q') => RefKind::Any,
                    _ => return Err(self.fail_here()),
                };
                self.pos += 1;
                self.finish_ref(kind)
            }
            Some(b'(') => {
                self.pos += 1;
                let n = self.parse_numeral()?;
                self.expect(b')')?;
                let target = cur_callable + i64::from(n);
                let backward = n <= 0;
                if target < 0 {
                    let clamped = target.max(i64::from(i32::MIN)) as i32;
                    return Err(LayoutErrorKind::BadCallTarget(clamped));
                }
                self.calls.push((target as usize, backward));
                Ok(Element {
                    kind: ElementKind::Call {
                        target: target as usize,
                    },
                    flags: if backward {
                        ElementFlags::BACKWARD
                    } else {
                        ElementFlags::empty()
                    },
                    len: 0,
                    band: None,
                })
            }
            Some(b'[') => Err(LayoutErrorKind::MisplacedCallable),
            _ => Err(self.fail_here()),
        }
    }

    fn parse_union(&mut self, cur_callable: i64) -> Result<Element, LayoutErrorKind> {
        self.pos += 1;
        let (len, signed) = self.parse_int_width(true)?;
        let band = self.next_band();

        let mut cases = Vec::new();
        let mut seen = HashSet::new();
        loop {
            self.expect(b'(')?;
            if self.take(b')') {
                // the tagless default case closes the union
                self.expect(b'[')?;
                let body = self.parse_elements(cur_callable, true)?;
                cases.push(Case {
                    tags: Vec::new(),
                    body,
                });
                break;
            }
            let mut tags = Vec::new();
            loop {
                let lo = self.parse_numeral()?;
                if self.take(b'-') {
                    let hi = self.parse_numeral()?;
                    if hi <= lo || i64::from(hi) - i64::from(lo) > 0x10000 {
                        return Err(LayoutErrorKind::BadCaseRange { lo, hi });
                    }
                    for tag in lo..=hi {
                        if !seen.insert(tag) {
                            return Err(LayoutErrorKind::DuplicateCaseTag(tag));
                        }
                        tags.push(tag);
                    }
                } else {
                    if !seen.insert(lo) {
                        return Err(LayoutErrorKind::DuplicateCaseTag(lo));
                    }
                    tags.push(lo);
                }
                if !self.take(b',') {
                    break;
                }
            }
            self.expect(b')')?;
            self.expect(b'[')?;
            let body = self.parse_elements(cur_callable, true)?;
            cases.push(Case { tags, body });
        }

        Ok(Element {
            kind: ElementKind::Union { cases },
            flags: sign_flag(signed),
            len,
            band: Some(band),
        })
    }

    fn finish_ref(&mut self, kind: RefKind) -> Result<Element, LayoutErrorKind> {
        let nullable = self.take(b'N');
        let len = self.parse_uint_width()?;
        let flags = if nullable {
            ElementFlags::NULLABLE
        } else {
            ElementFlags::empty()
        };
        Ok(self.banded(ElementKind::Ref { kind }, flags, len))
    }

    fn banded(&mut self, kind: ElementKind, flags: ElementFlags, len: u8) -> Element {
        Element {
            kind,
            flags,
            len,
            band: Some(self.next_band()),
        }
    }

    /// `S`-prefixed width where the element admits one, then `B H I V`
    fn parse_int_width(&mut self, can_be_signed: bool) -> Result<(u8, bool), LayoutErrorKind> {
        let signed = can_be_signed && self.take(b'S');
        Ok((self.parse_uint_width()?, signed))
    }

    fn parse_uint_width(&mut self) -> Result<u8, LayoutErrorKind> {
        let len = match self.peek() {
            Some(b'B') => 1,
            Some(b'H') => 2,
            Some(b'I') => 4,
            Some(b'V') => 0,
            _ => return Err(self.fail_here()),
        };
        self.pos += 1;
        Ok(len)
    }

    /// A possibly signed decimal numeral; a lone `0` is its own spelling
    fn parse_numeral(&mut self) -> Result<i32, LayoutErrorKind> {
        if self.take(b'0') {
            return Ok(0);
        }
        let negative = self.take(b'-');
        let mut magnitude: i64 = 0;
        let mut digits = 0;
        while let Some(d) = self.peek().filter(u8::is_ascii_digit) {
            self.pos += 1;
            digits += 1;
            magnitude = magnitude * 10 + i64::from(d - b'0');
            if magnitude > -i64::from(i32::MIN) {
                return Err(LayoutErrorKind::NumeralOverflow);
            }
        }
        if digits == 0 {
            return Err(LayoutErrorKind::MissingNumeral);
        }
        let signed = if negative { -magnitude } else { magnitude };
        i32::try_from(signed).map_err(|_| LayoutErrorKind::NumeralOverflow)
    }
}

fn sign_flag(signed: bool) -> ElementFlags {
    if signed {
        ElementFlags::SIGNED
    } else {
        ElementFlags::empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn layout(def: &str) -> Layout {
        match Layout::define(AttrContext::Code, "Test", def) {
            Ok(layout) => layout,
            Err(err) => panic!("{:?} failed to tokenize: {:?}", def, err.kind),
        }
    }

    fn reject(def: &str) -> LayoutErrorKind {
        match Layout::define(AttrContext::Code, "Test", def) {
            Ok(_) => panic!("{:?} should not tokenize", def),
            Err(err) => err.kind,
        }
    }

    #[test]
    fn line_number_table_tokenizes() {
        let lnt = layout("NH[PHH]");
        assert_eq!(lnt.band_count(), 3);
        assert_eq!(lnt.callables().len(), 1);

        let body = lnt.entry_body();
        assert_eq!(body.len(), 1);
        match &body[0].kind {
            ElementKind::Replication { body: inner } => {
                assert_eq!(body[0].len, 2);
                assert_eq!(body[0].band, Some(0));
                assert_eq!(inner.len(), 2);
                assert_eq!(inner[0].kind, ElementKind::Bci);
                assert_eq!(inner[0].band, Some(1));
                assert_eq!(inner[1].kind, ElementKind::Int);
                assert_eq!(inner[1].band, Some(2));
            }
            other => panic!("expected a replication, got {:?}", other),
        }
    }

    #[test]
    fn widths_and_signs() {
        let l = layout("BHSIVSB");
        let body = l.entry_body();
        let lens: Vec<u8> = body.iter().map(|e| e.len).collect();
        assert_eq!(lens, [1, 2, 4, 0, 1]);
        assert!(!body[0].flags.contains(ElementFlags::SIGNED));
        assert!(body[2].flags.contains(ElementFlags::SIGNED));
        assert!(body[4].flags.contains(ElementFlags::SIGNED));
    }

    #[test]
    fn bytecode_elements_need_anchors() {
        let ok = layout("PHOSH");
        let body = ok.entry_body();
        assert_eq!(body[0].kind, ElementKind::Bci);
        assert!(!body[0].flags.contains(ElementFlags::DELTA));
        assert_eq!(body[1].kind, ElementKind::Bco);
        assert!(body[1].flags.contains(ElementFlags::DELTA));
        assert!(body[1].flags.contains(ElementFlags::SIGNED));

        assert_eq!(reject("OH"), LayoutErrorKind::MissingBciAnchor);
        assert_eq!(reject("POH"), LayoutErrorKind::MissingBciAnchor);
        assert_eq!(reject("PHHOH"), LayoutErrorKind::MissingBciAnchor);
        // an offset is not an index, so it cannot anchor another offset
        assert_eq!(reject("PHOHOH"), LayoutErrorKind::MissingBciAnchor);
        let _ = layout("PHPOH");
    }

    #[test]
    fn unions_collect_tags_and_default() {
        let l = layout("TB(66,67)[KIH](1-3)[KJH]()[]");
        let body = l.entry_body();
        match &body[0].kind {
            ElementKind::Union { cases } => {
                assert_eq!(cases.len(), 3);
                assert_eq!(cases[0].tags, [66, 67]);
                assert_eq!(cases[1].tags, [1, 2, 3]);
                assert!(cases[2].tags.is_empty());
                assert!(cases[2].body.is_empty());
            }
            other => panic!("expected a union, got {:?}", other),
        }
        assert_eq!(l.band_count(), 3);
    }

    #[test]
    fn bad_unions_are_rejected() {
        assert_eq!(
            reject("TB(5-1)[KIH]()[]"),
            LayoutErrorKind::BadCaseRange { lo: 5, hi: 1 },
        );
        assert_eq!(
            reject("TB(0-65537)[KIH]()[]"),
            LayoutErrorKind::BadCaseRange { lo: 0, hi: 65537 },
        );
        assert_eq!(
            reject("TB(1,2)[KIH](2)[KJH]()[]"),
            LayoutErrorKind::DuplicateCaseTag(2),
        );
        // a union without its tagless default never closes
        assert_eq!(reject("TB(1)[KIH]"), LayoutErrorKind::UnexpectedEnd);
    }

    #[test]
    fn callables_link_calls_by_relative_number() {
        let l = layout("[NH[(1)]][RSH]");
        assert_eq!(l.callables().len(), 2);
        assert!(!l.callables()[1].backward);
        match &l.entry_body()[0].kind {
            ElementKind::Replication { body } => {
                assert_eq!(body[0].kind, ElementKind::Call { target: 1 });
                assert!(!body[0].flags.contains(ElementFlags::BACKWARD));
            }
            other => panic!("expected a replication, got {:?}", other),
        }
    }

    #[test]
    fn self_calls_mark_their_target_backward() {
        let l = layout("[NH[(0)]]");
        assert!(l.callables()[0].backward);
        match &l.entry_body()[0].kind {
            ElementKind::Replication { body } => {
                assert_eq!(body[0].kind, ElementKind::Call { target: 0 });
                assert!(body[0].flags.contains(ElementFlags::BACKWARD));
            }
            other => panic!("expected a replication, got {:?}", other),
        }
    }

    #[test]
    fn out_of_range_calls_are_rejected() {
        assert_eq!(
            reject("[NH[(2)]][RSH]"),
            LayoutErrorKind::BadCallTarget(2),
        );
        assert_eq!(reject("[NH[(-2)]][RSH]"), LayoutErrorKind::BadCallTarget(-2));
        // calls cannot appear outside explicit callables
        assert_eq!(reject("NH[(1)]"), LayoutErrorKind::BadCallTarget(0));
    }

    #[test]
    fn callables_do_not_mix_with_plain_elements() {
        assert_eq!(reject("[RSH]H"), LayoutErrorKind::MisplacedCallable);
        assert_eq!(reject("NH[[RSH]]"), LayoutErrorKind::MisplacedCallable);
        assert_eq!(reject("H]"), LayoutErrorKind::TrailingText);
        assert_eq!(reject("[RSH]]"), LayoutErrorKind::TrailingText);
        assert_eq!(reject("NH[PH"), LayoutErrorKind::UnexpectedEnd);
    }

    #[test]
    fn reference_kinds_and_nullability() {
        let l = layout("KQHRSNHKJHRIB");
        let body = l.entry_body();
        assert_eq!(body[0].kind, ElementKind::Ref { kind: RefKind::Literal });
        assert_eq!(
            body[1].kind,
            ElementKind::Ref {
                kind: RefKind::Signature,
            },
        );
        assert!(body[1].flags.contains(ElementFlags::NULLABLE));
        assert_eq!(body[2].kind, ElementKind::Ref { kind: RefKind::Long });
        assert_eq!(
            body[3].kind,
            ElementKind::Ref {
                kind: RefKind::InterfaceMethod,
            },
        );
        assert_eq!(body[3].len, 1);

        assert_eq!(reject("KXH"), LayoutErrorKind::UnexpectedChar('X'));
        assert_eq!(reject("RXH"), LayoutErrorKind::UnexpectedChar('X'));
    }

    #[test]
    fn sign_prefix_is_only_for_integrals_and_offsets() {
        assert_eq!(reject("PSH"), LayoutErrorKind::UnexpectedChar('S'));
        assert_eq!(reject("FSH"), LayoutErrorKind::UnexpectedChar('S'));
        assert_eq!(reject("NSH[H]"), LayoutErrorKind::UnexpectedChar('S'));
        let _ = layout("PHOSH");
        let _ = layout("TSB()[]");
    }

    #[test]
    fn bands_number_head_before_body_in_text_order() {
        let l = layout("HNH[RUHFB]KQH");
        let body = l.entry_body();
        assert_eq!(body[0].band, Some(0));
        assert_eq!(body[1].band, Some(1));
        match &body[1].kind {
            ElementKind::Replication { body: inner } => {
                assert_eq!(inner[0].band, Some(2));
                assert_eq!(inner[1].band, Some(3));
            }
            other => panic!("expected a replication, got {:?}", other),
        }
        assert_eq!(body[2].band, Some(4));
        assert_eq!(l.band_count(), 5);
    }

    #[test]
    fn empty_layouts_are_legal() {
        let l = layout("");
        assert!(l.is_empty());
        assert_eq!(l.band_count(), 0);
        assert!(l.entry_body().is_empty());
    }

    #[test]
    fn definitions_normalize_before_tokenizing() {
        let l = layout(" NH [PHH] # line number pairs\n");
        assert_eq!(l.layout(), "NH[PHH]");
        assert_eq!(l.band_count(), 3);
    }

    #[test]
    fn numerals_follow_the_lone_zero_rule() {
        // `01` is a zero numeral followed by a stray `1`
        assert_eq!(reject("TB(01)[]()[]"), LayoutErrorKind::UnexpectedChar('1'));
        let l = layout("TB(0,-1)[KIH]()[]");
        match &l.entry_body()[0].kind {
            ElementKind::Union { cases } => assert_eq!(cases[0].tags, [0, -1]),
            other => panic!("expected a union, got {:?}", other),
        }
        // `()` opens the default case, so the trailing `()[]` is a call
        // with no numeral inside
        assert_eq!(reject("TB()[KIH]()[]"), LayoutErrorKind::MissingNumeral);
        assert_eq!(reject("TB(,1)[KIH]()[]"), LayoutErrorKind::MissingNumeral);
    }
}
