//! Attribute definitions and instances
//!
//! [`AttrDefs`] is the registry of known attribute layouts for one
//! transcoding session: the built-in definitions for the standard class
//! file attributes plus whatever an archive defines on top. Definitions
//! are interned, and each one owns a canonical empty [`Attribute`] that is
//! shared by every entity carrying that attribute with no content.
//!
//! An [`Attribute`] pairs a layout with one occurrence's content bytes and
//! the reference fixups still waiting for the final pool numbering.

use super::codec::{self, ValueSink, ValueSource};
use super::fixups::Fixups;
use super::{AttrContext, Layout};
use crate::errors::{FormatError, LayoutError};
use crate::pool::{ConstantPool, Entry, Index};
use elsa::map::FrozenMap;

/// Layouts every transcoder knows without being told
///
/// `InnerClasses` and `Code` transmit their bodies through dedicated band
/// groups rather than through the layout engine, so their layouts are
/// empty here.
const STANDARD: &[(AttrContext, &str, &str)] = &[
    (AttrContext::Class, "InnerClasses", ""),
    (AttrContext::Class, "SourceFile", "RUNH"),
    (AttrContext::Class, "EnclosingMethod", "RCHRDNH"),
    (AttrContext::Class, ".ClassFile.version", "HH"),
    (AttrContext::Class, "Signature", "RSH"),
    (AttrContext::Class, "Deprecated", ""),
    (AttrContext::Class, ".Overflow", ""),
    (AttrContext::Field, "ConstantValue", "KQH"),
    (AttrContext::Field, "Signature", "RSH"),
    (AttrContext::Field, "Deprecated", ""),
    (AttrContext::Field, ".Overflow", ""),
    (AttrContext::Method, "Code", ""),
    (AttrContext::Method, "Exceptions", "NH[RCH]"),
    (AttrContext::Method, "MethodParameters", "NB[RUNHFH]"),
    (AttrContext::Method, "Signature", "RSH"),
    (AttrContext::Method, "Deprecated", ""),
    (AttrContext::Method, ".Overflow", ""),
    (AttrContext::Code, "LineNumberTable", "NH[PHH]"),
    (AttrContext::Code, "LocalVariableTable", "NH[PHOHRUHRSHH]"),
    (AttrContext::Code, "LocalVariableTypeTable", "NH[PHOHRUHRSHH]"),
    (AttrContext::Code, ".Overflow", ""),
];

/// One annotation list per parameter, counted by a byte
const PARAMETER_LISTS: &str = "[NB[(1)]]";

/// A counted annotation list, then one annotation: its type signature plus
/// named element values
const ANNOTATIONS: &str = "[NH[(1)]][RSHNH[RUH(1)]]";

/// The element value union, recursing into itself for arrays and nested
/// annotations
const ELEMENT_VALUES: &str = "[TB(66,67,73,83,90)[KIH](68)[KDH](70)[KFH](74)[KJH](99)[RSH](101)[RSHRUH](115)[RUH](91)[NH[(0)]](64)[RSHNH[RUH(0)]]()[]]";

/// The attribute definitions of one transcoding session
///
/// Interns layouts by (context, name, definition) and hands out `&'g`
/// references, so definitions can be compared by identity and canonical
/// empty attributes be shared. A name keeps its first definition; defining
/// it again returns that one.
pub struct AttrDefs<'g> {
    layouts: FrozenMap<(AttrContext, Box<str>, Box<str>), Box<Layout>>,
    defs: FrozenMap<(AttrContext, Box<str>), Box<Attribute<'g>>>,
}

impl<'g> AttrDefs<'g> {
    pub fn new() -> AttrDefs<'g> {
        AttrDefs {
            layouts: FrozenMap::new(),
            defs: FrozenMap::new(),
        }
    }

    /// Define an attribute, returning its canonical empty instance
    pub fn define(
        &'g self,
        context: AttrContext,
        name: &str,
        layout: &str,
    ) -> Result<&'g Attribute<'g>, LayoutError> {
        if let Some(existing) = self.defs.get(&(context, Box::from(name))) {
            return Ok(existing);
        }
        let built = Layout::define(context, name, layout)?;
        log::debug!("defining {} attribute {} as {:?}", context.name(), name, built.layout());
        let key = (context, Box::from(name), Box::from(built.layout()));
        let layout = self.layouts.insert(key, Box::new(built));
        let canonical = Attribute {
            layout,
            bytes: Vec::new(),
            fixups: Fixups::new(),
        };
        Ok(self.defs.insert((context, Box::from(name)), Box::new(canonical)))
    }

    /// The canonical attribute defined under `name`, if any
    pub fn lookup(&'g self, context: AttrContext, name: &str) -> Option<&'g Attribute<'g>> {
        self.defs.get(&(context, Box::from(name)))
    }

    /// Install the built-in definitions for the standard attributes
    pub fn install_standard(&'g self) -> Result<(), LayoutError> {
        for &(context, name, layout) in STANDARD {
            self.define(context, name, layout)?;
        }
        let annotations = [ANNOTATIONS, ELEMENT_VALUES].concat();
        let by_parameter = [PARAMETER_LISTS, ANNOTATIONS, ELEMENT_VALUES].concat();
        for context in [AttrContext::Class, AttrContext::Field, AttrContext::Method] {
            self.define(context, "RuntimeVisibleAnnotations", &annotations)?;
            self.define(context, "RuntimeInvisibleAnnotations", &annotations)?;
        }
        let method = AttrContext::Method;
        self.define(method, "RuntimeVisibleParameterAnnotations", &by_parameter)?;
        self.define(method, "RuntimeInvisibleParameterAnnotations", &by_parameter)?;
        self.define(method, "AnnotationDefault", ELEMENT_VALUES)?;
        Ok(())
    }
}

/// One occurrence of an attribute: a layout, its content bytes, and the
/// reference fields still waiting to be numbered
#[derive(Debug)]
pub struct Attribute<'g> {
    layout: &'g Layout,
    bytes: Vec<u8>,
    fixups: Fixups<'g>,
}

impl<'g> Attribute<'g> {
    pub fn new(layout: &'g Layout, bytes: Vec<u8>) -> Attribute<'g> {
        Attribute {
            layout,
            bytes,
            fixups: Fixups::new(),
        }
    }

    /// An attribute whose whole content is one two-byte reference, the
    /// shape of `SourceFile` and `Signature`
    pub fn of_ref(layout: &'g Layout, entry: Entry<'g>) -> Attribute<'g> {
        Attribute {
            layout,
            bytes: vec![0, 0],
            fixups: Fixups::of_ref(entry),
        }
    }

    /// Rebuild an attribute's bytes from banded values
    pub fn unparse<S: ValueSource<'g>>(
        layout: &'g Layout,
        source: &mut S,
    ) -> Result<Attribute<'g>, FormatError> {
        let mut bytes = Vec::new();
        let fixups = codec::unparse(layout, source, &mut bytes)?;
        Ok(Attribute { layout, bytes, fixups })
    }

    pub fn layout(&self) -> &'g Layout {
        self.layout
    }

    pub fn name(&self) -> &str {
        self.layout.name()
    }

    pub fn context(&self) -> AttrContext {
        self.layout.context()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Push this attribute's values into `sink`, band by band
    pub fn parse<S: ValueSink<'g>>(
        &self,
        pool: &ConstantPool<'g>,
        local_cp: &Index<'g>,
        sink: &mut S,
    ) -> Result<(), FormatError> {
        codec::parse(self.layout, &self.bytes, pool, local_cp, sink)
    }

    /// A new attribute with `extra` appended, its fixups shifted past the
    /// existing content
    pub fn add_content(&self, extra: &[u8], fixups: &Fixups<'g>) -> Attribute<'g> {
        let base = self.bytes.len() as u32;
        let mut merged = Fixups::new();
        for fixup in self.fixups.iter() {
            merged.add(fixup.location, fixup.width, fixup.entry);
        }
        for fixup in fixups.iter() {
            merged.add(base + fixup.location, fixup.width, fixup.entry);
        }
        let mut bytes = Vec::with_capacity(self.bytes.len() + extra.len());
        bytes.extend_from_slice(&self.bytes);
        bytes.extend_from_slice(extra);
        Attribute {
            layout: self.layout,
            bytes,
            fixups: merged,
        }
    }

    /// Every pool entry this attribute still references
    pub fn visit_refs(&self, visit: impl FnMut(Entry<'g>)) {
        self.fixups.visit_refs(visit);
    }

    /// Patch every pending reference with its position in `index`
    pub fn finish_refs(&mut self, index: &Index<'g>) -> Result<(), FormatError> {
        self.fixups.finish_refs(index, &mut self.bytes)
    }
}
