//! Constant pool entry types
//!
//! Entries are interned: two structurally equal entries are always the same
//! allocation, so equality of the [`Entry`] handles below coincides with
//! equality of what they describe.

use std::cell::Cell;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A modified UTF-8 string
#[derive(PartialEq, Eq, Hash, Debug)]
pub struct Utf8Entry {
    pub value: Box<str>,
}

/// A loadable literal
///
/// Floating point values are kept as raw bits so that interning and
/// equality are exact, NaN payloads included.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LiteralEntry<'g> {
    Integer(i32),
    Long(i64),
    Float(u32),
    Double(u64),
    String(&'g Utf8Entry),
}

/// A class or interface, named by its internal binary name
#[derive(PartialEq, Eq, Hash, Debug)]
pub struct ClassEntry<'g> {
    pub name: &'g Utf8Entry,
}

/// A field or method type, split into its syntactic form and the classes
/// the form mentions
///
/// The form is the type descriptor with every class name deleted; each `L`
/// in the form pairs with one entry of `classes`, in order. `flat` caches
/// the re-assembled descriptor once a pool has interned it.
#[derive(Debug)]
pub struct SignatureEntry<'g> {
    pub form: &'g Utf8Entry,
    pub classes: Vec<&'g ClassEntry<'g>>,
    pub(crate) flat: Cell<Option<&'g Utf8Entry>>,
}

/// A name paired with a type
#[derive(PartialEq, Eq, Hash, Debug)]
pub struct DescriptorEntry<'g> {
    pub name: &'g Utf8Entry,
    pub ty: &'g SignatureEntry<'g>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum MemberKind {
    Field,
    Method,
    InterfaceMethod,
}

/// A member reference: a descriptor rooted at a class
#[derive(PartialEq, Eq, Hash, Debug)]
pub struct MemberEntry<'g> {
    pub kind: MemberKind,
    pub class: &'g ClassEntry<'g>,
    pub descriptor: &'g DescriptorEntry<'g>,
}

impl SignatureEntry<'_> {
    /// Re-assemble the full type descriptor from the form and classes
    pub fn expand(&self) -> String {
        let mut out = String::with_capacity(self.form.value.len());
        let mut classes = self.classes.iter();
        for ch in self.form.value.chars() {
            out.push(ch);
            if ch == 'L' {
                match classes.next() {
                    Some(class) => out.push_str(&class.name.value),
                    None => unreachable!("signature form names more classes than it holds"),
                }
            }
        }
        out
    }
}

impl PartialEq for SignatureEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        // the flattening cache is identity, not content
        self.form == other.form && self.classes == other.classes
    }
}

impl Eq for SignatureEntry<'_> {}

impl Hash for SignatureEntry<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.form.hash(state);
        self.classes.hash(state);
    }
}

/// Kinds of entry, in untyped index order
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Tag {
    Utf8,
    Integer,
    Float,
    Long,
    Double,
    String,
    Class,
    Signature,
    Descriptor,
    Field,
    Method,
    InterfaceMethod,
}

impl Tag {
    pub fn name(self) -> &'static str {
        match self {
            Tag::Utf8 => "Utf8",
            Tag::Integer => "Integer",
            Tag::Float => "Float",
            Tag::Long => "Long",
            Tag::Double => "Double",
            Tag::String => "String",
            Tag::Class => "Class",
            Tag::Signature => "Signature",
            Tag::Descriptor => "Descriptor",
            Tag::Field => "Field",
            Tag::Method => "Method",
            Tag::InterfaceMethod => "InterfaceMethod",
        }
    }
}

/// A handle on any interned entry
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Entry<'g> {
    Utf8(&'g Utf8Entry),
    Literal(&'g LiteralEntry<'g>),
    Class(&'g ClassEntry<'g>),
    Signature(&'g SignatureEntry<'g>),
    Descriptor(&'g DescriptorEntry<'g>),
    Member(&'g MemberEntry<'g>),
}

impl<'g> Entry<'g> {
    pub fn tag(self) -> Tag {
        match self {
            Entry::Utf8(_) => Tag::Utf8,
            Entry::Literal(LiteralEntry::Integer(_)) => Tag::Integer,
            Entry::Literal(LiteralEntry::Float(_)) => Tag::Float,
            Entry::Literal(LiteralEntry::Long(_)) => Tag::Long,
            Entry::Literal(LiteralEntry::Double(_)) => Tag::Double,
            Entry::Literal(LiteralEntry::String(_)) => Tag::String,
            Entry::Class(_) => Tag::Class,
            Entry::Signature(_) => Tag::Signature,
            Entry::Descriptor(_) => Tag::Descriptor,
            Entry::Member(m) => match m.kind {
                MemberKind::Field => Tag::Field,
                MemberKind::Method => Tag::Method,
                MemberKind::InterfaceMethod => Tag::InterfaceMethod,
            },
        }
    }

    pub fn is_literal(self) -> bool {
        matches!(self, Entry::Literal(_))
    }

    /// The entries this one points at, in a fixed order
    pub fn references(self) -> Vec<Entry<'g>> {
        match self {
            Entry::Utf8(_) => vec![],
            Entry::Literal(LiteralEntry::String(utf8)) => vec![Entry::Utf8(utf8)],
            Entry::Literal(_) => vec![],
            Entry::Class(class) => vec![Entry::Utf8(class.name)],
            Entry::Signature(sig) => {
                let mut refs = vec![Entry::Utf8(sig.form)];
                refs.extend(sig.classes.iter().map(|&class| Entry::Class(class)));
                refs
            }
            Entry::Descriptor(desc) => vec![Entry::Utf8(desc.name), Entry::Signature(desc.ty)],
            Entry::Member(member) => {
                vec![Entry::Class(member.class), Entry::Descriptor(member.descriptor)]
            }
        }
    }
}

impl fmt::Display for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Entry::Utf8(u) => write!(f, "Utf8:{}", u.value),
            Entry::Literal(LiteralEntry::Integer(v)) => write!(f, "Integer:{}", v),
            Entry::Literal(LiteralEntry::Long(v)) => write!(f, "Long:{}", v),
            Entry::Literal(LiteralEntry::Float(bits)) => {
                write!(f, "Float:{}", f32::from_bits(*bits))
            }
            Entry::Literal(LiteralEntry::Double(bits)) => {
                write!(f, "Double:{}", f64::from_bits(*bits))
            }
            Entry::Literal(LiteralEntry::String(u)) => write!(f, "String:{:?}", &*u.value),
            Entry::Class(c) => write!(f, "Class:{}", c.name.value),
            Entry::Signature(s) => write!(f, "Signature:{}", s.expand()),
            Entry::Descriptor(d) => write!(f, "Descriptor:{}:{}", d.name.value, d.ty.expand()),
            Entry::Member(m) => {
                let kind = match m.kind {
                    MemberKind::Field => "Field",
                    MemberKind::Method => "Method",
                    MemberKind::InterfaceMethod => "InterfaceMethod",
                };
                write!(
                    f,
                    "{}:{}.{}:{}",
                    kind,
                    m.class.name.value,
                    m.descriptor.name.value,
                    m.descriptor.ty.expand()
                )
            }
        }
    }
}
