//! Element tree produced by tokenizing a layout definition
//!
//! A layout definition describes the byte-level shape of one attribute as a
//! sequence of elements. Tokenizing turns the definition into a tree of
//! [`Element`]s grouped under [`Callable`]s, with every value-carrying
//! element assigned the index of the band its values travel in.

use crate::coding::{Coding, BCI5, BRANCH5, BYTE1, SIGNED5, UNSIGNED5};
use crate::pool::Tag;
use bitflags::bitflags;

bitflags! {
    /// Modifier flags on a layout element
    pub struct ElementFlags: u8 {
        /// Field is stored sign-extended (`S` prefix on the width)
        const SIGNED = 1 << 0;

        /// Value travels as a difference from the previous one (`PO`, `O`)
        const DELTA = 1 << 1;

        /// Reference may be null (`N` between kind and width)
        const NULLABLE = 1 << 2;

        /// Call whose target does not lie strictly forward of it
        const BACKWARD = 1 << 3;
    }
}

/// One element of a layout body
///
/// `len` is the size of the attribute field in bytes (0, 1, 2 or 4), and
/// `band` is the index of the band carrying this element's values. Elements
/// that transmit nothing themselves (calls) have no band.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Element {
    pub kind: ElementKind,
    pub flags: ElementFlags,
    pub len: u8,
    pub band: Option<u32>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ElementKind {
    /// Fixed-width integer field (`B`, `H`, `I`, `V`)
    Int,

    /// Bytecode index, transmitted in renumbered instruction coordinates
    /// (`P`, `PO`)
    Bci,

    /// Bytecode offset relative to the previous bytecode index (`O`)
    Bco,

    /// Integer whose bits are semantically independent (`F`)
    Flag,

    /// Counted repetition: the count field, then `count` copies of the body
    /// (`N...[...]`)
    Replication { body: Vec<Element> },

    /// Tagged variant: a discriminant field selecting one case body
    /// (`T...(...)[...]...`)
    Union { cases: Vec<Case> },

    /// Inclusion of a callable's body at this point (`(n)`)
    Call { target: usize },

    /// Constant pool reference stored as a local pool index
    /// (`KI`, `RC`, ...)
    Ref { kind: RefKind },
}

/// One case of a union element
///
/// The last case of every union has no tags and catches every discriminant
/// value the tagged cases do not claim.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Case {
    pub tags: Vec<i32>,
    pub body: Vec<Element>,
}

/// A top-level group of elements that calls can target
///
/// A layout either is a single anonymous body (one callable, never called)
/// or consists entirely of bracketed callables. `backward` records whether
/// any call reaches this callable other than strictly forward, which forces
/// its per-invocation counts to be transmitted explicitly.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Callable {
    pub body: Vec<Element>,
    pub backward: bool,
}

/// The constant pool entry kind a reference element expects
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RefKind {
    Integer,
    Long,
    Float,
    Double,
    String,
    /// Any loadable literal (`KQ`)
    Literal,
    Class,
    Signature,
    Descriptor,
    Field,
    Method,
    InterfaceMethod,
    Utf8,
    /// Any entry at all (`RQ`)
    Any,
}

impl RefKind {
    /// Whether an entry with this tag satisfies the reference
    pub fn admits(self, tag: Tag) -> bool {
        match self {
            RefKind::Integer => tag == Tag::Integer,
            RefKind::Long => tag == Tag::Long,
            RefKind::Float => tag == Tag::Float,
            RefKind::Double => tag == Tag::Double,
            RefKind::String => tag == Tag::String,
            RefKind::Literal => matches!(
                tag,
                Tag::Integer | Tag::Long | Tag::Float | Tag::Double | Tag::String
            ),
            RefKind::Class => tag == Tag::Class,
            RefKind::Signature => tag == Tag::Signature,
            RefKind::Descriptor => tag == Tag::Descriptor,
            RefKind::Field => tag == Tag::Field,
            RefKind::Method => tag == Tag::Method,
            RefKind::InterfaceMethod => tag == Tag::InterfaceMethod,
            RefKind::Utf8 => tag == Tag::Utf8,
            RefKind::Any => true,
        }
    }

    /// Name used when reporting a reference of the wrong kind
    pub fn expected(self) -> &'static str {
        match self {
            RefKind::Integer => "Integer",
            RefKind::Long => "Long",
            RefKind::Float => "Float",
            RefKind::Double => "Double",
            RefKind::String => "String",
            RefKind::Literal => "literal",
            RefKind::Class => "Class",
            RefKind::Signature => "Signature",
            RefKind::Descriptor => "Descriptor",
            RefKind::Field => "Field",
            RefKind::Method => "Method",
            RefKind::InterfaceMethod => "InterfaceMethod",
            RefKind::Utf8 => "Utf8",
            RefKind::Any => "any entry",
        }
    }
}

impl Element {
    /// The coding a band of this element uses unless escaped to another
    ///
    /// Bands of one-byte fields default to the identity coding, everything
    /// else to a five-byte variable-length coding matching its sign and
    /// delta character.
    pub fn default_coding(&self) -> Coding {
        match &self.kind {
            ElementKind::Int | ElementKind::Union { .. } => {
                if self.flags.contains(ElementFlags::SIGNED) {
                    SIGNED5
                } else if self.len == 1 {
                    BYTE1
                } else {
                    UNSIGNED5
                }
            }
            ElementKind::Bci => {
                if self.flags.contains(ElementFlags::DELTA) {
                    BRANCH5
                } else {
                    BCI5
                }
            }
            ElementKind::Bco => BRANCH5,
            ElementKind::Flag | ElementKind::Replication { .. } => {
                if self.len == 1 {
                    BYTE1
                } else {
                    UNSIGNED5
                }
            }
            ElementKind::Ref { .. } => UNSIGNED5,
            ElementKind::Call { .. } => unreachable!("calls carry no band"),
        }
    }

    /// Whether this element is a `P` or `PO` bytecode index
    ///
    /// Only these may anchor a following `PO` or `O` element.
    pub fn is_bci_anchor(&self) -> bool {
        matches!(self.kind, ElementKind::Bci)
    }
}
