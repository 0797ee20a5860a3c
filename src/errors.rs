//! Errors raised while defining layouts and transcoding attributes

use crate::layout::AttrContext;

/// Any failure this crate can report
#[derive(Debug)]
pub enum Error {
    /// An attribute layout string was rejected
    BadLayout(LayoutError),

    /// Attribute data disagrees with the layout it claims to follow
    BadFormat(FormatError),

    IoError(std::io::Error),
}

impl From<LayoutError> for Error {
    fn from(err: LayoutError) -> Error {
        Error::BadLayout(err)
    }
}

impl From<FormatError> for Error {
    fn from(err: FormatError) -> Error {
        Error::BadFormat(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

/// Rejected attribute layout definition
///
/// Carries the full definition alongside the actual problem so a failing
/// attribute can be reported by name.
#[derive(Debug)]
pub struct LayoutError {
    pub ctxt: AttrContext,
    pub name: String,
    pub layout: String,
    pub kind: LayoutErrorKind,
}

#[derive(Debug, PartialEq, Eq)]
pub enum LayoutErrorKind {
    /// Character that no layout element can start with
    UnexpectedChar(char),

    /// Layout string stopped in the middle of an element
    UnexpectedEnd,

    /// Unbalanced `]`, or trailing text after the final element
    TrailingText,

    /// Expected a numeral and found none
    MissingNumeral,

    /// Numeral (or hex literal) outside the signed 32-bit range
    NumeralOverflow,

    /// `\` escape at the very end of the definition
    DanglingEscape,

    /// Case range `lo-hi` with `hi <= lo` or spanning more than 65536 values
    BadCaseRange { lo: i32, hi: i32 },

    /// Same tag bound by more than one union case
    DuplicateCaseTag(i32),

    /// Callable in a nested position, or mixed with plain elements
    MisplacedCallable,

    /// Call numeral resolving outside the callable list
    BadCallTarget(i32),

    /// `PO` or `O` element without a `P`/`PO` element directly before it
    MissingBciAnchor,
}

/// Attribute bytes (or band values) that cannot be transcoded
#[derive(Debug)]
pub enum FormatError {
    /// Attribute byte count differs from what its layout consumed
    AttributeLengthMismatch {
        name: String,
        declared: usize,
        consumed: usize,
    },

    /// Band value does not fit the fixed-width field it must be stored in
    ValueOutOfRange { value: i32, len: u8 },

    /// Reference resolved to a pool entry of the wrong kind
    RefKindMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Null reference in a field whose layout cannot encode null
    NullRef,

    /// Reference index with no entry in the local constant pool
    BadLocalRef(u32),

    /// Resolved pool index too wide for the field holding it
    RefOverflow { index: u32, len: u8 },

    /// Replications and calls nested past any reasonable attribute shape
    NestingTooDeep,

    /// Band header byte that does not denote any coding
    BadMetaCoding(u8),

    /// Population sub-band that cannot be reconstructed
    BadPopulation { detail: &'static str },

    /// Adaptive run longer than the values that remain in the band
    RunTooLong { run: usize, remaining: usize },
}
