//! Compact transcoding of Java class file attributes
//!
//! Attributes travel in class files as opaque length-prefixed byte blobs.
//! This crate takes them apart into _bands_, columns of like values
//! gathered across many class files, and puts them back together again
//! byte for byte. Grouped into bands and run through the right integer
//! codings, the same data deflates to a fraction of its interleaved size.
//!
//!  - [`layout`] is the mini-language describing an attribute's byte
//!    structure, plus the codec that walks a layout to move one attribute
//!    between its bytes and its band values
//!  - [`coding`] holds the variable-length integer codings bands travel
//!    in, and the chooser that searches for the cheapest one per band
//!  - [`pool`] interns the constant pool entries attributes reference, so
//!    references can be banded as indices and patched back later
//!
//! ### Example
//!
//! Parsing one `LineNumberTable` attribute into its bands:
//!
//! ```
//! use classband::layout::{AttrContext, AttrDefs, Attribute, BandBuffer};
//! use classband::pool::{ConstantPool, Index, PoolArenas};
//!
//! # fn main() -> Result<(), classband::Error> {
//! let arenas = PoolArenas::new();
//! let pool = ConstantPool::new(&arenas);
//! let defs = AttrDefs::new();
//! defs.install_standard()?;
//!
//! let layout = defs.lookup(AttrContext::Code, "LineNumberTable").unwrap().layout();
//! let attr = Attribute::new(
//!     layout,
//!     vec![0x00, 0x02, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x05, 0x00, 0x0B],
//! );
//!
//! let mut bands = BandBuffer::for_layout(layout);
//! attr.parse(&pool, &Index::new("cp", Vec::new()), &mut bands)?;
//! assert_eq!(bands.ints(0), [2]);
//! assert_eq!(bands.ints(1), [0, 5]);
//! assert_eq!(bands.ints(2), [10, 11]);
//! # Ok(())
//! # }
//! ```

pub mod coding;
pub mod errors;
pub mod layout;
pub mod pool;
pub mod util;

pub use errors::Error;
