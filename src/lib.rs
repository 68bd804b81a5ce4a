//! EWAH run-length compressed bitmaps over 64-bit words.
//!
//! A [`Bitmap`] stores a set of bit positions as blocks of uniform-word
//! runs and verbatim literal words, each block opened by a packed marker
//! word. Construction is append-only; the pairwise set operations walk two
//! compressed buffers in parallel and never decompress either operand.
//!
//! ```
//! use ewah64::Bitmap;
//!
//! let a = Bitmap::of(&[0, 2, 64, 1 << 30]);
//! let b = Bitmap::of(&[1, 3, 64, 1 << 30]);
//! assert_eq!(a.and(&b).positions(), vec![64, 1 << 30]);
//! assert_eq!(a.xor(&b).positions(), vec![0, 1, 2, 3]);
//! assert!(a.intersects(&b));
//! ```

pub mod bitmap;
pub mod error;
pub mod iter;

pub(crate) mod cursor;
pub(crate) mod marker;

mod codec;
mod ops;

pub use bitmap::Bitmap;
pub use error::{Error, Result};
pub use iter::{PositionIter, RunIter};
