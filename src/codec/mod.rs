//! Binary frame codec: wire primitives, bit packing, coordinate
//! compression, and frame assembly.
//!
//! # Frame layout
//!
//! Big-endian throughout. Every frame starts with the same header; the
//! coordinate section depends on the atom count:
//!
//! ```text
//! Header (56 bytes, both paths):
//!   Magic: i32 (1995)
//!   Atom count: i32
//!   Step: i32
//!   Time: f32
//!   Box: 3x3 f32
//!   Atom count, repeated: i32 (legacy; both copies must match)
//!
//! Short path (atom count < 10):
//!   Raw coordinates: atom count * 3 * f32
//!
//! Long path (atom count >= 10):
//!   Precision: f32
//!   Integer min extent: 3 * i32
//!   Integer max extent: 3 * i32
//!   Small-width index: i32
//!   Payload length: i32 (bytes, before padding)
//!   Payload: packed bitstream, zero-padded to 4 bytes
//! ```
//!
//! Encoding is deterministic; decoding rejects a bad magic value before
//! touching any later field.

pub(crate) mod bits;
pub(crate) mod compress;
pub(crate) mod frame;
pub(crate) mod wire;

pub use frame::{FRAME_MAGIC, Frame};
