//! Trajectory file handles and random-access indexing.
//!
//! This module provides the outer surface over the frame codec:
//!
//! - [`TrajectoryWriter`] appends frames to a file
//! - [`TrajectoryReader`] reads them back, sequentially or via
//!   [`seek_frame`](TrajectoryReader::seek_frame)
//! - [`scan_frames`] walks a file header by header (without decompressing
//!   payloads) and builds the [`FrameIndex`] that makes seeking possible
//! - [`count_atoms`] peeks at the first header only
//!
//! A trajectory file is a plain concatenation of frames with no file-level
//! header or trailer, so it can always be extended by appending and is
//! readable up to the first damaged frame.
//!
//! All I/O here is synchronous and blocking. Handles are single-operation:
//! share a file between threads by giving each its own handle, not by
//! sharing one. Scanning is read-only and may run concurrently with other
//! readers, but not with a writer appending to the same file.

mod index;
mod reader;
mod writer;

pub use index::{FrameIndex, count_atoms, scan_frames};
pub use reader::{FrameReadIterator, TrajectoryReader};
pub use writer::{TrajectoryWriter, WriteStats, WriterConfig};
