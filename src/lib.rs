//! Compressed molecular-dynamics trajectory codec.
//!
//! This crate reads and writes trajectory files storing per-frame atomic
//! coordinates, box geometry, and metadata. Coordinates are compressed
//! lossily at a caller-chosen precision using an adaptive bit-width scheme,
//! and a header-only frame scanner enables random-access seeking through
//! files with millions of frames without decoding them.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `codec`: the binary frame format (bit packing, coordinate
//!   compression, frame assembly)
//! - `trajectory`: file handles, frame indexing, and seeking
//!
//! # Example
//!
//! ```rust,no_run
//! use xtraj::{Frame, TrajectoryReader, TrajectoryWriter, WriterConfig, scan_frames};
//!
//! # fn main() -> xtraj::Result<()> {
//! // Write a trajectory at 0.001-unit resolution.
//! let box_vectors = [[5.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 5.0]];
//! let coords = vec![[1.0, 2.0, 3.0]; 100];
//! let mut writer = TrajectoryWriter::create("out.xtc", 100, WriterConfig::default())?;
//! writer.write_frame(&Frame::new(0, 0.0, box_vectors, coords))?;
//! let stats = writer.finalize()?;
//! println!("{stats}");
//!
//! // Random access via a frame index.
//! let index = scan_frames("out.xtc")?;
//! let mut reader = TrajectoryReader::open("out.xtc")?;
//! reader.seek_frame(0, &index)?;
//! let frame = reader.read_frame()?.expect("frame exists");
//! println!("step {} at t = {}", frame.step, frame.time);
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod trajectory;

// Re-export commonly used types
pub use codec::{FRAME_MAGIC, Frame};
pub use error::{Result, TrajectoryError};
pub use trajectory::{
    FrameIndex, FrameReadIterator, TrajectoryReader, TrajectoryWriter, WriteStats, WriterConfig,
    count_atoms, scan_frames,
};
