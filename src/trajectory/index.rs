//! Frame index scanning for random access.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;

use log::{debug, trace};

use crate::codec::frame::{self, long_frame_len, short_frame_len};
use crate::codec::wire;
use crate::error::{Result, TrajectoryError};

/// Byte offsets of every frame in a trajectory file, in file order.
///
/// Built once per file by [`scan_frames`] and immutable afterwards.
/// Offsets are strictly increasing and the first frame sits at offset 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameIndex {
    atom_count: u32,
    offsets: Vec<u64>,
}

impl FrameIndex {
    /// Number of frames in the file.
    pub fn frame_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Atom count shared by every frame (0 for an empty file).
    pub fn atom_count(&self) -> u32 {
        self.atom_count
    }

    /// Byte offset of frame `index`, if it exists.
    pub fn offset(&self, index: usize) -> Option<u64> {
        self.offsets.get(index).copied()
    }

    /// All offsets in file order.
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }
}

/// Read the atom count from the first frame header of a trajectory file.
pub fn count_atoms<P: AsRef<Path>>(path: P) -> Result<u32> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let header = frame::read_header(&mut reader, None)?.ok_or_else(|| {
        TrajectoryError::MalformedFrame("trajectory file contains no frames".into())
    })?;
    Ok(header.atom_count)
}

/// Walk a trajectory file header by header and index every frame.
///
/// Only headers are parsed; coordinate payloads are skipped over by
/// seeking, so scanning a multi-gigabyte file touches a few dozen bytes
/// per frame. The atom count of the first frame is authoritative: a later
/// frame declaring a different count fails with
/// [`TrajectoryError::AtomCountMismatch`], and a frame whose declared
/// length runs past the end of the file fails with
/// [`TrajectoryError::TruncatedFrame`] rather than being dropped.
pub fn scan_frames<P: AsRef<Path>>(path: P) -> Result<FrameIndex> {
    let file = File::open(&path)?;
    let file_len = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let mut offsets = Vec::new();
    let mut expected_atoms: Option<u32> = None;
    let mut offset = 0u64;

    while offset < file_len {
        let Some(header) = frame::read_header(&mut reader, expected_atoms)? else {
            break;
        };
        expected_atoms.get_or_insert(header.atom_count);

        let frame_len = if header.is_short() {
            short_frame_len(header.atom_count)
        } else {
            // Skip precision, extents, and the small-width index; only the
            // payload length matters for the scan.
            let mut skip = [0u8; 32];
            match wire::try_fill(&mut reader, &mut skip) {
                Ok(true) => {}
                Ok(false) => {
                    return Err(TrajectoryError::TruncatedFrame(format!(
                        "frame {} header ends early",
                        offsets.len()
                    )));
                }
                Err(e) => return Err(frame::eof_is_truncation(e, "long-path header")),
            }
            let payload_bytes = wire::read_i32(&mut reader)
                .map_err(|e| frame::eof_is_truncation(e, "payload length"))?;
            if payload_bytes < 0 {
                return Err(TrajectoryError::MalformedFrame(format!(
                    "negative payload length {payload_bytes} in frame {}",
                    offsets.len()
                )));
            }
            long_frame_len(payload_bytes as u32)
        };

        let end = offset + frame_len;
        if end > file_len {
            return Err(TrajectoryError::TruncatedFrame(format!(
                "frame {} declares {} bytes but only {} remain",
                offsets.len(),
                frame_len,
                file_len - offset
            )));
        }
        trace!("frame {} at offset {offset}, {frame_len} bytes", offsets.len());
        offsets.push(offset);
        reader.seek(SeekFrom::Start(end))?;
        offset = end;
    }

    debug!(
        "indexed {} frames ({} atoms each)",
        offsets.len(),
        expected_atoms.unwrap_or(0)
    );
    Ok(FrameIndex {
        atom_count: expected_atoms.unwrap_or(0),
        offsets,
    })
}
