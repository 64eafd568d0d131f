//! Frame assembly and parsing.
//!
//! One frame is a fixed header followed by a coordinate section. The header
//! repeats the atom count twice, a quirk kept for wire compatibility with
//! the original format; the decoder validates that both copies agree. Tiny
//! frames (fewer than [`SHORT_ATOM_LIMIT`] atoms) store raw floats because
//! compression overhead is not worth it at that scale; everything else goes
//! through the compressed path.

use std::io::{self, Read, Write};

use super::compress::{self, CompressedCoords};
use super::wire;
use crate::error::{Result, TrajectoryError};

/// Format tag at the start of every frame.
pub const FRAME_MAGIC: i32 = 1995;

/// Atom counts below this use the uncompressed short path.
pub(crate) const SHORT_ATOM_LIMIT: u32 = 10;

/// Header bytes shared by both paths:
/// magic, atom count, step, time, 3x3 box, atom count again.
pub(crate) const SHORT_HEADER_BYTES: u64 = 56;

/// Short-path coordinate storage per atom (three raw f32s).
pub(crate) const SHORT_BYTES_PER_ATOM: u64 = 12;

/// Long-path header bytes: the shared header plus precision, integer
/// bounding box, small-width index, and payload byte length.
pub(crate) const LONG_HEADER_BYTES: u64 = SHORT_HEADER_BYTES + 36;

/// One timestep of a trajectory: metadata, box geometry, and coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Simulation step number.
    pub step: i32,
    /// Simulation time in picoseconds.
    pub time: f32,
    /// Simulation box vectors, row per vector.
    pub box_vectors: [[f32; 3]; 3],
    /// One (x, y, z) triple per atom.
    pub coords: Vec<[f32; 3]>,
    /// Compression precision. `Some` only on the compressed path; when
    /// writing, `None` falls back to the writer's configured precision.
    pub precision: Option<f32>,
}

impl Frame {
    pub fn new(step: i32, time: f32, box_vectors: [[f32; 3]; 3], coords: Vec<[f32; 3]>) -> Self {
        Self {
            step,
            time,
            box_vectors,
            coords,
            precision: None,
        }
    }

    pub fn atom_count(&self) -> u32 {
        self.coords.len() as u32
    }
}

/// The header fields shared by both paths.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameHeader {
    pub atom_count: u32,
    pub step: i32,
    pub time: f32,
    pub box_vectors: [[f32; 3]; 3],
}

impl FrameHeader {
    pub fn is_short(&self) -> bool {
        self.atom_count < SHORT_ATOM_LIMIT
    }
}

/// Total on-disk length of a short-path frame.
pub(crate) fn short_frame_len(atom_count: u32) -> u64 {
    SHORT_HEADER_BYTES + atom_count as u64 * SHORT_BYTES_PER_ATOM
}

/// Total on-disk length of a long-path frame with the given payload size.
pub(crate) fn long_frame_len(payload_bytes: u32) -> u64 {
    LONG_HEADER_BYTES + wire::padded_len(payload_bytes as u64)
}

pub(crate) fn eof_is_truncation(e: io::Error, context: &str) -> TrajectoryError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        TrajectoryError::TruncatedFrame(format!("stream ended while reading {context}"))
    } else {
        TrajectoryError::Io(e)
    }
}

/// Read and validate the shared header. Returns `Ok(None)` on a clean
/// end-of-stream at the frame boundary; a partial header is reported as
/// [`TrajectoryError::TruncatedFrame`].
pub(crate) fn read_header<R: Read>(
    r: &mut R,
    expected_atoms: Option<u32>,
) -> Result<Option<FrameHeader>> {
    let mut magic_buf = [0u8; 4];
    match wire::try_fill(r, &mut magic_buf) {
        Ok(true) => {}
        Ok(false) => return Ok(None),
        Err(e) => return Err(eof_is_truncation(e, "frame magic")),
    }
    let magic = i32::from_be_bytes(magic_buf);
    if magic != FRAME_MAGIC {
        return Err(TrajectoryError::MalformedFrame(format!(
            "unexpected magic {magic:#010x}, expected {FRAME_MAGIC:#010x}"
        )));
    }

    let atoms = wire::read_i32(r).map_err(|e| eof_is_truncation(e, "atom count"))?;
    if atoms < 0 {
        return Err(TrajectoryError::MalformedFrame(format!(
            "negative atom count {atoms}"
        )));
    }
    let step = wire::read_i32(r).map_err(|e| eof_is_truncation(e, "step"))?;
    let time = wire::read_f32(r).map_err(|e| eof_is_truncation(e, "time"))?;
    let mut box_vectors = [[0f32; 3]; 3];
    for row in &mut box_vectors {
        for v in row.iter_mut() {
            *v = wire::read_f32(r).map_err(|e| eof_is_truncation(e, "box matrix"))?;
        }
    }
    let atoms_again = wire::read_i32(r).map_err(|e| eof_is_truncation(e, "repeated atom count"))?;
    if atoms_again != atoms {
        return Err(TrajectoryError::MalformedFrame(format!(
            "header atom count copies disagree: {atoms} vs {atoms_again}"
        )));
    }

    let atom_count = atoms as u32;
    if let Some(expected) = expected_atoms {
        if atom_count != expected {
            return Err(TrajectoryError::AtomCountMismatch {
                expected,
                actual: atom_count,
            });
        }
    }

    Ok(Some(FrameHeader {
        atom_count,
        step,
        time,
        box_vectors,
    }))
}

fn write_header<W: Write>(w: &mut W, frame: &Frame) -> Result<()> {
    let atoms = i32::try_from(frame.coords.len()).map_err(|_| {
        TrajectoryError::MalformedFrame(format!(
            "atom count {} exceeds the format's 32-bit limit",
            frame.coords.len()
        ))
    })?;
    wire::write_i32(w, FRAME_MAGIC)?;
    wire::write_i32(w, atoms)?;
    wire::write_i32(w, frame.step)?;
    wire::write_f32(w, frame.time)?;
    for row in &frame.box_vectors {
        for &v in row {
            wire::write_f32(w, v)?;
        }
    }
    wire::write_i32(w, atoms)?;
    Ok(())
}

/// Encode one frame. Returns the number of bytes written.
///
/// Byte-exact: identical input at identical precision always produces
/// identical output.
pub(crate) fn write_frame<W: Write>(w: &mut W, frame: &Frame, precision: f32) -> Result<u64> {
    if !precision.is_finite() || precision <= 0.0 {
        return Err(TrajectoryError::InvalidPrecision {
            precision,
            reason: "must be positive and finite",
        });
    }
    write_header(w, frame)?;
    let atom_count = frame.coords.len() as u32;

    if atom_count < SHORT_ATOM_LIMIT {
        for c in &frame.coords {
            for &v in c {
                wire::write_f32(w, v)?;
            }
        }
        return Ok(short_frame_len(atom_count));
    }

    let CompressedCoords {
        minint,
        maxint,
        smallidx,
        payload,
    } = compress::compress(&frame.coords, precision)?;
    let payload_bytes = i32::try_from(payload.len()).map_err(|_| {
        TrajectoryError::MalformedFrame("compressed payload exceeds 32-bit length field".into())
    })?;

    wire::write_f32(w, precision)?;
    for &v in &minint {
        wire::write_i32(w, v)?;
    }
    for &v in &maxint {
        wire::write_i32(w, v)?;
    }
    wire::write_i32(w, smallidx as i32)?;
    wire::write_i32(w, payload_bytes)?;
    wire::write_opaque(w, &payload)?;

    Ok(long_frame_len(payload_bytes as u32))
}

/// Decode one frame, or `Ok(None)` on a clean end-of-stream.
///
/// `expected_atoms` enforces the fixed-topology rule when reading a file
/// whose atom count is already known.
pub(crate) fn read_frame<R: Read>(r: &mut R, expected_atoms: Option<u32>) -> Result<Option<Frame>> {
    let Some(header) = read_header(r, expected_atoms)? else {
        return Ok(None);
    };
    let atom_count = header.atom_count as usize;

    if header.is_short() {
        let mut coords = Vec::with_capacity(atom_count);
        for _ in 0..atom_count {
            let mut c = [0f32; 3];
            for v in &mut c {
                *v = wire::read_f32(r).map_err(|e| eof_is_truncation(e, "raw coordinates"))?;
            }
            coords.push(c);
        }
        return Ok(Some(Frame {
            step: header.step,
            time: header.time,
            box_vectors: header.box_vectors,
            coords,
            precision: None,
        }));
    }

    let precision = wire::read_f32(r).map_err(|e| eof_is_truncation(e, "precision"))?;
    let mut minint = [0i32; 3];
    let mut maxint = [0i32; 3];
    for v in &mut minint {
        *v = wire::read_i32(r).map_err(|e| eof_is_truncation(e, "minimum extent"))?;
    }
    for v in &mut maxint {
        *v = wire::read_i32(r).map_err(|e| eof_is_truncation(e, "maximum extent"))?;
    }
    let smallidx = wire::read_i32(r).map_err(|e| eof_is_truncation(e, "small-width index"))?;
    if smallidx < 0 {
        return Err(TrajectoryError::MalformedFrame(format!(
            "negative small-width index {smallidx}"
        )));
    }
    let payload_bytes = wire::read_i32(r).map_err(|e| eof_is_truncation(e, "payload length"))?;
    if payload_bytes < 0 {
        return Err(TrajectoryError::MalformedFrame(format!(
            "negative payload length {payload_bytes}"
        )));
    }
    let payload = wire::read_opaque(r, payload_bytes as usize)
        .map_err(|e| eof_is_truncation(e, "compressed payload"))?;

    let coords = compress::decompress(
        minint,
        maxint,
        smallidx as u32,
        &payload,
        atom_count,
        precision,
    )?;

    Ok(Some(Frame {
        step: header.step,
        time: header.time,
        box_vectors: header.box_vectors,
        coords,
        precision: Some(precision),
    }))
}
