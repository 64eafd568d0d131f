//! Writing trajectories frame by frame.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::codec::Frame;
use crate::codec::frame;
use crate::error::{Result, TrajectoryError};

/// Configuration for a trajectory writer.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Compression precision for frames that do not carry their own:
    /// coordinates are quantized to `1 / precision` length units.
    pub precision: f32,
}

impl Default for WriterConfig {
    fn default() -> Self {
        // 0.001 length-unit resolution, the conventional default.
        Self { precision: 1000.0 }
    }
}

/// Handle for writing a trajectory file.
///
/// The atom count is fixed at creation; every frame must match it. Frames
/// with fewer than ten atoms are stored as raw floats, everything else is
/// compressed at the frame's precision (or the configured default).
///
/// Usage:
/// ```ignore
/// let mut writer = TrajectoryWriter::create("out.xtc", 1000, WriterConfig::default())?;
/// for step in 0..100 {
///     writer.write_frame(&frame)?;
/// }
/// let stats = writer.finalize()?;
/// println!("{stats}");
/// ```
pub struct TrajectoryWriter {
    writer: BufWriter<File>,
    atom_count: u32,
    config: WriterConfig,
    frames_written: u64,
    bytes_written: u64,
}

impl TrajectoryWriter {
    /// Create a new trajectory file, truncating any existing one.
    pub fn create<P: AsRef<Path>>(path: P, atom_count: u32, config: WriterConfig) -> Result<Self> {
        if !config.precision.is_finite() || config.precision <= 0.0 {
            return Err(TrajectoryError::InvalidPrecision {
                precision: config.precision,
                reason: "must be positive and finite",
            });
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            atom_count,
            config,
            frames_written: 0,
            bytes_written: 0,
        })
    }

    /// Append one frame.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.atom_count() != self.atom_count {
            return Err(TrajectoryError::AtomCountMismatch {
                expected: self.atom_count,
                actual: frame.atom_count(),
            });
        }
        let precision = frame.precision.unwrap_or(self.config.precision);
        let written = frame::write_frame(&mut self.writer, frame, precision)?;
        self.frames_written += 1;
        self.bytes_written += written;
        Ok(())
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flush and close the file, returning write statistics.
    pub fn finalize(mut self) -> Result<WriteStats> {
        self.writer.flush()?;
        let stats = WriteStats {
            frame_count: self.frames_written,
            total_bytes: self.bytes_written,
            average_frame_size: if self.frames_written > 0 {
                self.bytes_written / self.frames_written
            } else {
                0
            },
        };
        debug!("finished trajectory: {stats}");
        Ok(stats)
    }
}

/// Statistics from a writing session.
#[derive(Debug, Clone)]
pub struct WriteStats {
    /// Total frames written.
    pub frame_count: u64,
    /// Total bytes written.
    pub total_bytes: u64,
    /// Mean on-disk frame size in bytes.
    pub average_frame_size: u64,
}

impl std::fmt::Display for WriteStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames, {} bytes total, {} bytes/frame avg",
            self.frame_count, self.total_bytes, self.average_frame_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const BOX: [[f32; 3]; 3] = [[3.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 3.0]];

    fn frame_with(atoms: usize) -> Frame {
        let coords = (0..atoms).map(|i| [i as f32 * 0.05, 0.5, 1.0]).collect();
        Frame::new(0, 0.0, BOX, coords)
    }

    #[test]
    fn writes_frames_and_reports_stats() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xtc");

        let mut writer = TrajectoryWriter::create(&path, 20, WriterConfig::default()).unwrap();
        for _ in 0..6 {
            writer.write_frame(&frame_with(20)).unwrap();
        }
        assert_eq!(writer.frames_written(), 6);
        let stats = writer.finalize().unwrap();

        assert_eq!(stats.frame_count, 6);
        assert_eq!(stats.total_bytes, fs::metadata(&path).unwrap().len());
        assert_eq!(stats.average_frame_size, stats.total_bytes / 6);
    }

    #[test]
    fn wrong_atom_count_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xtc");

        let mut writer = TrajectoryWriter::create(&path, 20, WriterConfig::default()).unwrap();
        let err = writer.write_frame(&frame_with(19)).unwrap_err();
        assert!(matches!(
            err,
            TrajectoryError::AtomCountMismatch {
                expected: 20,
                actual: 19
            }
        ));
    }

    #[test]
    fn invalid_precision_is_rejected_at_creation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xtc");
        let config = WriterConfig { precision: -1.0 };
        assert!(matches!(
            TrajectoryWriter::create(&path, 20, config),
            Err(TrajectoryError::InvalidPrecision { .. })
        ));
    }

    #[test]
    fn per_frame_precision_overrides_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xtc");

        let mut writer = TrajectoryWriter::create(&path, 20, WriterConfig::default()).unwrap();
        let mut frame = frame_with(20);
        frame.precision = Some(100.0);
        writer.write_frame(&frame).unwrap();
        writer.finalize().unwrap();

        let mut reader = crate::trajectory::TrajectoryReader::open(&path).unwrap();
        let decoded = reader.read_frame().unwrap().unwrap();
        assert_eq!(decoded.precision, Some(100.0));
    }

    #[test]
    fn bad_per_frame_precision_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xtc");

        let mut writer = TrajectoryWriter::create(&path, 20, WriterConfig::default()).unwrap();
        let mut frame = frame_with(20);
        frame.precision = Some(f32::INFINITY);
        assert!(matches!(
            writer.write_frame(&frame),
            Err(TrajectoryError::InvalidPrecision { .. })
        ));
    }
}
