//! Reading trajectories frame by frame, sequentially or by random access.

use std::fs::File;
use std::io::{self, BufReader, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use super::index::FrameIndex;
use crate::codec::Frame;
use crate::codec::frame;
use crate::error::{Result, TrajectoryError};

/// Handle for reading a trajectory file.
///
/// Not safe for concurrent use: one in-flight operation per handle.
/// Independent handles on the same file may read concurrently.
///
/// Usage:
/// ```ignore
/// let mut reader = TrajectoryReader::open("traj.xtc")?;
/// for frame in reader.frames() {
///     let frame = frame?;
///     // ...
/// }
///
/// // Or seek directly using a frame index:
/// let index = scan_frames("traj.xtc")?;
/// reader.seek_frame(100, &index)?;
/// let frame = reader.read_frame()?;
/// ```
pub struct TrajectoryReader {
    reader: BufReader<File>,
    atom_count: u32,
}

impl TrajectoryReader {
    /// Open a trajectory, validating the first frame header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let mut reader = BufReader::new(file);
        let header = frame::read_header(&mut reader, None)?.ok_or_else(|| {
            TrajectoryError::MalformedFrame("trajectory file contains no frames".into())
        })?;
        reader.seek(SeekFrom::Start(0))?;
        debug!("opened trajectory with {} atoms per frame", header.atom_count);
        Ok(Self {
            reader,
            atom_count: header.atom_count,
        })
    }

    /// Atom count declared by the first frame; constant for the file.
    pub fn atom_count(&self) -> u32 {
        self.atom_count
    }

    /// Read the next frame, or `Ok(None)` at end of file.
    ///
    /// On error the read cursor is undefined relative to frame boundaries;
    /// call [`seek_frame`](Self::seek_frame) before reading again.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        frame::read_frame(&mut self.reader, Some(self.atom_count))
    }

    /// Position the cursor at frame `frame_index` using a scanned index.
    pub fn seek_frame(&mut self, frame_index: usize, index: &FrameIndex) -> Result<()> {
        let offset = index.offset(frame_index).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "frame index {frame_index} out of range (file has {} frames)",
                    index.frame_count()
                ),
            )
        })?;
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Iterate over the remaining frames.
    pub fn frames(&mut self) -> FrameReadIterator<'_> {
        FrameReadIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over trajectory frames; stops after the first error.
pub struct FrameReadIterator<'a> {
    reader: &'a mut TrajectoryReader,
    done: bool,
}

impl Iterator for FrameReadIterator<'_> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::{TrajectoryWriter, WriterConfig, scan_frames};
    use std::fs;
    use tempfile::tempdir;

    const BOX: [[f32; 3]; 3] = [[6.0, 0.0, 0.0], [0.0, 6.0, 0.0], [0.0, 0.0, 6.0]];

    fn frame_for(step: i32, atoms: usize) -> Frame {
        let coords = (0..atoms)
            .map(|i| {
                let t = i as f32 * 0.02 + step as f32 * 0.5;
                [t, -t, 2.0 * t]
            })
            .collect();
        Frame::new(step, step as f32 * 0.004, BOX, coords)
    }

    fn write_file(path: &std::path::Path, atoms: usize, frames: usize) -> Vec<Frame> {
        let mut writer =
            TrajectoryWriter::create(path, atoms as u32, WriterConfig::default()).unwrap();
        let originals: Vec<Frame> = (0..frames).map(|f| frame_for(f as i32, atoms)).collect();
        for frame in &originals {
            writer.write_frame(frame).unwrap();
        }
        writer.finalize().unwrap();
        originals
    }

    #[test]
    fn sequential_read_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("traj.xtc");
        let originals = write_file(&path, 25, 4);

        let mut reader = TrajectoryReader::open(&path).unwrap();
        assert_eq!(reader.atom_count(), 25);

        for original in &originals {
            let decoded = reader.read_frame().unwrap().unwrap();
            assert_eq!(decoded.step, original.step);
            assert_eq!(decoded.precision, Some(1000.0));
            for (o, d) in original.coords.iter().zip(&decoded.coords) {
                for axis in 0..3 {
                    assert!((o[axis] - d[axis]).abs() <= 0.5 / 1000.0 + 1e-6);
                }
            }
        }
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn short_path_read_is_exact_and_uncompressed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("small.xtc");
        let originals = write_file(&path, 5, 3);

        let mut reader = TrajectoryReader::open(&path).unwrap();
        for original in &originals {
            let decoded = reader.read_frame().unwrap().unwrap();
            // Raw floats: exact, and no precision is recorded.
            assert_eq!(decoded.precision, None);
            assert_eq!(decoded.coords, original.coords);
        }
    }

    #[test]
    fn seek_enables_random_access() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("traj.xtc");
        let originals = write_file(&path, 30, 6);

        let index = scan_frames(&path).unwrap();
        let mut reader = TrajectoryReader::open(&path).unwrap();

        for &target in &[4usize, 0, 5, 2] {
            reader.seek_frame(target, &index).unwrap();
            let decoded = reader.read_frame().unwrap().unwrap();
            assert_eq!(decoded.step, originals[target].step);
        }
    }

    #[test]
    fn seek_out_of_range_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("traj.xtc");
        write_file(&path, 12, 2);

        let index = scan_frames(&path).unwrap();
        let mut reader = TrajectoryReader::open(&path).unwrap();
        assert!(reader.seek_frame(2, &index).is_err());
    }

    #[test]
    fn iterator_yields_all_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("traj.xtc");
        write_file(&path, 20, 5);

        let mut reader = TrajectoryReader::open(&path).unwrap();
        let frames: Vec<_> = reader.frames().collect();
        assert_eq!(frames.len(), 5);
        for frame in frames {
            assert!(frame.is_ok());
        }
    }

    #[test]
    fn truncated_last_frame_surfaces_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("traj.xtc");
        write_file(&path, 30, 3);

        let mut bytes = fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 8);
        let cut = dir.path().join("cut.xtc");
        fs::write(&cut, bytes).unwrap();

        let mut reader = TrajectoryReader::open(&cut).unwrap();
        assert!(reader.read_frame().unwrap().is_some());
        assert!(reader.read_frame().unwrap().is_some());
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, TrajectoryError::TruncatedFrame(_)));
    }

    #[test]
    fn open_empty_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.xtc");
        fs::write(&path, b"").unwrap();
        assert!(matches!(
            TrajectoryReader::open(&path),
            Err(TrajectoryError::MalformedFrame(_))
        ));
    }
}
