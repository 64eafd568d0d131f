//! Big-endian primitive encode/decode against `Read`/`Write` streams.
//!
//! The on-disk format is network byte order throughout. Opaque byte runs
//! are padded to a four-byte boundary, and scan arithmetic elsewhere relies
//! on [`padded_len`] matching what [`write_opaque`] emits.

use std::io::{self, Read, Write};

pub(crate) fn write_i32<W: Write>(w: &mut W, v: i32) -> io::Result<()> {
    w.write_all(&v.to_be_bytes())
}

pub(crate) fn write_f32<W: Write>(w: &mut W, v: f32) -> io::Result<()> {
    w.write_all(&v.to_be_bytes())
}

pub(crate) fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

pub(crate) fn read_f32<R: Read>(r: &mut R) -> io::Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_be_bytes(buf))
}

/// Length of an opaque run once padded to a four-byte boundary.
pub(crate) fn padded_len(n: u64) -> u64 {
    (n + 3) & !3
}

/// Write an opaque byte run plus zero padding to a four-byte boundary.
pub(crate) fn write_opaque<W: Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
    w.write_all(data)?;
    let pad = (padded_len(data.len() as u64) - data.len() as u64) as usize;
    if pad > 0 {
        w.write_all(&[0u8; 3][..pad])?;
    }
    Ok(())
}

/// Upper bound on a single allocation step in [`read_opaque`].
const OPAQUE_CHUNK: usize = 1 << 16;

/// Read an opaque run of `n` bytes, consuming its padding as well.
///
/// `n` comes straight from an untrusted length field, so the buffer grows
/// in bounded chunks as bytes actually arrive: a corrupt header declaring
/// gigabytes against a tiny file fails with `UnexpectedEof` after at most
/// one chunk, never a huge upfront allocation.
pub(crate) fn read_opaque<R: Read>(r: &mut R, n: usize) -> io::Result<Vec<u8>> {
    let mut data = Vec::with_capacity(n.min(OPAQUE_CHUNK));
    while data.len() < n {
        let take = (n - data.len()).min(OPAQUE_CHUNK);
        let start = data.len();
        data.resize(start + take, 0);
        r.read_exact(&mut data[start..])?;
    }
    let pad = (padded_len(n as u64) - n as u64) as usize;
    if pad > 0 {
        let mut skip = [0u8; 3];
        r.read_exact(&mut skip[..pad])?;
    }
    Ok(data)
}

/// Fill `buf` completely, or report a clean end-of-stream.
///
/// Returns `Ok(false)` when the stream ends before the first byte (no frame
/// starts here); a partial fill is an `UnexpectedEof` error since it means
/// the stream ends inside a frame.
pub(crate) fn try_fill<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended mid-field",
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn primitives_are_big_endian() {
        let mut out = Vec::new();
        write_i32(&mut out, 1995).unwrap();
        write_f32(&mut out, 1.5).unwrap();
        assert_eq!(&out[..4], &[0x00, 0x00, 0x07, 0xcb]);
        assert_eq!(&out[4..], &[0x3f, 0xc0, 0x00, 0x00]);

        let mut r = Cursor::new(out);
        assert_eq!(read_i32(&mut r).unwrap(), 1995);
        assert_eq!(read_f32(&mut r).unwrap(), 1.5);
    }

    #[test]
    fn opaque_runs_are_padded() {
        for n in 0usize..9 {
            let data: Vec<u8> = (0..n as u8).collect();
            let mut out = Vec::new();
            write_opaque(&mut out, &data).unwrap();
            assert_eq!(out.len() as u64, padded_len(n as u64));
            let mut r = Cursor::new(out);
            assert_eq!(read_opaque(&mut r, n).unwrap(), data);
        }
    }

    #[test]
    fn opaque_reads_span_multiple_chunks() {
        let data: Vec<u8> = (0..OPAQUE_CHUNK + 17).map(|i| i as u8).collect();
        let mut out = Vec::new();
        write_opaque(&mut out, &data).unwrap();
        let mut r = Cursor::new(out);
        assert_eq!(read_opaque(&mut r, data.len()).unwrap(), data);
    }

    #[test]
    fn opaque_length_beyond_stream_is_eof_without_huge_allocation() {
        // A declared length in the gigabytes against a 4-byte stream must
        // fail fast, allocating at most one chunk.
        let mut r = Cursor::new(vec![1u8, 2, 3, 4]);
        let err = read_opaque(&mut r, i32::MAX as usize).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn try_fill_distinguishes_clean_eof() {
        let mut buf = [0u8; 4];
        let mut empty = Cursor::new(Vec::<u8>::new());
        assert!(!try_fill(&mut empty, &mut buf).unwrap());

        let mut partial = Cursor::new(vec![1u8, 2]);
        let err = try_fill(&mut partial, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let mut full = Cursor::new(vec![1u8, 2, 3, 4]);
        assert!(try_fill(&mut full, &mut buf).unwrap());
        assert_eq!(buf, [1, 2, 3, 4]);
    }
}
