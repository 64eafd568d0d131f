//! Lossy coordinate compression.
//!
//! Coordinates are quantized to integers at a caller-chosen precision
//! (e.g. 1000 for 0.001 length-unit resolution), then packed with an
//! adaptive bit width. Consecutive atoms in a well-behaved trajectory sit
//! close together, so most triples are encoded as small displacements from
//! the previous atom at the current small width. An atom whose displacement
//! exceeds that width is escape-encoded at the full bounding-box width,
//! together with a run marker that may retune the small width before the
//! following run of displacement triples.
//!
//! The round-trip error per coordinate is bounded by `0.5 / precision`;
//! the scheme is lossy by design and this bound is the contract.
//!
//! Stream grammar, after the absolute first atom:
//!
//! ```text
//! block     := '0' small-triple                       ; current width
//!            | '1' marker abs-triple small-triple*    ; run boundary
//! marker    := 5 bits, run * 3 + (adjust + 1)         ; run 0..=8
//! ```
//!
//! `adjust` retunes the small-width table index by -1, 0, or +1 and applies
//! to the run following the escape. Encode and decode walk the same
//! explicit state, so the two directions stay symmetric.

use log::trace;

use super::bits::{BitBuffer, FIRSTIDX, LASTIDX, MAGICINTS, bits_for_range, bits_for_triple};
use crate::error::{Result, TrajectoryError};

/// Longest run of small triples after one escape.
const MAX_RUN: usize = 8;

/// Quantized magnitudes beyond this cannot be represented safely in i32.
const MAX_ABS_QUANT: f64 = (i32::MAX - 2) as f64;

/// Output of [`compress`]: the fields that go into the long-path frame
/// header plus the packed bitstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompressedCoords {
    /// Quantized coordinate lower bound per axis.
    pub minint: [i32; 3],
    /// Quantized coordinate upper bound per axis.
    pub maxint: [i32; 3],
    /// Initial small-width table index.
    pub smallidx: u32,
    /// Packed payload, zero-padded to a whole byte.
    pub payload: Vec<u8>,
}

/// Current adaptive encoding width: an index into [`MAGICINTS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SmallWidth {
    idx: u32,
}

impl SmallWidth {
    fn new(idx: u32) -> Self {
        debug_assert!((FIRSTIDX..=LASTIDX).contains(&idx));
        Self { idx }
    }

    /// Per-axis value range of a small triple at this width.
    fn range(self) -> u32 {
        MAGICINTS[self.idx as usize]
    }

    /// Bias added to displacements so packed values are non-negative.
    fn bias(self) -> i32 {
        (self.range() / 2) as i32
    }

    /// Whether a displacement triple is encodable at this width.
    fn fits(self, delta: [i32; 3]) -> bool {
        let bias = self.bias() as i64;
        let range = self.range() as i64;
        delta.iter().all(|&d| {
            let v = d as i64 + bias;
            v >= 0 && v < range
        })
    }

    fn pack(self, buf: &mut BitBuffer, delta: [i32; 3]) {
        debug_assert!(self.fits(delta));
        let bias = self.bias();
        let nums = [
            (delta[0] + bias) as u32,
            (delta[1] + bias) as u32,
            (delta[2] + bias) as u32,
        ];
        buf.pack_ints(self.idx, [self.range(); 3], nums);
    }

    fn unpack(self, buf: &mut BitBuffer) -> Result<[i32; 3]> {
        let nums = buf.unpack_ints(self.idx, [self.range(); 3])?;
        let bias = self.bias();
        Ok([
            nums[0] as i32 - bias,
            nums[1] as i32 - bias,
            nums[2] as i32 - bias,
        ])
    }
}

/// Absolute-triple codec derived from the integer bounding box.
///
/// Small extents pack all three axes as one multiprecision field; an axis
/// spanning more than 24 bits falls back to independent per-axis fields so
/// the digit arithmetic never overflows its bound.
struct ExtentCodec {
    minint: [i32; 3],
    combined: Option<(u32, [u32; 3])>,
    per_axis: [u32; 3],
}

impl ExtentCodec {
    fn new(minint: [i32; 3], maxint: [i32; 3]) -> Self {
        let mut sizes64 = [0u64; 3];
        for d in 0..3 {
            debug_assert!(minint[d] <= maxint[d]);
            sizes64[d] = (maxint[d] as i64 - minint[d] as i64 + 1) as u64;
        }
        if sizes64.iter().any(|&s| s > 0xff_ffff) {
            let per_axis = [
                bits_for_range(sizes64[0]),
                bits_for_range(sizes64[1]),
                bits_for_range(sizes64[2]),
            ];
            Self {
                minint,
                combined: None,
                per_axis,
            }
        } else {
            let sizes = [sizes64[0] as u32, sizes64[1] as u32, sizes64[2] as u32];
            Self {
                minint,
                combined: Some((bits_for_triple(sizes), sizes)),
                per_axis: [0; 3],
            }
        }
    }

    fn pack(&self, buf: &mut BitBuffer, point: [i32; 3]) {
        let rel = [
            (point[0] as i64 - self.minint[0] as i64) as u32,
            (point[1] as i64 - self.minint[1] as i64) as u32,
            (point[2] as i64 - self.minint[2] as i64) as u32,
        ];
        match self.combined {
            Some((width, sizes)) => buf.pack_ints(width, sizes, rel),
            None => {
                for d in 0..3 {
                    buf.pack_bits(rel[d], self.per_axis[d]);
                }
            }
        }
    }

    fn unpack(&self, buf: &mut BitBuffer) -> Result<[i32; 3]> {
        let rel = match self.combined {
            Some((width, sizes)) => buf.unpack_ints(width, sizes)?,
            None => [
                buf.unpack_bits(self.per_axis[0])?,
                buf.unpack_bits(self.per_axis[1])?,
                buf.unpack_bits(self.per_axis[2])?,
            ],
        };
        let mut point = [0i32; 3];
        for d in 0..3 {
            let v = self.minint[d] as i64 + rel[d] as i64;
            point[d] = i32::try_from(v).map_err(|_| {
                TrajectoryError::MalformedFrame("absolute coordinate overflows i32".into())
            })?;
        }
        Ok(point)
    }
}

fn check_precision(precision: f32) -> Result<()> {
    if !precision.is_finite() || precision <= 0.0 {
        return Err(TrajectoryError::InvalidPrecision {
            precision,
            reason: "must be positive and finite",
        });
    }
    Ok(())
}

fn delta(a: [i32; 3], b: [i32; 3]) -> [i32; 3] {
    // Quantized values stay well inside i32, so the subtraction is safe.
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Compress one frame's coordinates at the given precision.
///
/// Deterministic: identical input always yields an identical payload.
pub(crate) fn compress(coords: &[[f32; 3]], precision: f32) -> Result<CompressedCoords> {
    check_precision(precision)?;
    debug_assert!(!coords.is_empty());

    // Quantize, tracking the integer bounding box and the smallest
    // inter-atom displacement (used to seed the adaptive width).
    let mut ints = Vec::with_capacity(coords.len());
    let mut minint = [i32::MAX; 3];
    let mut maxint = [i32::MIN; 3];
    let mut mindiff = i64::MAX;
    let mut prev = [0i32; 3];
    for (i, c) in coords.iter().enumerate() {
        let mut q = [0i32; 3];
        for d in 0..3 {
            let scaled = (c[d] as f64 * precision as f64).round();
            if !scaled.is_finite() || scaled.abs() > MAX_ABS_QUANT {
                return Err(TrajectoryError::InvalidPrecision {
                    precision,
                    reason: "quantized coordinate overflows 32-bit range",
                });
            }
            q[d] = scaled as i32;
            minint[d] = minint[d].min(q[d]);
            maxint[d] = maxint[d].max(q[d]);
        }
        if i > 0 {
            let diff: i64 = (0..3).map(|d| (q[d] as i64 - prev[d] as i64).abs()).sum();
            mindiff = mindiff.min(diff);
        }
        prev = q;
        ints.push(q);
    }

    let mut smallidx = FIRSTIDX;
    while smallidx < LASTIDX && (MAGICINTS[smallidx as usize] as i64) < mindiff {
        smallidx += 1;
    }

    let extent = ExtentCodec::new(minint, maxint);
    let mut width = SmallWidth::new(smallidx);
    let mut buf = BitBuffer::new();

    extent.pack(&mut buf, ints[0]);
    let mut prev = ints[0];
    let mut i = 1;
    while i < ints.len() {
        let d = delta(ints[i], prev);
        if width.fits(d) {
            buf.pack_bits(0, 1);
            width.pack(&mut buf, d);
            prev = ints[i];
            i += 1;
            continue;
        }

        // Run boundary: retune the width from the next displacement, then
        // escape-encode this atom absolutely and emit the run that follows.
        let next = (i + 1 < ints.len()).then(|| delta(ints[i + 1], ints[i]));
        let adjust: i32 = match next {
            Some(nd) if width.idx > FIRSTIDX && SmallWidth::new(width.idx - 1).fits(nd) => -1,
            Some(nd) if width.idx < LASTIDX && !width.fits(nd) => 1,
            _ => 0,
        };
        width = SmallWidth::new((width.idx as i32 + adjust) as u32);

        let mut run = 0usize;
        let mut run_prev = ints[i];
        while run < MAX_RUN && i + 1 + run < ints.len() {
            let rd = delta(ints[i + 1 + run], run_prev);
            if !width.fits(rd) {
                break;
            }
            run_prev = ints[i + 1 + run];
            run += 1;
        }

        buf.pack_bits(1, 1);
        buf.pack_bits(run as u32 * 3 + (adjust + 1) as u32, 5);
        extent.pack(&mut buf, ints[i]);
        prev = ints[i];
        for k in 0..run {
            let rd = delta(ints[i + 1 + k], prev);
            width.pack(&mut buf, rd);
            prev = ints[i + 1 + k];
        }
        i += 1 + run;
    }

    trace!(
        "compressed {} atoms into {} bytes (smallidx {})",
        coords.len(),
        buf.byte_len(),
        smallidx
    );

    Ok(CompressedCoords {
        minint,
        maxint,
        smallidx,
        payload: buf.into_bytes(),
    })
}

/// Decompress a payload produced by [`compress`]. Exact inverse up to the
/// quantization: each coordinate comes back within `0.5 / precision`.
pub(crate) fn decompress(
    minint: [i32; 3],
    maxint: [i32; 3],
    smallidx: u32,
    payload: &[u8],
    atom_count: usize,
    precision: f32,
) -> Result<Vec<[f32; 3]>> {
    if !precision.is_finite() || precision <= 0.0 {
        return Err(TrajectoryError::MalformedFrame(format!(
            "non-positive precision {precision} in compressed frame"
        )));
    }
    if !(FIRSTIDX..=LASTIDX).contains(&smallidx) {
        return Err(TrajectoryError::MalformedFrame(format!(
            "small-width index {smallidx} outside {FIRSTIDX}..={LASTIDX}"
        )));
    }
    for d in 0..3 {
        if minint[d] > maxint[d] {
            return Err(TrajectoryError::MalformedFrame(format!(
                "inverted bounding box on axis {d}: {} > {}",
                minint[d], maxint[d]
            )));
        }
    }
    debug_assert!(atom_count > 0);

    let extent = ExtentCodec::new(minint, maxint);
    let mut width = SmallWidth::new(smallidx);
    let mut buf = BitBuffer::from_bytes(payload);
    let mut coords = Vec::with_capacity(atom_count);

    let unquantize = |q: [i32; 3]| {
        [
            q[0] as f32 / precision,
            q[1] as f32 / precision,
            q[2] as f32 / precision,
        ]
    };
    let advance = |prev: [i32; 3], d: [i32; 3]| -> Result<[i32; 3]> {
        let mut q = [0i32; 3];
        for axis in 0..3 {
            let v = prev[axis] as i64 + d[axis] as i64;
            q[axis] = i32::try_from(v).map_err(|_| {
                TrajectoryError::MalformedFrame("displacement overflows i32 coordinate".into())
            })?;
        }
        Ok(q)
    };

    let mut prev = extent.unpack(&mut buf)?;
    coords.push(unquantize(prev));

    while coords.len() < atom_count {
        if buf.unpack_bits(1)? == 0 {
            let d = width.unpack(&mut buf)?;
            prev = advance(prev, d)?;
            coords.push(unquantize(prev));
            continue;
        }

        let marker = buf.unpack_bits(5)?;
        let run = (marker / 3) as usize;
        let adjust = (marker % 3) as i32 - 1;
        if run > MAX_RUN {
            return Err(TrajectoryError::MalformedFrame(format!(
                "run marker {marker} exceeds maximum run length"
            )));
        }
        let new_idx = width.idx as i32 + adjust;
        if !(FIRSTIDX as i32..=LASTIDX as i32).contains(&new_idx) {
            return Err(TrajectoryError::MalformedFrame(format!(
                "width adjustment leaves table: index {new_idx}"
            )));
        }
        width = SmallWidth::new(new_idx as u32);

        if coords.len() + 1 + run > atom_count {
            return Err(TrajectoryError::MalformedFrame(
                "run length extends past end of frame".into(),
            ));
        }
        prev = extent.unpack(&mut buf)?;
        coords.push(unquantize(prev));
        for _ in 0..run {
            let d = width.unpack(&mut buf)?;
            prev = advance(prev, d)?;
            coords.push(unquantize(prev));
        }
    }

    Ok(coords)
}
