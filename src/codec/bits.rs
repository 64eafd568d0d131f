//! Bit-level packing primitives for the coordinate compressor.
//!
//! A [`BitBuffer`] is a growable byte arena with an explicit bit cursor.
//! Fields are written most-significant-bit first and cross byte boundaries
//! transparently; alignment is flushed (zero-padded) only when the buffer is
//! converted back to bytes at a frame boundary, never mid-frame.
//!
//! On top of single-field packing sits the packed-triple scheme: three
//! bounded integers are combined into one multiprecision number (base-256
//! digit array) and written as a single field of a known bit width. The
//! width table [`MAGICINTS`] is laid out so that a triple of values below
//! `MAGICINTS[idx]` always fits in exactly `idx` bits.

use crate::error::{Result, TrajectoryError};

/// Width lookup table for the adaptive coordinate encoder.
///
/// Entry `idx` is the largest per-axis value range whose triple still packs
/// into `idx` bits (`MAGICINTS[idx]^3 <= 2^idx`). Entries below
/// [`FIRSTIDX`] are unused padding so the index doubles as the bit width.
pub(crate) static MAGICINTS: [u32; 73] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 8, 10, 12, 16, 20, 25, 32, 40, 50, 64, 80, 101, 128, 161, 203, 256,
    322, 406, 512, 645, 812, 1024, 1290, 1625, 2048, 2580, 3250, 4096, 5060, 6501, 8192, 10321,
    13003, 16384, 20642, 26007, 32768, 41285, 52015, 65536, 82570, 104031, 131072, 165140, 208063,
    262144, 330280, 416127, 524287, 660561, 832255, 1048576, 1321122, 1664510, 2097152, 2642245,
    3329021, 4194304, 5284491, 6658042, 8388607, 10568983, 13316085, 16777216,
];

/// Smallest usable index into [`MAGICINTS`].
pub(crate) const FIRSTIDX: u32 = 9;

/// Largest valid index into [`MAGICINTS`].
pub(crate) const LASTIDX: u32 = MAGICINTS.len() as u32 - 1;

/// Number of bits needed for a field holding values `0..=size`.
pub(crate) fn bits_for_range(size: u64) -> u32 {
    let mut bits = 0u32;
    let mut num = 1u64;
    while size >= num && bits < 32 {
        bits += 1;
        num <<= 1;
    }
    bits
}

/// Number of bits needed for a packed triple with the given per-axis ranges.
///
/// Computes `sizes[0] * sizes[1] * sizes[2]` as a base-256 digit array and
/// counts the bits of the result, so it stays exact well past 64 bits.
pub(crate) fn bits_for_triple(sizes: [u32; 3]) -> u32 {
    let mut bytes = [0u8; 32];
    bytes[0] = 1;
    let mut num_bytes = 1usize;
    for size in sizes {
        let mut carry = 0u64;
        let mut cnt = 0usize;
        while cnt < num_bytes {
            let t = bytes[cnt] as u64 * size as u64 + carry;
            bytes[cnt] = (t & 0xff) as u8;
            carry = t >> 8;
            cnt += 1;
        }
        while carry != 0 {
            bytes[cnt] = (carry & 0xff) as u8;
            carry >>= 8;
            cnt += 1;
        }
        num_bytes = cnt;
    }
    let top = bytes[num_bytes - 1] as u32;
    let mut bits = 0u32;
    let mut num = 1u32;
    while top >= num {
        bits += 1;
        num <<= 1;
    }
    bits + (num_bytes as u32 - 1) * 8
}

/// Byte arena with a bit cursor, scoped to one frame's (de)compression.
#[derive(Debug, Default)]
pub(crate) struct BitBuffer {
    bytes: Vec<u8>,
    /// Total bits written so far.
    write_cursor: usize,
    /// Next bit to consume on reads.
    read_cursor: usize,
}

impl BitBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing payload for unpacking.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            write_cursor: bytes.len() * 8,
            bytes: bytes.to_vec(),
            read_cursor: 0,
        }
    }

    /// Finish writing, flushing alignment: trailing bits of the last byte
    /// are already zero because bytes are allocated zeroed.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Append the low `width` bits of `value`, MSB first. `width == 0` is a
    /// legal no-op; `width` must not exceed 32.
    pub fn pack_bits(&mut self, value: u32, width: u32) {
        debug_assert!(width <= 32);
        if width == 0 {
            return;
        }
        let masked = if width == 32 {
            value
        } else {
            value & ((1u32 << width) - 1)
        };
        let mut remaining = width;
        while remaining > 0 {
            let byte_idx = self.write_cursor / 8;
            let bit_off = (self.write_cursor % 8) as u32;
            if byte_idx == self.bytes.len() {
                self.bytes.push(0);
            }
            let avail = 8 - bit_off;
            let take = remaining.min(avail);
            let chunk = ((masked >> (remaining - take)) & ((1u32 << take) - 1)) as u8;
            self.bytes[byte_idx] |= chunk << (avail - take);
            self.write_cursor += take as usize;
            remaining -= take;
        }
    }

    /// Consume and return the next `width` bits.
    pub fn unpack_bits(&mut self, width: u32) -> Result<u32> {
        debug_assert!(width <= 32);
        if width == 0 {
            return Ok(0);
        }
        let total = self.bytes.len() * 8;
        if self.read_cursor + width as usize > total {
            return Err(TrajectoryError::BufferExhausted {
                needed: width as usize,
                available: total - self.read_cursor,
            });
        }
        let mut value = 0u32;
        let mut remaining = width;
        while remaining > 0 {
            let byte_idx = self.read_cursor / 8;
            let bit_off = (self.read_cursor % 8) as u32;
            let avail = 8 - bit_off;
            let take = remaining.min(avail);
            let chunk = (self.bytes[byte_idx] >> (avail - take)) & (((1u16 << take) - 1) as u8);
            value = (value << take) | chunk as u32;
            self.read_cursor += take as usize;
            remaining -= take;
        }
        Ok(value)
    }

    /// Pack three bounded integers as one multiprecision field of
    /// `num_bits` bits. Each `nums[i]` for `i > 0` must be below `sizes[i]`.
    pub fn pack_ints(&mut self, num_bits: u32, sizes: [u32; 3], nums: [u32; 3]) {
        let mut bytes = [0u8; 32];
        let mut num_bytes = 0usize;
        let mut tmp = nums[0];
        loop {
            bytes[num_bytes] = (tmp & 0xff) as u8;
            num_bytes += 1;
            tmp >>= 8;
            if tmp == 0 {
                break;
            }
        }
        for i in 1..3 {
            debug_assert!(nums[i] < sizes[i]);
            let mut carry = nums[i] as u64;
            let mut cnt = 0usize;
            while cnt < num_bytes {
                let t = bytes[cnt] as u64 * sizes[i] as u64 + carry;
                bytes[cnt] = (t & 0xff) as u8;
                carry = t >> 8;
                cnt += 1;
            }
            while carry != 0 {
                bytes[cnt] = (carry & 0xff) as u8;
                carry >>= 8;
                cnt += 1;
            }
            num_bytes = cnt;
        }
        if num_bits as usize >= num_bytes * 8 {
            for &b in &bytes[..num_bytes] {
                self.pack_bits(b as u32, 8);
            }
            let mut pad = num_bits - num_bytes as u32 * 8;
            while pad > 0 {
                let chunk = pad.min(8);
                self.pack_bits(0, chunk);
                pad -= chunk;
            }
        } else {
            for &b in &bytes[..num_bytes - 1] {
                self.pack_bits(b as u32, 8);
            }
            self.pack_bits(
                bytes[num_bytes - 1] as u32,
                num_bits - (num_bytes as u32 - 1) * 8,
            );
        }
    }

    /// Inverse of [`pack_ints`](Self::pack_ints).
    pub fn unpack_ints(&mut self, num_bits: u32, sizes: [u32; 3]) -> Result<[u32; 3]> {
        let mut bytes = [0u8; 32];
        let mut num_bytes = 0usize;
        let mut remaining = num_bits;
        while remaining > 8 {
            bytes[num_bytes] = self.unpack_bits(8)? as u8;
            num_bytes += 1;
            remaining -= 8;
        }
        if remaining > 0 {
            bytes[num_bytes] = self.unpack_bits(remaining)? as u8;
            num_bytes += 1;
        }
        let mut nums = [0u32; 3];
        for i in (1..3).rev() {
            let mut rem = 0u64;
            for j in (0..num_bytes).rev() {
                let acc = (rem << 8) | bytes[j] as u64;
                let q = acc / sizes[i] as u64;
                // q < 256 because rem < sizes[i] on entry
                bytes[j] = q as u8;
                rem = acc - q * sizes[i] as u64;
            }
            nums[i] = rem as u32;
        }
        nums[0] = bytes[0] as u32
            | (bytes[1] as u32) << 8
            | (bytes[2] as u32) << 16
            | (bytes[3] as u32) << 24;
        Ok(nums)
    }

    /// Bytes currently held, including the partially filled tail byte.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}
