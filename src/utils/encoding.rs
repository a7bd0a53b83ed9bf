//! Fixed-width little-endian integers
//!
//! The output files store positions, SA samples, LCP values and run lengths in
//! `width`-byte little-endian integers (`width <= 8`), independent of the host.

use std::io::{self, Read, Write};

/// Largest value representable in `width` bytes
#[inline]
pub fn max_uint(width: usize) -> u64 {
    debug_assert!((1..=8).contains(&width));
    if width == 8 { u64::MAX } else { (1u64 << (8 * width)) - 1 }
}

/// Write the low `width` bytes of `value`
pub fn write_uint_le<W: Write>(writer: &mut W, value: u64, width: usize) -> io::Result<()> {
    if value > max_uint(width) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("value {} does not fit in {} bytes", value, width),
        ));
    }
    writer.write_all(&value.to_le_bytes()[..width])
}

/// Read a `width`-byte integer
pub fn read_uint_le<R: Read>(reader: &mut R, width: usize) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf[..width])?;
    Ok(u64::from_le_bytes(buf))
}

/// Decode a `width`-byte integer from the start of `bytes`
#[inline]
pub fn decode_uint_le(bytes: &[u8], width: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(&bytes[..width]);
    u64::from_le_bytes(buf)
}
