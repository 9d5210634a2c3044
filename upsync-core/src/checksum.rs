//! Adler-32 checksums and the stored checksum value type.
//!
//! Every tracked file carries the Adler-32 of its local bytes in the low 32
//! bits of a 64-bit field; directories are recorded as `0`. Adler-32 of any
//! input has a nonzero low half (the `a` accumulator starts at 1), so `0`
//! never collides with a real file checksum.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Adler-32 modulus, the largest prime below 2^16.
const MOD_ADLER: u32 = 65521;

/// Largest number of bytes that can be summed before the accumulators must
/// be reduced to keep `b` within `u32` (the zlib bound).
const NMAX: usize = 5552;

const READ_BUF: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Checksum value
// ---------------------------------------------------------------------------

/// A 64-bit checksum field as persisted in the state file.
///
/// Displays as 16 zero-padded lowercase hex digits, the exact on-disk form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum(pub u64);

impl Checksum {
    /// Marker value recorded for directories.
    pub const DIRECTORY: Checksum = Checksum(0);

    /// Whether this entry marks a directory rather than a file.
    pub fn is_directory(self) -> bool {
        self.0 == 0
    }

    /// Parse the 16-hex-digit on-disk form. Returns `None` for any other
    /// shape.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 16 {
            return None;
        }
        u64::from_str_radix(s, 16).ok().map(Checksum)
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Hasher
// ---------------------------------------------------------------------------

/// Streaming Adler-32 hasher.
#[derive(Debug, Clone)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Feed bytes into the running checksum.
    pub fn update(&mut self, data: &[u8]) {
        // Deferred modulo: sums of up to NMAX bytes cannot overflow u32.
        for chunk in data.chunks(NMAX) {
            for &byte in chunk {
                self.a += u32::from(byte);
                self.b += self.a;
            }
            self.a %= MOD_ADLER;
            self.b %= MOD_ADLER;
        }
    }

    /// Finish and return the checksum widened to the stored 64-bit form.
    pub fn finish(&self) -> Checksum {
        Checksum(u64::from((self.b << 16) | self.a))
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Adler-32 of a byte slice.
pub fn checksum_bytes(data: &[u8]) -> Checksum {
    let mut hasher = Adler32::new();
    hasher.update(data);
    hasher.finish()
}

/// Adler-32 of a local file's bytes, read in buffered chunks.
///
/// Returns `Ok(None)` when there is no regular file at `path`: missing, a
/// directory sits there, or a file blocks an ancestor component. That is the
/// analyzer's "local file missing" signal. Any other read failure is an
/// error.
pub fn local_checksum(path: &Path) -> io::Result<Option<Checksum>> {
    match std::fs::metadata(path) {
        Err(e) if matches!(
            e.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
        ) =>
        {
            return Ok(None)
        }
        Err(e) => return Err(e),
        Ok(meta) if !meta.is_file() => return Ok(None),
        Ok(_) => {}
    }

    let mut file = File::open(path)?;
    let mut hasher = Adler32::new();
    let mut buf = [0u8; READ_BUF];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Some(hasher.finish()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
