//! XLI chunk framing and the per-chunk residual-reconstruction pipeline.
//!
//! An XLI payload is a sequence of independent chunks, each an 8-byte header followed
//! by an LZW-compressed body (see `crate::lzw`). Decoding a chunk yields one lead's
//! worth of `i16` samples after a second-order predictor pass undoes the delta coding
//! the encoder applied.

use crate::error::{Error, Result};
use crate::lzw::Lzw;

const CHUNK_HEADER_LEN: usize = 8;

/// Bounds on untrusted input this decoder will honor before giving up, per the
/// "pathological input" concern noted for chunked formats with attacker-controlled
/// size fields.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Largest declared XLI chunk body size, in bytes, this decoder will trust.
    pub max_chunk_size: usize,
    /// Largest total decompressed payload, across all chunks, this decoder will
    /// accumulate before giving up.
    pub max_total_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_chunk_size: 64 * 1024 * 1024,
            max_total_size: 256 * 1024 * 1024,
        }
    }
}

/// Decodes every XLI chunk in `data`, returning one `i16` vector per chunk in the order
/// they appear in the stream.
pub fn decode_chunks(data: &[u8], limits: &Limits) -> Result<Vec<Vec<i16>>> {
    let mut chunks = Vec::new();
    let mut offset = 0usize;
    let mut total_decoded = 0usize;

    while offset < data.len() {
        if data.len() - offset < CHUNK_HEADER_LEN {
            return Err(Error::DecodeError(format!(
                "XLI chunk header truncated at offset {}",
                offset
            )));
        }

        let header = &data[offset..offset + CHUNK_HEADER_LEN];
        let size = i32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let start = i16::from_le_bytes([header[6], header[7]]);
        offset += CHUNK_HEADER_LEN;

        if size < 0 || size as usize > limits.max_chunk_size {
            return Err(Error::DecodeError(format!(
                "XLI chunk declared an implausible size of {}",
                size
            )));
        }
        let size = size as usize;

        if data.len() - offset < size {
            return Err(Error::DecodeError(format!(
                "XLI chunk body truncated: declared {} bytes, {} remain",
                size,
                data.len() - offset
            )));
        }

        let body = &data[offset..offset + size];
        offset += size;

        log::trace!(
            "decoding XLI chunk at offset {}: {} compressed bytes, start={}",
            offset - size - CHUNK_HEADER_LEN,
            size,
            start
        );

        let mut buf: Vec<u8> = Lzw::new(body, 10).collect();
        if buf.len() % 2 == 1 {
            buf.push(0);
        }

        total_decoded += buf.len();
        if total_decoded > limits.max_total_size {
            return Err(Error::DecodeError(
                "XLI payload exceeded the configured maximum decoded size".into(),
            ));
        }

        let unpacked = unpack(&buf);
        let deltas = reconstruct(unpacked, start);
        chunks.push(deltas);
    }

    Ok(chunks)
}

/// Splits a byte buffer into `M = len / 2` signed 16-bit samples, where the first half
/// holds high bytes and the second half holds the matching low bytes (two interleaved
/// byte planes, clustered so the preceding LZW stage can exploit their low entropy).
fn unpack(buf: &[u8]) -> Vec<i16> {
    let m = buf.len() / 2;
    let mut unpacked = Vec::with_capacity(m);
    for i in 0..m {
        let hi = buf[i] as u16;
        let lo = buf[m + i] as u16;
        unpacked.push(((hi << 8) | lo) as i16);
    }
    unpacked
}

/// Undoes the second-order linear prediction the encoder applied, in place.
///
/// `deltas[0]` and `deltas[1]` are returned verbatim (raw unpacked values); from index 2
/// onward each slot holds the *previous* iteration's predicted value, while the just-read
/// residual is carried over to bias the next prediction. This asymmetry is intentional:
/// reproducing it exactly is what makes the reconstruction match the encoder.
fn reconstruct(mut deltas: Vec<i16>, start: i16) -> Vec<i16> {
    let m = deltas.len();
    if m < 2 {
        return deltas;
    }

    let mut x = deltas[0];
    let mut y = deltas[1];
    let mut last = start;

    for i in 2..m {
        let z = (y as i32 + y as i32 - x as i32 - last as i32) as i16;
        last = (deltas[i] as i32 - 64) as i16;
        deltas[i] = z;
        x = y;
        y = z;
    }

    deltas
}
