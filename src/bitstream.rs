//! A big-endian, MSB-first bit reader over a fixed-width code stream.
//!
//! This is the bottom layer of the XLI decompressor: the LZW dictionary decoder
//! (`crate::lzw`) pulls fixed-width codepoints from here one at a time. The register is
//! refilled a byte at a time, up to three bytes per call, so that a `bits`-wide code is
//! always available before it is extracted.

/// Reads fixed-width codepoints (10 bits in this format) MSB-first from a byte slice.
pub struct BitReader<'a> {
    buffer: &'a [u8],
    offset: usize,
    bit_buffer: u32,
    bit_count: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            offset: 0,
            bit_buffer: 0,
            bit_count: 0,
        }
    }

    /// Refills `bit_buffer` with whole bytes until `bit_count > 24`. Returns `false` if
    /// the loop had to stop because the input ran out while still `<= 24` — i.e. the
    /// buffer is exhausted and a further refill attempt cannot be trusted, even if
    /// `bit_count` already covers the next code width. This mirrors the reference
    /// decoder's `while bit_count <= 24: ... else: return -1` loop exactly: it always
    /// attempts one more byte before ever emitting a code, so an input that runs dry
    /// inside that window yields end-of-input on its very next `read_codepoint` call.
    fn refill(&mut self) -> bool {
        while self.bit_count <= 24 {
            if self.offset >= self.buffer.len() {
                return false;
            }
            let next_byte = self.buffer[self.offset] as u32;
            self.offset += 1;
            self.bit_buffer |= (next_byte & 0xFF) << (24 - self.bit_count);
            self.bit_count += 8;
        }
        true
    }

    /// Reads the next `bits`-wide codepoint, or `None` at end of input.
    ///
    /// `bits` must be in `1..=16`. Trailing bits that don't add up to a full code are
    /// silently discarded, matching the source decoder's tolerant-stop behavior.
    pub fn read_codepoint(&mut self, bits: u32) -> Option<u16> {
        debug_assert!(bits >= 1 && bits <= 16);

        if !self.refill() {
            return None;
        }

        let code = ((self.bit_buffer >> (32 - bits)) & 0xFFFF) as u16;
        self.bit_buffer <<= bits;
        self.bit_count -= bits;
        Some(code)
    }
}
