//! A classic growing-dictionary LZW decoder, specialized to the fixed 10-bit code width
//! this format uses.
//!
//! The dictionary starts with the 256 single-byte strings and grows by one entry per
//! decoded code until it hits `max_code`. Unlike GIF/TIFF-style LZW there is no clear
//! code: running past `max_code`, or encountering an invariant violation, simply stops
//! the stream (see `Lzw::next`).

use std::collections::HashMap;

use crate::bitstream::BitReader;

/// Decodes an LZW byte stream, code by code, from a compressed body.
pub struct Lzw<'a> {
    reader: BitReader<'a>,
    bits: u32,
    max_code: u16,
    next_code: u16,
    strings: HashMap<u16, Vec<u8>>,
    previous: Vec<u8>,
    current: Vec<u8>,
    position: usize,
    done: bool,
}

impl<'a> Lzw<'a> {
    /// `bits` is the fixed code width; this format always uses 10.
    pub fn new(buffer: &'a [u8], bits: u32) -> Self {
        let max_code = ((1u32 << bits) - 2) as u16;
        let strings = (0u16..=255).map(|code| (code, vec![code as u8])).collect();

        Self {
            reader: BitReader::new(buffer),
            bits,
            max_code,
            next_code: 256,
            strings,
            previous: Vec::new(),
            current: Vec::new(),
            position: 0,
            done: false,
        }
    }

    /// Reads and decodes the next dictionary string, or returns an empty vector once
    /// the stream has ended (end of input, or a code past `max_code`).
    fn read_next_string(&mut self) -> Vec<u8> {
        let code = match self.reader.read_codepoint(self.bits) {
            Some(code) if code <= self.max_code => code,
            _ => return Vec::new(),
        };

        let data = if let Some(existing) = self.strings.get(&code) {
            existing.clone()
        } else if self.previous.is_empty() {
            // A self-reference can only be valid once something has already been
            // emitted; seeing one as the very first code is an invariant violation,
            // treated the same tolerant-stop way as a code past `max_code`.
            return Vec::new();
        } else {
            // Classic LZW self-reference: the encoder emitted a code it had just
            // defined but we haven't recorded yet. Only valid when code == next_code.
            let mut data = self.previous.clone();
            let first = self.previous[0];
            data.push(first);
            self.strings.insert(code, data.clone());
            data
        };

        if !self.previous.is_empty() && self.next_code <= self.max_code {
            let mut next = self.previous.clone();
            next.push(data[0]);
            self.strings.insert(self.next_code, next);
            self.next_code += 1;
        }

        self.previous = data.clone();
        data
    }
}

impl<'a> Iterator for Lzw<'a> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.done {
            return None;
        }

        if self.position == self.current.len() {
            self.current = self.read_next_string();
            self.position = 0;
        }

        if self.current.is_empty() {
            self.done = true;
            return None;
        }

        let byte = self.current[self.position];
        self.position += 1;
        Some(byte)
    }
}
