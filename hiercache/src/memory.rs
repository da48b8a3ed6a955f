use std::collections::HashMap;

/// Number of bytes moved by a single read or write request
pub const WORD_BYTES: usize = 4;

/// Sparse, byte addressed backing store behind the last cache level
///
/// Only bytes which have been written are stored; everything else reads as 0. Words are little
/// endian and address arithmetic wraps around the 32-bit address space
#[derive(Debug, Default, Clone)]
pub struct MainMemory {
    bytes: HashMap<u32, u8>,
    line_reads: u64,
    line_writes: u64,
}

impl MainMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches a whole line for a fill, counting it as a memory access
    pub fn read_line(&mut self, base: u32, buf: &mut [u8]) {
        self.line_reads += 1;
        self.peek(base, buf);
    }

    /// Accepts a written back line
    pub fn write_line(&mut self, base: u32, data: &[u8]) {
        self.line_writes += 1;
        self.poke(base, data);
    }

    pub fn read_word(&self, address: u32) -> u32 {
        let mut buf = [0u8; WORD_BYTES];
        self.peek(address, &mut buf);
        u32::from_le_bytes(buf)
    }

    pub fn write_word(&mut self, address: u32, value: u32) {
        self.poke(address, &value.to_le_bytes());
    }

    /// Line fetches served so far
    pub fn line_reads(&self) -> u64 {
        self.line_reads
    }

    /// Dirty lines written back so far
    pub fn line_writes(&self) -> u64 {
        self.line_writes
    }

    fn peek(&self, base: u32, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.bytes.get(&base.wrapping_add(i as u32)).copied().unwrap_or(0);
        }
    }

    fn poke(&mut self, base: u32, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            self.bytes.insert(base.wrapping_add(i as u32), *byte);
        }
    }
}
