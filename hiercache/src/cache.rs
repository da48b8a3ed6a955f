use crate::address::{AddressLayout, DecodedAddress};

/// Metadata for a single line slot
///
/// The line's bytes live in the owning level's contiguous data buffer, so a slot stays a small
/// fixed size record and a set is one contiguous run of slots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheLine {
    pub valid: bool,
    pub dirty: bool,
    pub tag: u32,
    /// Logical time of the last install or hit
    pub last_used: u64,
}

/// Handle to a slot returned by a probe or an install. Only valid until the next install into the
/// same level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRef(usize);

/// Outcome of a single level lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Hit(LineRef),
    Miss,
}

/// A valid line pushed out of its set to make room for a new one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictedLine {
    /// Address of the first byte of the evicted line
    pub address: u32,
    pub tag: u32,
    pub dirty: bool,
    pub data: Vec<u8>,
}

/// Hit and miss counters for one level, counted per probe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelStats {
    pub hits: u64,
    pub misses: u64,
}

/// One level of the hierarchy
///
/// Direct mapped levels are simply levels with an associativity of 1, so there is a single
/// implementation rather than one per mapping strategy. Set `s` occupies slots
/// `s * associativity .. (s + 1) * associativity`, and only that range is ever searched.
///
/// Replacement is least recently used. Like a timestamp based LRU, each line records the value of
/// a logical clock which ticks on every install and hit, so finding a victim is a single scan over
/// the set with no list maintenance. Ties can only happen between lines that were never used, and
/// are broken by the lowest slot.
///
/// The level has no knowledge of the levels around it; everything it does is confined to the
/// addressed set
#[derive(Debug, Clone)]
pub struct CacheLevel {
    name: String,
    latency: u32,
    layout: AddressLayout,
    associativity: usize,
    line_size: usize,
    lines: Vec<CacheLine>,
    data: Vec<u8>,
    time: u64,
    stats: LevelStats,
}

impl CacheLevel {
    pub fn new(name: impl Into<String>, line_size: u32, line_count: u32, associativity: u32, latency: u32) -> Self {
        Self {
            name: name.into(),
            latency,
            layout: AddressLayout::new(line_size, line_count, associativity),
            associativity: associativity as usize,
            line_size: line_size as usize,
            lines: vec![CacheLine::default(); line_count as usize],
            data: vec![0; line_count as usize * line_size as usize],
            time: 0,
            stats: LevelStats::default(),
        }
    }

    pub fn decode(&self, address: u32) -> DecodedAddress {
        self.layout.decode(address)
    }

    /// Looks for `tag` in set `index`, counting the hit or miss
    ///
    /// A hit makes the line the most recently used in its set
    pub fn probe(&mut self, tag: u32, index: u32) -> Probe {
        match self.find(tag, index) {
            Some(line) => {
                self.stats.hits += 1;
                self.touch(line.0);
                Probe::Hit(line)
            }
            None => {
                self.stats.misses += 1;
                Probe::Miss
            }
        }
    }

    /// Looks for `tag` in set `index` without updating recency or statistics
    pub fn find(&self, tag: u32, index: u32) -> Option<LineRef> {
        let set = self.set_range(index);
        let lower = set.start;
        self.lines[set]
            .iter()
            .position(|line| line.valid && line.tag == tag)
            .map(|slot| LineRef(lower + slot))
    }

    /// Installs a line after a miss at this level
    ///
    /// Fills the first invalid slot of the set if there is one, otherwise replaces the least
    /// recently used line and returns it so the caller can write it back if it is dirty
    ///
    /// # Arguments
    ///
    /// * `tag`, `index`: The decoded line to install. Must not already be present in the set
    /// * `dirty`: Initial dirty state of the new line
    /// * `data`: The full contents of the line, `line_size` bytes
    ///
    /// returns: (LineRef, Option<EvictedLine>)
    pub fn install(&mut self, tag: u32, index: u32, dirty: bool, data: &[u8]) -> (LineRef, Option<EvictedLine>) {
        debug_assert!(self.find(tag, index).is_none());
        debug_assert_eq!(data.len(), self.line_size);
        let slot = self.victim_slot(index);
        let previous = self.lines[slot];
        let evicted = previous.valid.then(|| EvictedLine {
            address: self.layout.line_address(previous.tag, index),
            tag: previous.tag,
            dirty: previous.dirty,
            data: self.slot_data(slot).to_vec(),
        });
        self.lines[slot] = CacheLine {
            valid: true,
            dirty,
            tag,
            last_used: 0,
        };
        self.touch(slot);
        self.slot_data_mut(slot).copy_from_slice(data);
        (LineRef(slot), evicted)
    }

    /// Marks a line as modified, used on the write hit path
    pub fn mark_dirty(&mut self, line: LineRef) {
        self.lines[line.0].dirty = true;
    }

    /// Accepts a written back line from a closer level if this level holds it
    ///
    /// Recency is left untouched as write backs are background traffic. Returns false when the
    /// line is not present, in which case the caller passes it further out
    pub fn absorb_write_back(&mut self, address: u32, data: &[u8]) -> bool {
        let decoded = self.layout.decode(address);
        match self.find(decoded.tag, decoded.index) {
            Some(line) => {
                self.lines[line.0].dirty = true;
                self.slot_data_mut(line.0).copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    pub fn line(&self, line: LineRef) -> &CacheLine {
        &self.lines[line.0]
    }

    pub fn line_data(&self, line: LineRef) -> &[u8] {
        self.slot_data(line.0)
    }

    /// Copies bytes out of a line, starting at `offset` within it
    pub fn read_bytes(&self, line: LineRef, offset: usize, buf: &mut [u8]) {
        buf.copy_from_slice(&self.slot_data(line.0)[offset..offset + buf.len()]);
    }

    /// Copies bytes into a line, starting at `offset` within it. Does not change the dirty bit
    pub fn write_bytes(&mut self, line: LineRef, offset: usize, bytes: &[u8]) {
        self.slot_data_mut(line.0)[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn latency(&self) -> u32 {
        self.latency
    }

    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn layout(&self) -> &AddressLayout {
        &self.layout
    }

    pub fn stats(&self) -> LevelStats {
        self.stats
    }

    /// Lines of set `index`, in slot order
    pub fn set(&self, index: u32) -> &[CacheLine] {
        &self.lines[self.set_range(index)]
    }

    /// Gets the number of lines never filled. Useful for analysing cache performance or debugging
    pub fn uninitialised_line_count(&self) -> usize {
        self.lines.iter().filter(|line| !line.valid).count()
    }

    fn set_range(&self, index: u32) -> std::ops::Range<usize> {
        let lower = index as usize * self.associativity;
        lower..lower + self.associativity
    }

    fn victim_slot(&self, index: u32) -> usize {
        let set = self.set_range(index);
        let lower = set.start;
        let lines = &self.lines[set];
        if let Some(free) = lines.iter().position(|line| !line.valid) {
            return lower + free;
        }
        // Manual scan keeps the lowest slot on ties
        let mut min_index = 0;
        let mut min_value = u64::MAX;
        for (slot, line) in lines.iter().enumerate() {
            if line.last_used < min_value {
                min_value = line.last_used;
                min_index = slot;
            }
        }
        lower + min_index
    }

    fn touch(&mut self, slot: usize) {
        self.time += 1;
        self.lines[slot].last_used = self.time;
    }

    fn slot_data(&self, slot: usize) -> &[u8] {
        &self.data[slot * self.line_size..(slot + 1) * self.line_size]
    }

    fn slot_data_mut(&mut self, slot: usize) -> &mut [u8] {
        &mut self.data[slot * self.line_size..(slot + 1) * self.line_size]
    }
}
