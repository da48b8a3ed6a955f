use std::fmt;
use crate::cache::{CacheLevel, LineRef, Probe};
use crate::config::{CacheConfiguration, LEVEL_NAMES, MAX_LEVELS};
use crate::memory::{MainMemory, WORD_BYTES};

/// Where a request was satisfied
///
/// Ordered by distance from the requester, so the maximum of several line accesses is the deepest
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServedBy {
    /// Hit in the given level, 1 being nearest to the requester
    Cache(u8),
    Memory,
}

impl ServedBy {
    /// The level that hit, or 0 when the request went to memory
    pub fn hit_level(&self) -> u8 {
        match self {
            ServedBy::Cache(level) => *level,
            ServedBy::Memory => 0,
        }
    }
}

impl fmt::Display for ServedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServedBy::Cache(level) => write!(f, "L{level} hit"),
            ServedBy::Memory => write!(f, "miss"),
        }
    }
}

/// Where a request was served and what it cost
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Access {
    pub served_by: ServedBy,
    pub latency: u64,
}

/// The levels holding a line once one line access completes
struct LinePath {
    served_by: ServedBy,
    latency: u64,
    /// Slot of the line in every level from the nearest up to the one that hit. All of them hold
    /// the current contents of the line
    slots: [Option<LineRef>; MAX_LEVELS],
}

/// An inclusive hierarchy of 1 to 3 levels in front of main memory
///
/// Levels are probed from the nearest outwards and the first hit ends the lookup, so deeper
/// levels are never charged for a request a closer level can serve. After a hit at level `k` the
/// line is installed in every level before `k`; after a miss everywhere it is fetched from memory
/// and installed in every level. Writes allocate on a miss and are written back: a write lands in
/// every level on its path, and a dirty victim is passed to the nearest deeper level holding the
/// line, or to memory.
///
/// The latency of a line access is the sum of the latencies of the levels probed, plus the memory
/// latency on a full miss. Write backs are not charged.
///
/// A word that straddles a line boundary is handled as one access per line
#[derive(Debug, Clone)]
pub struct CacheHierarchy {
    levels: Vec<CacheLevel>,
    memory: MainMemory,
    memory_latency: u32,
    line_size: u32,
    write_backs: u64,
}

impl CacheHierarchy {
    pub fn new(config: &CacheConfiguration) -> Self {
        let levels = config
            .levels()
            .iter()
            .zip(LEVEL_NAMES)
            .map(|(level, name)| {
                CacheLevel::new(name, config.line_size(), level.line_count, level.associativity, level.latency)
            })
            .collect();
        Self {
            levels,
            memory: MainMemory::new(),
            memory_latency: config.memory_latency(),
            line_size: config.line_size(),
            write_backs: 0,
        }
    }

    /// Reads the little endian word at `address`
    pub fn read(&mut self, address: u32) -> (u32, Access) {
        let mut word = [0u8; WORD_BYTES];
        let access = self.access_word(address, &mut word, false);
        (u32::from_le_bytes(word), access)
    }

    /// Writes `value` as a little endian word at `address`
    pub fn write(&mut self, address: u32, value: u32) -> Access {
        let mut word = value.to_le_bytes();
        self.access_word(address, &mut word, true)
    }

    pub fn levels(&self) -> &[CacheLevel] {
        &self.levels
    }

    pub fn memory(&self) -> &MainMemory {
        &self.memory
    }

    /// Direct access to the backing store, bypassing the caches. Used to seed memory contents
    pub fn memory_mut(&mut self) -> &mut MainMemory {
        &mut self.memory
    }

    /// Dirty lines evicted from any level so far
    pub fn write_backs(&self) -> u64 {
        self.write_backs
    }

    /// Splits a word access into line accesses, copying each span out of, or into, the line as
    /// soon as its access completes
    ///
    /// A later span can evict the line of an earlier one, so spans are never deferred. Reads only
    /// need the level 1 copy, writes update every copy on the path so no level on it is left
    /// holding stale data
    fn access_word(&mut self, address: u32, word: &mut [u8; WORD_BYTES], write: bool) -> Access {
        let line_size = self.line_size as usize;
        let mut served_by = ServedBy::Cache(1);
        let mut latency = 0;
        let mut done = 0;
        while done < WORD_BYTES {
            let current = address.wrapping_add(done as u32);
            let offset = (current & (self.line_size - 1)) as usize;
            let len = (line_size - offset).min(WORD_BYTES - done);
            let path = self.access_line(current, write);
            served_by = served_by.max(path.served_by);
            latency += path.latency;
            let span = &mut word[done..done + len];
            if write {
                for (level, line) in self.levels.iter_mut().zip(path.slots) {
                    if let Some(line) = line {
                        level.write_bytes(line, offset, span);
                    }
                }
            } else if let Some(line) = path.slots[0] {
                self.levels[0].read_bytes(line, offset, span);
            }
            done += len;
        }
        Access { served_by, latency }
    }

    /// Runs the lookup and fill protocol for the line containing `address`
    ///
    /// On return the line is present in level 1
    fn access_line(&mut self, address: u32, write: bool) -> LinePath {
        let mut slots = [None; MAX_LEVELS];
        let mut latency = 0;
        let mut hit = None;
        for (i, level) in self.levels.iter_mut().enumerate() {
            latency += level.latency() as u64;
            let decoded = level.decode(address);
            if let Probe::Hit(line) = level.probe(decoded.tag, decoded.index) {
                if write {
                    level.mark_dirty(line);
                }
                slots[i] = Some(line);
                hit = Some((i, line));
                break;
            }
        }

        let line_address = address & !(self.line_size - 1);
        let mut data = vec![0u8; self.line_size as usize];
        let (served_by, fill_to) = match hit {
            Some((i, line)) => {
                data.copy_from_slice(self.levels[i].line_data(line));
                (ServedBy::Cache(i as u8 + 1), i)
            }
            None => {
                latency += self.memory_latency as u64;
                self.memory.read_line(line_address, &mut data);
                (ServedBy::Memory, self.levels.len())
            }
        };

        // Fill from the data source inwards
        for i in (0..fill_to).rev() {
            let decoded = self.levels[i].decode(address);
            let (line, evicted) = self.levels[i].install(decoded.tag, decoded.index, write, &data);
            slots[i] = Some(line);
            if let Some(evicted) = evicted {
                log::trace!(
                    "{} evicted line 0x{:08x} (dirty: {})",
                    self.levels[i].name(),
                    evicted.address,
                    evicted.dirty
                );
                if evicted.dirty {
                    self.write_back(i + 1, evicted.address, &evicted.data);
                }
            }
        }

        LinePath {
            served_by,
            latency,
            slots,
        }
    }

    /// Hands a dirty line to the nearest level from `from` outwards that holds it, or to memory
    fn write_back(&mut self, from: usize, address: u32, data: &[u8]) {
        self.write_backs += 1;
        for level in self.levels.iter_mut().skip(from) {
            if level.absorb_write_back(address, data) {
                log::trace!("write back of line 0x{address:08x} absorbed by {}", level.name());
                return;
            }
        }
        log::trace!("write back of line 0x{address:08x} to memory");
        self.memory.write_line(address, data);
    }
}
