/// Bit layout used by one cache level to split a 32-bit address into tag, set index and offset
///
/// All sizes are assumed to be non-zero powers of two. Validation happens once, when the
/// configuration is built, so the layout never re-checks them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressLayout {
    offset_bits: u32,
    index_bits: u32,
    num_sets: u32,
}

/// An address split into its fields for a particular [`AddressLayout`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedAddress {
    pub tag: u32,
    pub index: u32,
    pub offset: u32,
}

impl AddressLayout {
    /// Creates the layout for a level
    ///
    /// # Arguments
    ///
    /// * `line_size`: Bytes per line
    /// * `line_count`: Lines in the level
    /// * `associativity`: Lines per set. Direct mapped caches use 1, fully associative caches use
    /// `line_count`
    ///
    /// returns: AddressLayout
    ///
    /// # Examples
    ///
    /// ```
    /// use hiercache::address::AddressLayout;
    /// let layout = AddressLayout::new(16, 8, 2);
    /// assert_eq!(layout.num_sets(), 4);
    /// let decoded = layout.decode(0x0000_1234);
    /// assert_eq!((decoded.tag, decoded.index, decoded.offset), (0x48, 3, 4));
    /// ```
    pub fn new(line_size: u32, line_count: u32, associativity: u32) -> Self {
        let num_sets = line_count / associativity;
        Self {
            offset_bits: line_size.trailing_zeros(),
            index_bits: num_sets.trailing_zeros(),
            num_sets,
        }
    }

    pub fn decode(&self, address: u32) -> DecodedAddress {
        DecodedAddress {
            // A single set spanning the whole address space leaves no tag bits
            tag: address.checked_shr(self.offset_bits + self.index_bits).unwrap_or(0),
            index: (address >> self.offset_bits) & (self.num_sets - 1),
            offset: address & (self.line_size() - 1),
        }
    }

    /// Rebuilds the address of the first byte of the line identified by `tag` and `index`
    pub fn line_address(&self, tag: u32, index: u32) -> u32 {
        tag.checked_shl(self.offset_bits + self.index_bits).unwrap_or(0) | (index << self.offset_bits)
    }

    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    pub fn index_bits(&self) -> u32 {
        self.index_bits
    }

    pub fn num_sets(&self) -> u32 {
        self.num_sets
    }

    pub fn line_size(&self) -> u32 {
        1 << self.offset_bits
    }
}
