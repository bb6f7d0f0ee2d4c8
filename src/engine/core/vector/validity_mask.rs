/// Per-row validity bitmap, 1 = valid. A mask without materialized words
/// means every row is valid, which lets hot loops skip null checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidityMask {
    words: Option<Vec<u64>>,
    capacity: usize,
}

const BITS: usize = 64;

impl ValidityMask {
    pub fn new(capacity: usize) -> Self {
        Self {
            words: None,
            capacity,
        }
    }

    /// True when no bitmap has been materialized. A materialized bitmap with
    /// every bit set still reports `false`; callers fall back to per-row checks.
    #[inline]
    pub fn all_valid(&self) -> bool {
        self.words.is_none()
    }

    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        match &self.words {
            None => true,
            Some(words) => (words[idx / BITS] >> (idx % BITS)) & 1 == 1,
        }
    }

    #[inline]
    pub fn is_null(&self, idx: usize) -> bool {
        !self.is_valid(idx)
    }

    pub fn set_invalid(&mut self, idx: usize) {
        let words = self.materialize();
        words[idx / BITS] &= !(1u64 << (idx % BITS));
    }

    pub fn set_valid(&mut self, idx: usize) {
        if let Some(words) = self.words.as_mut() {
            words[idx / BITS] |= 1u64 << (idx % BITS);
        }
    }

    #[inline]
    pub fn set(&mut self, idx: usize, valid: bool) {
        if valid {
            self.set_valid(idx)
        } else {
            self.set_invalid(idx)
        }
    }

    /// Number of invalid rows among the first `count`.
    pub fn count_invalid(&self, count: usize) -> usize {
        match &self.words {
            None => 0,
            Some(_) => (0..count).filter(|&i| !self.is_valid(i)).count(),
        }
    }

    pub fn reset(&mut self) {
        self.words = None;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn resize(&mut self, capacity: usize) {
        if let Some(words) = self.words.as_mut() {
            words.resize(capacity.div_ceil(BITS).max(1), u64::MAX);
        }
        self.capacity = capacity;
    }

    /// Packs the first `count` rows into a byte bitmap where a set bit marks
    /// a NULL (the on-disk convention of column blocks).
    pub fn to_null_bitmap(&self, count: usize) -> Vec<u8> {
        let mut out = vec![0u8; count.div_ceil(8)];
        for i in 0..count {
            if !self.is_valid(i) {
                out[i / 8] |= 1 << (i % 8);
            }
        }
        out
    }

    pub fn from_null_bitmap(bits: &[u8], count: usize, capacity: usize) -> Self {
        let mut mask = ValidityMask::new(capacity.max(count));
        for i in 0..count {
            if bits[i / 8] & (1 << (i % 8)) != 0 {
                mask.set_invalid(i);
            }
        }
        mask
    }

    fn materialize(&mut self) -> &mut Vec<u64> {
        let words = self.capacity.div_ceil(BITS).max(1);
        self.words.get_or_insert_with(|| vec![u64::MAX; words])
    }
}
