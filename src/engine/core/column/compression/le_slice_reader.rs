pub const SIZE_U32: usize = 4;
pub const SIZE_U64: usize = 8;

/// Bounds-checked little-endian cursor over a byte slice. Every read
/// returns `None` instead of panicking when the slice is too short.
pub struct LeSliceReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> LeSliceReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn has_bytes(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let v = *self.buf.get(self.pos)?;
        self.pos += 1;
        Some(v)
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.read_bytes(SIZE_U32)?;
        Some(u32::from_le_bytes(bytes.try_into().ok()?))
    }

    pub fn read_u64(&mut self) -> Option<u64> {
        let bytes = self.read_bytes(SIZE_U64)?;
        Some(u64::from_le_bytes(bytes.try_into().ok()?))
    }

    pub fn read_bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        if !self.has_bytes(n) {
            return None;
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Some(out)
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos.min(self.buf.len())..];
        self.pos = self.buf.len();
        out
    }
}
