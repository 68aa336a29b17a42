//! Byte-level reading used by the mesh parsers. Reads past the end of the
//! buffer return `None` instead of panicking so truncated files can be
//! reported as errors.

#[rustfmt::skip]
pub trait Deserializer {
    fn pos(&self) -> usize;
    fn size(&self) -> usize;
    fn jump_to(&mut self, pos: usize);
    /// Reads up to `length` bytes, returning fewer at the end of the buffer.
    fn read_bytes(&mut self, length: usize) -> &[u8];

    fn is_eof(&self) -> bool { self.pos() >= self.size() }
    fn remaining(&self) -> usize { self.size().saturating_sub(self.pos()) }

    fn advance_by(&mut self, amount: usize) -> Option<()> {
        (self.remaining() >= amount).then(|| self.jump_to(self.pos() + amount))
    }

    fn read_array<const LENGTH: usize>(&mut self) -> Option<[u8; LENGTH]> {
        self.read_bytes(LENGTH).try_into().ok()
    }

    fn read_u16_le(&mut self) -> Option<u16> { self.read_array().map(u16::from_le_bytes) }
    fn read_u32_le(&mut self) -> Option<u32> { self.read_array().map(u32::from_le_bytes) }
    fn read_f32_le(&mut self) -> Option<f32> { self.read_array().map(f32::from_le_bytes) }
}

pub struct SliceDeserializer<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> SliceDeserializer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buffer: data,
            offset: 0,
        }
    }
}

impl Deserializer for SliceDeserializer<'_> {
    fn pos(&self) -> usize {
        self.offset
    }

    fn size(&self) -> usize {
        self.buffer.len()
    }

    fn jump_to(&mut self, pos: usize) {
        self.offset = pos.min(self.buffer.len());
    }

    fn read_bytes(&mut self, length: usize) -> &[u8] {
        let end = (self.offset + length).min(self.buffer.len());
        let value = &self.buffer[self.offset..end];
        self.offset = end;
        value
    }
}
