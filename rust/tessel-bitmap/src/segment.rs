use bytemuck::{Pod, Zeroable};
use tessel_rle::Position;

/// Size of a packed bitmap segment in bytes.
pub const BITMAP_SEGMENT_SIZE: usize = std::mem::size_of::<BitmapSegment>();

/// A stretch of `length` populated logical positions starting at `logical_position`, whose
/// values occupy the dense positions starting at `physical_position`.
///
/// Stored as three little-endian u64 values: logical position, physical position, length.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct BitmapSegment {
    logical: [u8; 8],
    physical: [u8; 8],
    length: [u8; 8],
}

impl BitmapSegment {
    #[inline]
    pub fn new(logical: Position, physical: Position, length: u64) -> BitmapSegment {
        BitmapSegment {
            logical: logical.to_le_bytes(),
            physical: physical.to_le_bytes(),
            length: length.to_le_bytes(),
        }
    }

    #[inline]
    pub fn logical_position(&self) -> Position {
        u64::from_le_bytes(self.logical)
    }

    #[inline]
    pub fn physical_position(&self) -> Position {
        u64::from_le_bytes(self.physical)
    }

    #[inline]
    pub fn length(&self) -> u64 {
        u64::from_le_bytes(self.length)
    }

    /// Logical position just past the segment.
    #[inline]
    pub fn logical_end(&self) -> Position {
        self.logical_position() + self.length()
    }

    /// Physical position just past the segment.
    #[inline]
    pub fn physical_end(&self) -> Position {
        self.physical_position() + self.length()
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        self.logical_position() <= pos && pos < self.logical_end()
    }

    #[inline]
    pub(crate) fn set_length(&mut self, length: u64) {
        self.length = length.to_le_bytes();
    }
}

impl std::fmt::Debug for BitmapSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{},{},{}]",
            self.logical_position(),
            self.physical_position(),
            self.length()
        )
    }
}
