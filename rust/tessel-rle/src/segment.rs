//! The packed segment record shared by every run-length encoded payload.
//!
//! A segment describes one stretch of the logical sequence: either a *run* (every cell holds the
//! same value), a *literal* (every cell holds its own value), or a *null run* (every cell is
//! missing for the same reason). Segments are stored as 12-byte records:
//!
//! | bytes    | content                                                        |
//! |----------|----------------------------------------------------------------|
//! | `0..8`   | little-endian start position                                   |
//! | `8..12`  | little-endian word: data index (bits 0..30), run (30), null (31) |
//!
//! The record has alignment 1, so a slice of segments can be viewed in place inside a foreign
//! byte buffer.

use bytemuck::{Pod, Zeroable};

/// Logical position of a cell within an encoded sequence.
pub type Position = u64;

/// Reason code attached to a missing (null) cell.
pub type MissingReason = u32;

/// Largest value representable in the 30-bit data index field.
pub const MAX_DATA_INDEX: u32 = 0x3FFF_FFFF;

/// Size of a packed segment record in bytes.
pub const SEGMENT_SIZE: usize = std::mem::size_of::<Segment>();

const RUN_BIT: u32 = 1 << 30;
const NULL_BIT: u32 = 1 << 31;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Segment {
    start: [u8; 8],
    word: [u8; 4],
}

impl Segment {
    /// Creates a literal segment whose first value is stored at `data_index`.
    ///
    /// # Panics
    ///
    /// Panics if `data_index` exceeds [`MAX_DATA_INDEX`].
    #[inline]
    pub fn literal(start: Position, data_index: u32) -> Segment {
        Segment::with_flags(start, data_index, false, false)
    }

    /// Creates a run segment whose single value is stored at `data_index`.
    ///
    /// # Panics
    ///
    /// Panics if `data_index` exceeds [`MAX_DATA_INDEX`].
    #[inline]
    pub fn run(start: Position, data_index: u32) -> Segment {
        Segment::with_flags(start, data_index, true, false)
    }

    /// Creates a null run segment carrying the missing `reason`.
    ///
    /// # Panics
    ///
    /// Panics if `reason` exceeds [`MAX_DATA_INDEX`].
    #[inline]
    pub fn null_run(start: Position, reason: MissingReason) -> Segment {
        Segment::with_flags(start, reason, true, true)
    }

    /// Creates the data-free terminal segment placed after the last real segment.
    #[inline]
    pub fn terminal(len: Position) -> Segment {
        Segment::with_flags(len, 0, false, false)
    }

    fn with_flags(start: Position, data_index: u32, is_run: bool, is_null: bool) -> Segment {
        assert!(
            data_index <= MAX_DATA_INDEX,
            "data index {data_index} exceeds 30 bits"
        );
        let mut word = data_index;
        if is_run {
            word |= RUN_BIT;
        }
        if is_null {
            word |= NULL_BIT;
        }
        Segment {
            start: start.to_le_bytes(),
            word: word.to_le_bytes(),
        }
    }

    #[inline]
    fn word(&self) -> u32 {
        u32::from_le_bytes(self.word)
    }

    #[inline]
    pub fn start_position(&self) -> Position {
        u64::from_le_bytes(self.start)
    }

    #[inline]
    pub fn set_start_position(&mut self, start: Position) {
        self.start = start.to_le_bytes();
    }

    /// Index of the first value of this segment in the value buffer. For a null run this is
    /// the missing reason.
    #[inline]
    pub fn data_index(&self) -> u32 {
        self.word() & MAX_DATA_INDEX
    }

    /// # Panics
    ///
    /// Panics if `data_index` exceeds [`MAX_DATA_INDEX`].
    #[inline]
    pub fn set_data_index(&mut self, data_index: u32) {
        assert!(
            data_index <= MAX_DATA_INDEX,
            "data index {data_index} exceeds 30 bits"
        );
        let word = (self.word() & !MAX_DATA_INDEX) | data_index;
        self.word = word.to_le_bytes();
    }

    #[inline]
    pub fn is_run(&self) -> bool {
        self.word() & RUN_BIT != 0
    }

    #[inline]
    pub fn is_literal(&self) -> bool {
        !self.is_run()
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.word() & NULL_BIT != 0
    }

    /// Turns a literal segment into a run segment or back. Null segments are always runs.
    #[inline]
    pub fn set_run(&mut self, is_run: bool) {
        debug_assert!(is_run || !self.is_null());
        let word = if is_run {
            self.word() | RUN_BIT
        } else {
            self.word() & !RUN_BIT
        };
        self.word = word.to_le_bytes();
    }

    /// Missing reason of a null run, `None` for value-carrying segments.
    #[inline]
    pub fn missing_reason(&self) -> Option<MissingReason> {
        self.is_null().then(|| self.data_index())
    }

    /// Number of values this segment consumes from the value buffer given its `len` in cells.
    #[inline]
    pub fn value_count(&self, len: u64) -> u64 {
        if self.is_null() || len == 0 {
            0
        } else if self.is_run() {
            1
        } else {
            len
        }
    }

    /// End of the value range this segment references given its `len` in cells. Null
    /// segments reference no values.
    #[inline]
    pub fn value_end(&self, len: u64) -> u64 {
        if self.is_null() {
            0
        } else {
            self.data_index() as u64 + self.value_count(len)
        }
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match (self.is_null(), self.is_run()) {
            (true, _) => "null",
            (false, true) => "run",
            (false, false) => "literal",
        };
        f.debug_struct("Segment")
            .field("start", &self.start_position())
            .field("kind", &kind)
            .field("data_index", &self.data_index())
            .finish()
    }
}

/// Length in cells of the segment `i` of a segment list that ends with a terminal segment.
#[inline]
pub fn segment_len(segments: &[Segment], i: usize) -> u64 {
    segments[i + 1].start_position() - segments[i].start_position()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_layout() {
        assert_eq!(SEGMENT_SIZE, 12);
        assert_eq!(std::mem::align_of::<Segment>(), 1);

        let s = Segment::run(0x0102_0304_0506_0708, 5);
        let bytes = bytemuck::bytes_of(&s);
        assert_eq!(&bytes[..8], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 5 | 1 << 30);

        let n = Segment::null_run(3, 7);
        let word = u32::from_le_bytes(bytemuck::bytes_of(&n)[8..12].try_into().unwrap());
        assert_eq!(word, 7 | 1 << 30 | 1 << 31);
    }

    #[test]
    fn test_segment_flags() {
        let mut s = Segment::literal(10, 3);
        assert!(s.is_literal());
        assert!(!s.is_null());
        assert_eq!(s.missing_reason(), None);
        s.set_run(true);
        assert!(s.is_run());
        assert_eq!(s.data_index(), 3);
        s.set_data_index(MAX_DATA_INDEX);
        assert_eq!(s.data_index(), MAX_DATA_INDEX);
        assert!(s.is_run());
        assert!(!s.is_null());
        s.set_start_position(42);
        assert_eq!(s.start_position(), 42);

        let n = Segment::null_run(0, 9);
        assert_eq!(n.missing_reason(), Some(9));
        assert!(n.is_run());
    }

    #[test]
    #[should_panic]
    fn test_data_index_overflow() {
        Segment::literal(0, MAX_DATA_INDEX + 1);
    }

    #[test]
    fn test_segment_len() {
        let segs = [
            Segment::literal(0, 0),
            Segment::run(4, 4),
            Segment::terminal(10),
        ];
        assert_eq!(segment_len(&segs, 0), 4);
        assert_eq!(segment_len(&segs, 1), 6);
        assert_eq!(segs[0].value_count(4), 4);
        assert_eq!(segs[1].value_count(6), 1);
        assert_eq!(Segment::null_run(0, 1).value_count(5), 0);
        assert_eq!(segs[1].value_end(6), 5);
        assert_eq!(Segment::null_run(0, 9).value_end(5), 0);
    }
}
