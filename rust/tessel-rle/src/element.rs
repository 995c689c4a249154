use crate::segment::SEGMENT_SIZE;
use crate::var_part::VAR_OFFSET_SIZE;

/// Physical layout of the values of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Flat array of `size`-byte records.
    Fixed(u32),
    /// Bit-packed booleans, eight values per byte.
    Boolean,
    /// 4-byte offsets into a variable part of self-describing datums.
    Variable,
}

impl ElementKind {
    /// Element kind described by the header fields of an encoded payload.
    pub fn from_header(element_size: u64, is_boolean: bool) -> Option<ElementKind> {
        match (element_size, is_boolean) {
            (_, true) => Some(ElementKind::Boolean),
            (0, false) => Some(ElementKind::Variable),
            (size, false) => u32::try_from(size).ok().map(ElementKind::Fixed),
        }
    }

    /// Element size as written to the header: zero for variable-size elements.
    pub fn element_size(&self) -> u64 {
        match self {
            ElementKind::Fixed(size) => *size as u64,
            ElementKind::Boolean => 1,
            ElementKind::Variable => 0,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, ElementKind::Boolean)
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, ElementKind::Variable)
    }

    /// Size in bytes of one entry of the fixed part of the value buffer.
    pub fn slot_size(&self) -> usize {
        match self {
            ElementKind::Fixed(size) => *size as usize,
            ElementKind::Boolean => 1,
            ElementKind::Variable => VAR_OFFSET_SIZE,
        }
    }

    /// Number of repeated values after which a literal tail is turned into a run segment.
    ///
    /// This is the break-even point where one extra segment record costs less than the
    /// repeated values it replaces.
    pub fn max_run_len(&self) -> usize {
        max_run_len(self.slot_size())
    }
}

/// Run conversion threshold for values of `slot_size` bytes.
#[inline]
pub fn max_run_len(slot_size: usize) -> usize {
    SEGMENT_SIZE / slot_size.max(1) + 1
}
