//! Presence of the cells of an identity-encoded tile.

use tessel_rle::MissingReason;

/// Marks a present cell in [`Presence::Reasons`]. Missing reasons never reach this value.
const PRESENT: u32 = u32::MAX;

/// Tracks which cells are missing and why.
///
/// - `Trivial`: all cells are present, only the count is kept
/// - `Nulls`: all cells are missing for the same reason
/// - `Reasons`: one entry per cell, the missing reason or [`PRESENT`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Trivial(usize),
    Nulls(usize, MissingReason),
    Reasons(Vec<u32>),
}

impl Default for Presence {
    fn default() -> Self {
        Presence::Trivial(0)
    }
}

impl Presence {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Trivial(len) => *len,
            Self::Nulls(len, _) => *len,
            Self::Reasons(reasons) => reasons.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_nulls(&self) -> usize {
        match self {
            Self::Trivial(_) => 0,
            Self::Nulls(len, _) => *len,
            Self::Reasons(reasons) => reasons.iter().filter(|&&r| r != PRESENT).count(),
        }
    }

    #[inline]
    pub fn is_trivial_non_null(&self) -> bool {
        matches!(self, Self::Trivial(_))
    }

    /// Missing reason of the cell at `index`, `None` for a present cell.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn missing_reason(&self, index: usize) -> Option<MissingReason> {
        assert!(index < self.len(), "presence index {index} out of bounds");
        match self {
            Self::Trivial(_) => None,
            Self::Nulls(_, reason) => Some(*reason),
            Self::Reasons(reasons) => Some(reasons[index]).filter(|&r| r != PRESENT),
        }
    }

    pub fn push_non_null(&mut self) {
        match self {
            Self::Trivial(len) => *len += 1,
            Self::Nulls(..) => {
                self.materialize(1);
                self.push_non_null();
            }
            Self::Reasons(reasons) => reasons.push(PRESENT),
        }
    }

    pub fn push_null(&mut self, reason: MissingReason) {
        debug_assert_ne!(reason, PRESENT);
        match self {
            Self::Trivial(0) => *self = Self::Nulls(1, reason),
            Self::Nulls(len, r) if *r == reason => *len += 1,
            Self::Trivial(_) | Self::Nulls(..) => {
                self.materialize(1);
                self.push_null(reason);
            }
            Self::Reasons(reasons) => reasons.push(reason),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::Trivial(0);
    }

    /// Switches to one entry per cell, with room for `additional` more.
    fn materialize(&mut self, additional: usize) {
        let reasons = match self {
            Self::Trivial(len) => {
                let mut reasons = Vec::with_capacity(*len + additional);
                reasons.resize(*len, PRESENT);
                reasons
            }
            Self::Nulls(len, reason) => {
                let mut reasons = Vec::with_capacity(*len + additional);
                reasons.resize(*len, *reason);
                reasons
            }
            Self::Reasons(_) => return,
        };
        *self = Self::Reasons(reasons);
    }
}
