use tessel_rle::MissingReason;

/// A cell read back from a tile: its value and, for a missing cell, the reason it is missing.
///
/// Missing cells carry a placeholder value, the type's default for scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct Datum<T> {
    pub value: T,
    pub missing: Option<MissingReason>,
}

impl<T> Datum<T> {
    #[inline]
    pub fn present(value: T) -> Datum<T> {
        Datum {
            value,
            missing: None,
        }
    }

    #[inline]
    pub fn missing(reason: MissingReason) -> Datum<T>
    where
        T: Default,
    {
        Datum {
            value: T::default(),
            missing: Some(reason),
        }
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        self.missing.is_some()
    }

    /// The value of a present cell.
    #[inline]
    pub fn into_option(self) -> Option<T> {
        match self.missing {
            None => Some(self.value),
            Some(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Datum<U> {
        Datum {
            value: f(self.value),
            missing: self.missing,
        }
    }
}

impl<T> From<T> for Datum<T> {
    fn from(value: T) -> Self {
        Datum::present(value)
    }
}
