use std::fmt;

use tessel_common::Result;
use tessel_rle::MissingReason;

use crate::{config::EncodingKind, datum::Datum, encoding::Encoding, presence::Presence};

/// Uncompressed storage: one array slot per cell, missing cells hold `T::default()`.
#[derive(Debug, Clone)]
pub struct IdentityEncoding<T> {
    values: Vec<T>,
    presence: Presence,
    finalized: bool,
}

impl<T> IdentityEncoding<T> {
    pub fn new() -> IdentityEncoding<T> {
        IdentityEncoding {
            values: Vec::new(),
            presence: Presence::default(),
            finalized: false,
        }
    }

    pub fn with_capacity(capacity: usize) -> IdentityEncoding<T> {
        IdentityEncoding {
            values: Vec::with_capacity(capacity),
            presence: Presence::default(),
            finalized: false,
        }
    }

    /// Stored values, placeholders of missing cells included.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    fn check_open(&self) {
        assert!(!self.finalized, "push into a finalized encoder");
    }
}

impl<T> Default for IdentityEncoding<T> {
    fn default() -> Self {
        IdentityEncoding::new()
    }
}

impl<T> Encoding<T> for IdentityEncoding<T>
where
    T: Clone + Default + fmt::Debug + Send,
{
    fn kind(&self) -> EncodingKind {
        EncodingKind::Identity
    }

    fn len(&self) -> u64 {
        self.values.len() as u64
    }

    fn push(&mut self, value: T) -> Result<()> {
        self.check_open();
        self.values.push(value);
        self.presence.push_non_null();
        Ok(())
    }

    fn push_null(&mut self, reason: MissingReason) -> Result<()> {
        self.check_open();
        self.values.push(T::default());
        self.presence.push_null(reason);
        Ok(())
    }

    fn get(&self, index: u64) -> Datum<T> {
        let index = index as usize;
        Datum {
            value: self.values[index].clone(),
            missing: self.presence.missing_reason(index),
        }
    }

    fn reserve(&mut self, additional: usize) {
        self.values.reserve(additional);
    }

    fn finalize(&mut self) {
        self.finalized = true;
    }

    fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn clear(&mut self) {
        self.values.clear();
        self.presence.clear();
        self.finalized = false;
    }

    fn dump(&self, sink: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            sink,
            "identity: {} cells, {} missing",
            self.values.len(),
            self.presence.count_nulls()
        )?;
        for (i, value) in self.values.iter().enumerate() {
            match self.presence.missing_reason(i) {
                Some(reason) => writeln!(sink, "  {i}: null({reason})")?,
                None => writeln!(sink, "  {i}: {value:?}")?,
            }
        }
        Ok(())
    }
}
