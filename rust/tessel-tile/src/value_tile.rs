use std::fmt;

use tessel_common::Result;
use tessel_rle::{ElementKind, MissingReason, Payload, PayloadBuilder, PayloadView, Value, ValueRef};

use crate::{config::EncodingKind, datum::Datum, encoding::Encoding, tile::Tile};

/// Tile of untyped values: booleans, fixed-size records or variable-size byte strings.
pub type ValueTile = Tile<Value, PayloadEncoding>;

/// Run-length encoded storage of untyped values, laid out as a [`Payload`] of one element
/// kind.
#[derive(Clone)]
pub struct PayloadEncoding {
    builder: PayloadBuilder,
    finalized: bool,
}

impl PayloadEncoding {
    pub fn new(kind: ElementKind) -> PayloadEncoding {
        PayloadEncoding {
            builder: PayloadBuilder::new(kind),
            finalized: false,
        }
    }

    /// Re-encodes the cells of `view`. The resulting encoding is finalized.
    pub fn from_payload(view: &PayloadView<'_>) -> Result<PayloadEncoding> {
        let mut encoding = PayloadEncoding::new(view.kind());
        for value in view.values() {
            encoding.builder.push(value)?;
        }
        encoding.finalized = true;
        Ok(encoding)
    }

    pub fn element_kind(&self) -> ElementKind {
        self.builder.kind()
    }

    /// Payload of the cells pushed so far.
    pub fn to_payload(&self) -> Payload {
        self.builder.clone().finish()
    }

    /// Appends a borrowed value without copying it first.
    pub fn push_ref(&mut self, value: ValueRef<'_>) -> Result<()> {
        assert!(!self.finalized, "push into a finalized encoder");
        self.builder.push(value)
    }
}

impl fmt::Debug for PayloadEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadEncoding")
            .field("kind", &self.builder.kind())
            .field("len", &self.builder.len())
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl Encoding<Value> for PayloadEncoding {
    fn kind(&self) -> EncodingKind {
        EncodingKind::RunLength
    }

    fn len(&self) -> u64 {
        self.builder.len()
    }

    fn push(&mut self, value: Value) -> Result<()> {
        self.push_ref(value.as_ref())
    }

    fn push_null(&mut self, reason: MissingReason) -> Result<()> {
        self.push_ref(ValueRef::Null(reason))
    }

    fn get(&self, index: u64) -> Datum<Value> {
        match self.builder.value_at(index) {
            Some(ValueRef::Null(reason)) => Datum {
                value: Value::Null(reason),
                missing: Some(reason),
            },
            Some(value) => Datum::present(value.to_owned()),
            None => panic!("index {index} out of range for {} cells", self.builder.len()),
        }
    }

    fn reserve(&mut self, additional: usize) {
        self.builder.reserve(additional);
    }

    fn finalize(&mut self) {
        self.finalized = true;
    }

    fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn clear(&mut self) {
        self.builder.clear();
        self.finalized = false;
    }

    fn dump(&self, sink: &mut dyn fmt::Write) -> fmt::Result {
        let mut sink = sink;
        self.to_payload().view().dump(&mut sink)
    }
}
