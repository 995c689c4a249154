//! Run-length encoding of position-ordered cell values.
//!
//! A payload encodes a sequence of cells as [`Segment`]s (runs, literals and null runs) over a
//! value buffer whose layout is given by an [`ElementKind`]. Payloads are built value by value
//! with a [`PayloadBuilder`], stream-assembled from other payloads with an [`AppendIterator`],
//! sliced with [`Payload::from_range`] and concatenated with [`Payload::append`].

pub mod append;
pub mod builder;
pub mod element;
pub mod merge;
pub mod payload;
pub mod range;
pub mod scalar;
pub mod segment;
pub mod value;
pub mod values;
pub mod var_part;
pub mod writer;

pub use append::AppendIterator;
pub use builder::PayloadBuilder;
pub use element::ElementKind;
pub use payload::{Payload, PayloadCursor, PayloadIter, PayloadView};
pub use segment::{MAX_DATA_INDEX, MissingReason, Position, Segment};
pub use value::{Value, ValueRef};
