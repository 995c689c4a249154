//! Position bitmaps of sparse array chunks.
//!
//! A [`PositionBitmap`] lists the populated logical positions of a chunk as segments mapping
//! logical ranges to the physical positions of their values in a value payload. Bitmaps can be
//! cut down to a sub-box of the chunk ([`BitmapView::cut`]), combined ([`BitmapView::union`],
//! [`BitmapView::intersect`]) and used to unpack cells ([`unpack::unpack_values`]).

pub mod bitmap;
pub mod builder;
pub mod cut;
pub mod segment;
pub mod set_ops;
pub mod unpack;

pub use bitmap::{BITMAP_MAGIC, BitmapCursor, BitmapView, PositionBitmap};
pub use builder::BitmapBuilder;
pub use cut::{BitmapReplicator, Cut, Replicator};
pub use segment::BitmapSegment;
