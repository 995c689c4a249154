//! Typed tiles: columns of cells backed by an [`Encoding`].
//!
//! [`Tile`] is generic over the cell type and its encoding: [`IdentityEncoding`] keeps a plain
//! array, [`RunLengthEncoding`] keeps run-length segments compatible with
//! [`tessel_rle::Payload`]. [`CoordinatesTile`] stores cell coordinates as logical positions,
//! [`ValueTile`] holds untyped values, and [`TileFactory`] creates tiles at run time.

pub mod config;
pub mod coordinates;
pub mod datum;
pub mod encoding;
pub mod factory;
pub mod identity;
pub mod presence;
pub mod run_length;
pub mod tile;
pub mod value_tile;

pub use config::{EncodingKind, TileConfig};
pub use coordinates::{BoxMapper, CoordinatesMapper, CoordinatesTile};
pub use datum::Datum;
pub use encoding::Encoding;
pub use factory::{DynTile, TileFactory, ValueType};
pub use identity::IdentityEncoding;
pub use run_length::RunLengthEncoding;
pub use tile::Tile;
pub use value_tile::{PayloadEncoding, ValueTile};
