//! Runtime construction of tiles by value type and encoding.

use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tessel_common::{Result, error::Error};
use tessel_rle::{
    ElementKind, Payload, PayloadBuilder, PayloadView, Value, ValueRef, scalar::Scalar,
};

use crate::{
    config::{EncodingKind, TileConfig},
    encoding::Encoding,
    identity::IdentityEncoding,
    run_length::RunLengthEncoding,
    tile::Tile,
    value_tile::PayloadEncoding,
};

/// Type of the values held by a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    #[serde(rename = "uint8")]
    UInt8,
    #[serde(rename = "uint16")]
    UInt16,
    #[serde(rename = "uint32")]
    UInt32,
    #[serde(rename = "uint64")]
    UInt64,
    Float32,
    Float64,
    String,
    Binary,
}

impl ValueType {
    pub const ALL: [ValueType; 13] = [
        ValueType::Bool,
        ValueType::Int8,
        ValueType::Int16,
        ValueType::Int32,
        ValueType::Int64,
        ValueType::UInt8,
        ValueType::UInt16,
        ValueType::UInt32,
        ValueType::UInt64,
        ValueType::Float32,
        ValueType::Float64,
        ValueType::String,
        ValueType::Binary,
    ];

    /// Layout of the values in an encoded payload.
    pub fn element_kind(&self) -> ElementKind {
        match self {
            ValueType::Bool => ElementKind::Boolean,
            ValueType::Int8 | ValueType::UInt8 => ElementKind::Fixed(1),
            ValueType::Int16 | ValueType::UInt16 => ElementKind::Fixed(2),
            ValueType::Int32 | ValueType::UInt32 | ValueType::Float32 => ElementKind::Fixed(4),
            ValueType::Int64 | ValueType::UInt64 | ValueType::Float64 => ElementKind::Fixed(8),
            ValueType::String | ValueType::Binary => ElementKind::Variable,
        }
    }
}

/// Object-safe handle to a tile of any value type and encoding.
pub trait DynTile: Send {
    fn value_type(&self) -> ValueType;

    fn encoding_kind(&self) -> EncodingKind;

    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a cell. [`ValueRef::Null`] appends a missing cell; a value of another type is
    /// an invalid argument.
    fn push_value(&mut self, value: ValueRef<'_>) -> Result<()>;

    /// Reads the cell at `index`; a missing cell reads as [`Value::Null`].
    fn get_value(&self, index: u64) -> Value;

    fn reserve(&mut self, additional: usize);

    fn finalize(&mut self);

    fn clear(&mut self);

    fn dump(&self, sink: &mut dyn fmt::Write) -> fmt::Result;

    /// Appends every cell of `view`.
    fn push_payload(&mut self, view: &PayloadView<'_>) -> Result<()> {
        for value in view.values() {
            self.push_value(value)?;
        }
        Ok(())
    }

    /// Encodes the cells into a payload.
    fn to_payload(&self) -> Result<Payload> {
        let mut builder = PayloadBuilder::new(self.value_type().element_kind());
        for i in 0..self.len() {
            builder.push(self.get_value(i).as_ref())?;
        }
        Ok(builder.finish())
    }
}

/// Conversion of a tile's cell type from and to untyped values.
pub trait CellType: Clone + fmt::Debug + Send + 'static {
    fn from_value(value: ValueRef<'_>) -> Option<Self>;

    fn to_value(&self) -> Value;
}

macro_rules! impl_scalar_cell {
    ($($T:ty),*) => {
        $(
            impl CellType for $T {
                fn from_value(value: ValueRef<'_>) -> Option<Self> {
                    match value {
                        ValueRef::Bytes(bytes) if bytes.len() == <$T as Scalar>::SIZE => {
                            Some(<$T as Scalar>::read_from(bytes))
                        }
                        _ => None,
                    }
                }

                fn to_value(&self) -> Value {
                    Value::from_scalar(*self)
                }
            }
        )*
    };
}

impl_scalar_cell!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl CellType for bool {
    fn from_value(value: ValueRef<'_>) -> Option<Self> {
        value.as_bool()
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl CellType for Vec<u8> {
    fn from_value(value: ValueRef<'_>) -> Option<Self> {
        match value {
            ValueRef::Bytes(bytes) => Some(bytes.to_vec()),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        Value::from_bytes(self)
    }
}

impl CellType for Value {
    fn from_value(value: ValueRef<'_>) -> Option<Self> {
        Some(value.to_owned())
    }

    fn to_value(&self) -> Value {
        self.clone()
    }
}

/// A typed tile behind the [`DynTile`] interface.
pub struct TypedTile<T, E> {
    tile: Tile<T, E>,
    value_type: ValueType,
}

impl<T, E> TypedTile<T, E>
where
    T: CellType,
    E: Encoding<T>,
{
    pub fn new(value_type: ValueType, encoding: E) -> TypedTile<T, E> {
        TypedTile {
            tile: Tile::new(encoding),
            value_type,
        }
    }

    pub fn tile(&self) -> &Tile<T, E> {
        &self.tile
    }

    pub fn into_tile(self) -> Tile<T, E> {
        self.tile
    }
}

impl<T, E> DynTile for TypedTile<T, E>
where
    T: CellType,
    E: Encoding<T>,
{
    fn value_type(&self) -> ValueType {
        self.value_type
    }

    fn encoding_kind(&self) -> EncodingKind {
        self.tile.encoding().kind()
    }

    fn len(&self) -> u64 {
        self.tile.len()
    }

    fn push_value(&mut self, value: ValueRef<'_>) -> Result<()> {
        if let ValueRef::Null(reason) = value {
            return self.tile.push_null(reason);
        }
        let cell = T::from_value(value).ok_or_else(|| {
            Error::invalid_arg(
                "value",
                format!("{value:?} is not a {:?} value", self.value_type),
            )
        })?;
        self.tile.push(cell)
    }

    fn get_value(&self, index: u64) -> Value {
        let datum = self.tile.get(index);
        match datum.missing {
            Some(reason) => Value::Null(reason),
            None => datum.value.to_value(),
        }
    }

    fn reserve(&mut self, additional: usize) {
        self.tile.reserve(additional);
    }

    fn finalize(&mut self) {
        self.tile.finalize();
    }

    fn clear(&mut self) {
        self.tile.clear();
    }

    fn dump(&self, sink: &mut dyn fmt::Write) -> fmt::Result {
        let mut sink = sink;
        self.tile.dump(&mut sink)
    }
}

/// Creates an empty tile of the given value type.
pub type TileConstructor = fn(ValueType) -> Box<dyn DynTile>;

/// Registry of tile constructors keyed by value type and encoding.
pub struct TileFactory {
    constructors: AHashMap<(ValueType, EncodingKind), TileConstructor>,
}

impl TileFactory {
    /// Factory with constructors for every built-in value type and encoding.
    pub fn new() -> TileFactory {
        let mut factory = TileFactory::empty();
        factory.register_scalar::<i8>(ValueType::Int8);
        factory.register_scalar::<i16>(ValueType::Int16);
        factory.register_scalar::<i32>(ValueType::Int32);
        factory.register_scalar::<i64>(ValueType::Int64);
        factory.register_scalar::<u8>(ValueType::UInt8);
        factory.register_scalar::<u16>(ValueType::UInt16);
        factory.register_scalar::<u32>(ValueType::UInt32);
        factory.register_scalar::<u64>(ValueType::UInt64);
        factory.register_scalar::<f32>(ValueType::Float32);
        factory.register_scalar::<f64>(ValueType::Float64);

        factory.register(ValueType::Bool, EncodingKind::Identity, |value_type| {
            Box::new(TypedTile::new(value_type, IdentityEncoding::<bool>::new()))
        });
        for value_type in [ValueType::String, ValueType::Binary] {
            factory.register(value_type, EncodingKind::Identity, |value_type| {
                Box::new(TypedTile::new(value_type, IdentityEncoding::<Vec<u8>>::new()))
            });
        }
        for value_type in [ValueType::Bool, ValueType::String, ValueType::Binary] {
            factory.register(value_type, EncodingKind::RunLength, |value_type| {
                Box::new(TypedTile::new(
                    value_type,
                    PayloadEncoding::new(value_type.element_kind()),
                ))
            });
        }
        factory
    }

    /// Factory without any constructor.
    pub fn empty() -> TileFactory {
        TileFactory {
            constructors: AHashMap::new(),
        }
    }

    /// Registers `constructor` for the pair, replacing any previous one.
    pub fn register(
        &mut self,
        value_type: ValueType,
        encoding: EncodingKind,
        constructor: TileConstructor,
    ) {
        log::debug!("registering tile constructor for {value_type:?}/{encoding:?}");
        self.constructors.insert((value_type, encoding), constructor);
    }

    fn register_scalar<T>(&mut self, value_type: ValueType)
    where
        T: Scalar + CellType,
    {
        self.register(value_type, EncodingKind::Identity, |value_type| {
            Box::new(TypedTile::new(value_type, IdentityEncoding::<T>::new()))
        });
        self.register(value_type, EncodingKind::RunLength, |value_type| {
            Box::new(TypedTile::new(value_type, RunLengthEncoding::<T>::new()))
        });
    }

    pub fn supports(&self, value_type: ValueType, encoding: EncodingKind) -> bool {
        self.constructors.contains_key(&(value_type, encoding))
    }

    /// Creates an empty tile of `value_type` with the encoding and capacity of `config`.
    pub fn create(&self, value_type: ValueType, config: &TileConfig) -> Result<Box<dyn DynTile>> {
        let constructor = self
            .constructors
            .get(&(value_type, config.encoding))
            .ok_or_else(|| {
                Error::invalid_arg(
                    "config",
                    format!("no {:?} tile for {value_type:?}", config.encoding),
                )
            })?;
        let mut tile = constructor(value_type);
        tile.reserve(config.capacity_hint);
        Ok(tile)
    }
}

impl Default for TileFactory {
    fn default() -> Self {
        TileFactory::new()
    }
}
