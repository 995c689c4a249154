use serde::{Deserialize, Serialize};

/// Storage strategy of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum EncodingKind {
    /// Plain array of values, no compression.
    Identity = 1,
    /// Run-length encoded segments over a value buffer.
    #[default]
    RunLength = 2,
}

impl TryFrom<u16> for EncodingKind {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EncodingKind::Identity),
            2 => Ok(EncodingKind::RunLength),
            _ => Err(()),
        }
    }
}

/// Settings used when creating tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    pub encoding: EncodingKind,

    /// Number of cells to reserve room for up front.
    pub capacity_hint: usize,
}

impl TileConfig {
    pub fn with_encoding(&self, encoding: EncodingKind) -> Self {
        let mut config = self.clone();
        config.encoding = encoding;
        config
    }

    pub fn with_capacity_hint(&self, capacity_hint: usize) -> Self {
        let mut config = self.clone();
        config.capacity_hint = capacity_hint;
        config
    }
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            encoding: EncodingKind::RunLength,
            capacity_hint: 0,
        }
    }
}
