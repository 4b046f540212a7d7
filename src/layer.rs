use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error produced when a persisted row/folder/layer key cannot be parsed
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("malformed {kind} key {key:?}")]
pub struct KeyParseError {
    pub kind: &'static str,
    pub key: String,
}

impl KeyParseError {
    fn new(kind: &'static str, key: &str) -> Self {
        Self {
            kind,
            key: key.to_owned(),
        }
    }
}

/// Identifies a timeline row. Serialized as `row-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RowId(pub u32);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row-{}", self.0)
    }
}

impl FromStr for RowId {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("row-")
            .and_then(|n| n.parse().ok())
            .map(RowId)
            .ok_or_else(|| KeyParseError::new("row", s))
    }
}

impl TryFrom<String> for RowId {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RowId> for String {
    fn from(id: RowId) -> Self {
        id.to_string()
    }
}

/// Identifies a frame folder by the row it lives in and its first frame.
/// Serialized as `row-<n>-<frameIndex>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FolderId {
    pub row: RowId,
    pub frame_index: u32,
}

impl FolderId {
    pub fn new(row: RowId, frame_index: u32) -> Self {
        Self { row, frame_index }
    }

    /// The raster-bound layer of this folder
    pub fn main_layer(self) -> LayerRef {
        LayerRef::Main(self)
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.frame_index)
    }
}

impl FromStr for FolderId {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, frame) = s
            .rsplit_once('-')
            .ok_or_else(|| KeyParseError::new("folder", s))?;
        let row = row.parse().map_err(|_| KeyParseError::new("folder", s))?;
        let frame_index = frame.parse().map_err(|_| KeyParseError::new("folder", s))?;
        Ok(Self { row, frame_index })
    }
}

impl TryFrom<String> for FolderId {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FolderId> for String {
    fn from(id: FolderId) -> Self {
        id.to_string()
    }
}

/// A layer inside a frame folder.
///
/// Every folder owns exactly one `Main` layer (bound to the folder's raster
/// asset) and any number of vector-only `Extra` layers. On the wire these are
/// `row-1-0-main` and `row-1-0-extra-2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LayerRef {
    Main(FolderId),
    Extra(FolderId, u32),
}

impl LayerRef {
    pub fn folder(&self) -> FolderId {
        match *self {
            LayerRef::Main(folder) | LayerRef::Extra(folder, _) => folder,
        }
    }

    pub fn is_main(&self) -> bool {
        matches!(self, LayerRef::Main(_))
    }

    /// Name given to a layer that has not been renamed
    pub fn default_name(&self) -> String {
        match self {
            LayerRef::Main(_) => "Main".to_owned(),
            LayerRef::Extra(_, index) => format!("Layer {}", index),
        }
    }
}

impl fmt::Display for LayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerRef::Main(folder) => write!(f, "{}-main", folder),
            LayerRef::Extra(folder, index) => write!(f, "{}-extra-{}", folder, index),
        }
    }
}

impl FromStr for LayerRef {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(folder) = s.strip_suffix("-main") {
            let folder = folder.parse().map_err(|_| KeyParseError::new("layer", s))?;
            return Ok(LayerRef::Main(folder));
        }
        let (folder, index) = s
            .rsplit_once("-extra-")
            .ok_or_else(|| KeyParseError::new("layer", s))?;
        let folder = folder.parse().map_err(|_| KeyParseError::new("layer", s))?;
        let index = index.parse().map_err(|_| KeyParseError::new("layer", s))?;
        Ok(LayerRef::Extra(folder, index))
    }
}

impl TryFrom<String> for LayerRef {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LayerRef> for String {
    fn from(layer: LayerRef) -> Self {
        layer.to_string()
    }
}

/// Per-layer display attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerProps {
    pub name: String,
    pub visible: bool,
    /// Always kept within `0.0..=1.0`
    #[serde(deserialize_with = "deserialize_opacity")]
    pub opacity: f32,
}

/// Clamp to `0.0..=1.0`; non-finite values mean fully opaque
fn clamp_opacity(opacity: f32) -> f32 {
    if opacity.is_finite() {
        opacity.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

fn deserialize_opacity<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    f32::deserialize(deserializer).map(clamp_opacity)
}

impl Default for LayerProps {
    fn default() -> Self {
        Self {
            name: String::new(),
            visible: true,
            opacity: 1.0,
        }
    }
}

impl LayerProps {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = clamp_opacity(opacity);
    }
}

/// Direction for moving a layer within its folder's z-order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerDirection {
    /// Towards the top of the stack (drawn later)
    Up,
    /// Towards the bottom of the stack
    Down,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_keys_round_trip_through_strings() {
        let folder = FolderId::new(RowId(1), 0);
        assert_eq!(folder.to_string(), "row-1-0");
        assert_eq!(LayerRef::Main(folder).to_string(), "row-1-0-main");
        assert_eq!(LayerRef::Extra(folder, 2).to_string(), "row-1-0-extra-2");

        assert_eq!("row-1-0-main".parse::<LayerRef>().unwrap(), LayerRef::Main(folder));
        assert_eq!(
            "row-12-40-extra-3".parse::<LayerRef>().unwrap(),
            LayerRef::Extra(FolderId::new(RowId(12), 40), 3)
        );
    }

    #[test]
    fn test_malformed_keys_are_rejected() {
        assert!("row-x".parse::<RowId>().is_err());
        assert!("row-1".parse::<FolderId>().is_err());
        assert!("row-1-0-side".parse::<LayerRef>().is_err());
        assert!("row-1-0-extra-".parse::<LayerRef>().is_err());
    }

    #[test]
    fn test_layer_ref_as_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(LayerRef::Extra(FolderId::new(RowId(2), 5), 1), 7u32);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"row-2-5-extra-1":7}"#);
        let back: std::collections::BTreeMap<LayerRef, u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_opacity_is_clamped() {
        let mut props = LayerProps::named("Ink");
        props.set_opacity(1.5);
        assert_eq!(props.opacity, 1.0);
        props.set_opacity(-0.2);
        assert_eq!(props.opacity, 0.0);
    }

    #[test]
    fn test_loaded_opacity_is_clamped() {
        let props: LayerProps = serde_json::from_str(r#"{"name": "Ink", "opacity": 2.5}"#).unwrap();
        assert_eq!(props.opacity, 1.0);
        let props: LayerProps = serde_json::from_str(r#"{"opacity": -0.5}"#).unwrap();
        assert_eq!(props.opacity, 0.0);
        let props: LayerProps = serde_json::from_str(r#"{"name": "Ink"}"#).unwrap();
        assert_eq!(props.opacity, 1.0);
    }
}
