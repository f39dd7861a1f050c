//! Socket definitions and the values flowing through them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Named values keyed by socket name.
///
/// Ordered so that anything derived from a mapping (logs, results, dataset
/// schemas) comes out in a stable order.
pub type IoValues<T = serde_json::Value> = BTreeMap<String, T>;

/// Socket definitions keyed by socket name.
pub type SocketDefs = BTreeMap<String, SocketDef>;

/// Meta values keyed by socket name.
pub type SocketMetas = IoValues<MetaValue>;

/// Type of the data carried by a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumIter, EnumString, AsRefStr)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Datetime,
    Time,
    Dataset,
    Custom,
}

impl DataType {
    /// Returns whether a value of `self` may feed a socket of type `target`.
    ///
    /// `CUSTOM` bridges any type in either direction.
    #[inline]
    pub fn can_connect_to(self, target: DataType) -> bool {
        self == target || self == DataType::Custom || target == DataType::Custom
    }
}

/// How a socket came to exist on a node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum SocketState {
    /// Declared by the node type.
    #[default]
    Static,
    /// Derived from other sockets (e.g. a dataset schema).
    Dynamic,
    /// Added by the user as a node variable.
    Variable,
}

/// Definition of one named input or output of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketDef {
    pub data_type: DataType,
    pub display_name: String,
    #[serde(default)]
    pub state: SocketState,
    /// Unconnected optional sockets do not make their node invalid.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_optional: bool,
}

impl SocketDef {
    /// Creates a static socket definition.
    pub fn new(data_type: DataType, display_name: impl Into<String>) -> Self {
        Self {
            data_type,
            display_name: display_name.into(),
            state: SocketState::Static,
            is_optional: false,
        }
    }

    /// Creates a dynamic socket definition.
    pub fn dynamic(data_type: DataType, display_name: impl Into<String>) -> Self {
        Self {
            state: SocketState::Dynamic,
            ..Self::new(data_type, display_name)
        }
    }

    /// Marks the socket as optional.
    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    /// Sets the socket state.
    pub fn with_state(mut self, state: SocketState) -> Self {
        self.state = state;
        self
    }
}

/// Result of propagating a socket symbolically during meta-execution.
///
/// `content` is opaque per-type metadata (e.g. a dataset schema), while
/// `is_present` answers whether a real value would exist at this socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaValue {
    #[serde(default)]
    pub content: serde_json::Value,
    pub is_present: bool,
}

impl MetaValue {
    /// A present value with the given metadata.
    pub fn present(content: serde_json::Value) -> Self {
        Self {
            content,
            is_present: true,
        }
    }

    /// A value that would not exist at runtime.
    pub fn absent() -> Self {
        Self {
            content: serde_json::Value::Object(Default::default()),
            is_present: false,
        }
    }
}

/// Returns whether every meta value in the mapping is present.
///
/// An empty mapping counts as present.
pub fn all_present(metas: &SocketMetas) -> bool {
    metas.values().all(|meta| meta.is_present)
}

/// Returns whether every meta value of a non-optional socket in `defs` is
/// present.
///
/// A required socket without a meta value counts as absent.
pub fn required_present(metas: &SocketMetas, defs: &SocketDefs) -> bool {
    defs.iter()
        .filter(|(_, def)| !def.is_optional)
        .all(|(name, _)| metas.get(name).is_some_and(|meta| meta.is_present))
}
