//! Connections between node sockets.

use serde::{Deserialize, Serialize};

use crate::id::{ConnectionId, NodeId};

/// One end of a connection: a named socket on a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketRef {
    pub node_id: NodeId,
    pub name: String,
}

impl SocketRef {
    pub fn new(node_id: NodeId, name: impl Into<String>) -> Self {
        Self {
            node_id,
            name: name.into(),
        }
    }
}

/// A typed edge from an output socket to an input socket.
///
/// `from` and `to` are only `None` transiently while a graph is edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInstance {
    pub id: ConnectionId,
    pub from: Option<SocketRef>,
    pub to: Option<SocketRef>,
    #[serde(default)]
    pub context_ids: Vec<NodeId>,
}

impl ConnectionInstance {
    /// Creates a connection inside the scope identified by `context_ids`.
    pub fn new(from: SocketRef, to: SocketRef, context_ids: Vec<NodeId>) -> Self {
        Self {
            id: ConnectionId::new(),
            from: Some(from),
            to: Some(to),
            context_ids,
        }
    }

    /// Returns both endpoints if the connection is complete.
    #[inline]
    pub fn endpoints(&self) -> Option<(&SocketRef, &SocketRef)> {
        Some((self.from.as_ref()?, self.to.as_ref()?))
    }

    /// Returns whether the connection feeds the given input socket.
    #[inline]
    pub fn feeds(&self, node_id: NodeId, socket: &str) -> bool {
        self.to
            .as_ref()
            .is_some_and(|to| to.node_id == node_id && to.name == socket)
    }

    /// Returns whether the connection touches the given node at either end.
    #[inline]
    pub fn touches(&self, node_id: NodeId) -> bool {
        self.from.as_ref().is_some_and(|s| s.node_id == node_id)
            || self.to.as_ref().is_some_and(|s| s.node_id == node_id)
    }
}
