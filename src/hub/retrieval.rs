// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for retrieving nodes and connections from a [`HubGraph`].
//!
//! This is the read-only surface a topology renderer consumes; it exposes
//! no mutable access to the underlying graph.

use crate::hub::iterators::{Connections, Nodes};
use crate::{Error, HubGraph, HubNode};

/// Node and connection retrieval.
impl HubGraph {
    /// Returns the node with the given name, if it exists.
    pub fn node(&self, name: &str) -> Result<&HubNode, Error> {
        self.node_index(name)
            .map(|i| &self.graph[i])
            .ok_or_else(|| Error::node_not_found(format!("Node '{}' not found.", name)))
    }

    /// Returns an iterator over the nodes in the graph, in registration
    /// order.
    pub fn nodes(&self) -> Nodes {
        Nodes {
            iter: self.graph.raw_nodes().iter(),
        }
    }

    /// Returns an iterator over the connections in the graph, in insertion
    /// order.
    pub fn connections(&self) -> Connections {
        Connections {
            graph: &self.graph,
            iter: self.graph.raw_edges().iter(),
        }
    }
}
