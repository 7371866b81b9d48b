// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Iterators over nodes and connections in a `HubGraph`.

use petgraph::graph::DiGraph;

use super::{Connection, HubNode};

/// An iterator over the nodes in a `HubGraph`.
pub struct Nodes<'a> {
    pub(crate) iter: std::slice::Iter<'a, petgraph::graph::Node<HubNode>>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a HubNode;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|n| &n.weight)
    }
}

/// An iterator over the connections in a `HubGraph`.
///
/// Yields the source node, the connection and the destination node, which
/// is what a topology renderer needs.
pub struct Connections<'a> {
    pub(crate) graph: &'a DiGraph<HubNode, Connection>,
    pub(crate) iter: std::slice::Iter<'a, petgraph::graph::Edge<Connection>>,
}

impl<'a> Iterator for Connections<'a> {
    type Item = (&'a HubNode, &'a Connection, &'a HubNode);

    fn next(&mut self) -> Option<Self::Item> {
        self.iter
            .next()
            .map(|e| (&self.graph[e.source()], &e.weight, &self.graph[e.target()]))
    }
}
