// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! A graph representation of a multi-carrier energy hub: conversion and
//! storage components, boundary nodes where energy enters or leaves the
//! hub, and the directed port-to-port connections between them.

mod compilation;
mod creation;
mod retrieval;

pub mod iterators;

#[cfg(test)]
pub(crate) mod test_utils;

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::Component;

pub use compilation::{Branch, BranchRole, CompiledHub};

/// `HubNode`s stored in a `DiGraph` instance can be addressed with
/// `NodeIndex`es.
///
/// `NodeIndexMap` stores the corresponding `NodeIndex` for any node name, so
/// that nodes in the `DiGraph` can be retrieved by name.
pub(crate) type NodeIndexMap = HashMap<String, NodeIndex>;

/// The role of a boundary node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryRole {
    /// Energy enters the hub here.
    Input,
    /// Energy leaves the hub here.
    Output,
}

/// A node of the hub graph.
#[derive(Clone, Debug, PartialEq)]
pub enum HubNode {
    /// A conversion or storage unit.
    Component(Component),
    /// A boundary node, carrying only a name and a role.  Boundary nodes
    /// expose a single generic port and may fan out or in freely.
    Boundary { name: String, role: BoundaryRole },
}

impl HubNode {
    /// The name of the node.
    pub fn name(&self) -> &str {
        match self {
            HubNode::Component(component) => component.name(),
            HubNode::Boundary { name, .. } => name,
        }
    }

    /// The node's boundary role, if it is a boundary node.
    pub fn boundary_role(&self) -> Option<BoundaryRole> {
        match self {
            HubNode::Component(_) => None,
            HubNode::Boundary { role, .. } => Some(*role),
        }
    }

    /// The node's component, if it is a component node.
    pub fn component(&self) -> Option<&Component> {
        match self {
            HubNode::Component(component) => Some(component),
            HubNode::Boundary { .. } => None,
        }
    }
}

/// A directed connection from a source port to a destination port.
///
/// Each connection induces exactly one branch, named deterministically from
/// the four edge fields so that parallel connections between the same two
/// nodes via different ports stay distinct.
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    source_port: String,
    target_port: String,
    branch: String,
}

impl Connection {
    /// The port on the source node.
    pub fn source_port(&self) -> &str {
        &self.source_port
    }

    /// The port on the destination node.
    pub fn target_port(&self) -> &str {
        &self.target_port
    }

    /// The name of the branch induced by this connection.
    pub fn branch(&self) -> &str {
        &self.branch
    }
}

/// A mutable energy-hub topology.
///
/// Components and boundary nodes are registered under unique names and
/// connected port to port; [`compile`][HubGraph::compile] then freezes the
/// graph into an immutable [`CompiledHub`] with the global branch registry.
pub struct HubGraph {
    graph: DiGraph<HubNode, Connection>,
    node_indices: NodeIndexMap,
}
