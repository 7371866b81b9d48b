// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for building up a [`HubGraph`] from components, boundary nodes
//! and connections.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::component::PortDirection;
use crate::{Component, Error};

use super::{BoundaryRole, Connection, HubGraph, HubNode, NodeIndexMap};

/// `HubGraph` construction.
impl HubGraph {
    /// Creates a new, empty hub graph.
    pub fn new() -> Self {
        HubGraph {
            graph: DiGraph::new(),
            node_indices: NodeIndexMap::new(),
        }
    }

    /// Registers a component under its unique name.
    ///
    /// Returns a `NameConflict` error if a node with the same name already
    /// exists.
    pub fn add_component(&mut self, component: Component) -> Result<(), Error> {
        let name = component.name().to_string();
        if self.node_indices.contains_key(&name) {
            return Err(Error::name_conflict(format!(
                "A node named '{}' already exists.",
                name
            )));
        }
        let idx = self.graph.add_node(HubNode::Component(component));
        self.node_indices.insert(name, idx);
        Ok(())
    }

    /// Registers a boundary node where energy enters the hub.
    pub fn add_input(&mut self, name: impl Into<String>) -> Result<(), Error> {
        self.add_boundary(name.into(), BoundaryRole::Input)
    }

    /// Registers a boundary node where energy leaves the hub.
    pub fn add_output(&mut self, name: impl Into<String>) -> Result<(), Error> {
        self.add_boundary(name.into(), BoundaryRole::Output)
    }

    fn add_boundary(&mut self, name: String, role: BoundaryRole) -> Result<(), Error> {
        if self.node_indices.contains_key(&name) {
            return Err(Error::name_conflict(format!(
                "A node named '{}' already exists.",
                name
            )));
        }
        let idx = self.graph.add_node(HubNode::Boundary {
            name: name.clone(),
            role,
        });
        self.node_indices.insert(name, idx);
        Ok(())
    }

    /// Connects a port of one node to a port of another node, inducing one
    /// branch.
    ///
    /// The source port must be an output port of a component or the generic
    /// port of an input boundary node; the destination port must be an
    /// input port of a component or the generic port of an output boundary
    /// node.  A component port can be connected at most once.  Violations
    /// fail with a `PortValidation` error; unregistered endpoints fail with
    /// a `NodeNotFound` error.
    pub fn connect(
        &mut self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> Result<(), Error> {
        let source_idx = *self.node_indices.get(source).ok_or_else(|| {
            Error::node_not_found(format!("Source node '{}' not found.", source))
        })?;
        let target_idx = *self.node_indices.get(target).ok_or_else(|| {
            Error::node_not_found(format!("Destination node '{}' not found.", target))
        })?;
        if source_idx == target_idx {
            return Err(Error::port_validation(format!(
                "Cannot connect node '{}' to itself.",
                source
            )));
        }

        match &self.graph[source_idx] {
            HubNode::Component(component) => {
                self.validate_component_port(
                    component,
                    source_port,
                    PortDirection::Output,
                    source_idx,
                )?;
            }
            HubNode::Boundary { role, .. } => {
                if *role != BoundaryRole::Input {
                    return Err(Error::port_validation(format!(
                        "Boundary node '{}' is an output node and cannot be a source.",
                        source
                    )));
                }
            }
        }

        match &self.graph[target_idx] {
            HubNode::Component(component) => {
                self.validate_component_port(
                    component,
                    target_port,
                    PortDirection::Input,
                    target_idx,
                )?;
            }
            HubNode::Boundary { role, .. } => {
                if *role != BoundaryRole::Output {
                    return Err(Error::port_validation(format!(
                        "Boundary node '{}' is an input node and cannot be a destination.",
                        target
                    )));
                }
            }
        }

        let branch = format!("{}_{}_to_{}_{}", source, source_port, target, target_port);
        self.graph.add_edge(
            source_idx,
            target_idx,
            Connection {
                source_port: source_port.to_string(),
                target_port: target_port.to_string(),
                branch,
            },
        );
        Ok(())
    }

    fn validate_component_port(
        &self,
        component: &Component,
        port: &str,
        direction: PortDirection,
        idx: NodeIndex,
    ) -> Result<(), Error> {
        if component.is_virtual_port(port) {
            return Err(Error::port_validation(format!(
                "Port '{}' of component '{}' is virtual and cannot be connected.",
                port,
                component.name()
            )));
        }
        match component.port(port) {
            Some((_, declared)) if declared.direction() == direction => {}
            _ => {
                let expected = match direction {
                    PortDirection::Input => "input",
                    PortDirection::Output => "output",
                };
                return Err(Error::port_validation(format!(
                    "Port '{}' is not an {} port of component '{}'.",
                    port,
                    expected,
                    component.name()
                )));
            }
        }
        let (petgraph_direction, already) = match direction {
            PortDirection::Output => (petgraph::Direction::Outgoing, "already sources a branch"),
            PortDirection::Input => (petgraph::Direction::Incoming, "already sinks a branch"),
        };
        for edge in self.graph.edges_directed(idx, petgraph_direction) {
            let connected_port = match direction {
                PortDirection::Output => edge.weight().source_port(),
                PortDirection::Input => edge.weight().target_port(),
            };
            if connected_port == port {
                return Err(Error::port_validation(format!(
                    "Port '{}' of component '{}' {}.",
                    port,
                    component.name(),
                    already
                )));
            }
        }
        Ok(())
    }
}

impl Default for HubGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper for addressing nodes by index in sibling modules.
impl HubGraph {
    pub(super) fn node_index(&self, name: &str) -> Option<NodeIndex> {
        self.node_indices.get(name).copied()
    }
}
