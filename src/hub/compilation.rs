// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Compilation of a [`HubGraph`] into an immutable [`CompiledHub`]: the
//! global branch registry, the port-to-branch bindings and the hub
//! input/output branch sets.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::visit::EdgeRef;

use crate::{Component, Error};

use super::{BoundaryRole, HubGraph, HubNode};

/// The role of a branch within the hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchRole {
    /// The branch enters the hub at an input boundary node.
    HubInput,
    /// The branch leaves the hub at an output boundary node.
    HubOutput,
    /// The branch connects two components, or is a virtual state variable.
    Internal,
}

/// A named global flow variable.
///
/// A branch's index is its position in the compiled hub's lexicographically
/// sorted branch list, so that repeated compilation of the same topology
/// yields identical matrices.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    name: String,
    role: BranchRole,
}

impl Branch {
    /// The name of the branch.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The role of the branch.
    pub fn role(&self) -> BranchRole {
        self.role
    }
}

/// An immutable, compiled snapshot of a hub topology.
///
/// Produced by [`HubGraph::compile`]; consumed by the system-matrix
/// assembler, the coupling derivation, and external collaborators such as a
/// dispatch optimizer.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledHub {
    components: Vec<Component>,
    branches: Vec<Branch>,
    bindings: BTreeMap<(String, String), usize>,
    hub_inputs: Vec<usize>,
    hub_outputs: Vec<usize>,
}

/// Compilation.
impl HubGraph {
    /// Compiles the topology into a [`CompiledHub`].
    ///
    /// Every edge contributes one branch; every storage component
    /// additionally contributes one virtual branch for its state-of-charge
    /// delta, bound even though no edge references it.  The branch list and
    /// the hub input/output sets are deduplicated and sorted
    /// lexicographically to fix the final indices.
    ///
    /// Compilation is read-only: on failure the graph is left untouched and
    /// no partial registry escapes.
    pub fn compile(&self) -> Result<CompiledHub, Error> {
        let mut branch_names: BTreeSet<String> = BTreeSet::new();
        let mut input_names: BTreeSet<String> = BTreeSet::new();
        let mut output_names: BTreeSet<String> = BTreeSet::new();
        let mut port_branches: BTreeMap<(String, String), String> = BTreeMap::new();

        for edge in self.graph.edge_references() {
            let connection = edge.weight();
            let branch = connection.branch();
            branch_names.insert(branch.to_string());

            if let HubNode::Component(component) = &self.graph[edge.source()] {
                port_branches.insert(
                    (
                        component.name().to_string(),
                        connection.source_port().to_string(),
                    ),
                    branch.to_string(),
                );
            }
            if let HubNode::Component(component) = &self.graph[edge.target()] {
                port_branches.insert(
                    (
                        component.name().to_string(),
                        connection.target_port().to_string(),
                    ),
                    branch.to_string(),
                );
            }

            if self.graph[edge.source()].boundary_role() == Some(BoundaryRole::Input) {
                input_names.insert(branch.to_string());
            }
            if self.graph[edge.target()].boundary_role() == Some(BoundaryRole::Output) {
                output_names.insert(branch.to_string());
            }
        }

        // Components in registration order; this order fixes the Z-block
        // stacking downstream.
        let components: Vec<Component> = self
            .graph
            .node_weights()
            .filter_map(|node| node.component().cloned())
            .collect();

        // Storage state branches exist whether or not any edge mentions the
        // component.
        for component in &components {
            if let Some(port) = component.virtual_port() {
                let branch = format!("{}_{}_branch", component.name(), port);
                branch_names.insert(branch.clone());
                port_branches.insert(
                    (component.name().to_string(), port.to_string()),
                    branch,
                );
            }
        }

        let indices: BTreeMap<String, usize> = branch_names
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), index))
            .collect();

        let branches: Vec<Branch> = branch_names
            .into_iter()
            .map(|name| {
                let role = if input_names.contains(&name) {
                    BranchRole::HubInput
                } else if output_names.contains(&name) {
                    BranchRole::HubOutput
                } else {
                    BranchRole::Internal
                };
                Branch { name, role }
            })
            .collect();

        let mut bindings: BTreeMap<(String, String), usize> = BTreeMap::new();
        for (port, branch) in port_branches {
            match indices.get(&branch) {
                Some(index) => {
                    bindings.insert(port, *index);
                }
                None => {
                    return Err(Error::internal(format!(
                        "Branch '{}' was bound but never registered.",
                        branch
                    )))
                }
            }
        }

        let lookup = |names: BTreeSet<String>| -> Result<Vec<usize>, Error> {
            names
                .into_iter()
                .map(|name| {
                    indices.get(&name).copied().ok_or_else(|| {
                        Error::internal(format!(
                            "Branch '{}' was classified but never registered.",
                            name
                        ))
                    })
                })
                .collect()
        };

        Ok(CompiledHub {
            components,
            branches,
            bindings,
            hub_inputs: lookup(input_names)?,
            hub_outputs: lookup(output_names)?,
        })
    }
}

/// Accessors for [`CompiledHub`].
impl CompiledHub {
    /// The components of the hub, in registration order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Returns the component with the given name, if it exists.
    pub fn component(&self, name: &str) -> Result<&Component, Error> {
        self.components
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| Error::node_not_found(format!("Component '{}' not found.", name)))
    }

    /// The branches of the hub, sorted lexicographically by name.
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Returns the index of the branch with the given name, if it exists.
    pub fn branch_index(&self, name: &str) -> Option<usize> {
        self.branches
            .iter()
            .position(|branch| branch.name() == name)
    }

    /// Returns the branch index bound to the given component port, if any.
    pub fn port_binding(&self, component: &str, port: &str) -> Option<usize> {
        self.bindings
            .get(&(component.to_string(), port.to_string()))
            .copied()
    }

    /// The indices of the hub-input branches, ascending.
    pub fn hub_inputs(&self) -> &[usize] {
        &self.hub_inputs
    }

    /// The indices of the hub-output branches, ascending.
    pub fn hub_outputs(&self) -> &[usize] {
        &self.hub_outputs
    }

    /// The hub-input branches, in index order.
    pub fn hub_input_branches(&self) -> impl Iterator<Item = &Branch> {
        self.hub_inputs.iter().map(|&index| &self.branches[index])
    }

    /// The hub-output branches, in index order.
    pub fn hub_output_branches(&self) -> impl Iterator<Item = &Branch> {
        self.hub_outputs.iter().map(|&index| &self.branches[index])
    }

    /// The storage components and their bound state-delta branch names, for
    /// consumption by a dispatch optimizer.
    pub fn storage_state_branches(&self) -> Vec<(&str, &str)> {
        self.components
            .iter()
            .filter_map(|component| {
                let port = component.virtual_port()?;
                let index = self.port_binding(component.name(), port)?;
                Some((component.name(), self.branches[index].name()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::BranchRole;
    use crate::hub::test_utils::HubBuilder;
    use crate::Error;

    #[test]
    fn test_compile_chp_boiler() -> Result<(), Error> {
        let hub = HubBuilder::chp_boiler_hub(false).compile()?;

        let names: Vec<&str> = hub.branches().iter().map(|b| b.name()).collect();
        assert_eq!(
            names,
            [
                "Boiler1_heat_out_to_HeatLoad_in",
                "CHP1_elec_out_to_ElecLoad_in",
                "CHP1_heat_out_to_HeatLoad_in",
                "GasInput_out_to_Boiler1_fuel_in",
                "GasInput_out_to_CHP1_fuel_in",
            ]
        );
        assert_eq!(hub.hub_inputs(), [3, 4]);
        assert_eq!(hub.hub_outputs(), [0, 1, 2]);

        let roles: Vec<BranchRole> = hub.branches().iter().map(|b| b.role()).collect();
        assert_eq!(
            roles,
            [
                BranchRole::HubOutput,
                BranchRole::HubOutput,
                BranchRole::HubOutput,
                BranchRole::HubInput,
                BranchRole::HubInput,
            ]
        );

        // Registration order, not branch order.
        let components: Vec<&str> = hub.components().iter().map(|c| c.name()).collect();
        assert_eq!(components, ["CHP1", "Boiler1"]);

        assert_eq!(hub.port_binding("CHP1", "fuel_in"), Some(4));
        assert_eq!(hub.port_binding("CHP1", "heat_out"), Some(2));
        assert_eq!(hub.port_binding("CHP1", "elec_out"), Some(1));
        assert_eq!(hub.port_binding("Boiler1", "fuel_in"), Some(3));
        assert_eq!(hub.port_binding("Boiler1", "heat_out"), Some(0));
        assert_eq!(hub.port_binding("Boiler1", "steam_out"), None);

        assert_eq!(hub.branch_index("GasInput_out_to_CHP1_fuel_in"), Some(4));
        assert_eq!(hub.branch_index("NoSuchBranch"), None);
        assert!(hub.component("Boiler1").is_ok());
        assert_eq!(
            hub.component("Boiler2"),
            Err(Error::node_not_found("Component 'Boiler2' not found."))
        );
        Ok(())
    }

    #[test]
    fn test_compile_is_deterministic() -> Result<(), Error> {
        let graph = HubBuilder::chp_boiler_hub(true);
        let first = graph.compile()?;
        let second = graph.compile()?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_storage_virtual_branch() -> Result<(), Error> {
        let hub = HubBuilder::storage_hub().compile()?;

        // No edge references the virtual port, but the branch is there.
        let index = hub.branch_index("Storage1_delta_soc_branch");
        assert!(index.is_some());
        assert_eq!(hub.port_binding("Storage1", "delta_soc"), index);
        assert_eq!(
            hub.storage_state_branches(),
            [("Storage1", "Storage1_delta_soc_branch")]
        );

        let branches: Vec<&str> = hub.branches().iter().map(|b| b.name()).collect();
        assert_eq!(
            branches,
            [
                "Boiler1_heat_out_to_HeatLoad_in",
                "CHP1_elec_for_load_to_ElecLoad_in",
                "CHP1_elec_for_storage_to_Storage1_energy_in",
                "CHP1_heat_out_to_HeatLoad_in",
                "GasInput_out_to_Boiler1_fuel_in",
                "GasInput_out_to_CHP1_fuel_in",
                "Storage1_delta_soc_branch",
                "Storage1_energy_out_to_ElecLoad_in",
            ]
        );

        // Virtual branches are internal.
        let delta = &hub.branches()[6];
        assert_eq!(delta.role(), BranchRole::Internal);
        assert_eq!(
            hub.hub_output_branches()
                .map(|b| b.name())
                .collect::<Vec<_>>(),
            [
                "Boiler1_heat_out_to_HeatLoad_in",
                "CHP1_elec_for_load_to_ElecLoad_in",
                "CHP1_heat_out_to_HeatLoad_in",
                "Storage1_energy_out_to_ElecLoad_in",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_compile_empty_graph() -> Result<(), Error> {
        let hub = crate::HubGraph::new().compile()?;
        assert!(hub.branches().is_empty());
        assert!(hub.components().is_empty());
        Ok(())
    }
}
