// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

/*!
# Energy Hub Graph

This is a library for representing a multi-carrier energy hub (a facility
converting and storing energy across fuel, heat, electricity, cooling and
gas) as a directed graph of typed components, and for compiling that graph
into a linear algebraic description of the hub's steady-state energy
balance.

## Building a hub

A [`HubGraph`] is built incrementally: register [`Component`]s (converters,
a back-pressure CHP, storage, convertible loads) and boundary nodes under
unique names, then connect ports with
[`connect`][HubGraph::connect].  Every connection induces one *branch*, a
named global flow variable.

## Compilation

[`compile`][HubGraph::compile] freezes the graph into an immutable
[`CompiledHub`]: the lexicographically sorted branch registry, the
port-to-branch bindings, and the hub input/output branch sets.  Storage
components get an extra *virtual* branch for their state-of-charge delta,
bound even though no edge references it.

## System matrices

[`system_matrices`][CompiledHub::system_matrices] assembles the three
global matrices over the branch variables:

- `X` selects the hub-input branches,
- `Y` selects the hub-output branches,
- `Z` stacks every component's balance equations, with +1 for input ports
  and -1 for output ports at the bound branch columns.

## Coupling derivation

[`coupling_matrix`][CompiledHub::coupling_matrix] derives the closed-form
map from hub inputs to hub outputs by stacking `X` above `Z`, inverting the
stack exactly, and forming `C = -Y * Q^-1 * R`.  Component parameters can be
free symbols; the derived [`CouplingMatrix`] is specialized to numbers with
[`substitute`][CouplingMatrix::substitute] and evaluated with
[`evaluate`][CouplingMatrix::evaluate].

All failures are reported through [`Error`]; the hub is never left in a
partially compiled state.
*/

mod algebra;
pub use algebra::{Expr, ExprMatrix};

mod assembly;
pub use assembly::SystemMatrices;

mod component;
pub use component::{Component, ComponentModel, ConverterKind, Port, PortDirection};

mod coupling;
pub use coupling::CouplingMatrix;

mod error;
pub use error::Error;

mod hub;
pub use hub::{
    iterators, BoundaryRole, Branch, BranchRole, CompiledHub, Connection, HubGraph, HubNode,
};
