// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Assembly of the global system matrices X, Y and Z from a compiled hub.

use crate::algebra::{Expr, ExprMatrix};
use crate::component::PortDirection;
use crate::{CompiledHub, Error};

/// The assembled system matrices of a hub.
///
/// With `m` hub inputs, `q` hub outputs, `B` branches and `k` component
/// balance rows in total: `x` is the m-by-B indicator of the hub-input
/// branches, `y` the q-by-B indicator of the hub-output branches, and `z`
/// the k-by-B stack of the component balance equations over the global
/// branch variables.  All three share the compiled branch ordering.
#[derive(Clone, Debug, PartialEq)]
pub struct SystemMatrices {
    pub x: ExprMatrix,
    pub y: ExprMatrix,
    pub z: ExprMatrix,
}

/// System-matrix assembly.
impl CompiledHub {
    /// Assembles the system matrices.
    ///
    /// Each component's characteristic matrix H is right-multiplied by the
    /// component's global incidence expansion, which has exactly one
    /// nonzero per port row: +1 at the column of an input port's bound
    /// branch, -1 at the column of an output port's.  The resulting blocks
    /// are stacked in component-registration order.
    ///
    /// Assembly is pure: re-running it on the same compiled hub reproduces
    /// identical matrices.  Fails with an `UnboundPort` error if a declared
    /// port was never bound to a branch, and with a `Configuration` error
    /// for a hub without any branches.
    pub fn system_matrices(&self) -> Result<SystemMatrices, Error> {
        let branch_count = self.branches().len();
        if branch_count == 0 {
            return Err(Error::configuration("The hub has no branches."));
        }

        let mut z = ExprMatrix::zeros(0, branch_count);
        for component in self.components() {
            let mut expansion = ExprMatrix::zeros(component.ports().len(), branch_count);
            for (row, port) in component.ports().iter().enumerate() {
                let index = self
                    .port_binding(component.name(), port.name())
                    .ok_or_else(|| {
                        Error::unbound_port(format!(
                            "Port '{}' of component '{}' is not bound to a branch.",
                            port.name(),
                            component.name()
                        ))
                    })?;
                let sign = match port.direction() {
                    PortDirection::Input => Expr::one(),
                    PortDirection::Output => Expr::number(-1.0),
                };
                expansion.set(row, index, sign);
            }
            let block = component.characteristic_matrix().matmul(&expansion)?;
            z = z.vstack(&block)?;
        }

        let mut x = ExprMatrix::zeros(self.hub_inputs().len(), branch_count);
        for (row, &index) in self.hub_inputs().iter().enumerate() {
            x.set(row, index, Expr::one());
        }
        let mut y = ExprMatrix::zeros(self.hub_outputs().len(), branch_count);
        for (row, &index) in self.hub_outputs().iter().enumerate() {
            y.set(row, index, Expr::one());
        }

        Ok(SystemMatrices { x, y, z })
    }
}
