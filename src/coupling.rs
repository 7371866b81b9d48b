// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Derivation of the coupling matrix: the closed-form linear map from hub
//! input flows to hub output flows, obtained by eliminating all internal
//! branches through the full balance system.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::{DMatrix, DVector};

use crate::algebra::{Expr, ExprMatrix};
use crate::assembly::SystemMatrices;
use crate::{CompiledHub, Error};

/// The derived coupling matrix C, satisfying `outputs = C * inputs` for
/// every consistent steady state of the hub.
///
/// Rows follow the hub-output branch order, columns the hub-input branch
/// order; both orders are carried along as branch names.
#[derive(Clone, Debug, PartialEq)]
pub struct CouplingMatrix {
    matrix: ExprMatrix,
    input_branches: Vec<String>,
    output_branches: Vec<String>,
}

/// Coupling derivation.
impl SystemMatrices {
    /// Derives the coupling matrix from the system matrices.
    ///
    /// Q is X stacked above Z and R is a negative identity above a zero
    /// block; the derivation inverts Q exactly and returns C = -Y * Q^-1 * R.
    ///
    /// Fails with a `Dimension` error when Q is not square (the topology
    /// does not pin every branch with exactly one equation) and with a
    /// `SingularSystem` error when Q is not invertible.
    pub fn derive_coupling(&self) -> Result<ExprMatrix, Error> {
        let branch_count = self.x.cols();
        let q = self.x.vstack(&self.z)?;
        if q.rows() != branch_count {
            let determinacy = if q.rows() < branch_count {
                "under"
            } else {
                "over"
            };
            return Err(Error::dimension(format!(
                "The balance system has {} equations for {} branches; the topology is {}-determined.",
                q.rows(),
                branch_count,
                determinacy,
            )));
        }
        let q_inverse = q.inverse()?;

        let input_count = self.x.rows();
        let mut r = ExprMatrix::zeros(q.rows(), input_count);
        for i in 0..input_count {
            r.set(i, i, Expr::number(-1.0));
        }

        Ok(self.y.matmul(&q_inverse)?.matmul(&r)?.negated())
    }
}

/// Coupling derivation, labeled with branch names.
impl CompiledHub {
    /// Assembles the system matrices and derives the [`CouplingMatrix`].
    pub fn coupling_matrix(&self) -> Result<CouplingMatrix, Error> {
        let matrices = self.system_matrices()?;
        let matrix = matrices.derive_coupling()?;
        Ok(CouplingMatrix {
            matrix,
            input_branches: self
                .hub_input_branches()
                .map(|b| b.name().to_string())
                .collect(),
            output_branches: self
                .hub_output_branches()
                .map(|b| b.name().to_string())
                .collect(),
        })
    }
}

impl CouplingMatrix {
    /// The derived matrix.
    pub fn matrix(&self) -> &ExprMatrix {
        &self.matrix
    }

    /// The hub-input branch names, in column order.
    pub fn input_branches(&self) -> &[String] {
        &self.input_branches
    }

    /// The hub-output branch names, in row order.
    pub fn output_branches(&self) -> &[String] {
        &self.output_branches
    }

    /// The names of the parameters still free in the matrix, sorted.
    pub fn free_parameters(&self) -> BTreeSet<String> {
        self.matrix.free_symbols()
    }

    /// Returns a copy with the given parameters replaced by numbers.
    ///
    /// The symbolic inversion is parameter-independent in structure, so
    /// deriving once and substituting repeatedly is the cheap path for
    /// evaluating many parameter samples.  A requested parameter that does
    /// not appear free in the matrix is skipped with a warning.
    pub fn substitute(&self, values: &[(&str, f64)]) -> CouplingMatrix {
        let free = self.matrix.free_symbols();
        let mut bindings = BTreeMap::new();
        for (name, value) in values {
            if !free.contains(*name) {
                tracing::warn!(
                    "Parameter '{}' does not appear free in the coupling matrix.",
                    name
                );
                continue;
            }
            bindings.insert((*name).to_string(), *value);
        }
        CouplingMatrix {
            matrix: self.matrix.substitute(&bindings),
            input_branches: self.input_branches.clone(),
            output_branches: self.output_branches.clone(),
        }
    }

    /// Converts the matrix to a numeric `nalgebra` matrix.
    ///
    /// Fails with a `Configuration` error naming the parameters that are
    /// still free.
    pub fn to_numeric(&self) -> Result<DMatrix<f64>, Error> {
        self.matrix.to_numeric()
    }

    /// Evaluates the output flows for the given input flows, in branch
    /// order.  All parameters must have been substituted.
    pub fn evaluate(&self, inputs: &[f64]) -> Result<DVector<f64>, Error> {
        if inputs.len() != self.input_branches.len() {
            return Err(Error::dimension(format!(
                "Expected {} input flows, got {}.",
                self.input_branches.len(),
                inputs.len()
            )));
        }
        let matrix = self.to_numeric()?;
        Ok(matrix * DVector::from_column_slice(inputs))
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{DMatrix, DVector};

    use super::SystemMatrices;
    use crate::algebra::ExprMatrix;
    use crate::hub::test_utils::HubBuilder;
    use crate::{Error, Expr};

    fn numeric_rows(rows: Vec<Vec<f64>>) -> ExprMatrix {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Expr::number).collect())
            .collect();
        match ExprMatrix::from_rows(rows) {
            Ok(matrix) => matrix,
            Err(e) => panic!("{}", e),
        }
    }

    #[test]
    fn test_numeric_coupling() -> Result<(), Error> {
        let coupling = HubBuilder::chp_boiler_hub(false).compile()?.coupling_matrix()?;

        assert_eq!(
            coupling.input_branches(),
            [
                "GasInput_out_to_Boiler1_fuel_in",
                "GasInput_out_to_CHP1_fuel_in"
            ]
        );
        assert_eq!(
            coupling.output_branches(),
            [
                "Boiler1_heat_out_to_HeatLoad_in",
                "CHP1_elec_out_to_ElecLoad_in",
                "CHP1_heat_out_to_HeatLoad_in"
            ]
        );
        assert!(coupling.free_parameters().is_empty());

        #[rustfmt::skip]
        let expected = DMatrix::from_row_slice(3, 2, &[
            -0.9,  0.0,
             0.0, -0.3,
             0.0, -0.8,
        ]);
        assert_eq!(coupling.to_numeric()?, expected);
        Ok(())
    }

    #[test]
    fn test_symbolic_coupling() -> Result<(), Error> {
        let coupling = HubBuilder::chp_boiler_hub(true).compile()?.coupling_matrix()?;

        let free: Vec<String> = coupling.free_parameters().into_iter().collect();
        assert_eq!(free, ["eta_boiler", "eta_q", "eta_w"]);

        // The unspecialized matrix is not numerically evaluable.
        assert!(coupling.to_numeric().is_err_and(|e| e.to_string()
            == "Configuration: Matrix still contains free symbols: eta_boiler, eta_q, eta_w."));

        let specialized =
            coupling.substitute(&[("eta_q", 0.8), ("eta_w", 0.3), ("eta_boiler", 0.9)]);
        #[rustfmt::skip]
        let expected = DMatrix::from_row_slice(3, 2, &[
            -0.9,  0.0,
             0.0, -0.3,
             0.0, -0.8,
        ]);
        assert_eq!(specialized.to_numeric()?, expected);
        Ok(())
    }

    #[test]
    fn test_specialization_is_idempotent() -> Result<(), Error> {
        let coupling = HubBuilder::chp_boiler_hub(true).compile()?.coupling_matrix()?;
        let values = [("eta_q", 0.8), ("eta_w", 0.3), ("eta_boiler", 0.9)];
        let first = coupling.substitute(&values).to_numeric()?;
        let second = coupling.substitute(&values).to_numeric()?;
        assert_eq!(first, second);

        // Substituting into an already specialized matrix changes nothing.
        let twice = coupling.substitute(&values).substitute(&values).to_numeric()?;
        assert_eq!(first, twice);
        Ok(())
    }

    #[test]
    fn test_substitute_unknown_parameter() -> Result<(), Error> {
        let coupling = HubBuilder::chp_boiler_hub(true).compile()?.coupling_matrix()?;
        // Non-fatal: the unknown name is skipped with a warning.
        let specialized = coupling.substitute(&[
            ("eta_q", 0.8),
            ("eta_w", 0.3),
            ("eta_boiler", 0.9),
            ("eta_turbine", 0.5),
        ]);
        assert!(specialized.free_parameters().is_empty());
        Ok(())
    }

    #[test]
    fn test_evaluate() -> Result<(), Error> {
        let coupling = HubBuilder::chp_boiler_hub(false).compile()?.coupling_matrix()?;
        let outputs = coupling.evaluate(&[10.0, 20.0])?;
        assert_eq!(outputs, DVector::from_column_slice(&[-9.0, -6.0, -16.0]));

        assert!(coupling
            .evaluate(&[10.0])
            .is_err_and(|e| e.to_string() == "Dimension: Expected 2 input flows, got 1."));
        Ok(())
    }

    #[test]
    fn test_square_precondition() -> Result<(), Error> {
        // A storage hub is under-determined in a single steady state: the
        // virtual state branch adds a column without an input equation.
        let hub = HubBuilder::storage_hub().compile()?;
        assert!(hub.coupling_matrix().is_err_and(|e| e.to_string()
            == "Dimension: The balance system has 6 equations for 8 branches; \
                the topology is under-determined."));
        Ok(())
    }

    #[test]
    fn test_singular_system() {
        // Two identical equations leave one branch unconstrained.
        let matrices = SystemMatrices {
            x: numeric_rows(vec![vec![1.0, 0.0]]),
            y: numeric_rows(vec![vec![0.0, 1.0]]),
            z: numeric_rows(vec![vec![1.0, 0.0]]),
        };
        assert!(matrices
            .derive_coupling()
            .is_err_and(|e| e.to_string() == "SingularSystem: No usable pivot in column 1."));
    }

    #[test]
    fn test_overdetermined_system() {
        let matrices = SystemMatrices {
            x: numeric_rows(vec![vec![1.0, 0.0]]),
            y: numeric_rows(vec![vec![0.0, 1.0]]),
            z: numeric_rows(vec![vec![0.9, 1.0], vec![0.9, 1.0]]),
        };
        assert!(matrices.derive_coupling().is_err_and(|e| e.to_string()
            == "Dimension: The balance system has 3 equations for 2 branches; \
                the topology is over-determined."));
    }
}
