// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! A dense matrix over the symbolic scalar, with exact inversion.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::DMatrix;

use crate::{algebra::Expr, Error};

/// A dense, row-major matrix of [`Expr`] entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprMatrix {
    rows: usize,
    cols: usize,
    data: Vec<Expr>,
}

impl ExprMatrix {
    /// Creates a matrix of the given shape, filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Expr::zero(); rows * cols],
        }
    }

    /// Creates the n×n identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut matrix = Self::zeros(n, n);
        for i in 0..n {
            matrix.set(i, i, Expr::one());
        }
        matrix
    }

    /// Creates a matrix from rows of entries.
    ///
    /// Returns an `Internal` error if the rows have unequal lengths.
    pub fn from_rows(rows: Vec<Vec<Expr>>) -> Result<Self, Error> {
        let cols = rows.first().map(|row| row.len()).unwrap_or(0);
        let num_rows = rows.len();
        let mut data = Vec::with_capacity(num_rows * cols);
        for row in rows {
            if row.len() != cols {
                return Err(Error::internal(format!(
                    "Matrix row has {} entries, expected {}.",
                    row.len(),
                    cols
                )));
            }
            data.extend(row);
        }
        Ok(Self {
            rows: num_rows,
            cols,
            data,
        })
    }

    /// The number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// The number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: Expr) {
        self.data[row * self.cols + col] = value;
    }

    /// Stacks `other` below `self`.
    ///
    /// Returns an `Internal` error if the column counts differ.
    pub fn vstack(&self, other: &ExprMatrix) -> Result<ExprMatrix, Error> {
        if self.cols != other.cols {
            return Err(Error::internal(format!(
                "Cannot stack a matrix with {} columns below one with {}.",
                other.cols, self.cols
            )));
        }
        let mut data = self.data.clone();
        data.extend(other.data.iter().cloned());
        Ok(ExprMatrix {
            rows: self.rows + other.rows,
            cols: self.cols,
            data,
        })
    }

    /// The matrix product `self * rhs`.
    ///
    /// Returns an `Internal` error if the inner dimensions disagree.
    pub fn matmul(&self, rhs: &ExprMatrix) -> Result<ExprMatrix, Error> {
        if self.cols != rhs.rows {
            return Err(Error::internal(format!(
                "Cannot multiply a {}x{} matrix by a {}x{} matrix.",
                self.rows, self.cols, rhs.rows, rhs.cols
            )));
        }
        let mut result = ExprMatrix::zeros(self.rows, rhs.cols);
        for row in 0..self.rows {
            for col in 0..rhs.cols {
                let mut terms = Vec::with_capacity(self.cols);
                for k in 0..self.cols {
                    let lhs = &self[(row, k)];
                    let factor = &rhs[(k, col)];
                    if lhs.is_zero() || factor.is_zero() {
                        continue;
                    }
                    terms.push(lhs.clone() * factor.clone());
                }
                result.set(row, col, Expr::sum(terms));
            }
        }
        Ok(result)
    }

    /// The entry-wise negation of the matrix.
    pub fn negated(&self) -> ExprMatrix {
        ExprMatrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|e| -e.clone()).collect(),
        }
    }

    /// Inverts the matrix exactly by Gauss–Jordan elimination.
    ///
    /// Pivots are chosen syntactically: numeric non-zero entries are
    /// preferred, and a symbolic entry is assumed invertible.  Fails with a
    /// `Dimension` error for non-square input and a `SingularSystem` error
    /// when a column has no usable pivot.
    pub fn inverse(&self) -> Result<ExprMatrix, Error> {
        if self.rows != self.cols {
            return Err(Error::dimension(format!(
                "Cannot invert a {}x{} matrix.",
                self.rows, self.cols
            )));
        }
        let n = self.rows;
        let mut work = self.clone();
        let mut result = ExprMatrix::identity(n);
        for col in 0..n {
            let pivot_row = (col..n)
                .find(|&row| work[(row, col)].is_nonzero_number())
                .or_else(|| (col..n).find(|&row| !work[(row, col)].is_zero()))
                .ok_or_else(|| {
                    Error::singular_system(format!("No usable pivot in column {}.", col))
                })?;
            work.swap_rows(pivot_row, col);
            result.swap_rows(pivot_row, col);

            let pivot = work[(col, col)].clone();
            for j in 0..n {
                let entry = work[(col, j)].clone() / pivot.clone();
                work.set(col, j, entry);
                let entry = result[(col, j)].clone() / pivot.clone();
                result.set(col, j, entry);
            }

            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = work[(row, col)].clone();
                if factor.is_zero() {
                    continue;
                }
                for j in 0..n {
                    let entry =
                        work[(row, j)].clone() - factor.clone() * work[(col, j)].clone();
                    work.set(row, j, entry);
                    let entry =
                        result[(row, j)].clone() - factor.clone() * result[(col, j)].clone();
                    result.set(row, j, entry);
                }
            }
        }
        Ok(result)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for j in 0..self.cols {
            self.data.swap(a * self.cols + j, b * self.cols + j);
        }
    }

    /// Returns a copy with the given symbols replaced by numbers.
    pub fn substitute(&self, bindings: &BTreeMap<String, f64>) -> ExprMatrix {
        ExprMatrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|e| e.substitute(bindings)).collect(),
        }
    }

    /// Returns the names of all free symbols in the matrix, sorted.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        for entry in &self.data {
            entry.collect_symbols(&mut symbols);
        }
        symbols
    }

    /// Converts the matrix to a numeric `nalgebra` matrix.
    ///
    /// Fails with a `Configuration` error naming the free symbols if any
    /// remain.
    pub fn to_numeric(&self) -> Result<DMatrix<f64>, Error> {
        let free = self.free_symbols();
        if !free.is_empty() {
            return Err(Error::configuration(format!(
                "Matrix still contains free symbols: {}.",
                free.into_iter().collect::<Vec<_>>().join(", ")
            )));
        }
        let mut values = Vec::with_capacity(self.data.len());
        for entry in &self.data {
            values.push(entry.eval()?);
        }
        Ok(DMatrix::from_row_slice(self.rows, self.cols, &values))
    }
}

impl std::ops::Index<(usize, usize)> for ExprMatrix {
    type Output = Expr;

    fn index(&self, (row, col): (usize, usize)) -> &Expr {
        &self.data[row * self.cols + col]
    }
}

impl std::fmt::Display for ExprMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..self.rows {
            if row > 0 {
                writeln!(f)?;
            }
            write!(f, "[")?;
            for col in 0..self.cols {
                if col > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", self[(row, col)])?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::ExprMatrix;
    use crate::algebra::Expr;

    fn num(value: f64) -> Expr {
        Expr::number(value)
    }

    fn numeric(rows: Vec<Vec<f64>>) -> ExprMatrix {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(num).collect())
            .collect();
        match ExprMatrix::from_rows(rows) {
            Ok(matrix) => matrix,
            Err(e) => panic!("{}", e),
        }
    }

    #[test]
    fn test_construction() {
        let zeros = ExprMatrix::zeros(2, 3);
        assert_eq!(zeros.rows(), 2);
        assert_eq!(zeros.cols(), 3);
        assert!(zeros[(1, 2)].is_zero());

        let eye = ExprMatrix::identity(2);
        assert_eq!(eye.to_string(), "[1.0, 0.0]\n[0.0, 1.0]");

        assert!(ExprMatrix::from_rows(vec![vec![num(1.0)], vec![]])
            .is_err_and(|e| e.to_string() == "Internal: Matrix row has 0 entries, expected 1."));
    }

    #[test]
    fn test_vstack_and_matmul() {
        let top = numeric(vec![vec![1.0, 2.0]]);
        let bottom = numeric(vec![vec![3.0, 4.0]]);
        let stacked = top.vstack(&bottom).ok();
        assert_eq!(stacked, Some(numeric(vec![vec![1.0, 2.0], vec![3.0, 4.0]])));

        let lhs = numeric(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let rhs = numeric(vec![vec![5.0], vec![6.0]]);
        assert_eq!(lhs.matmul(&rhs).ok(), Some(numeric(vec![vec![17.0], vec![39.0]])));

        assert!(top.vstack(&numeric(vec![vec![1.0]])).is_err());
        assert!(top.matmul(&numeric(vec![vec![1.0]])).is_err());
    }

    #[test]
    fn test_numeric_inverse() {
        let matrix = numeric(vec![vec![2.0, 0.0], vec![1.0, 1.0]]);
        let inverse = match matrix.inverse() {
            Ok(inverse) => inverse,
            Err(e) => panic!("{}", e),
        };
        assert_eq!(inverse, numeric(vec![vec![0.5, 0.0], vec![-0.5, 1.0]]));

        // Row swaps: a permutation matrix is its own inverse.
        let permutation = numeric(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        assert_eq!(permutation.inverse().ok(), Some(permutation));
    }

    #[test]
    fn test_inverse_failures() {
        let rectangular = ExprMatrix::zeros(2, 3);
        assert!(rectangular
            .inverse()
            .is_err_and(|e| e.to_string() == "Dimension: Cannot invert a 2x3 matrix."));

        let singular = numeric(vec![vec![1.0, 2.0], vec![2.0, 4.0]]);
        assert!(singular
            .inverse()
            .is_err_and(|e| e.to_string() == "SingularSystem: No usable pivot in column 1."));
    }

    #[test]
    fn test_symbolic_inverse() {
        let diagonal = ExprMatrix::from_rows(vec![
            vec![Expr::symbol("a"), num(0.0)],
            vec![num(0.0), Expr::symbol("b")],
        ]);
        let diagonal = match diagonal {
            Ok(matrix) => matrix,
            Err(e) => panic!("{}", e),
        };
        let inverse = match diagonal.inverse() {
            Ok(inverse) => inverse,
            Err(e) => panic!("{}", e),
        };
        assert_eq!(inverse.to_string(), "[1.0 / a, 0.0]\n[0.0, 1.0 / b]");

        let bindings = BTreeMap::from([("a".to_string(), 2.0), ("b".to_string(), 4.0)]);
        let numeric_inverse = match inverse.substitute(&bindings).to_numeric() {
            Ok(matrix) => matrix,
            Err(e) => panic!("{}", e),
        };
        assert_eq!(numeric_inverse[(0, 0)], 0.5);
        assert_eq!(numeric_inverse[(1, 1)], 0.25);
    }

    #[test]
    fn test_to_numeric_with_free_symbols() {
        let matrix = ExprMatrix::from_rows(vec![vec![Expr::symbol("eta"), num(1.0)]]);
        let matrix = match matrix {
            Ok(matrix) => matrix,
            Err(e) => panic!("{}", e),
        };
        assert_eq!(matrix.free_symbols().into_iter().collect::<Vec<_>>(), ["eta"]);
        assert!(matrix
            .to_numeric()
            .is_err_and(|e| e.to_string()
                == "Configuration: Matrix still contains free symbols: eta."));
    }
}
