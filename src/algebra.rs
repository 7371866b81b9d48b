// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Exact linear algebra over scalars that can be numbers or free symbols.
//!
//! All matrix manipulation in this library (characteristic matrices, the
//! assembled system matrices and the coupling-matrix derivation) runs on the
//! [`Expr`] scalar and the [`ExprMatrix`] dense matrix, so symbolic and
//! numeric hubs share a single code path.  Numeric values are only split off
//! at the very end, by [`ExprMatrix::to_numeric`].

mod expr;
mod matrix;

pub use expr::Expr;
pub use matrix::ExprMatrix;
