// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! The symbolic scalar type and its simplifying arithmetic.

use std::collections::{BTreeMap, BTreeSet};

use crate::Error;

/// A scalar expression: a number, a named free symbol, or a combination of
/// them under negation, addition, multiplication and division.
///
/// The `std::ops` implementations simplify as they build, so that entries
/// that cancel during matrix elimination collapse back to plain numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number { value: f64 },
    Symbol { name: String },
    Neg { param: Box<Expr> },
    Add { params: Vec<Expr> },
    Mul { params: Vec<Expr> },
    Div { num: Box<Expr>, den: Box<Expr> },
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::sum(vec![self, rhs])
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::sum(vec![self, -rhs])
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::product(vec![self, rhs])
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Self::product(vec![
            self,
            Self::Div {
                num: Box::new(Self::one()),
                den: Box::new(rhs),
            },
        ])
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self {
        match self {
            // -n = (-n)
            Self::Number { value } => Self::Number { value: -value },
            // -(-a) = a
            Self::Neg { param } => *param,
            // -(a + b) = -a + -b
            Self::Add { params } => Self::sum(params.into_iter().map(|p| -p).collect()),
            // -(a * b) = (-1 * a * b), folded into the numeric factor
            Self::Mul { mut params } => {
                let mut factors = vec![Self::number(-1.0)];
                factors.append(&mut params);
                Self::product(factors)
            }
            // -(a / b) = (-a) / b
            Self::Div { num, den } => Self::product(vec![
                Self::number(-1.0),
                Self::Div { num, den },
            ]),
            // Symbols are the only thing `Neg` ends up wrapping.
            symbol @ Self::Symbol { .. } => Self::Neg {
                param: Box::new(symbol),
            },
        }
    }
}

/// Constructors for [`Expr`].
impl Expr {
    pub fn number(value: f64) -> Self {
        Self::Number { value }
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol { name: name.into() }
    }

    pub fn zero() -> Self {
        Self::Number { value: 0.0 }
    }

    pub fn one() -> Self {
        Self::Number { value: 1.0 }
    }

    /// Builds the simplified sum of the given terms: nested sums are
    /// flattened, numbers are folded together, and a term cancels against an
    /// already collected term that is its exact negation.
    pub(crate) fn sum(terms: Vec<Expr>) -> Self {
        fn push_term(number: &mut f64, params: &mut Vec<Expr>, term: Expr) {
            match term {
                Expr::Number { value } => *number += value,
                Expr::Add { params: inner } => {
                    for t in inner {
                        push_term(number, params, t);
                    }
                }
                term => {
                    let negated = -term.clone();
                    if let Some(pos) = params.iter().position(|p| *p == negated) {
                        params.remove(pos);
                    } else {
                        params.push(term);
                    }
                }
            }
        }

        let mut number = 0.0;
        let mut params: Vec<Expr> = Vec::new();
        for term in terms {
            push_term(&mut number, &mut params, term);
        }
        // Keep negated terms behind plain ones, so a sum has one canonical
        // form and displays as "b - a" rather than "-a + b".
        let (mut params, negatives): (Vec<_>, Vec<_>) =
            params.into_iter().partition(|p| !p.is_negative_term());
        params.extend(negatives);
        if number != 0.0 {
            params.push(Self::number(number));
        }
        match params.len() {
            0 => Self::zero(),
            1 => params.remove(0),
            _ => Self::Add { params },
        }
    }

    /// Builds the simplified product of the given factors: nested products
    /// and quotients are flattened into one numerator and one denominator,
    /// signs and numbers are folded into a single coefficient, and factors
    /// appearing on both sides of the quotient cancel syntactically.
    pub(crate) fn product(factors: Vec<Expr>) -> Self {
        fn collect(
            term: Expr,
            coef: &mut f64,
            den_coef: &mut f64,
            nums: &mut Vec<Expr>,
            dens: &mut Vec<Expr>,
            inverted: bool,
        ) {
            match term {
                Expr::Number { value } => {
                    if inverted {
                        *den_coef *= value;
                    } else {
                        *coef *= value;
                    }
                }
                Expr::Neg { param } => {
                    *coef = -*coef;
                    collect(*param, coef, den_coef, nums, dens, inverted);
                }
                Expr::Mul { params } => {
                    for p in params {
                        collect(p, coef, den_coef, nums, dens, inverted);
                    }
                }
                Expr::Div { num, den } => {
                    collect(*num, coef, den_coef, nums, dens, inverted);
                    collect(*den, coef, den_coef, nums, dens, !inverted);
                }
                term => {
                    if inverted {
                        dens.push(term);
                    } else {
                        nums.push(term);
                    }
                }
            }
        }

        let mut coef = 1.0;
        let mut den_coef = 1.0;
        let mut nums: Vec<Expr> = Vec::new();
        let mut dens: Vec<Expr> = Vec::new();
        for factor in factors {
            collect(factor, &mut coef, &mut den_coef, &mut nums, &mut dens, false);
        }

        if coef == 0.0 && den_coef != 0.0 {
            return Self::zero();
        }
        if den_coef != 0.0 {
            coef /= den_coef;
        } else {
            // A literal zero denominator is preserved so that numeric
            // evaluation reports the singularity instead of hiding it.
            dens.push(Self::zero());
        }

        let mut remaining_dens: Vec<Expr> = Vec::new();
        for den in dens {
            if let Some(pos) = nums.iter().position(|n| *n == den) {
                nums.remove(pos);
            } else {
                remaining_dens.push(den);
            }
        }

        let numerator = Self::assemble_product(coef, nums);
        if remaining_dens.is_empty() {
            numerator
        } else {
            Self::Div {
                num: Box::new(numerator),
                den: Box::new(Self::assemble_product(1.0, remaining_dens)),
            }
        }
    }

    fn assemble_product(coef: f64, mut params: Vec<Expr>) -> Self {
        if params.is_empty() {
            return Self::number(coef);
        }
        if coef == 1.0 {
            return match params.len() {
                1 => params.remove(0),
                _ => Self::Mul { params },
            };
        }
        if coef == -1.0 && params.len() == 1 {
            return -params.remove(0);
        }
        params.insert(0, Self::number(coef));
        Self::Mul { params }
    }
}

/// Queries and transformations.
impl Expr {
    /// Whether this expression is the literal number zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Number { value } if *value == 0.0)
    }

    pub(crate) fn is_nonzero_number(&self) -> bool {
        matches!(self, Self::Number { value } if *value != 0.0)
    }

    /// Evaluates the expression to a number.
    ///
    /// Fails with a `Configuration` error if a free symbol remains, and with
    /// a `SingularSystem` error on division by zero.
    pub fn eval(&self) -> Result<f64, Error> {
        match self {
            Self::Number { value } => Ok(*value),
            Self::Symbol { name } => Err(Error::configuration(format!(
                "Symbol '{}' has no numeric value.",
                name
            ))),
            Self::Neg { param } => Ok(-param.eval()?),
            Self::Add { params } => {
                let mut acc = 0.0;
                for param in params {
                    acc += param.eval()?;
                }
                Ok(acc)
            }
            Self::Mul { params } => {
                let mut acc = 1.0;
                for param in params {
                    acc *= param.eval()?;
                }
                Ok(acc)
            }
            Self::Div { num, den } => {
                let den_value = den.eval()?;
                if den_value == 0.0 {
                    return Err(Error::singular_system(format!(
                        "Division by zero when evaluating '{}'.",
                        self
                    )));
                }
                Ok(num.eval()? / den_value)
            }
        }
    }

    /// Returns a copy of the expression with the given symbols replaced by
    /// numbers, re-simplified along the way.
    pub fn substitute(&self, bindings: &BTreeMap<String, f64>) -> Expr {
        match self {
            Self::Number { .. } => self.clone(),
            Self::Symbol { name } => match bindings.get(name) {
                Some(value) => Self::number(*value),
                None => self.clone(),
            },
            Self::Neg { param } => -param.substitute(bindings),
            Self::Add { params } => {
                Self::sum(params.iter().map(|p| p.substitute(bindings)).collect())
            }
            Self::Mul { params } => {
                Self::product(params.iter().map(|p| p.substitute(bindings)).collect())
            }
            Self::Div { num, den } => num.substitute(bindings) / den.substitute(bindings),
        }
    }

    pub(crate) fn collect_symbols(&self, symbols: &mut BTreeSet<String>) {
        match self {
            Self::Number { .. } => {}
            Self::Symbol { name } => {
                symbols.insert(name.clone());
            }
            Self::Neg { param } => param.collect_symbols(symbols),
            Self::Add { params } | Self::Mul { params } => {
                for param in params {
                    param.collect_symbols(symbols);
                }
            }
            Self::Div { num, den } => {
                num.collect_symbols(symbols);
                den.collect_symbols(symbols);
            }
        }
    }

    /// Returns the names of the free symbols in the expression, sorted.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.generate_string(false))
    }
}

/// Display helpers for [`Expr`].
impl Expr {
    fn is_negative_term(&self) -> bool {
        match self {
            Self::Neg { .. } => true,
            Self::Number { value } => *value < 0.0,
            Self::Mul { params } => {
                matches!(params.first(), Some(Self::Number { value }) if *value < 0.0)
            }
            Self::Div { num, .. } => num.is_negative_term(),
            _ => false,
        }
    }

    fn generate_string(&self, bracket_whole: bool) -> String {
        match self {
            Self::Number { value } => {
                if value.fract() == 0.0 {
                    // For whole numbers, format with one decimal place.
                    format!("{:.1}", value)
                } else {
                    format!("{}", value)
                }
            }
            Self::Symbol { name } => name.clone(),
            Self::Neg { param } => format!("-{}", param.generate_string(true)),
            Self::Add { params } => {
                let mut result = String::new();
                for (i, param) in params.iter().enumerate() {
                    if i == 0 {
                        result.push_str(&param.generate_string(false));
                    } else if param.is_negative_term() {
                        result.push_str(" - ");
                        result.push_str(&(-param.clone()).generate_string(true));
                    } else {
                        result.push_str(" + ");
                        result.push_str(&param.generate_string(false));
                    }
                }
                if bracket_whole {
                    format!("({})", result)
                } else {
                    result
                }
            }
            Self::Mul { params } => params
                .iter()
                .map(|p| p.generate_string(true))
                .collect::<Vec<_>>()
                .join(" * "),
            Self::Div { num, den } => {
                let den_string = match **den {
                    Self::Number { .. } | Self::Symbol { .. } => den.generate_string(false),
                    _ => format!("({})", den.generate_string(false)),
                };
                format!("{} / {}", num.generate_string(true), den_string)
            }
        }
    }
}
