// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! The component catalogue: the closed set of conversion and storage unit
//! types, each with a fixed port layout and a characteristic matrix of
//! linear balance equations among its port flows.

use std::collections::BTreeMap;

use crate::algebra::{Expr, ExprMatrix};
use crate::Error;

/// The direction of a component port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// A named, directed port.  A port's local index is its position in the
/// component's port list, which is fixed per variant.
#[derive(Clone, Debug, PartialEq)]
pub struct Port {
    name: String,
    direction: PortDirection,
}

impl Port {
    fn input(name: impl Into<String>) -> Self {
        Port {
            name: name.into(),
            direction: PortDirection::Input,
        }
    }

    fn output(name: impl Into<String>) -> Self {
        Port {
            name: name.into(),
            direction: PortDirection::Output,
        }
    }

    /// The name of the port.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The direction of the port.
    pub fn direction(&self) -> PortDirection {
        self.direction
    }
}

/// The kind of a simple two-port converter: one input carrier, one output
/// carrier, one gain parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConverterKind {
    /// Fuel to heat.
    Boiler,
    /// Electricity to heat, resistive.
    ElectricBoiler,
    /// Electricity to heat, with a coefficient of performance.
    HeatPump,
    /// Heat to cooling.
    AbsorptionChiller,
    /// Electricity to electricity across voltage levels.
    Transformer,
    /// Electricity to gas.
    PowerToGas,
}

impl ConverterKind {
    fn input_port(&self) -> &'static str {
        match self {
            ConverterKind::Boiler => "fuel_in",
            ConverterKind::ElectricBoiler => "elec_in",
            ConverterKind::HeatPump => "elec_in",
            ConverterKind::AbsorptionChiller => "heat_in",
            ConverterKind::Transformer => "elec_in",
            ConverterKind::PowerToGas => "elec_in",
        }
    }

    fn output_port(&self) -> &'static str {
        match self {
            ConverterKind::Boiler => "heat_out",
            ConverterKind::ElectricBoiler => "heat_out",
            ConverterKind::HeatPump => "heat_out",
            ConverterKind::AbsorptionChiller => "cool_out",
            ConverterKind::Transformer => "elec_out",
            ConverterKind::PowerToGas => "gas_out",
        }
    }

    fn gain_parameter(&self) -> &'static str {
        match self {
            ConverterKind::HeatPump | ConverterKind::AbsorptionChiller => "cop",
            _ => "eta",
        }
    }
}

impl std::fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConverterKind::Boiler => write!(f, "Boiler"),
            ConverterKind::ElectricBoiler => write!(f, "ElectricBoiler"),
            ConverterKind::HeatPump => write!(f, "HeatPump"),
            ConverterKind::AbsorptionChiller => write!(f, "AbsorptionChiller"),
            ConverterKind::Transformer => write!(f, "Transformer"),
            ConverterKind::PowerToGas => write!(f, "PowerToGas"),
        }
    }
}

/// The model of a component: which variant it is, and its parameters.
///
/// Parameters are [`Expr`] values, so a component can carry free symbols
/// (for closed-form derivation) or plain numbers interchangeably.
#[derive(Clone, Debug, PartialEq)]
pub enum ComponentModel {
    /// A two-port converter: `gain * V_in - V_out = 0`.
    Converter { kind: ConverterKind, gain: Expr },
    /// A back-pressure cogeneration unit with one fuel input, one heat
    /// output and one or more named electrical outputs:
    /// `eta_q * V_fuel - V_heat = 0` and `eta_w * V_fuel - sum(V_elec_i) = 0`.
    BackPressureChp {
        eta_q: Expr,
        eta_w: Expr,
        elec_ports: Vec<String>,
    },
    /// A storage unit with a virtual port for the per-period change in
    /// stored energy: `eta_c * V_in - V_out / eta_d - delta_E = 0`.
    Storage { eta_c: Expr, eta_d: Expr },
    /// A flexible demand satisfiable by two carriers with a substitution
    /// ratio: `V_demand = V_elec + ratio * V_heat`.
    ConvertibleLoad { substitution_ratio: Expr },
}

/// The name of the storage virtual port.  It has no physical counterpart
/// and is bound to an auto-generated branch during compilation.
pub(crate) const STORAGE_VIRTUAL_PORT: &str = "delta_soc";

/// A conversion or storage unit.
///
/// The port layout is fixed at construction and never changes; the
/// characteristic matrix is derived from the model parameters on demand.
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    name: String,
    model: ComponentModel,
    ports: Vec<Port>,
}

/// Constructors for [`Component`].
impl Component {
    /// Creates a two-port converter of the given kind.
    pub fn converter(name: impl Into<String>, kind: ConverterKind, gain: Expr) -> Self {
        Component {
            name: name.into(),
            ports: vec![Port::input(kind.input_port()), Port::output(kind.output_port())],
            model: ComponentModel::Converter { kind, gain },
        }
    }

    /// Creates a fuel-fired boiler.
    pub fn boiler(name: impl Into<String>, eta: Expr) -> Self {
        Self::converter(name, ConverterKind::Boiler, eta)
    }

    /// Creates an electric boiler.
    pub fn electric_boiler(name: impl Into<String>, eta: Expr) -> Self {
        Self::converter(name, ConverterKind::ElectricBoiler, eta)
    }

    /// Creates a heat pump.
    pub fn heat_pump(name: impl Into<String>, cop: Expr) -> Self {
        Self::converter(name, ConverterKind::HeatPump, cop)
    }

    /// Creates an absorption chiller.
    pub fn absorption_chiller(name: impl Into<String>, cop: Expr) -> Self {
        Self::converter(name, ConverterKind::AbsorptionChiller, cop)
    }

    /// Creates a transformer.
    pub fn transformer(name: impl Into<String>, eta: Expr) -> Self {
        Self::converter(name, ConverterKind::Transformer, eta)
    }

    /// Creates a power-to-gas unit.
    pub fn power_to_gas(name: impl Into<String>, eta: Expr) -> Self {
        Self::converter(name, ConverterKind::PowerToGas, eta)
    }

    /// Creates a back-pressure cogeneration unit with the default single
    /// electrical output port `elec_out`.
    pub fn back_pressure_chp(name: impl Into<String>, eta_q: Expr, eta_w: Expr) -> Self {
        Component {
            name: name.into(),
            ports: vec![
                Port::input("fuel_in"),
                Port::output("heat_out"),
                Port::output("elec_out"),
            ],
            model: ComponentModel::BackPressureChp {
                eta_q,
                eta_w,
                elec_ports: vec!["elec_out".to_string()],
            },
        }
    }

    /// Creates a back-pressure cogeneration unit with the given named
    /// electrical output ports.
    ///
    /// The efficiency parameters relate to the total fuel flow regardless
    /// of how many electrical ports share the output.  Fails with a
    /// `Configuration` error if the port list is empty, repeats a name, or
    /// clashes with the fixed `fuel_in`/`heat_out` ports.
    pub fn back_pressure_chp_with_outlets(
        name: impl Into<String>,
        eta_q: Expr,
        eta_w: Expr,
        elec_ports: Vec<String>,
    ) -> Result<Self, Error> {
        if elec_ports.is_empty() {
            return Err(Error::configuration(
                "A CHP unit needs at least one electrical output port.",
            ));
        }
        let mut ports = vec![Port::input("fuel_in"), Port::output("heat_out")];
        for elec_port in &elec_ports {
            if ports.iter().any(|p| p.name() == elec_port) {
                return Err(Error::configuration(format!(
                    "Duplicate port name '{}' in CHP unit.",
                    elec_port
                )));
            }
            ports.push(Port::output(elec_port.clone()));
        }
        Ok(Component {
            name: name.into(),
            model: ComponentModel::BackPressureChp {
                eta_q,
                eta_w,
                elec_ports,
            },
            ports,
        })
    }

    /// Creates a storage unit.
    ///
    /// Besides the `energy_in` and `energy_out` ports it declares the
    /// virtual `delta_soc` port, which is bound by the topology compiler
    /// rather than by an edge.
    pub fn storage(name: impl Into<String>, eta_c: Expr, eta_d: Expr) -> Self {
        Component {
            name: name.into(),
            model: ComponentModel::Storage { eta_c, eta_d },
            ports: vec![
                Port::input("energy_in"),
                Port::output("energy_out"),
                Port::input(STORAGE_VIRTUAL_PORT),
            ],
        }
    }

    /// Creates a convertible load.
    pub fn convertible_load(name: impl Into<String>, substitution_ratio: Expr) -> Self {
        Component {
            name: name.into(),
            model: ComponentModel::ConvertibleLoad { substitution_ratio },
            ports: vec![
                Port::input("elec_supply"),
                Port::input("heat_supply"),
                Port::output("satisfied_demand"),
            ],
        }
    }

    /// Creates a component from a string variant identifier and a parameter
    /// map, the information a configuration loader supplies.
    ///
    /// Fails with a `Configuration` error for an unknown identifier or a
    /// missing parameter.
    pub fn try_new(
        name: impl Into<String>,
        variant: &str,
        params: &BTreeMap<String, Expr>,
    ) -> Result<Self, Error> {
        fn require(
            params: &BTreeMap<String, Expr>,
            variant: &str,
            key: &str,
        ) -> Result<Expr, Error> {
            params.get(key).cloned().ok_or_else(|| {
                Error::configuration(format!(
                    "Variant '{}' requires parameter '{}'.",
                    variant, key
                ))
            })
        }

        match variant {
            "Boiler" => Ok(Self::boiler(name, require(params, variant, "eta")?)),
            "ElectricBoiler" => Ok(Self::electric_boiler(name, require(params, variant, "eta")?)),
            "HeatPump" => Ok(Self::heat_pump(name, require(params, variant, "cop")?)),
            "AbsorptionChiller" => {
                Ok(Self::absorption_chiller(name, require(params, variant, "cop")?))
            }
            "Transformer" => Ok(Self::transformer(name, require(params, variant, "eta")?)),
            "PowerToGas" => Ok(Self::power_to_gas(name, require(params, variant, "eta")?)),
            "CHPBackPressure" => Ok(Self::back_pressure_chp(
                name,
                require(params, variant, "eta_q")?,
                require(params, variant, "eta_w")?,
            )),
            "Storage" => Ok(Self::storage(
                name,
                require(params, variant, "eta_c")?,
                require(params, variant, "eta_d")?,
            )),
            "ConvertibleLoad" => Ok(Self::convertible_load(
                name,
                require(params, variant, "substitution_ratio")?,
            )),
            _ => Err(Error::configuration(format!(
                "Unknown component variant: '{}'.",
                variant
            ))),
        }
    }
}

/// Accessors for [`Component`].
impl Component {
    /// The unique name of the component.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The model of the component.
    pub fn model(&self) -> &ComponentModel {
        &self.model
    }

    /// The string identifier of the component's variant.
    pub fn variant(&self) -> String {
        match &self.model {
            ComponentModel::Converter { kind, .. } => kind.to_string(),
            ComponentModel::BackPressureChp { .. } => "CHPBackPressure".to_string(),
            ComponentModel::Storage { .. } => "Storage".to_string(),
            ComponentModel::ConvertibleLoad { .. } => "ConvertibleLoad".to_string(),
        }
    }

    /// The ports of the component, in local index order.
    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    /// Looks up a port by name, returning it with its local index.
    pub fn port(&self, name: &str) -> Option<(usize, &Port)> {
        self.ports
            .iter()
            .enumerate()
            .find(|(_, port)| port.name() == name)
    }

    /// Whether the component is a storage unit.
    pub fn is_storage(&self) -> bool {
        matches!(self.model, ComponentModel::Storage { .. })
    }

    /// The name of the component's virtual port, if it has one.
    pub fn virtual_port(&self) -> Option<&'static str> {
        if self.is_storage() {
            Some(STORAGE_VIRTUAL_PORT)
        } else {
            None
        }
    }

    /// Whether the given port name refers to the component's virtual port.
    pub fn is_virtual_port(&self, port: &str) -> bool {
        self.virtual_port() == Some(port)
    }

    /// The component's parameters as (name, value) pairs.
    pub fn parameters(&self) -> Vec<(&'static str, &Expr)> {
        match &self.model {
            ComponentModel::Converter { kind, gain } => vec![(kind.gain_parameter(), gain)],
            ComponentModel::BackPressureChp { eta_q, eta_w, .. } => {
                vec![("eta_q", eta_q), ("eta_w", eta_w)]
            }
            ComponentModel::Storage { eta_c, eta_d } => {
                vec![("eta_c", eta_c), ("eta_d", eta_d)]
            }
            ComponentModel::ConvertibleLoad { substitution_ratio } => {
                vec![("substitution_ratio", substitution_ratio)]
            }
        }
    }

    /// The characteristic matrix H: one row per balance equation, one
    /// column per port in local index order.
    pub fn characteristic_matrix(&self) -> ExprMatrix {
        match &self.model {
            ComponentModel::Converter { gain, .. } => {
                let mut h = ExprMatrix::zeros(1, 2);
                h.set(0, 0, gain.clone());
                h.set(0, 1, Expr::number(-1.0));
                h
            }
            ComponentModel::BackPressureChp {
                eta_q,
                eta_w,
                elec_ports,
            } => {
                let mut h = ExprMatrix::zeros(2, 2 + elec_ports.len());
                // Heat balance: eta_q * V_fuel - V_heat = 0
                h.set(0, 0, eta_q.clone());
                h.set(0, 1, Expr::number(-1.0));
                // Electrical balance: eta_w * V_fuel - sum(V_elec_i) = 0
                h.set(1, 0, eta_w.clone());
                for i in 0..elec_ports.len() {
                    h.set(1, 2 + i, Expr::number(-1.0));
                }
                h
            }
            ComponentModel::Storage { eta_c, eta_d } => {
                let mut h = ExprMatrix::zeros(1, 3);
                // eta_c * V_in - V_out / eta_d - delta_E = 0
                h.set(0, 0, eta_c.clone());
                h.set(0, 1, -(Expr::one() / eta_d.clone()));
                h.set(0, 2, Expr::number(-1.0));
                h
            }
            ComponentModel::ConvertibleLoad { substitution_ratio } => {
                let mut h = ExprMatrix::zeros(1, 3);
                // V_demand = V_elec + ratio * V_heat
                h.set(0, 0, Expr::number(-1.0));
                h.set(0, 1, -substitution_ratio.clone());
                h.set(0, 2, Expr::one());
                h
            }
        }
    }
}
