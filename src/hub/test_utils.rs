// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module is only compiled when running unit tests and contains
//! features that are shared by the test modules of the crate:
//!
//! - the `HubBuilder`, which can declaratively build the recurring hub
//!   topologies used across tests.

use crate::algebra::Expr;
use crate::{Component, HubGraph};

/// A builder for creating hub topologies easily, for use in tests.
///
/// All methods panic on error; validation failures have their own tests.
pub(crate) struct HubBuilder {
    hub: HubGraph,
}

impl HubBuilder {
    pub(crate) fn new() -> Self {
        HubBuilder {
            hub: HubGraph::new(),
        }
    }

    pub(crate) fn add(&mut self, component: Component) -> &mut Self {
        if let Err(e) = self.hub.add_component(component) {
            panic!("{}", e);
        }
        self
    }

    pub(crate) fn input(&mut self, name: &str) -> &mut Self {
        if let Err(e) = self.hub.add_input(name) {
            panic!("{}", e);
        }
        self
    }

    pub(crate) fn output(&mut self, name: &str) -> &mut Self {
        if let Err(e) = self.hub.add_output(name) {
            panic!("{}", e);
        }
        self
    }

    pub(crate) fn connect(
        &mut self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> &mut Self {
        if let Err(e) = self.hub.connect(source, source_port, target, target_port) {
            panic!("{}", e);
        }
        self
    }

    pub(crate) fn finish(self) -> HubGraph {
        self.hub
    }

    /// A CHP and a boiler sharing a gas input and a heat load, with the CHP
    /// alone feeding an electrical load.
    ///
    /// With `symbolic` the efficiencies are the free symbols `eta_q`,
    /// `eta_w` and `eta_boiler`; otherwise they are 0.8, 0.3 and 0.9.
    pub(crate) fn chp_boiler_hub(symbolic: bool) -> HubGraph {
        let (eta_q, eta_w, eta_boiler) = if symbolic {
            (
                Expr::symbol("eta_q"),
                Expr::symbol("eta_w"),
                Expr::symbol("eta_boiler"),
            )
        } else {
            (Expr::number(0.8), Expr::number(0.3), Expr::number(0.9))
        };
        let mut builder = HubBuilder::new();
        builder
            .add(Component::back_pressure_chp("CHP1", eta_q, eta_w))
            .add(Component::boiler("Boiler1", eta_boiler))
            .input("GasInput")
            .output("HeatLoad")
            .output("ElecLoad")
            .connect("GasInput", "out", "CHP1", "fuel_in")
            .connect("CHP1", "heat_out", "HeatLoad", "in")
            .connect("CHP1", "elec_out", "ElecLoad", "in")
            .connect("GasInput", "out", "Boiler1", "fuel_in")
            .connect("Boiler1", "heat_out", "HeatLoad", "in");
        builder.finish()
    }

    /// The CHP/boiler hub extended with a storage unit charged from a
    /// dedicated CHP electrical port and discharging into the electrical
    /// load.
    pub(crate) fn storage_hub() -> HubGraph {
        let chp = Component::back_pressure_chp_with_outlets(
            "CHP1",
            Expr::number(0.8),
            Expr::number(0.3),
            vec!["elec_for_load".to_string(), "elec_for_storage".to_string()],
        );
        let chp = match chp {
            Ok(chp) => chp,
            Err(e) => panic!("{}", e),
        };
        let mut builder = HubBuilder::new();
        builder
            .add(chp)
            .add(Component::boiler("Boiler1", Expr::number(0.9)))
            .add(Component::storage(
                "Storage1",
                Expr::number(0.95),
                Expr::number(0.9),
            ))
            .input("GasInput")
            .output("ElecLoad")
            .output("HeatLoad")
            .connect("GasInput", "out", "CHP1", "fuel_in")
            .connect("GasInput", "out", "Boiler1", "fuel_in")
            .connect("CHP1", "heat_out", "HeatLoad", "in")
            .connect("CHP1", "elec_for_load", "ElecLoad", "in")
            .connect("CHP1", "elec_for_storage", "Storage1", "energy_in")
            .connect("Boiler1", "heat_out", "HeatLoad", "in")
            .connect("Storage1", "energy_out", "ElecLoad", "in");
        builder.finish()
    }
}
