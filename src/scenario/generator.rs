//! Generator descriptors and the cost model.
//!
//! Each generator carries a [`Technology`] classification that answers
//! capability queries (fossil? storage? counts for reserves?) so that
//! penalty terms never branch on concrete types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Technology classification for a generator.
///
/// Capability queries on this enum replace type-identity checks in the
/// penalty and cost code: a term asks `is_fossil()` or
/// `counts_for_reserves()`, never "is this a CCGT".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Technology {
    Coal,
    CoalCcs,
    Ccgt,
    CcgtCcs,
    Ocgt,
    Wind,
    Pv,
    Cst,
    Hydro,
    PumpedHydro,
    Biofuel,
    Battery,
    Geothermal,
}

impl Technology {
    /// Fossil-fuelled technologies, counted against the fossil share limit.
    pub fn is_fossil(self) -> bool {
        matches!(
            self,
            Technology::Coal
                | Technology::CoalCcs
                | Technology::Ccgt
                | Technology::CcgtCcs
                | Technology::Ocgt
        )
    }

    /// Storage technologies shift energy rather than generate it.
    pub fn is_storage(self) -> bool {
        matches!(self, Technology::PumpedHydro | Technology::Battery)
    }

    /// Counts against the hydro generation limit. Pumped storage is
    /// excluded: its discharge is recycled energy, not new inflow.
    pub fn counts_for_hydro_limit(self) -> bool {
        matches!(self, Technology::Hydro)
    }

    /// Counts against the bioenergy limit.
    pub fn is_biofuel(self) -> bool {
        matches!(self, Technology::Biofuel)
    }

    /// Output follows an exogenous resource trace (wind, insolation)
    /// rather than operator instruction.
    pub fn has_variable_capacity_factor(self) -> bool {
        matches!(self, Technology::Wind | Technology::Pv)
    }

    /// Can be instructed to produce up to capacity at any time step.
    pub fn is_dispatchable(self) -> bool {
        !self.has_variable_capacity_factor()
    }

    /// Contributes unused capacity headroom to the reserves term:
    /// dispatchable, not storage, not resource-limited.
    pub fn counts_for_reserves(self) -> bool {
        self.is_dispatchable() && !self.is_storage()
    }

    /// Captures and stores a share of its combustion CO₂.
    pub fn has_ccs(self) -> bool {
        matches!(self, Technology::CoalCcs | Technology::CcgtCcs)
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Technology::Coal => "coal",
            Technology::CoalCcs => "coal-CCS",
            Technology::Ccgt => "CCGT",
            Technology::CcgtCcs => "CCGT-CCS",
            Technology::Ocgt => "OCGT",
            Technology::Wind => "wind",
            Technology::Pv => "PV",
            Technology::Cst => "CST",
            Technology::Hydro => "hydro",
            Technology::PumpedHydro => "pumped-hydro",
            Technology::Biofuel => "biofuel",
            Technology::Battery => "battery",
            Technology::Geothermal => "geothermal",
        };
        f.write_str(label)
    }
}

/// Economy-wide prices and rates shared by every generator's cost hooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostModel {
    /// Real discount rate used for annuitising capital, e.g. 0.05.
    pub discount_rate: f64,
    /// Carbon price in $/t CO₂ emitted.
    pub carbon_price_per_t: f64,
    /// Coal price in $/GJ of fuel burned.
    pub coal_price_per_gj: f64,
    /// Gas price in $/GJ of fuel burned.
    pub gas_price_per_gj: f64,
    /// Transport and storage cost for captured CO₂, $/t.
    pub ccs_storage_per_t: f64,
    /// New transmission capacity cost, $ per MW per km of link length.
    pub tx_cost_per_mw_km: f64,
    /// Economic lifetime of transmission assets in years.
    pub tx_lifetime_years: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            discount_rate: 0.05,
            carbon_price_per_t: 0.0,
            coal_price_per_gj: 2.0,
            gas_price_per_gj: 9.0,
            ccs_storage_per_t: 27.0,
            tx_cost_per_mw_km: 800.0,
            tx_lifetime_years: 50.0,
        }
    }
}

/// Annual payment equivalent to one dollar of capital repaid over
/// `lifetime_years` at `rate`. A zero rate degenerates to straight-line
/// repayment.
pub fn annuity_factor(rate: f64, lifetime_years: f64) -> f64 {
    if rate > 0.0 {
        (1.0 - (1.0 + rate).powf(-lifetime_years)) / rate
    } else {
        lifetime_years
    }
}

/// One generating (or storage) unit in the scenario.
///
/// Capacity is the mutable search parameter; the power and spill series are
/// overwritten by each dispatch run. Cloning a `Generator` (via the context)
/// clones those series too, so concurrent evaluations never share output
/// buffers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generator {
    pub name: String,
    /// Index into the scenario's region roster.
    pub region: usize,
    pub technology: Technology,
    /// Nameplate capacity in MW. Overwritten per candidate; may be negative
    /// transiently during search.
    pub capacity_mw: f64,
    /// Storage duration in hours. Only meaningful (and only settable) for
    /// pumped hydro.
    pub storage_hours: f64,
    /// Emitted CO₂ per MWh generated, t/MWh. `None` means the generator
    /// carries no emissions attribute and contributes zero to the
    /// emissions term.
    pub emissions_intensity: Option<f64>,
    /// Captured CO₂ per MWh for CCS plant, t/MWh, priced at the CCS
    /// storage rate.
    pub capture_intensity: Option<f64>,
    /// Fuel burned per MWh generated, GJ/MWh. `None` for unfuelled plant.
    pub heat_rate_gj_per_mwh: Option<f64>,
    /// Overnight capital cost, $/MW.
    pub capcost_per_mw: f64,
    /// Fixed operating cost, $/MW/yr.
    pub fom_per_mw_yr: f64,
    /// Variable operating cost, $/MWh.
    pub vom_per_mwh: f64,
    /// Economic lifetime for annuitisation, years.
    pub lifetime_years: f64,
    /// Dispatched power per time step, MW. Written by the simulator.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub power_mw: Vec<f64>,
    /// Spilled (curtailed) power per time step, MW. May be empty for
    /// generators the simulator never spills.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spill_mw: Vec<f64>,
}

impl Generator {
    /// Creates a generator with zero capacity and default unit costs.
    pub fn new(name: impl Into<String>, region: usize, technology: Technology) -> Self {
        Self {
            name: name.into(),
            region,
            technology,
            capacity_mw: 0.0,
            storage_hours: 0.0,
            emissions_intensity: None,
            capture_intensity: None,
            heat_rate_gj_per_mwh: None,
            capcost_per_mw: 0.0,
            fom_per_mw_yr: 0.0,
            vom_per_mwh: 0.0,
            lifetime_years: 30.0,
            power_mw: Vec::new(),
            spill_mw: Vec::new(),
        }
    }

    /// Number of free parameters this generator contributes to the
    /// candidate vector. Pumped hydro exposes power and storage duration;
    /// everything else exposes capacity alone.
    pub fn param_count(&self) -> usize {
        match self.technology {
            Technology::PumpedHydro => 2,
            _ => 1,
        }
    }

    /// Writes this generator's slice of the candidate vector.
    ///
    /// `params.len()` must equal [`param_count`](Self::param_count); the
    /// context enforces this before slicing.
    pub fn set_params(&mut self, params: &[f64]) {
        debug_assert_eq!(params.len(), self.param_count());
        self.capacity_mw = params[0];
        if self.param_count() == 2 {
            self.storage_hours = params[1];
        }
    }

    /// Current parameter values in candidate-vector order.
    pub fn params(&self) -> Vec<f64> {
        if self.param_count() == 2 {
            vec![self.capacity_mw, self.storage_hours]
        } else {
            vec![self.capacity_mw]
        }
    }

    /// Total energy generated over the simulated horizon, MWh.
    pub fn energy_mwh(&self, dt_hours: f64) -> f64 {
        self.power_mw.iter().sum::<f64>() * dt_hours
    }

    /// Total energy spilled over the simulated horizon, MWh. Zero when the
    /// simulator recorded no spill series.
    pub fn spill_mwh(&self, dt_hours: f64) -> f64 {
        self.spill_mw.iter().sum::<f64>() * dt_hours
    }

    /// CO₂ emitted over the horizon, tonnes. Zero without an intensity
    /// attribute.
    pub fn emissions_t(&self, dt_hours: f64) -> f64 {
        match self.emissions_intensity {
            Some(intensity) => self.energy_mwh(dt_hours) * intensity,
            None => 0.0,
        }
    }

    /// Overnight capital cost of the currently-set capacity, $.
    pub fn capital_cost(&self, _costs: &CostModel) -> f64 {
        self.capacity_mw * self.capcost_per_mw
    }

    /// Annual payment for the capital, $/yr.
    pub fn annual_capital_cost(&self, costs: &CostModel) -> f64 {
        self.capital_cost(costs) / annuity_factor(costs.discount_rate, self.lifetime_years)
    }

    /// Operating cost over the simulated horizon, $: fixed O&M on capacity
    /// plus variable O&M, fuel, carbon, and CCS storage on energy
    /// generated.
    pub fn operating_cost(&self, costs: &CostModel, dt_hours: f64, years: f64) -> f64 {
        let energy = self.energy_mwh(dt_hours);
        let fuel = self
            .heat_rate_gj_per_mwh
            .map_or(0.0, |hr| hr * self.fuel_price(costs));
        let carbon = self
            .emissions_intensity
            .map_or(0.0, |i| i * costs.carbon_price_per_t);
        let ccs = self
            .capture_intensity
            .map_or(0.0, |c| c * costs.ccs_storage_per_t);
        self.capacity_mw * self.fom_per_mw_yr * years
            + energy * (self.vom_per_mwh + fuel + carbon + ccs)
    }

    fn fuel_price(&self, costs: &CostModel) -> f64 {
        match self.technology {
            Technology::Coal | Technology::CoalCcs => costs.coal_price_per_gj,
            Technology::Ccgt | Technology::CcgtCcs | Technology::Ocgt => costs.gas_price_per_gj,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_queries() {
        assert!(Technology::Coal.is_fossil());
        assert!(Technology::CcgtCcs.is_fossil());
        assert!(!Technology::Biofuel.is_fossil());

        assert!(Technology::PumpedHydro.is_storage());
        assert!(Technology::Battery.is_storage());
        assert!(!Technology::Hydro.is_storage());

        assert!(Technology::Hydro.counts_for_hydro_limit());
        assert!(!Technology::PumpedHydro.counts_for_hydro_limit());

        assert!(Technology::Wind.has_variable_capacity_factor());
        assert!(!Technology::Cst.has_variable_capacity_factor());
    }

    #[test]
    fn test_reserves_eligibility() {
        // Dispatchable, non-storage, non-variable plant counts.
        assert!(Technology::Ccgt.counts_for_reserves());
        assert!(Technology::Hydro.counts_for_reserves());
        assert!(Technology::Cst.counts_for_reserves());
        // Storage and variable plant do not.
        assert!(!Technology::Battery.counts_for_reserves());
        assert!(!Technology::PumpedHydro.counts_for_reserves());
        assert!(!Technology::Wind.counts_for_reserves());
        assert!(!Technology::Pv.counts_for_reserves());
    }

    #[test]
    fn test_annuity_factor() {
        // 5% over 30 years: standard annuity, ~15.372.
        let af = annuity_factor(0.05, 30.0);
        assert!((af - 15.3724).abs() < 1e-3, "got {af}");
        // Zero rate degenerates to the lifetime.
        assert!((annuity_factor(0.0, 30.0) - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_param_protocol() {
        let mut psh = Generator::new("psh", 0, Technology::PumpedHydro);
        assert_eq!(psh.param_count(), 2);
        psh.set_params(&[400.0, 6.0]);
        assert_eq!(psh.params(), vec![400.0, 6.0]);

        let mut ccgt = Generator::new("ccgt", 0, Technology::Ccgt);
        assert_eq!(ccgt.param_count(), 1);
        ccgt.set_params(&[250.0]);
        assert_eq!(ccgt.params(), vec![250.0]);
    }

    #[test]
    fn test_energy_and_emissions() {
        let mut gen = Generator::new("coal", 0, Technology::Coal);
        gen.emissions_intensity = Some(0.9);
        gen.power_mw = vec![100.0, 200.0, 300.0];
        assert!((gen.energy_mwh(1.0) - 600.0).abs() < 1e-9);
        assert!((gen.emissions_t(1.0) - 540.0).abs() < 1e-9);
        // No spill series recorded: zero, not an error.
        assert_eq!(gen.spill_mwh(1.0), 0.0);
    }

    #[test]
    fn test_no_intensity_means_zero_emissions() {
        let mut gen = Generator::new("wind", 0, Technology::Wind);
        gen.power_mw = vec![50.0; 10];
        assert_eq!(gen.emissions_t(1.0), 0.0);
    }

    #[test]
    fn test_operating_cost_components() {
        let costs = CostModel {
            carbon_price_per_t: 50.0,
            gas_price_per_gj: 10.0,
            ..CostModel::default()
        };
        let mut gen = Generator::new("ccgt", 0, Technology::Ccgt);
        gen.capacity_mw = 100.0;
        gen.fom_per_mw_yr = 10_000.0;
        gen.vom_per_mwh = 4.0;
        gen.heat_rate_gj_per_mwh = Some(7.0);
        gen.emissions_intensity = Some(0.4);
        gen.power_mw = vec![100.0; 10];

        // 1000 MWh at $4 VOM + $70 fuel + $20 carbon, plus one year of FOM.
        let expected = 100.0 * 10_000.0 + 1000.0 * (4.0 + 70.0 + 20.0);
        let got = gen.operating_cost(&costs, 1.0, 1.0);
        assert!((got - expected).abs() < 1e-6, "got {got}, want {expected}");
    }
}
