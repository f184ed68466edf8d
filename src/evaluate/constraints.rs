//! Violated-constraint bitmask and per-run constraint activation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::run::RunConfig;
use crate::scenario::ScenarioContext;

/// One constraint whose violation can be reported.
///
/// The bit assignment is fixed: constraints are independent and multiple
/// simultaneous violations are reported together by OR-ing bits. No two
/// constraints share a bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    Unserved,
    Reserves,
    MinRegional,
    Emissions,
    Fossil,
    Bioenergy,
    Hydro,
}

/// All reasons, in bit order.
pub const ALL_REASONS: [Reason; 7] = [
    Reason::Unserved,
    Reason::Reserves,
    Reason::MinRegional,
    Reason::Emissions,
    Reason::Fossil,
    Reason::Bioenergy,
    Reason::Hydro,
];

impl Reason {
    /// The bit this reason occupies in a [`ReasonMask`].
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }

    /// Human-readable constraint label, used in the results artifact.
    pub fn label(self) -> &'static str {
        match self {
            Reason::Unserved => "unserved energy",
            Reason::Reserves => "minimum reserves",
            Reason::MinRegional => "minimum regional generation",
            Reason::Emissions => "emissions limit",
            Reason::Fossil => "fossil share limit",
            Reason::Bioenergy => "bioenergy limit",
            Reason::Hydro => "hydro limit",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bitwise OR of the currently violated constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonMask(pub u32);

impl ReasonMask {
    pub const EMPTY: ReasonMask = ReasonMask(0);

    pub fn contains(self, reason: Reason) -> bool {
        self.0 & reason.bit() != 0
    }

    pub fn insert(&mut self, reason: Reason) {
        self.0 |= reason.bit();
    }

    pub fn union(self, other: ReasonMask) -> ReasonMask {
        ReasonMask(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Raw code written to the trace file.
    pub fn code(self) -> u32 {
        self.0
    }
}

/// A non-negative penalty plus the reasons that produced it.
///
/// Invariant: a reason bit is set iff that constraint's penalty term was
/// strictly positive.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PenaltyReport {
    pub value: f64,
    pub reasons: ReasonMask,
}

impl PenaltyReport {
    /// Folds one term into the report: the bit is set only for a strictly
    /// positive penalty.
    pub fn add_term(&mut self, reason: Reason, penalty: f64) {
        if penalty > 0.0 {
            self.value += penalty;
            self.reasons.insert(reason);
        }
    }
}

/// The penalty terms active for one run.
///
/// Unserved energy and the bioenergy/hydro limits are always assessed.
/// The remaining terms are skipped when their threshold means
/// "unconstrained", avoiding needless computation and spurious penalty
/// contributions.
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    active: Vec<Reason>,
}

impl ConstraintSet {
    /// Derives the active set from the run configuration and scenario.
    pub fn from_config(config: &RunConfig, ctx: &ScenarioContext) -> Self {
        let mut active = vec![Reason::Unserved, Reason::Bioenergy, Reason::Hydro];
        if config.min_reserves_mw > 0.0 {
            active.push(Reason::Reserves);
        }
        if config.emissions_limit_mt.is_finite() {
            active.push(Reason::Emissions);
        }
        if config.fossil_share_limit < 1.0 {
            active.push(Reason::Fossil);
        }
        if ctx.min_regional_share > 0.0 {
            active.push(Reason::MinRegional);
        }
        Self { active }
    }

    pub fn is_active(&self, reason: Reason) -> bool {
        self.active.contains(&reason)
    }

    pub fn active(&self) -> &[Reason] {
        &self.active
    }

    /// Labels of the configured constraints whose bits are set in `mask`,
    /// in bit order.
    pub fn violated_labels(&self, mask: ReasonMask) -> Vec<&'static str> {
        ALL_REASONS
            .iter()
            .filter(|r| self.is_active(**r) && mask.contains(**r))
            .map(|r| r.label())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunConfig;
    use crate::scenario::ScenarioContext;

    fn base_ctx() -> ScenarioContext {
        ScenarioContext::single_region(vec![100.0; 4], 1.0)
    }

    #[test]
    fn test_bits_are_disjoint() {
        let mut seen = 0u32;
        for reason in ALL_REASONS {
            assert_eq!(seen & reason.bit(), 0, "{reason} shares a bit");
            seen |= reason.bit();
        }
        assert_eq!(seen.count_ones() as usize, ALL_REASONS.len());
    }

    #[test]
    fn test_mask_union_and_contains() {
        let mut a = ReasonMask::EMPTY;
        a.insert(Reason::Unserved);
        let mut b = ReasonMask::EMPTY;
        b.insert(Reason::Fossil);
        let u = a.union(b);
        assert!(u.contains(Reason::Unserved));
        assert!(u.contains(Reason::Fossil));
        assert!(!u.contains(Reason::Hydro));
        assert_eq!(u.code(), Reason::Unserved.bit() | Reason::Fossil.bit());
    }

    #[test]
    fn test_report_sets_bit_only_when_positive() {
        let mut report = PenaltyReport::default();
        report.add_term(Reason::Emissions, 0.0);
        assert!(report.reasons.is_empty());
        assert_eq!(report.value, 0.0);

        report.add_term(Reason::Emissions, 8.0);
        assert!(report.reasons.contains(Reason::Emissions));
        assert_eq!(report.value, 8.0);
    }

    #[test]
    fn test_default_activation() {
        let set = ConstraintSet::from_config(&RunConfig::default(), &base_ctx());
        assert!(set.is_active(Reason::Unserved));
        assert!(set.is_active(Reason::Bioenergy));
        assert!(set.is_active(Reason::Hydro));
        assert!(!set.is_active(Reason::Reserves));
        assert!(!set.is_active(Reason::Emissions));
        assert!(!set.is_active(Reason::Fossil));
        assert!(!set.is_active(Reason::MinRegional));
    }

    #[test]
    fn test_thresholds_activate_terms() {
        let config = RunConfig::default()
            .with_min_reserves_mw(500.0)
            .with_emissions_limit_mt(20.0)
            .with_fossil_share_limit(0.5);
        let mut ctx = base_ctx();
        ctx.min_regional_share = 0.25;
        let set = ConstraintSet::from_config(&config, &ctx);
        assert!(set.is_active(Reason::Reserves));
        assert!(set.is_active(Reason::Emissions));
        assert!(set.is_active(Reason::Fossil));
        assert!(set.is_active(Reason::MinRegional));
    }

    #[test]
    fn test_violated_labels_respect_configuration() {
        let set = ConstraintSet::from_config(&RunConfig::default(), &base_ctx());
        let mut mask = ReasonMask::EMPTY;
        mask.insert(Reason::Unserved);
        // Fossil is not configured: its bit must not surface as a label.
        mask.insert(Reason::Fossil);
        assert_eq!(set.violated_labels(mask), vec!["unserved energy"]);
    }
}
