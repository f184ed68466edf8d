//! The penalty terms.
//!
//! Every exceedance is cubed before summation: the penalty surface is
//! near-zero close to feasibility and steep beyond it, which drives the
//! derivative-free search to near-zero violation instead of trading cost
//! against a linear penalty. The reserves term is the one exception to
//! aggregate cubing: it cubes the shortfall at every time step
//! independently, because reserves are an operational per-interval
//! constraint. That asymmetry is intentional and must not be collapsed
//! into an end-of-run aggregate.
//!
//! No term errors. A generator lacking a power or spill series contributes
//! zero to the affected term.

use super::constraints::{ConstraintSet, PenaltyReport, Reason};
use crate::run::RunConfig;
use crate::scenario::ScenarioContext;

/// MWh per TWh, for the bioenergy/hydro limits quoted in TWh/y.
const MWH_PER_TWH: f64 = 1e6;
/// Tonnes per megatonne, for the emissions limit quoted in Mt/y.
const T_PER_MT: f64 = 1e6;

fn cube(x: f64) -> f64 {
    x * x * x
}

fn exceedance(actual: f64, allowed: f64) -> f64 {
    (actual - allowed).max(0.0)
}

/// Assesses every active term against the post-dispatch context.
pub fn assess(ctx: &ScenarioContext, config: &RunConfig, set: &ConstraintSet) -> PenaltyReport {
    let mut report = PenaltyReport::default();
    for &reason in set.active() {
        let penalty = match reason {
            Reason::Unserved => unserved(ctx),
            Reason::Reserves => reserves(ctx, config),
            Reason::MinRegional => min_regional(ctx),
            Reason::Emissions => emissions(ctx, config),
            Reason::Fossil => fossil(ctx, config),
            Reason::Bioenergy => bioenergy(ctx, config),
            Reason::Hydro => hydro(ctx, config),
        };
        report.add_term(reason, penalty);
    }
    report
}

/// Unserved energy above the reliability standard, cubed.
pub fn unserved(ctx: &ScenarioContext) -> f64 {
    let allowed = ctx.total_demand_energy_mwh() * ctx.reliability_standard_pct / 100.0;
    cube(exceedance(ctx.unserved_energy_mwh(), allowed))
}

/// Per-time-step reserve shortfall, cubed per step and summed.
///
/// Headroom at a step is the unused capacity of dispatchable, non-storage,
/// non-variable plant plus everything spilled at that step by any
/// generator.
pub fn reserves(ctx: &ScenarioContext, config: &RunConfig) -> f64 {
    let required = config.min_reserves_mw;
    let mut penalty = 0.0;
    for t in 0..ctx.timesteps() {
        let mut headroom = 0.0;
        for gen in &ctx.generators {
            if gen.technology.counts_for_reserves() {
                if let Some(&power) = gen.power_mw.get(t) {
                    headroom += gen.capacity_mw - power;
                }
            }
            if let Some(&spill) = gen.spill_mw.get(t) {
                headroom += spill;
            }
        }
        if headroom < required {
            penalty += cube(required - headroom);
        }
    }
    penalty
}

/// Regional generation shortfalls summed across regions, then cubed once.
pub fn min_regional(ctx: &ScenarioContext) -> f64 {
    let share = ctx.min_regional_share;
    let shortfall: f64 = (0..ctx.regions.len())
        .map(|r| {
            (ctx.regional_demand_energy_mwh(r) * share - ctx.regional_generation_mwh(r)).max(0.0)
        })
        .sum();
    cube(shortfall)
}

/// Emitted CO₂ above the limit, cubed. Generators without an intensity
/// attribute emit nothing.
pub fn emissions(ctx: &ScenarioContext, config: &RunConfig) -> f64 {
    let actual: f64 = ctx
        .generators
        .iter()
        .map(|g| g.emissions_t(ctx.dt_hours))
        .sum();
    let allowed = config.emissions_limit_mt * T_PER_MT * ctx.years();
    cube(exceedance(actual, allowed))
}

/// Fossil-fuelled generation above the permitted share of demand, cubed.
pub fn fossil(ctx: &ScenarioContext, config: &RunConfig) -> f64 {
    let actual: f64 = ctx
        .generators
        .iter()
        .filter(|g| g.technology.is_fossil())
        .map(|g| g.energy_mwh(ctx.dt_hours))
        .sum();
    let allowed = ctx.total_demand_energy_mwh() * config.fossil_share_limit * ctx.years();
    cube(exceedance(actual, allowed))
}

/// Biofuel generation above the annual limit, cubed.
pub fn bioenergy(ctx: &ScenarioContext, config: &RunConfig) -> f64 {
    let actual: f64 = ctx
        .generators
        .iter()
        .filter(|g| g.technology.is_biofuel())
        .map(|g| g.energy_mwh(ctx.dt_hours))
        .sum();
    let allowed = config.bioenergy_limit_twh * MWH_PER_TWH * ctx.years();
    cube(exceedance(actual, allowed))
}

/// Hydro generation (excluding pumped storage) above the annual limit,
/// cubed.
pub fn hydro(ctx: &ScenarioContext, config: &RunConfig) -> f64 {
    let actual: f64 = ctx
        .generators
        .iter()
        .filter(|g| g.technology.counts_for_hydro_limit())
        .map(|g| g.energy_mwh(ctx.dt_hours))
        .sum();
    let allowed = config.hydro_limit_twh * MWH_PER_TWH * ctx.years();
    cube(exceedance(actual, allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::ReasonMask;
    use crate::scenario::{Generator, ScenarioContext, Technology};
    use proptest::prelude::*;

    fn ctx_with(gens: Vec<Generator>) -> ScenarioContext {
        let mut ctx = ScenarioContext::single_region(vec![100.0; 4], 1.0);
        ctx.generators = gens;
        ctx
    }

    #[test]
    fn test_unserved_zero_within_standard() {
        let mut ctx = ctx_with(vec![]);
        // 400 MWh demand, 0.002% standard → 0.008 MWh allowed.
        ctx.unserved_mw = vec![0.0; 4];
        assert_eq!(unserved(&ctx), 0.0);
    }

    #[test]
    fn test_unserved_cubes_exceedance() {
        let mut ctx = ctx_with(vec![]);
        ctx.reliability_standard_pct = 0.0;
        ctx.unserved_mw = vec![2.0, 0.0, 0.0, 0.0];
        // 2 MWh unserved, none allowed → 2³.
        assert!((unserved(&ctx) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_reserves_cubed_per_step_not_aggregate() {
        let mut gen = Generator::new("ccgt", 0, Technology::Ccgt);
        gen.capacity_mw = 100.0;
        gen.power_mw = vec![90.0, 90.0, 10.0, 10.0];
        let ctx = ctx_with(vec![gen]);
        let config = RunConfig::default().with_min_reserves_mw(20.0);
        // Headroom: 10, 10, 90, 90. Shortfall of 10 MW at two steps.
        // Per-step cubing: 2 × 10³ = 2000. Aggregate cubing would give
        // (10 + 10)³ = 8000.
        assert!((reserves(&ctx, &config) - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_reserves_counts_spill_from_any_generator() {
        let mut ccgt = Generator::new("ccgt", 0, Technology::Ccgt);
        ccgt.capacity_mw = 100.0;
        ccgt.power_mw = vec![100.0];
        let mut wind = Generator::new("wind", 0, Technology::Wind);
        wind.capacity_mw = 50.0;
        wind.power_mw = vec![30.0];
        wind.spill_mw = vec![15.0];
        let mut ctx = ctx_with(vec![ccgt, wind]);
        ctx.demand_mw = vec![vec![130.0]];
        let config = RunConfig::default().with_min_reserves_mw(20.0);
        // Wind's unused capacity is ignored (variable plant) but its spill
        // counts: headroom = 0 + 15 → shortfall 5 → 125.
        assert!((reserves(&ctx, &config) - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_reserves_missing_series_contributes_zero() {
        let mut gen = Generator::new("ccgt", 0, Technology::Ccgt);
        gen.capacity_mw = 1000.0;
        // No power series recorded at all: zero headroom, not an error.
        let ctx = ctx_with(vec![gen]);
        let config = RunConfig::default().with_min_reserves_mw(10.0);
        assert!((reserves(&ctx, &config) - 4.0 * 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_min_regional_single_aggregate_cube() {
        let mut ctx = ScenarioContext::single_region(vec![100.0; 2], 1.0);
        ctx.regions.push(crate::scenario::Region::new("region-2"));
        ctx.demand_mw.push(vec![100.0; 2]);
        ctx.min_regional_share = 0.5;
        let mut g = Generator::new("a", 0, Technology::Ccgt);
        g.power_mw = vec![40.0, 40.0];
        ctx.generators.push(g);
        // Region 0: needs 100, has 80 → short 20. Region 1: needs 100,
        // has 0 → short 100. Summed then cubed once: 120³.
        assert!((min_regional(&ctx) - 120.0_f64.powi(3)).abs() < 1e-6);
    }

    #[test]
    fn test_emissions_term() {
        let mut gen = Generator::new("coal", 0, Technology::Coal);
        gen.emissions_intensity = Some(1.0);
        gen.power_mw = vec![100.0; 4];
        let ctx = ctx_with(vec![gen]);
        // 400 t emitted over 4/8760 years.
        let years = ctx.years();
        let config = RunConfig::default().with_emissions_limit_mt(0.0001);
        let allowed = 0.0001 * 1e6 * years;
        let expected = (400.0 - allowed).max(0.0).powi(3);
        assert!((emissions(&ctx, &config) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_fossil_zero_limit_penalises_any_output() {
        let mut gen = Generator::new("coal", 0, Technology::Coal);
        gen.power_mw = vec![10.0; 4];
        let ctx = ctx_with(vec![gen]);
        let config = RunConfig::default().with_fossil_share_limit(0.0);
        assert!((fossil(&ctx, &config) - 40.0_f64.powi(3)).abs() < 1e-6);
    }

    #[test]
    fn test_hydro_excludes_pumped_storage() {
        let mut hydro_gen = Generator::new("dam", 0, Technology::Hydro);
        hydro_gen.power_mw = vec![10.0; 4];
        let mut psh = Generator::new("psh", 0, Technology::PumpedHydro);
        psh.power_mw = vec![1000.0; 4];
        let ctx = ctx_with(vec![hydro_gen, psh]);
        let config = RunConfig::default().with_hydro_limit_twh(0.0);
        // Only the dam's 40 MWh counts.
        assert!((hydro(&ctx, &config) - 40.0_f64.powi(3)).abs() < 1e-6);
    }

    #[test]
    fn test_assess_ors_multiple_reasons() {
        let mut coal = Generator::new("coal", 0, Technology::Coal);
        coal.power_mw = vec![10.0; 4];
        let mut bio = Generator::new("bio", 0, Technology::Biofuel);
        bio.power_mw = vec![10.0; 4];
        let mut ctx = ctx_with(vec![coal, bio]);
        ctx.reliability_standard_pct = 0.0;
        ctx.unserved_mw = vec![1.0; 4];
        let config = RunConfig::default()
            .with_fossil_share_limit(0.0)
            .with_bioenergy_limit_twh(0.0);
        let set = ConstraintSet::from_config(&config, &ctx);
        let report = assess(&ctx, &config, &set);
        assert!(report.reasons.contains(Reason::Unserved));
        assert!(report.reasons.contains(Reason::Fossil));
        assert!(report.reasons.contains(Reason::Bioenergy));
        assert!(!report.reasons.contains(Reason::Hydro));
        assert!(report.value > 0.0);
    }

    #[test]
    fn test_assess_clean_context_is_empty() {
        let mut ctx = ctx_with(vec![]);
        ctx.unserved_mw = vec![0.0; 4];
        let config = RunConfig::default();
        let set = ConstraintSet::from_config(&config, &ctx);
        let report = assess(&ctx, &config, &set);
        assert_eq!(report.value, 0.0);
        assert_eq!(report.reasons, ReasonMask::EMPTY);
    }

    proptest! {
        // exceedance == 0 ⇒ penalty == 0 and bit unset;
        // exceedance > 0 ⇒ penalty == exceedance³ and bit set.
        #[test]
        fn prop_cubic_on_off(unserved_total in 0.0f64..50.0) {
            let mut ctx = ctx_with(vec![]);
            ctx.reliability_standard_pct = 0.0;
            ctx.unserved_mw = vec![unserved_total / ctx.timesteps() as f64; 4];
            let config = RunConfig::default();
            let set = ConstraintSet::from_config(&config, &ctx);
            let report = assess(&ctx, &config, &set);
            let actual = ctx.unserved_energy_mwh();
            if actual > 0.0 {
                prop_assert!((report.value - actual.powi(3)).abs() < 1e-6 * actual.powi(3).max(1.0));
                prop_assert!(report.reasons.contains(Reason::Unserved));
            } else {
                prop_assert_eq!(report.value, 0.0);
                prop_assert!(report.reasons.is_empty());
            }
        }

        // Inactive constraints never contribute, whatever the outputs say.
        #[test]
        fn prop_inactive_terms_silent(output in 0.0f64..1e4) {
            let mut coal = Generator::new("coal", 0, Technology::Coal);
            coal.power_mw = vec![output; 4];
            coal.emissions_intensity = Some(1.0);
            let mut ctx = ctx_with(vec![coal]);
            ctx.unserved_mw = vec![0.0; 4];
            // Fossil limit 1.0 and infinite emissions: both unconstrained.
            let config = RunConfig::default();
            let set = ConstraintSet::from_config(&config, &ctx);
            let report = assess(&ctx, &config, &set);
            prop_assert!(!report.reasons.contains(Reason::Fossil));
            prop_assert!(!report.reasons.contains(Reason::Emissions));
        }
    }
}
