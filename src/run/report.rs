//! Results and exchanges artifact serialization.

use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use super::config::RunConfig;
use crate::error::Result;
use crate::evaluate::FitnessResult;
use crate::scenario::{Generator, ScenarioContext};

/// The persisted record of a completed (or interrupted) run.
#[derive(Debug, Serialize)]
struct ResultsRecord<'a> {
    options: &'a RunConfig,
    /// Final parameter vector, capacities clamped to ≥ 0.
    parameters: Vec<f64>,
    score: f64,
    penalty: f64,
    constraints_violated: Vec<&'static str>,
}

/// Writes the results artifact. Capacities are clamped to ≥ 0 here and
/// only here — the search itself runs on unclamped values.
pub fn write_results(
    path: &Path,
    config: &RunConfig,
    candidate: &[f64],
    result: &FitnessResult,
    constraints_violated: Vec<&'static str>,
) -> Result<()> {
    let record = ResultsRecord {
        options: config,
        parameters: candidate.iter().map(|v| v.max(0.0)).collect(),
        score: result.fitness(),
        penalty: result.penalty,
        constraints_violated,
    };
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, &record)?;
    Ok(())
}

/// The symmetrised exchange matrix plus the generator roster it was
/// derived from.
#[derive(Debug, Serialize)]
struct ExchangesRecord<'a> {
    exchanges_mw: &'a [Vec<f64>],
    generators: &'a [Generator],
}

/// Writes the exchanges artifact from the finalised context.
pub fn write_exchanges(path: &Path, ctx: &ScenarioContext) -> Result<()> {
    let record = ExchangesRecord {
        exchanges_mw: &ctx.exchanges_mw,
        generators: &ctx.generators,
    };
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, &record)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::{Reason, ReasonMask};
    use crate::scenario::Technology;

    #[test]
    fn test_results_record_clamps_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let config = RunConfig::default();
        let mut reasons = ReasonMask::EMPTY;
        reasons.insert(Reason::Fossil);
        let result = FitnessResult {
            cost: 60.0,
            penalty: 4.0,
            reasons,
        };
        write_results(
            &path,
            &config,
            &[120.0, -3.5, 0.0],
            &result,
            vec![Reason::Fossil.label()],
        )
        .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let params: Vec<f64> = value["parameters"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert_eq!(params, vec![120.0, 0.0, 0.0]);
        assert_eq!(value["score"], 64.0);
        assert_eq!(value["penalty"], 4.0);
        assert_eq!(value["constraints_violated"][0], "fossil share limit");
        assert!(value["options"]["generations"].is_number());
    }

    #[test]
    fn test_exchanges_record_includes_generators() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exchanges.json");
        let mut ctx = ScenarioContext::single_region(vec![10.0; 2], 1.0);
        ctx.generators
            .push(Generator::new("ccgt-1", 0, Technology::Ccgt));
        ctx.exchanges_mw = vec![vec![0.0]];
        write_exchanges(&path, &ctx).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["generators"][0]["name"], "ccgt-1");
        assert_eq!(value["generators"][0]["technology"], "Ccgt");
        assert!(value["exchanges_mw"].is_array());
    }
}
