use crate::error::RegiolinkError;
use crate::report::{CoverageGap, Stage};
use regiolink_schemas::{
    factor::{CharacterizationFactor, SpatializableFlow},
    process::{ExchangeTarget, ProcessKind, ProcessNode},
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// The elementary flows eligible for spatialization and the compartments in
/// which spatialized variants exist.
#[derive(Debug, Default)]
pub struct SpatializableFlows {
    by_flow: HashMap<String, HashSet<String>>,
}

impl SpatializableFlows {
    pub fn from_flows(flows: Vec<SpatializableFlow>) -> Self {
        let by_flow = flows
            .into_iter()
            .map(|f| (f.flow, f.compartments.into_iter().collect()))
            .collect();
        Self { by_flow }
    }

    pub fn is_spatializable(&self, flow: &str, compartment: &str) -> bool {
        self.by_flow
            .get(flow)
            .map(|compartments| compartments.contains(compartment))
            .unwrap_or(false)
    }
}

/// Tag the elementary flows of a national production process with the
/// process country. Markets have no single physical location and are left
/// unspatialized so that global-average factors apply to them. Returns the
/// number of flows tagged.
pub fn spatialize_node(node: &mut ProcessNode, flows: &SpatializableFlows) -> usize {
    if node.kind != ProcessKind::NationalProduction {
        return 0;
    }
    let Some(country) = node.geography.country_code().map(str::to_string) else {
        return 0;
    };

    let mut tagged = 0;
    for exchange in &mut node.exchanges {
        if let ExchangeTarget::Elementary {
            flow,
            compartment,
            emitter,
        } = &mut exchange.target
        {
            if flows.is_spatializable(flow, compartment) {
                *emitter = Some(country.clone());
                tagged += 1;
            }
        }
    }
    tagged
}

/// Regionalized characterization factors of one impact method, keyed by
/// (flow, compartment, emitting country). "GLO" rows double as the
/// global-average fallback for unspatialized flows.
#[derive(Debug, Default)]
pub struct CfTable {
    factors: HashMap<(String, String, String), f64>,
}

impl CfTable {
    pub fn from_factors(factors: Vec<CharacterizationFactor>) -> Self {
        let factors = factors
            .into_iter()
            .map(|f| ((f.flow, f.compartment, f.country), f.factor))
            .collect();
        Self { factors }
    }

    pub fn load(path: &Path) -> Result<Self, RegiolinkError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| RegiolinkError::CsvError(path.display().to_string(), e))?;
        let mut factors = Vec::new();
        for result in reader.deserialize() {
            let factor: CharacterizationFactor =
                result.map_err(|e| RegiolinkError::CsvError(path.display().to_string(), e))?;
            factors.push(factor);
        }
        Ok(Self::from_factors(factors))
    }

    pub fn lookup(&self, flow: &str, compartment: &str, country: &str) -> Option<f64> {
        self.factors
            .get(&(flow.to_string(), compartment.to_string(), country.to_string()))
            .copied()
    }

    pub fn global(&self, flow: &str, compartment: &str) -> Option<f64> {
        self.lookup(flow, compartment, "GLO")
    }
}

/// One elementary flow joined with its characterization factor.
#[derive(Debug, Clone, Serialize)]
pub struct FactorBinding {
    pub process_id: String,
    pub flow: String,
    pub compartment: String,
    pub emitter: Option<String>,
    pub factor: f64,
}

/// Join every elementary flow of a node against the method's factor table.
/// Spatialized flows use the (flow, country) entry, unspatialized flows the
/// global average; an absent entry binds 0.0 and records the gap.
pub fn bind_factors(
    node: &ProcessNode,
    commodity_code: &str,
    table: &CfTable,
    gaps: &mut Vec<CoverageGap>,
) -> Vec<FactorBinding> {
    let mut bindings = Vec::new();
    for exchange in &node.exchanges {
        let ExchangeTarget::Elementary {
            flow,
            compartment,
            emitter,
        } = &exchange.target
        else {
            continue;
        };

        let factor = match emitter {
            Some(country) => table.lookup(flow, compartment, country),
            None => table.global(flow, compartment),
        };
        let factor = match factor {
            Some(value) => value,
            None => {
                gaps.push(CoverageGap::new(
                    commodity_code,
                    emitter.as_deref().unwrap_or("GLO"),
                    Stage::Spatialization,
                    RegiolinkError::NoCharacterizationFactor {
                        flow: flow.clone(),
                        country: emitter.as_deref().unwrap_or("GLO").to_string(),
                    }
                    .to_string(),
                ));
                0.0
            }
        };
        bindings.push(FactorBinding {
            process_id: node.id.clone(),
            flow: flow.clone(),
            compartment: compartment.clone(),
            emitter: emitter.clone(),
            factor,
        });
    }
    bindings
}
