use csv::Writer;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;

/// Pipeline stage a coverage gap was recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classification,
    TemplateSelection,
    Duplication,
    Allocation,
    MarketConstruction,
    Rewiring,
    Spatialization,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Classification => "classification",
            Stage::TemplateSelection => "template_selection",
            Stage::Duplication => "duplication",
            Stage::Allocation => "allocation",
            Stage::MarketConstruction => "market_construction",
            Stage::Rewiring => "rewiring",
            Stage::Spatialization => "spatialization",
        };
        f.write_str(s)
    }
}

/// One recoverable gap encountered during a run. Gaps are diagnosable from
/// (commodity, country, stage) and never abort the run.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageGap {
    pub commodity: String,
    pub country: String,
    pub stage: Stage,
    pub detail: String,
}

impl CoverageGap {
    pub fn new(commodity: &str, country: &str, stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            commodity: commodity.to_string(),
            country: country.to_string(),
            stage,
            detail: detail.into(),
        }
    }
}

/// Everything a run reports back besides the regionalized database itself.
#[derive(Debug, Default)]
pub struct CoverageReport {
    pub gaps: Vec<CoverageGap>,
}

impl CoverageReport {
    pub fn extend(&mut self, gaps: Vec<CoverageGap>) {
        self.gaps.extend(gaps);
    }

    pub fn count_for_stage(&self, stage: Stage) -> usize {
        self.gaps.iter().filter(|g| g.stage == stage).count()
    }
}

pub struct CoverageWriter {
    writer: Writer<fs::File>,
}

impl CoverageWriter {
    pub fn new(path: &str) -> Result<Self, io::Error> {
        let writer = Writer::from_path(path)?;
        Ok(Self { writer })
    }

    pub fn write_report(&mut self, report: &CoverageReport) -> Result<(), anyhow::Error> {
        for gap in &report.gaps {
            self.writer.serialize(gap)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
