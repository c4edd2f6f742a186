use crate::config::{self, RunConfig};
use anyhow::{Context, Result};
use regiolink_core::regionalization::pipeline::{
    regionalize, RegionalizationConfig, RegionalizationOutcome,
};
use regiolink_core::report::{CoverageWriter, Stage};
use regiolink_core::snapshot::LciSnapshot;
use regiolink_core::trade::TradeTables;
use regiolink_schemas::process::{ProcessKind, ProcessNode};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// On-disk form of the regionalized database: the snapshot with rewired
/// consumers swapped in, plus every generated node.
#[derive(Serialize)]
struct RegionalizedExport<'a> {
    schema_version: &'a str,
    processes: Vec<&'a ProcessNode>,
}

/// Load the inputs, run the regionalization and write the outputs into a
/// timestamped run directory.
pub fn run(config: &RunConfig) -> Result<()> {
    println!("\n--- [Workflow] Loading inputs ---");
    let snapshot = LciSnapshot::load(&config.snapshot)
        .with_context(|| format!("Failed to load the database snapshot {:?}", config.snapshot))?;
    println!("Snapshot loaded: {} processes.", snapshot.len());

    let trade = TradeTables::load(
        &config.trade_dir.join("imports.csv"),
        &config.trade_dir.join("exports.csv"),
        &config.trade_dir.join("domestic.csv"),
        &config.years,
    )
    .with_context(|| format!("Failed to load trade tables from {:?}", config.trade_dir))?;

    let refdata = config::load_reference_data(config)?;
    let run_config = RegionalizationConfig {
        cutoff: config.cutoff,
        method: config.method()?,
    };

    println!("\n--- [Workflow] Regionalizing ---");
    let outcome = regionalize(&snapshot, &trade, &refdata, &run_config)?;

    let output_dir = config.output_dir.join(format!(
        "regiolink_{}",
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    ));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", output_dir))?;

    write_database(&output_dir, config, &snapshot, &outcome)?;
    write_coverage(&output_dir, &outcome)?;
    write_bindings(&output_dir, &outcome)?;

    print_summary(&outcome, &run_config);
    println!(
        "\nRegionalization complete. Results are in '{}'",
        output_dir.display()
    );
    Ok(())
}

fn write_database(
    output_dir: &Path,
    config: &RunConfig,
    snapshot: &LciSnapshot,
    outcome: &RegionalizationOutcome,
) -> Result<()> {
    let mut processes: Vec<&ProcessNode> = snapshot
        .iter()
        .map(|node| {
            outcome
                .database
                .rewired_snapshot
                .get(&node.id)
                .unwrap_or(node)
        })
        .chain(outcome.database.nodes.values())
        .collect();
    processes.sort_by(|a, b| a.id.cmp(&b.id));

    let export = RegionalizedExport {
        schema_version: &config.schema_version,
        processes,
    };
    let path = output_dir.join("regionalized_database.json");
    let content = serde_json::to_string_pretty(&export)?;
    fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

fn write_coverage(output_dir: &Path, outcome: &RegionalizationOutcome) -> Result<()> {
    let path = output_dir.join("coverage_report.csv");
    let mut writer = CoverageWriter::new(path.to_str().unwrap_or("coverage_report.csv"))
        .with_context(|| format!("Failed to create {:?}", path))?;
    writer.write_report(&outcome.report)?;
    Ok(())
}

fn write_bindings(output_dir: &Path, outcome: &RegionalizationOutcome) -> Result<()> {
    let path = output_dir.join("factor_bindings.csv");
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    for binding in &outcome.bindings {
        writer.serialize(binding)?;
    }
    writer.flush()?;
    Ok(())
}

fn print_summary(outcome: &RegionalizationOutcome, config: &RegionalizationConfig) {
    println!("\n\n--- [Final Summary Report] ---");
    println!("========================================");
    println!("Cutoff: {:.2} | Method: {}", config.cutoff, config.method);
    println!("----------------------------------------");
    println!("Generated nodes:");
    println!(
        "  - National production processes: {:>6}",
        outcome.database.count_kind(ProcessKind::NationalProduction)
    );
    println!(
        "  - Consumption markets:           {:>6}",
        outcome.database.count_kind(ProcessKind::ConsumptionMarket)
    );
    println!(
        "  - Global production markets:     {:>6}",
        outcome
            .database
            .count_kind(ProcessKind::GlobalProductionMarket)
    );
    println!(
        "  - Rewired snapshot consumers:    {:>6}",
        outcome.database.rewired_snapshot.len()
    );
    println!(
        "  - Characterization bindings:     {:>6}",
        outcome.bindings.len()
    );

    println!("\nCoverage gaps by stage:");
    for stage in [
        Stage::Classification,
        Stage::TemplateSelection,
        Stage::Duplication,
        Stage::Allocation,
        Stage::MarketConstruction,
        Stage::Rewiring,
        Stage::Spatialization,
    ] {
        let count = outcome.report.count_for_stage(stage);
        if count > 0 {
            println!("  - {:<20} {:>6}", stage.to_string(), count);
        }
    }
    if outcome.report.gaps.is_empty() {
        println!("  - none");
    }
    println!("========================================");
}
