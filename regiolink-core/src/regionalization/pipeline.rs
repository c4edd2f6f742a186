use crate::classifier::{CommodityClassifier, TemplateRank};
use crate::error::RegiolinkError;
use crate::regionalization::allocation;
use crate::regionalization::duplicator::{EnergyCoverage, ProcessDuplicator};
use crate::regionalization::market::{self, NationalCatalog};
use crate::regionalization::rewire::GraphRewirer;
use crate::regionalization::spatialize::{self, CfTable, FactorBinding, SpatializableFlows};
use crate::report::{CoverageGap, CoverageReport, Stage};
use crate::snapshot::{LciSnapshot, RegionalizedDatabase};
use crate::trade::TradeTables;
use rayon::prelude::*;
use regiolink_schemas::factor::ImpactMethod;
use regiolink_schemas::process::{ExchangeTarget, ProcessKind, ProcessNode};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct RegionalizationConfig {
    /// Cumulative trade-share threshold beyond which minor partners fold
    /// into the Rest-of-World bucket.
    pub cutoff: f64,
    /// Which regionalized impact method the factor table belongs to.
    pub method: ImpactMethod,
}

/// Immutable reference data shared by all commodity workers. Constructed
/// once up front and only ever read, so the parallel build stays
/// deterministic.
pub struct ReferenceData {
    pub classifier: CommodityClassifier,
    pub coverage: EnergyCoverage,
    pub spatializable: SpatializableFlows,
    pub factors: CfTable,
}

/// Everything a run produces: the regionalized database, the coverage
/// report, and the characterization-factor bindings of the new nodes.
pub struct RegionalizationOutcome {
    pub database: RegionalizedDatabase,
    pub report: CoverageReport,
    pub bindings: Vec<FactorBinding>,
}

/// The isolated output of one commodity worker, merged into the shared
/// database by the single-writer merge pass.
struct CommoditySubgraph {
    code: String,
    nodes: Vec<ProcessNode>,
    /// (origin code, national process id)
    national: Vec<(String, String)>,
    /// (consumer code, consumption market id)
    consumption: Vec<(String, String)>,
    global_market: Option<String>,
    gaps: Vec<CoverageGap>,
}

impl CommoditySubgraph {
    fn empty(code: &str) -> Self {
        Self {
            code: code.to_string(),
            nodes: Vec::new(),
            national: Vec::new(),
            consumption: Vec::new(),
            global_market: None,
            gaps: Vec::new(),
        }
    }
}

/// Run the whole regionalization over one database snapshot and one trade
/// vintage. Per-commodity problems are folded into the coverage report;
/// only configuration and load errors abort the run.
pub fn regionalize(
    snapshot: &LciSnapshot,
    trade: &TradeTables,
    refdata: &ReferenceData,
    config: &RegionalizationConfig,
) -> Result<RegionalizationOutcome, RegiolinkError> {
    allocation::validate_cutoff(config.cutoff)?;

    let codes: Vec<String> = refdata
        .classifier
        .commodity_codes()
        .into_iter()
        .map(str::to_string)
        .collect();
    println!(
        "--- Building subgraphs for {} commodities (cutoff {}) ---",
        codes.len(),
        config.cutoff
    );

    // Commodities are independent: each worker reads only the shared
    // reference data and returns an isolated subgraph.
    let subgraphs: Vec<CommoditySubgraph> = codes
        .par_iter()
        .map(|code| build_commodity_subgraph(code, snapshot, trade, refdata, config.cutoff))
        .collect();

    // Merge pass: the only writer of the shared database.
    let mut database = RegionalizedDatabase::default();
    let mut report = CoverageReport::default();
    for subgraph in subgraphs {
        let CommoditySubgraph {
            code,
            nodes,
            national,
            consumption,
            global_market,
            gaps,
        } = subgraph;
        for node in nodes {
            database.insert_node(node);
        }
        for (origin, id) in national {
            database.national_processes.insert((code.clone(), origin), id);
        }
        for (consumer, id) in consumption {
            database
                .consumption_markets
                .insert((code.clone(), consumer), id);
        }
        if let Some(id) = global_market {
            database.global_markets.insert(code.clone(), id);
        }
        report.extend(gaps);
    }

    rewire_database(snapshot, refdata, &mut database, &mut report);
    cull_unreferenced_nationals(&mut database);
    let bindings = spatialize_and_bind(refdata, &mut database, &mut report);

    println!(
        "--- Regionalization complete: {} national processes, {} consumption markets, \
         {} production markets, {} rewired consumers, {} coverage gaps ---",
        database.count_kind(ProcessKind::NationalProduction),
        database.count_kind(ProcessKind::ConsumptionMarket),
        database.count_kind(ProcessKind::GlobalProductionMarket),
        database.rewired_snapshot.len(),
        report.gaps.len()
    );

    Ok(RegionalizationOutcome {
        database,
        report,
        bindings,
    })
}

fn build_commodity_subgraph(
    code: &str,
    snapshot: &LciSnapshot,
    trade: &TradeTables,
    refdata: &ReferenceData,
    cutoff: f64,
) -> CommoditySubgraph {
    let mut subgraph = CommoditySubgraph::empty(code);
    let Some(commodity) = refdata.classifier.commodity(code) else {
        return subgraph;
    };

    let Some(production) = trade.production_for(code) else {
        subgraph.gaps.push(CoverageGap::new(
            code,
            "GLO",
            Stage::Allocation,
            RegiolinkError::MissingTradeData(code.to_string()).to_string(),
        ));
        return subgraph;
    };
    let production_shares = allocation::allocate_shares(production, cutoff);
    if production_shares.is_empty() {
        subgraph.gaps.push(CoverageGap::new(
            code,
            "GLO",
            Stage::Allocation,
            "all recorded production quantities are zero",
        ));
        return subgraph;
    }

    // One national production process per surviving origin, RoW included.
    let duplicator = ProcessDuplicator::new(snapshot, &refdata.classifier, &refdata.coverage);
    let mut catalog = NationalCatalog::default();
    for share in &production_shares {
        let origin = share.origin.code();
        let Some((template, rank)) = refdata.classifier.select_template(snapshot, commodity, origin)
        else {
            subgraph.gaps.push(CoverageGap::new(
                code,
                origin,
                Stage::TemplateSelection,
                RegiolinkError::NoTemplate(code.to_string()).to_string(),
            ));
            return subgraph;
        };
        if rank == TemplateRank::ArbitraryGeography {
            subgraph.gaps.push(CoverageGap::new(
                code,
                origin,
                Stage::TemplateSelection,
                format!(
                    "template '{}' taken from unrelated geography '{}'",
                    template.name, template.geography
                ),
            ));
        }
        let node = duplicator.duplicate(template, origin, code, &mut subgraph.gaps);
        catalog.register(origin, node.id.clone());
        subgraph.national.push((origin.to_string(), node.id.clone()));
        subgraph.nodes.push(node);
    }

    match market::build_global_market(commodity, &production_shares, &catalog) {
        Ok(node) => {
            subgraph.global_market = Some(node.id.clone());
            subgraph.nodes.push(node);
        }
        Err(error) => subgraph.gaps.push(CoverageGap::new(
            code,
            "GLO",
            Stage::MarketConstruction,
            error.to_string(),
        )),
    }

    // One consumption market per consumer surviving the cutoff, plus the
    // folded Rest-of-World consumer.
    if let Some(consumption) = trade.consumption_for(code) {
        let (named, residual) = allocation::select_consumers(consumption, cutoff);
        for consumer in &named {
            let vector = allocation::import_vector(consumption, consumer);
            let shares = allocation::allocate_shares(&vector, cutoff);
            if shares.is_empty() {
                continue;
            }
            match market::build_consumption_market(commodity, consumer, &shares, &catalog) {
                Ok(node) => {
                    subgraph.consumption.push((consumer.clone(), node.id.clone()));
                    subgraph.nodes.push(node);
                }
                Err(error) => subgraph.gaps.push(CoverageGap::new(
                    code,
                    consumer,
                    Stage::MarketConstruction,
                    error.to_string(),
                )),
            }
        }
        if !residual.is_empty() {
            let shares = allocation::allocate_shares(&residual, cutoff);
            if !shares.is_empty() {
                match market::build_consumption_market(commodity, "RoW", &shares, &catalog) {
                    Ok(node) => {
                        subgraph.consumption.push(("RoW".to_string(), node.id.clone()));
                        subgraph.nodes.push(node);
                    }
                    Err(error) => subgraph.gaps.push(CoverageGap::new(
                        code,
                        "RoW",
                        Stage::MarketConstruction,
                        error.to_string(),
                    )),
                }
            }
        }
    }

    subgraph
}

/// Link the new national processes to each other's markets and rewire the
/// snapshot consumers of regionalized commodities onto the new markets,
/// through working copies so the snapshot itself stays untouched.
fn rewire_database(
    snapshot: &LciSnapshot,
    refdata: &ReferenceData,
    database: &mut RegionalizedDatabase,
    report: &mut CoverageReport,
) {
    let mut gaps = Vec::new();
    let mut rewired_copies = Vec::new();
    let mut nodes = std::mem::take(&mut database.nodes);
    {
        let rewirer = GraphRewirer::new(&refdata.classifier, database);

        let mut ids: Vec<String> = nodes.keys().cloned().collect();
        ids.sort_unstable();
        for id in &ids {
            if let Some(node) = nodes.get_mut(id) {
                if node.kind == ProcessKind::NationalProduction {
                    rewirer.rewire_node(node, &mut gaps);
                }
            }
        }

        let mut snapshot_nodes: Vec<&ProcessNode> = snapshot
            .iter()
            .filter(|p| rewirer.consumes_regionalized_commodity(p))
            .collect();
        snapshot_nodes.sort_by(|a, b| a.id.cmp(&b.id));
        for process in snapshot_nodes {
            let mut copy = process.clone();
            if rewirer.rewire_node(&mut copy, &mut gaps) {
                rewired_copies.push(copy);
            }
        }
    }
    database.nodes = nodes;
    for copy in rewired_copies {
        database.rewired_snapshot.insert(copy.id.clone(), copy);
    }
    report.extend(gaps);
}

/// Drop national processes nothing points at anymore. The Rest-of-World
/// clone of each commodity is always retained as the default fallback.
fn cull_unreferenced_nationals(database: &mut RegionalizedDatabase) {
    let mut referenced: HashSet<String> = HashSet::new();
    let market_nodes = database.nodes.values().filter(|n| {
        matches!(
            n.kind,
            ProcessKind::ConsumptionMarket | ProcessKind::GlobalProductionMarket
        )
    });
    for node in market_nodes.chain(database.rewired_snapshot.values()) {
        for exchange in &node.exchanges {
            if let ExchangeTarget::Process { id } = &exchange.target {
                referenced.insert(id.clone());
            }
        }
    }

    let mut removed = Vec::new();
    database.national_processes.retain(|(_, origin), id| {
        let keep = origin == "RoW" || referenced.contains(id);
        if !keep {
            removed.push(id.clone());
        }
        keep
    });
    for id in removed {
        database.nodes.remove(&id);
    }
}

/// Tag the elementary flows of the national processes with their country
/// and join every generated node against the method's factor table.
fn spatialize_and_bind(
    refdata: &ReferenceData,
    database: &mut RegionalizedDatabase,
    report: &mut CoverageReport,
) -> Vec<FactorBinding> {
    let mut ids: Vec<String> = database.nodes.keys().cloned().collect();
    ids.sort_unstable();

    for id in &ids {
        if let Some(node) = database.nodes.get_mut(id) {
            spatialize::spatialize_node(node, &refdata.spatializable);
        }
    }

    let mut gaps = Vec::new();
    let mut bindings = Vec::new();
    for id in &ids {
        if let Some(node) = database.nodes.get(id) {
            let commodity = refdata
                .classifier
                .commodity_code_for_product(&node.reference_product)
                .unwrap_or("unmapped");
            bindings.extend(spatialize::bind_factors(
                node,
                commodity,
                &refdata.factors,
                &mut gaps,
            ));
        }
    }
    report.extend(gaps);
    bindings
}
