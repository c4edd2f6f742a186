use regiolink_core::classifier::CommodityClassifier;
use regiolink_core::regionalization::duplicator::EnergyCoverage;
use regiolink_core::regionalization::pipeline::{
    regionalize, ReferenceData, RegionalizationConfig,
};
use regiolink_core::regionalization::spatialize::{CfTable, SpatializableFlows};
use regiolink_core::report::Stage;
use regiolink_core::snapshot::LciSnapshot;
use regiolink_core::trade::TradeTables;
use regiolink_schemas::commodity::{Commodity, CommodityMapping};
use regiolink_schemas::factor::{CharacterizationFactor, ImpactMethod, SpatializableFlow};
use regiolink_schemas::geography::Geography;
use regiolink_schemas::process::{Exchange, ExchangeTarget, ProcessKind, ProcessNode};
use regiolink_schemas::trade::TradeFlow;
use std::collections::HashMap;

fn generic(name: &str, product: &str, geo: &str) -> ProcessNode {
    let geography = Geography::from(geo.to_string());
    ProcessNode {
        id: ProcessNode::derive_id(ProcessKind::Generic, name, product, &geography),
        name: name.to_string(),
        reference_product: product.to_string(),
        unit: "kg".to_string(),
        geography,
        kind: ProcessKind::Generic,
        comment: String::new(),
        exchanges: vec![Exchange {
            target: ExchangeTarget::Production,
            product: product.to_string(),
            amount: 1.0,
            unit: "kg".to_string(),
        }],
    }
}

fn technosphere(supplier_id: &str, product: &str, amount: f64, unit: &str) -> Exchange {
    Exchange {
        target: ExchangeTarget::Process {
            id: supplier_id.to_string(),
        },
        product: product.to_string(),
        amount,
        unit: unit.to_string(),
    }
}

fn biosphere(flow: &str, compartment: &str, amount: f64) -> Exchange {
    Exchange {
        target: ExchangeTarget::Elementary {
            flow: flow.to_string(),
            compartment: compartment.to_string(),
            emitter: None,
        },
        product: flow.to_string(),
        amount,
        unit: "kg".to_string(),
    }
}

fn flow(commodity: &str, exporter: &str, importer: &str, qty: f64) -> TradeFlow {
    TradeFlow {
        commodity_code: commodity.to_string(),
        exporter: exporter.to_string(),
        importer: importer.to_string(),
        year: 2022,
        quantity_t: qty,
    }
}

fn snapshot() -> LciSnapshot {
    let grid_rer = generic(
        "market for electricity, high voltage",
        "electricity, high voltage",
        "RER",
    );
    let grid_ru = generic(
        "market for electricity, high voltage",
        "electricity, high voltage",
        "RU",
    );
    let grid_nl = generic(
        "market for electricity, high voltage",
        "electricity, high voltage",
        "NL",
    );
    let grid_glo = generic(
        "market group for electricity, high voltage",
        "electricity, high voltage",
        "GLO",
    );

    let mut template_rer = generic("ammonia production", "ammonia", "RER");
    template_rer
        .exchanges
        .push(technosphere(&grid_rer.id, "electricity, high voltage", 0.4, "kWh"));
    template_rer.exchanges.push(biosphere("Ammonia", "air", 0.01));

    let mut template_row = generic("ammonia production", "ammonia", "RoW");
    template_row
        .exchanges
        .push(technosphere(&grid_glo.id, "electricity, high voltage", 0.5, "kWh"));
    template_row.exchanges.push(biosphere("Ammonia", "air", 0.012));

    let generic_market = generic("market for ammonia", "ammonia", "GLO");

    let mut fertilizer_se = generic("fertilizer production", "fertilizer", "SE");
    fertilizer_se
        .exchanges
        .push(technosphere(&generic_market.id, "ammonia", 0.42, "kg"));

    let mut urea_rer = generic("urea production", "urea", "RER");
    urea_rer
        .exchanges
        .push(technosphere(&generic_market.id, "ammonia", 0.1, "kg"));

    LciSnapshot::from_nodes(vec![
        grid_rer,
        grid_ru,
        grid_nl,
        grid_glo,
        template_rer,
        template_row,
        generic_market,
        fertilizer_se,
        urea_rer,
    ])
}

fn trade() -> TradeTables {
    let imports = vec![
        flow("2814", "RU", "SE", 73.0),
        flow("2814", "NL", "SE", 7.0),
        flow("2814", "DZ", "SE", 5.0),
        flow("2814", "TT", "SE", 4.5),
        flow("2814", "EG", "SE", 4.0),
        flow("2814", "SA", "SE", 3.5),
        flow("2814", "KW", "SE", 3.0),
        flow("2814", "RU", "DE", 10.0),
    ];
    let exports = vec![
        flow("2814", "RU", "SE", 100.0),
        flow("2814", "NL", "SE", 30.0),
        flow("2814", "DZ", "SE", 20.0),
        flow("2814", "CN", "SE", 60.0),
    ];
    let domestic = vec![flow("2814", "RU", "RU", 50.0), flow("2814", "CN", "CN", 40.0)];
    TradeTables::from_flows(&imports, &exports, &domestic)
}

fn refdata() -> ReferenceData {
    let mut regions = HashMap::new();
    for country in ["RU", "NL", "SE", "DE"] {
        regions.insert(country.to_string(), vec!["RER".to_string()]);
    }
    regions.insert("CN".to_string(), vec!["RAS".to_string()]);
    regions.insert("DZ".to_string(), vec!["RAF".to_string()]);

    ReferenceData {
        classifier: CommodityClassifier::new(
            vec![Commodity {
                code: "2814".to_string(),
                name: "ammonia".to_string(),
                unit: "kg".to_string(),
            }],
            vec![CommodityMapping {
                reference_product: "ammonia".to_string(),
                commodity_code: "2814".to_string(),
            }],
            regions,
        ),
        coverage: EnergyCoverage {
            electricity: ["RU", "NL"].iter().map(|c| c.to_string()).collect(),
            ..EnergyCoverage::default()
        },
        spatializable: SpatializableFlows::from_flows(vec![SpatializableFlow {
            flow: "Ammonia".to_string(),
            compartments: vec!["air".to_string()],
        }]),
        factors: CfTable::from_factors(vec![
            CharacterizationFactor {
                flow: "Ammonia".to_string(),
                compartment: "air".to_string(),
                country: "RU".to_string(),
                factor: 2.0,
            },
            CharacterizationFactor {
                flow: "Ammonia".to_string(),
                compartment: "air".to_string(),
                country: "NL".to_string(),
                factor: 1.5,
            },
            CharacterizationFactor {
                flow: "Ammonia".to_string(),
                compartment: "air".to_string(),
                country: "GLO".to_string(),
                factor: 1.0,
            },
        ]),
    }
}

fn config() -> RegionalizationConfig {
    RegionalizationConfig {
        cutoff: 0.85,
        method: ImpactMethod::ImpactWorldPlus21,
    }
}

fn technosphere_inputs(node: &ProcessNode) -> Vec<(&str, f64)> {
    node.exchanges
        .iter()
        .filter_map(|e| match &e.target {
            ExchangeTarget::Process { id } => Some((id.as_str(), e.amount)),
            _ => None,
        })
        .collect()
}

#[test]
fn swedish_consumption_market_matches_trade_shares() {
    let outcome = regionalize(&snapshot(), &trade(), &refdata(), &config()).unwrap();
    let market = outcome
        .database
        .consumption_market("2814", "SE")
        .expect("consumption market for Sweden");

    let inputs = technosphere_inputs(market);
    let total: f64 = inputs.iter().map(|(_, amount)| amount).sum();
    assert!((total - 1.0).abs() < 1e-6);

    let ru_id = &outcome.database.national_processes[&("2814".to_string(), "RU".to_string())];
    let nl_id = &outcome.database.national_processes[&("2814".to_string(), "NL".to_string())];
    let row_id = &outcome.database.national_processes[&("2814".to_string(), "RoW".to_string())];

    let amount_of = |id: &str| {
        inputs
            .iter()
            .find(|(input, _)| *input == id)
            .map(|(_, amount)| *amount)
            .unwrap_or(0.0)
    };
    assert!((amount_of(ru_id) - 0.73).abs() < 1e-9);
    assert!((amount_of(nl_id) - 0.07).abs() < 1e-9);
    // Algeria has no surviving national process: its 5% joins the 15% tail
    // on the Rest-of-World input.
    assert!((amount_of(row_id) - 0.20).abs() < 1e-9);
    assert_eq!(inputs.len(), 3);
}

#[test]
fn global_market_covers_exactly_the_surviving_producers() {
    let outcome = regionalize(&snapshot(), &trade(), &refdata(), &config()).unwrap();
    let market = outcome.database.global_market("2814").expect("global market");

    let inputs = technosphere_inputs(market);
    let total: f64 = inputs.iter().map(|(_, amount)| amount).sum();
    assert!((total - 1.0).abs() < 1e-6);

    let national = &outcome.database.national_processes;
    let expected: Vec<&String> = ["RU", "CN", "NL", "RoW"]
        .iter()
        .map(|origin| &national[&("2814".to_string(), origin.to_string())])
        .collect();
    assert_eq!(inputs.len(), expected.len());
    for id in expected {
        assert!(inputs.iter().any(|(input, _)| input == id));
    }
}

#[test]
fn every_national_process_is_reachable_from_a_market() {
    let outcome = regionalize(&snapshot(), &trade(), &refdata(), &config()).unwrap();
    let markets: Vec<&ProcessNode> = outcome
        .database
        .nodes
        .values()
        .filter(|n| {
            matches!(
                n.kind,
                ProcessKind::ConsumptionMarket | ProcessKind::GlobalProductionMarket
            )
        })
        .collect();
    for id in outcome.database.national_processes.values() {
        let referenced = markets.iter().any(|m| {
            m.exchanges
                .iter()
                .any(|e| matches!(&e.target, ExchangeTarget::Process { id: input } if input == id))
        });
        assert!(referenced, "national process {id} unreachable");
    }
}

#[test]
fn snapshot_consumers_rewire_without_changing_amounts() {
    let fixture = snapshot();
    let outcome = regionalize(&fixture, &trade(), &refdata(), &config()).unwrap();

    let fertilizer_id = ProcessNode::derive_id(
        ProcessKind::Generic,
        "fertilizer production",
        "fertilizer",
        &Geography::country("SE"),
    );
    let rewired = outcome
        .database
        .rewired_snapshot
        .get(&fertilizer_id)
        .expect("rewired Swedish consumer");
    let se_market_id =
        &outcome.database.consumption_markets[&("2814".to_string(), "SE".to_string())];
    let inputs = technosphere_inputs(rewired);
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].0, se_market_id.as_str());
    assert!((inputs[0].1 - 0.42).abs() < 1e-12);

    // The snapshot itself is untouched.
    let original = fixture.get(&fertilizer_id).unwrap();
    assert!(technosphere_inputs(original)
        .iter()
        .all(|(id, _)| *id != se_market_id.as_str()));
}

#[test]
fn consumer_without_country_rewires_to_global_market() {
    let outcome = regionalize(&snapshot(), &trade(), &refdata(), &config()).unwrap();
    let urea_id = ProcessNode::derive_id(
        ProcessKind::Generic,
        "urea production",
        "urea",
        &Geography::MacroRegion("RER".to_string()),
    );
    let rewired = outcome
        .database
        .rewired_snapshot
        .get(&urea_id)
        .expect("rewired regional consumer");
    let global_id = &outcome.database.global_markets["2814"];
    let inputs = technosphere_inputs(rewired);
    assert_eq!(inputs[0].0, global_id.as_str());
    assert!((inputs[0].1 - 0.1).abs() < 1e-12);
}

#[test]
fn folded_tail_consumers_share_a_rest_of_world_market() {
    let outcome = regionalize(&snapshot(), &trade(), &refdata(), &config()).unwrap();
    // Germany's consumption is below the cutoff: it has no market of its
    // own, only the folded Rest-of-World consumer carries its imports.
    assert!(outcome.database.consumption_market("2814", "DE").is_none());
    assert!(outcome.database.consumption_market("2814", "RoW").is_some());
}

#[test]
fn running_twice_produces_identical_databases() {
    let first = regionalize(&snapshot(), &trade(), &refdata(), &config()).unwrap();
    let second = regionalize(&snapshot(), &trade(), &refdata(), &config()).unwrap();

    assert_eq!(first.database.nodes, second.database.nodes);
    assert_eq!(first.database.rewired_snapshot, second.database.rewired_snapshot);
    assert_eq!(
        first.database.consumption_markets,
        second.database.consumption_markets
    );
    assert_eq!(first.database.global_markets, second.database.global_markets);
}

#[test]
fn national_flows_are_spatialized_and_bound_to_factors() {
    let outcome = regionalize(&snapshot(), &trade(), &refdata(), &config()).unwrap();

    let ru_id = &outcome.database.national_processes[&("2814".to_string(), "RU".to_string())];
    let ru_binding = outcome
        .bindings
        .iter()
        .find(|b| &b.process_id == ru_id)
        .expect("binding for the Russian process");
    assert_eq!(ru_binding.emitter.as_deref(), Some("RU"));
    assert!((ru_binding.factor - 2.0).abs() < 1e-12);

    // China has no factor: bound to zero, reported as a gap.
    let cn_id = &outcome.database.national_processes[&("2814".to_string(), "CN".to_string())];
    let cn_binding = outcome
        .bindings
        .iter()
        .find(|b| &b.process_id == cn_id)
        .expect("binding for the Chinese process");
    assert_eq!(cn_binding.factor, 0.0);
    assert!(outcome.report.count_for_stage(Stage::Spatialization) >= 1);

    // The Rest-of-World clone has no single country: global average applies.
    let row_id = &outcome.database.national_processes[&("2814".to_string(), "RoW".to_string())];
    let row_binding = outcome
        .bindings
        .iter()
        .find(|b| &b.process_id == row_id)
        .expect("binding for the Rest-of-World process");
    assert!(row_binding.emitter.is_none());
    assert!((row_binding.factor - 1.0).abs() < 1e-12);
}

#[test]
fn electricity_inputs_follow_the_producing_country() {
    let outcome = regionalize(&snapshot(), &trade(), &refdata(), &config()).unwrap();
    let ru_id = &outcome.database.national_processes[&("2814".to_string(), "RU".to_string())];
    let ru_node = outcome.database.get(ru_id).unwrap();

    let ru_grid_id = ProcessNode::derive_id(
        ProcessKind::Generic,
        "market for electricity, high voltage",
        "electricity, high voltage",
        &Geography::country("RU"),
    );
    let electricity = ru_node
        .exchanges
        .iter()
        .find(|e| e.product == "electricity, high voltage")
        .unwrap();
    assert_eq!(
        electricity.target,
        ExchangeTarget::Process { id: ru_grid_id }
    );
    assert!((electricity.amount - 0.4).abs() < 1e-12);

    // China lacks a national grid: its clone fell back and the gap shows
    // up in the report.
    assert!(outcome.report.count_for_stage(Stage::Duplication) >= 1);
}
