use crate::error::RegiolinkError;
use crate::regionalization::allocation::{Share, BALANCE_TOLERANCE, SHARE_EPSILON};
use regiolink_schemas::{
    commodity::Commodity,
    geography::Geography,
    process::{Exchange, ExchangeTarget, ProcessKind, ProcessNode},
};
use std::collections::HashMap;

/// Lookup of the national production processes built for one commodity,
/// keyed by origin code. The Rest-of-World clone is registered under "RoW"
/// and backs every partner folded at the cutoff.
#[derive(Debug, Default)]
pub struct NationalCatalog {
    by_origin: HashMap<String, String>,
}

impl NationalCatalog {
    pub fn register(&mut self, origin: &str, id: String) {
        self.by_origin.insert(origin.to_string(), id);
    }

    pub fn get(&self, origin: &str) -> Option<&str> {
        self.by_origin.get(origin).map(String::as_str)
    }

    /// Resolve an origin to its national process, falling back to the
    /// Rest-of-World clone for partners folded at the cutoff.
    pub fn resolve(&self, origin: &str) -> Option<&str> {
        self.get(origin).or_else(|| self.get("RoW"))
    }
}

fn check_balance(
    commodity: &Commodity,
    country: &str,
    shares: &[Share],
) -> Result<(), RegiolinkError> {
    let total: f64 = shares.iter().map(|s| s.value).sum();
    if (total - 1.0).abs() > BALANCE_TOLERANCE {
        return Err(RegiolinkError::ImbalancedShares {
            commodity: commodity.code.clone(),
            country: country.to_string(),
            total,
        });
    }
    Ok(())
}

fn market_exchanges(
    commodity: &Commodity,
    shares: &[Share],
    catalog: &NationalCatalog,
) -> Result<Vec<Exchange>, RegiolinkError> {
    let mut exchanges = vec![Exchange {
        target: ExchangeTarget::Production,
        product: commodity.name.clone(),
        amount: 1.0,
        unit: commodity.unit.clone(),
    }];
    for share in shares {
        if share.value < SHARE_EPSILON {
            continue;
        }
        let supplier = catalog.resolve(share.origin.code()).ok_or_else(|| {
            RegiolinkError::ProcessNotFound(format!("{} | {}", commodity.name, share.origin))
        })?;
        exchanges.push(Exchange {
            target: ExchangeTarget::Process {
                id: supplier.to_string(),
            },
            product: commodity.name.clone(),
            amount: share.value,
            unit: commodity.unit.clone(),
        });
    }
    Ok(exchanges)
}

/// Assemble the consumption market of one country for one commodity: one
/// input exchange per surviving import share, domestic production included.
pub fn build_consumption_market(
    commodity: &Commodity,
    consumer: &str,
    shares: &[Share],
    catalog: &NationalCatalog,
) -> Result<ProcessNode, RegiolinkError> {
    check_balance(commodity, consumer, shares)?;
    let geography = Geography::from(consumer.to_string());
    let name = format!("consumption market for {}", commodity.name);
    let mut node = ProcessNode {
        id: ProcessNode::derive_id(
            ProcessKind::ConsumptionMarket,
            &name,
            &commodity.name,
            &geography,
        ),
        name,
        reference_product: commodity.name.clone(),
        unit: commodity.unit.clone(),
        geography,
        kind: ProcessKind::ConsumptionMarket,
        comment: format!(
            "Average sourcing mix of {} in {}, derived from bilateral trade \
             shares of commodity {} with domestic production included.",
            commodity.name, consumer, commodity.code
        ),
        exchanges: market_exchanges(commodity, shares, catalog)?,
    };
    aggregate_duplicate_inputs(&mut node);
    Ok(node)
}

/// Assemble the single world-average production market for one commodity,
/// weighted by national production volumes.
pub fn build_global_market(
    commodity: &Commodity,
    shares: &[Share],
    catalog: &NationalCatalog,
) -> Result<ProcessNode, RegiolinkError> {
    check_balance(commodity, "GLO", shares)?;
    let name = format!("production market for {}", commodity.name);
    let mut node = ProcessNode {
        id: ProcessNode::derive_id(
            ProcessKind::GlobalProductionMarket,
            &name,
            &commodity.name,
            &Geography::Global,
        ),
        name,
        reference_product: commodity.name.clone(),
        unit: commodity.unit.clone(),
        geography: Geography::Global,
        kind: ProcessKind::GlobalProductionMarket,
        comment: format!(
            "World average production mix of {}, weighted by national \
             production volumes of commodity {}.",
            commodity.name, commodity.code
        ),
        exchanges: market_exchanges(commodity, shares, catalog)?,
    };
    aggregate_duplicate_inputs(&mut node);
    Ok(node)
}

/// Merge technosphere exchanges pointing at the same supplier into one
/// exchange of the summed amount. Folded Rest-of-World partners routinely
/// produce such duplicates.
pub fn aggregate_duplicate_inputs(node: &mut ProcessNode) {
    let mut merged: Vec<Exchange> = Vec::with_capacity(node.exchanges.len());
    let mut seen: HashMap<String, usize> = HashMap::new();
    for exchange in node.exchanges.drain(..) {
        match &exchange.target {
            ExchangeTarget::Process { id } => match seen.get(id) {
                Some(&index) => merged[index].amount += exchange.amount,
                None => {
                    seen.insert(id.clone(), merged.len());
                    merged.push(exchange);
                }
            },
            _ => merged.push(exchange),
        }
    }
    node.exchanges = merged;
}
