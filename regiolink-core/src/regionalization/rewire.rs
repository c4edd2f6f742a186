use crate::classifier::CommodityClassifier;
use crate::error::RegiolinkError;
use crate::regionalization::market::aggregate_duplicate_inputs;
use crate::report::{CoverageGap, Stage};
use crate::snapshot::RegionalizedDatabase;
use regiolink_schemas::process::{ExchangeTarget, ProcessNode};
use std::collections::HashMap;

/// Repoints exchanges that consume a regionalized commodity at the new
/// markets: the consumer country's consumption market when it exists, the
/// global production market otherwise. Only the supplier endpoint changes;
/// consumed quantities are preserved exactly.
pub struct GraphRewirer<'a> {
    classifier: &'a CommodityClassifier,
    consumption_markets: &'a HashMap<(String, String), String>,
    global_markets: &'a HashMap<String, String>,
}

impl<'a> GraphRewirer<'a> {
    pub fn new(classifier: &'a CommodityClassifier, database: &'a RegionalizedDatabase) -> Self {
        Self {
            classifier,
            consumption_markets: &database.consumption_markets,
            global_markets: &database.global_markets,
        }
    }

    /// Rewire the technosphere inputs of one node in place. Returns whether
    /// anything changed. Exchanges with no resolvable market keep their
    /// original supplier and are flagged in the coverage report.
    pub fn rewire_node(&self, node: &mut ProcessNode, gaps: &mut Vec<CoverageGap>) -> bool {
        let consumer_country = node.geography.country_code().map(str::to_string);
        let own_product = node.reference_product.clone();
        let mut changed = false;

        for exchange in &mut node.exchanges {
            if !exchange.is_technosphere() {
                continue;
            }
            // A producer never sources its own reference product from the
            // market it feeds; that would close a market/producer cycle.
            if exchange.product == own_product {
                continue;
            }
            let Some(commodity) = self
                .classifier
                .commodity_code_for_product(&exchange.product)
            else {
                continue;
            };

            let market_id = consumer_country
                .as_deref()
                .and_then(|country| {
                    self.consumption_markets
                        .get(&(commodity.to_string(), country.to_string()))
                })
                .or_else(|| self.global_markets.get(commodity));

            match market_id {
                Some(id) => {
                    let new_target = ExchangeTarget::Process { id: id.clone() };
                    if exchange.target != new_target {
                        exchange.target = new_target;
                        changed = true;
                    }
                }
                None => {
                    gaps.push(CoverageGap::new(
                        commodity,
                        consumer_country.as_deref().unwrap_or("unknown"),
                        Stage::Rewiring,
                        RegiolinkError::UnresolvedRewire {
                            consumer: node.name.clone(),
                            product: exchange.product.clone(),
                        }
                        .to_string(),
                    ));
                }
            }
        }

        if changed {
            aggregate_duplicate_inputs(node);
        }
        changed
    }

    /// Whether a snapshot node consumes any regionalized commodity at all;
    /// only such nodes need a rewired working copy.
    pub fn consumes_regionalized_commodity(&self, node: &ProcessNode) -> bool {
        node.exchanges.iter().any(|e| {
            e.is_technosphere()
                && e.product != node.reference_product
                && self.classifier.is_regionalized_product(&e.product)
        })
    }
}
