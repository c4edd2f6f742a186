use crate::error::RegiolinkError;
use crate::snapshot::LciSnapshot;
use regiolink_schemas::{
    commodity::{Commodity, CommodityMapping},
    geography::Geography,
    process::{ExchangeTarget, ProcessNode},
};
use std::collections::HashMap;

/// How well a template's declared geography encloses a target country.
/// Variant order is the selection precedence; lower compares smaller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TemplateRank {
    /// Declared for the target country itself.
    ExactCountry,
    /// Declared for an enclosing region; payload is the position in the
    /// country's region list, smallest enclosing region first.
    EnclosingRegion(usize),
    RestOfWorld,
    Global,
    /// None of the above: an unrelated geography taken as a last resort.
    ArbitraryGeography,
}

/// Maps database reference products to trade-commodity codes and ranks
/// production templates by geographic closeness to a target country.
pub struct CommodityClassifier {
    commodities: HashMap<String, Commodity>,
    product_to_commodity: HashMap<String, String>,
    /// Enclosing database regions per country, smallest first.
    country_regions: HashMap<String, Vec<String>>,
}

impl CommodityClassifier {
    pub fn new(
        commodities: Vec<Commodity>,
        mappings: Vec<CommodityMapping>,
        country_regions: HashMap<String, Vec<String>>,
    ) -> Self {
        let commodities = commodities
            .into_iter()
            .map(|c| (c.code.clone(), c))
            .collect();
        let product_to_commodity = mappings
            .into_iter()
            .map(|m| (m.reference_product, m.commodity_code))
            .collect();
        Self {
            commodities,
            product_to_commodity,
            country_regions,
        }
    }

    /// The commodity a generic process produces. Processes without a mapping
    /// are left untouched by the pipeline.
    pub fn classify(&self, process: &ProcessNode) -> Result<&Commodity, RegiolinkError> {
        self.product_to_commodity
            .get(&process.reference_product)
            .and_then(|code| self.commodities.get(code))
            .ok_or_else(|| RegiolinkError::UnmappedProcess(process.name.clone()))
    }

    pub fn commodity(&self, code: &str) -> Option<&Commodity> {
        self.commodities.get(code)
    }

    /// All commodity codes, sorted for deterministic scheduling.
    pub fn commodity_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.commodities.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    /// The reference products mapping onto a commodity (many-to-one).
    pub fn products_for(&self, commodity_code: &str) -> Vec<&str> {
        let mut products: Vec<&str> = self
            .product_to_commodity
            .iter()
            .filter(|(_, code)| code.as_str() == commodity_code)
            .map(|(product, _)| product.as_str())
            .collect();
        products.sort_unstable();
        products
    }

    pub fn is_regionalized_product(&self, product: &str) -> bool {
        self.product_to_commodity.contains_key(product)
    }

    pub fn commodity_code_for_product(&self, product: &str) -> Option<&str> {
        self.product_to_commodity.get(product).map(String::as_str)
    }

    pub fn enclosing_regions(&self, country: &str) -> &[String] {
        self.country_regions
            .get(country)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn rank_geography(&self, geography: &Geography, country: &str) -> TemplateRank {
        match geography {
            Geography::Country(_) if geography.country_code() == Some(country) => {
                TemplateRank::ExactCountry
            }
            Geography::RestOfWorld => TemplateRank::RestOfWorld,
            Geography::Global => TemplateRank::Global,
            other => {
                let regions = self.enclosing_regions(country);
                match regions.iter().position(|r| r == other.code()) {
                    Some(position) => TemplateRank::EnclosingRegion(position),
                    None => TemplateRank::ArbitraryGeography,
                }
            }
        }
    }

    /// Pick the single closest available template able to produce a
    /// commodity in `country`. Candidates rank by the smallest enclosing
    /// declared geography; ties break on an exact declared
    /// reference-product match, then on the technology's generic-market
    /// weight, then on name and geography code for determinism.
    pub fn select_template<'a>(
        &self,
        snapshot: &'a LciSnapshot,
        commodity: &Commodity,
        country: &str,
    ) -> Option<(&'a ProcessNode, TemplateRank)> {
        let mut candidates: Vec<(&ProcessNode, TemplateRank, f64)> = Vec::new();
        for product in self.products_for(&commodity.code) {
            let mix: HashMap<String, f64> =
                self.technology_mix(snapshot, product).into_iter().collect();
            for template in snapshot.templates_for(product) {
                let rank = self.rank_geography(&template.geography, country);
                let weight = mix.get(&template.name).copied().unwrap_or(0.0);
                candidates.push((template, rank, weight));
            }
        }
        candidates
            .into_iter()
            .min_by(|(a, rank_a, weight_a), (b, rank_b, weight_b)| {
                rank_a
                    .cmp(rank_b)
                    .then_with(|| {
                        (a.reference_product != commodity.name)
                            .cmp(&(b.reference_product != commodity.name))
                    })
                    .then_with(|| {
                        weight_b
                            .partial_cmp(weight_a)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .then_with(|| a.name.cmp(&b.name))
                    .then_with(|| a.geography.code().cmp(b.geography.code()))
            })
            .map(|(template, rank, _)| (template, rank))
    }

    /// Distinct production technologies for a product, sorted by name.
    pub fn technologies_for<'a>(&self, snapshot: &'a LciSnapshot, product: &str) -> Vec<&'a str> {
        let mut names: Vec<&str> = snapshot
            .templates_for(product)
            .into_iter()
            .map(|p| p.name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Market share of each technology producing a product, averaged over
    /// the generic markets that distribute it. Falls back to a uniform mix
    /// when the markets carry no such inputs.
    pub fn technology_mix(&self, snapshot: &LciSnapshot, product: &str) -> Vec<(String, f64)> {
        let technologies = self.technologies_for(snapshot, product);
        if technologies.is_empty() {
            return Vec::new();
        }

        let mut weights: HashMap<&str, f64> =
            technologies.iter().map(|t| (*t, 0.0)).collect();
        for market in snapshot.markets_for(product) {
            for exchange in &market.exchanges {
                if exchange.product != product {
                    continue;
                }
                if let ExchangeTarget::Process { id } = &exchange.target {
                    if let Some(supplier) = snapshot.get(id) {
                        if let Some(weight) = weights.get_mut(supplier.name.as_str()) {
                            *weight += exchange.amount;
                        }
                    }
                }
            }
        }

        let total: f64 = weights.values().sum();
        let uniform = 1.0 / technologies.len() as f64;
        technologies
            .iter()
            .map(|t| {
                let weight = if total > 0.0 { weights[t] / total } else { uniform };
                (t.to_string(), weight)
            })
            .collect()
    }
}
