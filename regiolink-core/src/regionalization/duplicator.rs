use crate::classifier::CommodityClassifier;
use crate::report::{CoverageGap, Stage};
use crate::snapshot::LciSnapshot;
use regiolink_schemas::{
    file_formats::EnergyCoverageFile,
    geography::Geography,
    process::{Exchange, ExchangeTarget, ProcessKind, ProcessNode},
};
use std::collections::HashSet;

pub const HEAT_DISTRICT_NG: &str = "heat, district or industrial, natural gas";
pub const HEAT_DISTRICT_NON_NG: &str = "heat, district or industrial, other than natural gas";
pub const HEAT_SMALL_SCALE_NON_NG: &str = "heat, central or small-scale, other than natural gas";
const WASTE_PRODUCT: &str = "municipal solid waste";

/// Which geographies the snapshot carries dedicated energy and waste mixes
/// for. Countries outside a list fall back to an enclosing aggregate.
#[derive(Debug, Default)]
pub struct EnergyCoverage {
    pub electricity: HashSet<String>,
    pub waste: HashSet<String>,
    pub heat_district_ng: HashSet<String>,
    pub heat_district_non_ng: HashSet<String>,
    pub heat_small_scale_non_ng: HashSet<String>,
}

impl From<EnergyCoverageFile> for EnergyCoverage {
    fn from(file: EnergyCoverageFile) -> Self {
        Self {
            electricity: file.electricity.into_iter().collect(),
            waste: file.waste.into_iter().collect(),
            heat_district_ng: file.heat_district_ng.into_iter().collect(),
            heat_district_non_ng: file.heat_district_non_ng.into_iter().collect(),
            heat_small_scale_non_ng: file.heat_small_scale_non_ng.into_iter().collect(),
        }
    }
}

/// Clones generic templates into country-specific production processes,
/// redirecting their electricity, heat and waste-treatment inputs to the
/// national mixes where the snapshot has them.
pub struct ProcessDuplicator<'a> {
    snapshot: &'a LciSnapshot,
    classifier: &'a CommodityClassifier,
    coverage: &'a EnergyCoverage,
}

impl<'a> ProcessDuplicator<'a> {
    pub fn new(
        snapshot: &'a LciSnapshot,
        classifier: &'a CommodityClassifier,
        coverage: &'a EnergyCoverage,
    ) -> Self {
        Self {
            snapshot,
            classifier,
            coverage,
        }
    }

    /// Copy `template` into a national production process for `country`.
    /// Amounts are never modified, only the origin of the substituted
    /// inputs changes. Fallbacks past the country level are recorded as
    /// coverage gaps, never as failures.
    pub fn duplicate(
        &self,
        template: &ProcessNode,
        country: &str,
        commodity_code: &str,
        gaps: &mut Vec<CoverageGap>,
    ) -> ProcessNode {
        let geography = Geography::from(country.to_string());
        let mut node = template.clone();
        node.kind = ProcessKind::NationalProduction;
        node.geography = geography.clone();
        node.id = ProcessNode::derive_id(
            ProcessKind::NationalProduction,
            &template.name,
            &template.reference_product,
            &geography,
        );
        node.comment = format!(
            "National adaptation of '{} | {} | {}'. No amounts were modified, \
             only the origin of the energy and waste inputs.",
            template.name, template.reference_product, template.geography
        );

        self.substitute(
            &mut node,
            country,
            commodity_code,
            |product| product.starts_with("electricity"),
            &self.coverage.electricity,
            Geography::Global,
            "electricity",
            gaps,
        );
        self.substitute(
            &mut node,
            country,
            commodity_code,
            |product| product == WASTE_PRODUCT,
            &self.coverage.waste,
            Geography::RestOfWorld,
            "municipal solid waste",
            gaps,
        );
        for (heat_product, heat_coverage) in [
            (HEAT_DISTRICT_NG, &self.coverage.heat_district_ng),
            (HEAT_DISTRICT_NON_NG, &self.coverage.heat_district_non_ng),
            (HEAT_SMALL_SCALE_NON_NG, &self.coverage.heat_small_scale_non_ng),
        ] {
            self.substitute(
                &mut node,
                country,
                commodity_code,
                |product| product == heat_product,
                heat_coverage,
                Geography::RestOfWorld,
                "heat",
                gaps,
            );
        }

        node
    }

    /// Replace every technosphere input matching `matches_product` with one
    /// exchange of the summed amount, sourced from the closest geography in
    /// the fallback chain that both the coverage list and the snapshot
    /// support.
    #[allow(clippy::too_many_arguments)]
    fn substitute(
        &self,
        node: &mut ProcessNode,
        country: &str,
        commodity_code: &str,
        matches_product: impl Fn(&str) -> bool,
        coverage: &HashSet<String>,
        last_resort: Geography,
        concern: &str,
        gaps: &mut Vec<CoverageGap>,
    ) {
        let mut products: Vec<String> = node
            .exchanges
            .iter()
            .filter(|e| e.is_technosphere() && matches_product(&e.product))
            .map(|e| e.product.clone())
            .collect();
        products.sort_unstable();
        products.dedup();

        for product in products {
            let total: f64 = node
                .exchanges
                .iter()
                .filter(|e| e.is_technosphere() && e.product == product)
                .map(|e| e.amount)
                .sum();
            let unit = node
                .exchanges
                .iter()
                .find(|e| e.is_technosphere() && e.product == product)
                .map(|e| e.unit.clone())
                .unwrap_or_else(|| node.unit.clone());

            let Some((supplier, resolved)) =
                self.resolve_supplier(&product, country, coverage, &last_resort)
            else {
                // Nothing to redirect to anywhere in the chain: the generic
                // input stays as it is.
                gaps.push(CoverageGap::new(
                    commodity_code,
                    country,
                    Stage::Duplication,
                    format!("no {concern} supplier found for '{product}'"),
                ));
                continue;
            };

            if country != "RoW" && resolved.country_code() != Some(country) {
                gaps.push(CoverageGap::new(
                    commodity_code,
                    country,
                    Stage::Duplication,
                    format!("{concern} input '{product}' fell back to '{resolved}'"),
                ));
            }

            node.exchanges
                .retain(|e| !(e.is_technosphere() && e.product == product));
            node.exchanges.push(Exchange {
                target: ExchangeTarget::Process {
                    id: supplier.id.clone(),
                },
                product,
                amount: total,
                unit,
            });
        }
    }

    /// Walk the fallback chain (country, parent country for sub-national
    /// codes, enclosing regions, then the last resort) and return the first
    /// snapshot market that distributes the product there.
    fn resolve_supplier(
        &self,
        product: &str,
        country: &str,
        coverage: &HashSet<String>,
        last_resort: &Geography,
    ) -> Option<(&'a ProcessNode, Geography)> {
        let mut chain: Vec<Geography> = Vec::new();
        if coverage.contains(country) {
            chain.push(Geography::country(country));
        }
        if let Some((parent, _)) = country.split_once('-') {
            if coverage.contains(parent) {
                chain.push(Geography::country(parent));
            }
        }
        for region in self.classifier.enclosing_regions(country) {
            if coverage.contains(region) {
                chain.push(Geography::from(region.clone()));
            }
        }
        chain.push(last_resort.clone());
        if *last_resort != Geography::Global {
            chain.push(Geography::Global);
        }

        for geography in chain {
            if let Some(market) = self
                .snapshot
                .markets_for(product)
                .into_iter()
                .find(|m| m.geography == geography)
            {
                return Some((market, geography));
            }
        }
        None
    }
}
