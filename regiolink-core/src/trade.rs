use crate::error::RegiolinkError;
use regiolink_schemas::trade::TradeFlow;
use std::collections::HashMap;
use std::path::Path;

/// Bilateral trade and domestic-production quantities, averaged over the
/// years of the vintage window and indexed for the allocation engine.
///
/// Consumption combines imports with domestic production (a country
/// consuming its own output is a self-export); production combines net
/// exports with domestic production, ignoring the importer dimension.
#[derive(Debug, Default)]
pub struct TradeTables {
    /// commodity -> exporter -> average produced quantity (t).
    production: HashMap<String, HashMap<String, f64>>,
    /// commodity -> (importer, exporter) -> average sourced quantity (t).
    consumption: HashMap<String, HashMap<(String, String), f64>>,
}

impl TradeTables {
    /// Load the three trade tables from CSV files. `years` restricts the
    /// records to the requested vintage window; an empty slice keeps all.
    pub fn load(
        imports_path: &Path,
        exports_path: &Path,
        domestic_path: &Path,
        years: &[u16],
    ) -> Result<Self, RegiolinkError> {
        let imports = read_trade_csv(imports_path, years)?;
        let exports = read_trade_csv(exports_path, years)?;
        let domestic = read_trade_csv(domestic_path, years)?;
        Ok(Self::from_flows(&imports, &exports, &domestic))
    }

    pub fn from_flows(imports: &[TradeFlow], exports: &[TradeFlow], domestic: &[TradeFlow]) -> Self {
        let mut consumption_by_year: HashMap<(String, String, String), HashMap<u16, f64>> =
            HashMap::new();
        for flow in imports.iter().chain(domestic.iter()) {
            *consumption_by_year
                .entry((
                    flow.commodity_code.clone(),
                    flow.importer.clone(),
                    flow.exporter.clone(),
                ))
                .or_default()
                .entry(flow.year)
                .or_insert(0.0) += flow.quantity_t;
        }

        let mut production_by_year: HashMap<(String, String), HashMap<u16, f64>> = HashMap::new();
        for flow in exports.iter().chain(domestic.iter()) {
            *production_by_year
                .entry((flow.commodity_code.clone(), flow.exporter.clone()))
                .or_default()
                .entry(flow.year)
                .or_insert(0.0) += flow.quantity_t;
        }

        let mut consumption: HashMap<String, HashMap<(String, String), f64>> = HashMap::new();
        for ((commodity, importer, exporter), per_year) in consumption_by_year {
            let mean = per_year.values().sum::<f64>() / per_year.len() as f64;
            consumption
                .entry(commodity)
                .or_default()
                .insert((importer, exporter), mean);
        }

        let mut production: HashMap<String, HashMap<String, f64>> = HashMap::new();
        for ((commodity, exporter), per_year) in production_by_year {
            let mean = per_year.values().sum::<f64>() / per_year.len() as f64;
            production.entry(commodity).or_default().insert(exporter, mean);
        }

        Self {
            production,
            consumption,
        }
    }

    pub fn production_for(&self, commodity: &str) -> Option<&HashMap<String, f64>> {
        self.production.get(commodity)
    }

    pub fn consumption_for(&self, commodity: &str) -> Option<&HashMap<(String, String), f64>> {
        self.consumption.get(commodity)
    }
}

fn read_trade_csv(path: &Path, years: &[u16]) -> Result<Vec<TradeFlow>, RegiolinkError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| RegiolinkError::CsvError(path.display().to_string(), e))?;
    let mut flows = Vec::new();
    for result in reader.deserialize() {
        let flow: TradeFlow =
            result.map_err(|e| RegiolinkError::CsvError(path.display().to_string(), e))?;
        if years.is_empty() || years.contains(&flow.year) {
            flows.push(flow);
        }
    }
    Ok(flows)
}
