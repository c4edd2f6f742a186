use serde::{Deserialize, Serialize};

/// One bilateral trade record: quantity of a commodity moved from exporter
/// to importer during a given year. Domestic production is represented as a
/// flow with exporter == importer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeFlow {
    pub commodity_code: String,
    pub exporter: String,
    pub importer: String,
    pub year: u16,
    pub quantity_t: f64,
}

impl TradeFlow {
    pub fn is_domestic(&self) -> bool {
        self.exporter == self.importer
    }
}
