use serde::{Deserialize, Serialize};

/// An internationally traded commodity, identified by its HS-style trade
/// classification code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commodity {
    pub code: String,
    pub name: String,
    pub unit: String,
}

/// Many-to-one link from a database reference product to a commodity code.
/// Several generic processes may produce the same commodity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityMapping {
    pub reference_product: String,
    pub commodity_code: String,
}
