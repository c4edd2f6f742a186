use crate::geography::Geography;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    /// A pre-existing process of the source database snapshot.
    Generic,
    /// A country-specific clone of a generic template.
    NationalProduction,
    /// A country's average sourcing mix for one commodity.
    ConsumptionMarket,
    /// The world average production mix for one commodity.
    GlobalProductionMarket,
}

/// The supplier side of an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExchangeTarget {
    /// The reference output of the node itself.
    Production,
    /// Another process node (technosphere input).
    Process { id: String },
    /// An elementary flow exchanged with the environment (biosphere).
    /// `emitter` carries the emitting-country label once spatialized.
    Elementary {
        flow: String,
        compartment: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        emitter: Option<String>,
    },
}

/// A directed, quantified edge between a process node and a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub target: ExchangeTarget,
    /// Reference product of the supplier, or the flow name for biosphere
    /// exchanges. Used to locate substitutable inputs by what they deliver.
    pub product: String,
    pub amount: f64,
    pub unit: String,
}

impl Exchange {
    pub fn is_technosphere(&self) -> bool {
        matches!(self.target, ExchangeTarget::Process { .. })
    }
}

/// A node of the supply-chain graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessNode {
    pub id: String,
    pub name: String,
    pub reference_product: String,
    pub unit: String,
    pub geography: Geography,
    pub kind: ProcessKind,
    #[serde(default)]
    pub comment: String,
    pub exchanges: Vec<Exchange>,
}

impl ProcessNode {
    /// Deterministic identifier for a generated node. Re-running a build on
    /// identical inputs must reproduce identical ids, so ids are derived
    /// from the node's identity rather than drawn at random.
    pub fn derive_id(kind: ProcessKind, name: &str, reference_product: &str, geography: &Geography) -> String {
        let prefix = match kind {
            ProcessKind::Generic => "generic",
            ProcessKind::NationalProduction => "national",
            ProcessKind::ConsumptionMarket => "consumption",
            ProcessKind::GlobalProductionMarket => "production-market",
        };
        format!("{prefix}|{name}|{reference_product}|{geography}")
    }

    /// Markets of the source database are recognizable by their name, as is
    /// the convention in ecoinvent-style snapshots.
    pub fn is_snapshot_market(&self) -> bool {
        self.name.starts_with("market for ")
            || self.name.starts_with("market group for ")
            || self.name.contains("generic market")
            || self.name.contains("import from")
    }
}
