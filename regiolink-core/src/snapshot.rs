use crate::error::RegiolinkError;
use regiolink_schemas::{
    file_formats::SnapshotFile,
    geography::Geography,
    process::{ProcessKind, ProcessNode},
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Read-only view over one fixed snapshot of the source LCI database.
///
/// The engine never mutates the snapshot; everything it builds lands in a
/// [`RegionalizedDatabase`] working copy instead.
pub struct LciSnapshot {
    processes: HashMap<String, ProcessNode>,
    by_product: HashMap<String, Vec<String>>,
    by_geography: HashMap<Geography, Vec<String>>,
}

impl LciSnapshot {
    pub fn from_nodes(nodes: Vec<ProcessNode>) -> Self {
        let mut processes = HashMap::new();
        let mut by_product: HashMap<String, Vec<String>> = HashMap::new();
        let mut by_geography: HashMap<Geography, Vec<String>> = HashMap::new();
        for node in nodes {
            by_product
                .entry(node.reference_product.clone())
                .or_default()
                .push(node.id.clone());
            by_geography
                .entry(node.geography.clone())
                .or_default()
                .push(node.id.clone());
            processes.insert(node.id.clone(), node);
        }
        Self {
            processes,
            by_product,
            by_geography,
        }
    }

    pub fn load(path: &Path) -> Result<Self, RegiolinkError> {
        let content = fs::read_to_string(path)
            .map_err(|e| RegiolinkError::FileIO(path.display().to_string(), e))?;
        let file: SnapshotFile = serde_json::from_str(&content)?;
        Ok(Self::from_nodes(file.processes))
    }

    pub fn get(&self, id: &str) -> Option<&ProcessNode> {
        self.processes.get(id)
    }

    pub fn by_reference_product(&self, product: &str) -> Vec<&ProcessNode> {
        self.by_product
            .get(product)
            .map(|ids| ids.iter().filter_map(|id| self.processes.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn by_geography(&self, geography: &Geography) -> Vec<&ProcessNode> {
        self.by_geography
            .get(geography)
            .map(|ids| ids.iter().filter_map(|id| self.processes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Production templates for a product: snapshot processes that actually
    /// manufacture it, with market-type nodes screened out.
    pub fn templates_for(&self, product: &str) -> Vec<&ProcessNode> {
        self.by_reference_product(product)
            .into_iter()
            .filter(|p| !p.is_snapshot_market())
            .collect()
    }

    /// Market nodes of the snapshot distributing a product.
    pub fn markets_for(&self, product: &str) -> Vec<&ProcessNode> {
        self.by_reference_product(product)
            .into_iter()
            .filter(|p| {
                (p.name.starts_with("market for ") || p.name.starts_with("market group for "))
                    && !p.name.contains("generic market")
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessNode> {
        self.processes.values()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

/// The working copy the engine assembles: every generated node plus rewired
/// copies of snapshot consumers, with lookup registries over the generated
/// markets and national processes.
///
/// All inserts funnel through one owner (the merge step), which keeps the
/// parallel per-commodity build free of shared mutable state.
#[derive(Debug, Default)]
pub struct RegionalizedDatabase {
    /// Generated nodes, keyed by id.
    pub nodes: HashMap<String, ProcessNode>,
    /// Rewired copies of snapshot processes, keyed by their snapshot id.
    pub rewired_snapshot: HashMap<String, ProcessNode>,
    /// (commodity code, country code) -> consumption market id.
    pub consumption_markets: HashMap<(String, String), String>,
    /// commodity code -> global production market id.
    pub global_markets: HashMap<String, String>,
    /// (commodity code, origin code) -> national process id. Exactly one
    /// national process exists per surviving pair.
    pub national_processes: HashMap<(String, String), String>,
}

impl RegionalizedDatabase {
    pub fn insert_node(&mut self, node: ProcessNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn get(&self, id: &str) -> Option<&ProcessNode> {
        self.nodes.get(id)
    }

    pub fn consumption_market(&self, commodity: &str, country: &str) -> Option<&ProcessNode> {
        self.consumption_markets
            .get(&(commodity.to_string(), country.to_string()))
            .and_then(|id| self.nodes.get(id))
    }

    pub fn global_market(&self, commodity: &str) -> Option<&ProcessNode> {
        self.global_markets
            .get(commodity)
            .and_then(|id| self.nodes.get(id))
    }

    pub fn count_kind(&self, kind: ProcessKind) -> usize {
        self.nodes.values().filter(|n| n.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, product: &str, geo: &str) -> ProcessNode {
        let geography = Geography::from(geo.to_string());
        ProcessNode {
            id: ProcessNode::derive_id(ProcessKind::Generic, name, product, &geography),
            name: name.to_string(),
            reference_product: product.to_string(),
            unit: "kg".to_string(),
            geography,
            kind: ProcessKind::Generic,
            comment: String::new(),
            exchanges: vec![],
        }
    }

    #[test]
    fn lookups_by_id_product_and_geography() {
        let template = node("ammonia production", "ammonia", "SE");
        let template_id = template.id.clone();
        let snapshot = LciSnapshot::from_nodes(vec![
            template,
            node("ammonia production", "ammonia", "RER"),
            node("market for ammonia", "ammonia", "GLO"),
        ]);

        assert!(snapshot.get(&template_id).is_some());
        assert_eq!(snapshot.by_reference_product("ammonia").len(), 3);
        assert_eq!(snapshot.by_geography(&Geography::country("SE")).len(), 1);
        assert!(snapshot.by_geography(&Geography::country("FR")).is_empty());
    }

    #[test]
    fn market_nodes_are_screened_out_of_templates() {
        let snapshot = LciSnapshot::from_nodes(vec![
            node("ammonia production", "ammonia", "RER"),
            node("market for ammonia", "ammonia", "GLO"),
            node("market group for ammonia", "ammonia", "RER"),
        ]);
        assert_eq!(snapshot.templates_for("ammonia").len(), 1);
        assert_eq!(snapshot.markets_for("ammonia").len(), 2);
    }
}
