use crate::{
    commodity::{Commodity, CommodityMapping},
    factor::SpatializableFlow,
    process::ProcessNode,
};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct CommodityFile {
    pub schema_version: String,
    pub commodities: Vec<Commodity>,
}

#[derive(Debug, Deserialize)]
pub struct MappingFile {
    pub schema_version: String,
    pub mappings: Vec<CommodityMapping>,
}

/// Enclosing database regions for each country, smallest region first.
#[derive(Debug, Deserialize)]
pub struct RegionFile {
    pub schema_version: String,
    pub regions: HashMap<String, Vec<String>>,
}

/// Which geographies the snapshot carries national energy and waste
/// processes for. A country absent from a list has no dedicated mix and
/// falls back to an enclosing aggregate during duplication.
#[derive(Debug, Deserialize)]
pub struct EnergyCoverageFile {
    pub schema_version: String,
    pub electricity: Vec<String>,
    pub waste: Vec<String>,
    pub heat_district_ng: Vec<String>,
    pub heat_district_non_ng: Vec<String>,
    pub heat_small_scale_non_ng: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpatializableFlowFile {
    pub schema_version: String,
    pub flows: Vec<SpatializableFlow>,
}

/// On-disk form of an LCI database snapshot.
#[derive(Debug, Deserialize)]
pub struct SnapshotFile {
    pub schema_version: String,
    pub processes: Vec<ProcessNode>,
}
