use anyhow::{bail, Context, Result};
use regiolink_core::classifier::CommodityClassifier;
use regiolink_core::regionalization::duplicator::EnergyCoverage;
use regiolink_core::regionalization::pipeline::ReferenceData;
use regiolink_core::regionalization::spatialize::{CfTable, SpatializableFlows};
use regiolink_schemas::factor::ImpactMethod;
use regiolink_schemas::file_formats::{
    CommodityFile, EnergyCoverageFile, MappingFile, RegionFile, SpatializableFlowFile,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a run needs, read from one YAML file. CLI flags may override
/// the cutoff and the method afterwards.
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    pub snapshot: PathBuf,
    pub trade_dir: PathBuf,
    pub reference_dir: PathBuf,
    pub factors_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cutoff: f64,
    pub schema_version: String,
    pub method: String,
    /// Trade vintage window; empty keeps every recorded year.
    #[serde(default)]
    pub years: Vec<u16>,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {:?}", path))?;
        let config: RunConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration from {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !["3.9", "3.9.1", "3.10", "3.10.1"].contains(&self.schema_version.as_str()) {
            bail!(
                "Unsupported schema version '{}'. Supported versions are: 3.9, 3.9.1, 3.10 or 3.10.1",
                self.schema_version
            );
        }
        Ok(())
    }

    /// Patch releases share their minor version's reference data.
    pub fn normalized_schema_version(&self) -> &str {
        if self.schema_version.starts_with("3.9") {
            "3.9"
        } else {
            "3.10"
        }
    }

    pub fn method(&self) -> Result<ImpactMethod> {
        self.method
            .parse()
            .map_err(|message: String| anyhow::anyhow!(message))
    }
}

fn load_yaml<T>(path: &Path) -> Result<T>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse YAML from {:?}", path))
}

/// Load the immutable reference tables for the configured schema version:
/// the commodity catalog and mappings, the geography hierarchy, the energy
/// coverage lists, the spatializable-flow list and the selected method's
/// characterization factors.
pub fn load_reference_data(config: &RunConfig) -> Result<ReferenceData> {
    let base = config
        .reference_dir
        .join(format!("ei{}", config.normalized_schema_version()));
    println!("Loading reference data from '{}'...", base.display());

    let commodities: CommodityFile = load_yaml(&base.join("commodities.yaml"))?;
    let mappings: MappingFile = load_yaml(&base.join("commodity_mappings.yaml"))?;
    let regions: RegionFile = load_yaml(&base.join("country_regions.yaml"))?;
    let coverage: EnergyCoverageFile = load_yaml(&base.join("energy_coverage.yaml"))?;
    let spatializable: SpatializableFlowFile = load_yaml(&base.join("spatialized_flows.yaml"))?;

    let method = config.method()?;
    let factors_path = config.factors_dir.join(format!(
        "{}_ei{}.csv",
        method.table_stem(),
        config.normalized_schema_version()
    ));
    let factors = CfTable::load(&factors_path)
        .with_context(|| format!("Failed to load characterization factors for {method}"))?;

    println!("Reference data loaded successfully.");
    Ok(ReferenceData {
        classifier: CommodityClassifier::new(
            commodities.commodities,
            mappings.mappings,
            regions.regions,
        ),
        coverage: EnergyCoverage::from(coverage),
        spatializable: SpatializableFlows::from_flows(spatializable.flows),
        factors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &Path, schema_version: &str, method: &str) -> PathBuf {
        let path = dir.join("regiolink.yaml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "snapshot: snapshot.json\n\
             trade_dir: trade\n\
             reference_dir: reference\n\
             factors_dir: factors\n\
             output_dir: runs\n\
             cutoff: 0.85\n\
             schema_version: \"{schema_version}\"\n\
             method: \"{method}\"\n\
             years: [2021, 2022]"
        )
        .unwrap();
        path
    }

    #[test]
    fn parses_a_complete_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "3.10.1", "IW v2.1");
        let config = RunConfig::load(&path).unwrap();
        assert!((config.cutoff - 0.85).abs() < 1e-12);
        assert_eq!(config.normalized_schema_version(), "3.10");
        assert_eq!(config.method().unwrap(), ImpactMethod::ImpactWorldPlus21);
        assert_eq!(config.years, vec![2021, 2022]);
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "2.2", "IW v2.1");
        assert!(RunConfig::load(&path).is_err());
    }

    #[test]
    fn rejects_unknown_method() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "3.10", "TRACI");
        let config = RunConfig::load(&path).unwrap();
        assert!(config.method().is_err());
    }
}
