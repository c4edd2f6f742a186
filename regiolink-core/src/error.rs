use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegiolinkError {
    #[error("Cutoff must lie strictly between 0 and 1, got {0}")]
    InvalidCutoff(f64),

    #[error("Process '{0}' has no commodity mapping")]
    UnmappedProcess(String),

    #[error("No production template found for commodity '{0}'")]
    NoTemplate(String),

    #[error("Process '{0}' not found in the database")]
    ProcessNotFound(String),

    #[error("Shares of '{commodity}' for '{country}' sum to {total}, expected 1")]
    ImbalancedShares {
        commodity: String,
        country: String,
        total: f64,
    },

    #[error("Exchange of '{product}' in '{consumer}' could not be rewired")]
    UnresolvedRewire { consumer: String, product: String },

    #[error("No characterization factor for flow '{flow}' in '{country}'")]
    NoCharacterizationFactor { flow: String, country: String },

    #[error("Missing trade data: {0}")]
    MissingTradeData(String),

    #[error("I/O error for file '{0}': {1}")]
    FileIO(String, #[source] std::io::Error),

    #[error("Failed to parse YAML from '{0}': {1}")]
    YamlParsing(String, #[source] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Failed to process CSV file '{0}': {1}")]
    CsvError(String, #[source] csv::Error),

    #[error("An error occurred while writing the coverage report: {0}")]
    ReportError(#[from] anyhow::Error),
}
