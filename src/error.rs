use thiserror::Error;

/// Errors surfaced to the caller before or instead of a search.
///
/// Classifier failures during a search are not represented here: they are
/// mapped to a fitness (or accuracy) of 0.0 so that candidates stay comparable.
#[derive(Error, Debug)]
pub enum GafsError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    DataQuality(String),

    #[error("Error processing CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),
}

impl GafsError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, GafsError::Configuration(_))
    }

    pub fn is_data_quality(&self) -> bool {
        matches!(self, GafsError::DataQuality(_))
    }
}

pub type Result<T> = std::result::Result<T, GafsError>;
