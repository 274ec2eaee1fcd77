use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::aggregate::Sampling;
use crate::error::ConfigError;

/// Where the survey data lives and how large scatter views may grow.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```json
/// { "raw_path": "/srv/survey/cchs_2017.csv", "sample_ceiling": 2000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Raw, integer-coded survey file (`.csv` or `.parquet`).
    pub raw_path: PathBuf,
    /// Decoded table written after every load.
    pub cache_path: PathBuf,
    /// Maximum points in a scatter view.
    pub sample_ceiling: usize,
    /// Seed for the scatter sample.
    pub sample_seed: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let sampling = Sampling::default();
        Settings {
            raw_path: PathBuf::from("data/raw/health_dataset.csv"),
            cache_path: PathBuf::from("data/processed/clean_health_data.csv"),
            sample_ceiling: sampling.ceiling,
            sample_seed: sampling.seed,
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn sampling(&self) -> Sampling {
        Sampling {
            ceiling: self.sample_ceiling,
            seed: self.sample_seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_data_dir() {
        let s = Settings::default();
        assert_eq!(s.raw_path, Path::new("data/raw/health_dataset.csv"));
        assert_eq!(s.cache_path, Path::new("data/processed/clean_health_data.csv"));
        assert_eq!(s.sampling(), Sampling { ceiling: 5000, seed: 42 });
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.json");
        std::fs::write(&path, r#"{ "sample_ceiling": 100 }"#).unwrap();

        let s = Settings::from_file(&path).unwrap();
        assert_eq!(s.sample_ceiling, 100);
        assert_eq!(s.raw_path, Settings::default().raw_path);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.json");
        std::fs::write(&path, r#"{ "sample_size": 100 }"#).unwrap();
        assert!(matches!(Settings::from_file(&path), Err(ConfigError::Json { .. })));
    }
}
