//! Atlas configuration.
//!
//! One document configures the whole pipeline. Every section has defaults,
//! so an empty file is a valid configuration:
//!
//! ```toml
//! hash_function = "sha256"
//!
//! [verifier]
//! count_tolerance = 2
//! min_confidence = 70
//!
//! [resolver]
//! terminal_tier = "county"
//!
//! [[expected_counts]]
//! jurisdiction = "us/wa/seattle"
//! districtType = "council-district"
//! expected = 7
//! ```

use std::path::Path;

use boundary_atlas_core::{CanonicalizerConfig, HashFunction};
use boundary_atlas_resolver::ResolverConfig;
use boundary_atlas_verify::{ExpectedCountRegistry, VerifierConfig};
use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, Result};

/// Overrides [`VerifierConfig::min_confidence`].
pub const ENV_MIN_CONFIDENCE: &str = "BOUNDARY_ATLAS_MIN_CONFIDENCE";
/// Overrides [`AtlasConfig::hash_function`] (`sha256` or `poseidon`).
pub const ENV_HASH: &str = "BOUNDARY_ATLAS_HASH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Hash function new snapshots are committed with.
    pub hash_function: HashFunction,
    pub canonicalizer: CanonicalizerConfig,
    pub verifier: VerifierConfig,
    pub resolver: ResolverConfig,
    /// Expected district counts consulted by the verifier.
    pub expected_counts: ExpectedCountRegistry,
}

impl AtlasConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| AtlasError::Config(format!("invalid TOML: {e}")))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| AtlasError::Config(format!("invalid JSON: {e}")))
    }

    /// Load from a `.toml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AtlasError::Config(format!("failed to read {}: {e}", path.display())))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(AtlasError::Config(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    /// Apply overrides from the process environment.
    pub fn merge_env(self) -> Result<Self> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any variable source.
    pub fn merge_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup(ENV_MIN_CONFIDENCE) {
            let confidence: u8 = value
                .trim()
                .parse()
                .ok()
                .filter(|c| *c <= 100)
                .ok_or_else(|| {
                    AtlasError::Config(format!("invalid {ENV_MIN_CONFIDENCE}: {value:?}"))
                })?;
            self.verifier.min_confidence = confidence;
        }
        if let Some(value) = lookup(ENV_HASH) {
            self.hash_function = HashFunction::from_code(value.trim())
                .ok_or_else(|| AtlasError::Config(format!("invalid {ENV_HASH}: {value:?}")))?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boundary_atlas_core::BoundaryType;
    use boundary_atlas_verify::ExpectedCount;
    use std::collections::HashMap;

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(AtlasConfig::from_toml_str("").unwrap(), AtlasConfig::default());
    }

    #[test]
    fn test_toml_sections() {
        let config = AtlasConfig::from_toml_str(
            r#"
            hash_function = "poseidon"

            [verifier]
            min_confidence = 80

            [resolver]
            terminal_tier = "state"

            [[expected_counts]]
            jurisdiction = "us/wa/seattle"
            districtType = "council-district"
            expected = 7
            source = "Seattle City Charter"
            "#,
        )
        .unwrap();

        assert_eq!(config.hash_function, HashFunction::Poseidon);
        assert_eq!(config.verifier.min_confidence, 80);
        assert_eq!(config.verifier.count_tolerance, 2);
        assert_eq!(config.resolver.terminal_tier, BoundaryType::State);
        let seattle = config
            .expected_counts
            .get("us/wa/seattle", BoundaryType::CouncilDistrict)
            .unwrap();
        assert_eq!(seattle.expected, ExpectedCount::Districts(7));
    }

    #[test]
    fn test_json_at_large_count() {
        let config = AtlasConfig::from_json_str(
            r#"{"expected_counts":[
                {"jurisdiction":"us/ca/carlsbad","districtType":"council-district","expected":null}
            ]}"#,
        )
        .unwrap();
        let carlsbad = config
            .expected_counts
            .get("us/ca/carlsbad", BoundaryType::CouncilDistrict)
            .unwrap();
        assert_eq!(carlsbad.expected, ExpectedCount::AtLarge);
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("atlas.toml");
        std::fs::write(&toml_path, "[verifier]\nmin_confidence = 90\n").unwrap();
        assert_eq!(AtlasConfig::from_file(&toml_path).unwrap().verifier.min_confidence, 90);

        let json_path = dir.path().join("atlas.json");
        std::fs::write(&json_path, r#"{"hash_function":"poseidon"}"#).unwrap();
        assert_eq!(
            AtlasConfig::from_file(&json_path).unwrap().hash_function,
            HashFunction::Poseidon
        );

        let other = dir.path().join("atlas.yaml");
        std::fs::write(&other, "").unwrap();
        assert!(AtlasConfig::from_file(&other).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> =
            HashMap::from([(ENV_MIN_CONFIDENCE, "85"), (ENV_HASH, "poseidon")]);
        let config = AtlasConfig::default()
            .merge_vars(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.verifier.min_confidence, 85);
        assert_eq!(config.hash_function, HashFunction::Poseidon);
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let bad_confidence = AtlasConfig::default()
            .merge_vars(|k| (k == ENV_MIN_CONFIDENCE).then(|| "101".to_string()));
        assert!(bad_confidence.is_err());

        let bad_hash =
            AtlasConfig::default().merge_vars(|k| (k == ENV_HASH).then(|| "md5".to_string()));
        assert!(bad_hash.is_err());
    }
}
