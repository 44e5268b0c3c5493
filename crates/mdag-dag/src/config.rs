use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chunker::Chunker;
use crate::error::{DagError, DagResult};

/// Tuning for DAG construction and reconstruction.
///
/// Leaf size and fan-out change the shape of the tree and therefore every
/// digest it produces; readers accept any shape regardless of their own
/// setting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DagConfig {
    /// Maximum payload bytes per Blob leaf.
    pub leaf_size: usize,
    /// Maximum links per List or Tree object.
    pub fan_out: usize,
    /// Check every link's declared size against the reconstructed subtree.
    pub verify_sizes: bool,
    /// Process sibling chunks and entries on the rayon thread pool.
    pub parallel: bool,
}

impl DagConfig {
    /// 256 KiB leaves.
    pub const DEFAULT_LEAF_SIZE: usize = 256 * 1024;
    /// 1024 links per internal object.
    pub const DEFAULT_FAN_OUT: usize = 1024;

    /// Reject bounds the chunker cannot work with.
    pub fn validate(&self) -> DagResult<()> {
        self.chunker().map(|_| ())
    }

    /// The chunker these bounds describe.
    pub fn chunker(&self) -> DagResult<Chunker> {
        Chunker::new(self.leaf_size, self.fan_out)
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> DagResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| DagError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> DagResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DagError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> DagResult<String> {
        toml::to_string_pretty(self).map_err(|e| DagError::Config(e.to_string()))
    }
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            leaf_size: Self::DEFAULT_LEAF_SIZE,
            fan_out: Self::DEFAULT_FAN_OUT,
            verify_sizes: false,
            parallel: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = DagConfig::default();
        assert_eq!(c.leaf_size, 256 * 1024);
        assert_eq!(c.fan_out, 1024);
        assert!(!c.verify_sizes);
        assert!(c.parallel);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = DagConfig::from_toml_str("fan_out = 16\nverify_sizes = true\n").unwrap();
        assert_eq!(c.fan_out, 16);
        assert!(c.verify_sizes);
        assert_eq!(c.leaf_size, DagConfig::DEFAULT_LEAF_SIZE);
    }

    #[test]
    fn toml_roundtrip() {
        let c = DagConfig {
            leaf_size: 4096,
            fan_out: 8,
            verify_sizes: true,
            parallel: false,
        };
        let text = c.to_toml_string().unwrap();
        assert_eq!(DagConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        assert!(matches!(
            DagConfig::from_toml_str("leaf_size = 0"),
            Err(DagError::Config(_))
        ));
        assert!(matches!(
            DagConfig::from_toml_str("fan_out = 1"),
            Err(DagError::Config(_))
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            DagConfig::from_toml_str("leaf_sise = 10"),
            Err(DagError::Config(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdag.toml");
        std::fs::write(&path, "leaf_size = 1024\n").unwrap();
        assert_eq!(DagConfig::load(&path).unwrap().leaf_size, 1024);
        assert!(matches!(
            DagConfig::load(dir.path().join("missing.toml")),
            Err(DagError::Config(_))
        ));
    }
}
