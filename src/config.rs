use anyhow::{Context, Result, bail};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Construction-time parameters of a `NodeContainer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Maximum number of edges kept per node. 0 leaves the count uncapped.
    pub max_edge_count: usize,
    /// Edges beyond `max_edge_distance` are only kept to reach this many.
    pub min_edge_count: usize,
    pub max_edge_distance: f32,
    /// Largest vertical gap two connected nodes may have.
    pub max_height_delta: f32,
    pub target_nodes_per_cell: usize,
    /// When false, node positions are at the agent's feet and rays are cast
    /// from half the collide height above them.
    pub node_is_at_center: bool,
    /// Agent body box (width, height, depth) used to spread free-path rays.
    pub collide_size: Vec3,
}

impl Default for NavConfig {
    fn default() -> Self {
        NavConfig {
            max_edge_count: 5,
            min_edge_count: 2,
            max_edge_distance: 3.0,
            max_height_delta: 0.1,
            target_nodes_per_cell: 6,
            node_is_at_center: true,
            collide_size: Vec3::new(0.5, 1.4, 0.5),
        }
    }
}

impl NavConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: NavConfig = serde_yaml::from_str(text).context("Failed to parse nav config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read nav config {}", path.display()))?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_edge_distance.is_nan() || self.max_edge_distance <= 0.0 {
            bail!("max_edge_distance must be positive, got {}", self.max_edge_distance);
        }
        if self.max_height_delta < 0.0 {
            bail!("max_height_delta must not be negative, got {}", self.max_height_delta);
        }
        if self.target_nodes_per_cell == 0 {
            bail!("target_nodes_per_cell must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NavConfig::default();
        assert_eq!(config.max_edge_count, 5);
        assert_eq!(config.min_edge_count, 2);
        assert_eq!(config.max_edge_distance, 3.0);
        assert_eq!(config.max_height_delta, 0.1);
        assert_eq!(config.target_nodes_per_cell, 6);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = NavConfig::from_yaml_str("max_edge_distance: 4.5\nnode_is_at_center: false\n")
            .expect("config should parse");
        assert_eq!(config.max_edge_distance, 4.5);
        assert!(!config.node_is_at_center);
        assert_eq!(config.max_edge_count, 5);
    }

    #[test]
    fn test_rejects_zero_cell_target() {
        let result = NavConfig::from_yaml_str("target_nodes_per_cell: 0\n");
        assert!(result.is_err());
    }
}
