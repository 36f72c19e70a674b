//! Saving and loading compiled edges as an `AINodes` XML document.
//!
//! Only edges are stored. Node names and positions come from the level, so a
//! file is applied to a container whose nodes were already added:
//!
//! ```xml
//! <AINodes>
//!   <Node Name="hall_1">
//!     <Edge Node="hall_2" Distance="2.5"/>
//!   </Node>
//! </AINodes>
//! ```

use crate::graph::NodeContainer;
use crate::models::NavEdge;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "AINodes")]
struct AiNodesDocument {
    #[serde(rename = "Node", default)]
    nodes: Vec<NodeElement>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeElement {
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "Edge", default)]
    edges: Vec<EdgeElement>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgeElement {
    #[serde(rename = "@Node")]
    node: String,
    #[serde(rename = "@Distance")]
    distance: f32,
}

impl NodeContainer {
    /// Serializes every node's edges to an `AINodes` XML string.
    ///
    /// Nodes are written by name, so duplicate names do not round-trip; a
    /// warning is logged when any are present.
    pub fn edges_to_xml(&self) -> Result<String> {
        let shadowed = self.shadowed_nodes().count();
        if shadowed > 0 {
            warn!(
                shadowed,
                "Saving nav edges with duplicate node names, shadowed nodes will not reload"
            );
        }

        let document = AiNodesDocument {
            nodes: self
                .nodes()
                .iter()
                .map(|node| NodeElement {
                    name: node.name.clone(),
                    edges: node
                        .edges
                        .iter()
                        .map(|edge| EdgeElement {
                            node: self.node(edge.node).name.clone(),
                            distance: edge.distance,
                        })
                        .collect(),
                })
                .collect(),
        };
        quick_xml::se::to_string(&document).context("Failed to serialize nav edges")
    }

    /// Replaces the edges of the named nodes with the ones in `xml` and
    /// rebuilds the spatial grid. Stored edges are trusted as-is; no free-path
    /// checks are re-run.
    ///
    /// Fails without modifying the container if the document names a node
    /// the container does not have.
    pub fn apply_edges_xml(&mut self, xml: &str) -> Result<()> {
        let document: AiNodesDocument =
            quick_xml::de::from_str(xml).context("Failed to parse AINodes document")?;

        let mut resolved = Vec::with_capacity(document.nodes.len());
        for element in &document.nodes {
            let id = self
                .node_id_by_name(&element.name)
                .ok_or_else(|| anyhow!("Unknown node '{}' in AINodes document", element.name))?;

            let mut edges = Vec::with_capacity(element.edges.len());
            for edge in &element.edges {
                let target = self.node_id_by_name(&edge.node).ok_or_else(|| {
                    anyhow!("Node '{}' has an edge to unknown node '{}'", element.name, edge.node)
                })?;
                edges.push(NavEdge::new(target, edge.distance));
            }
            resolved.push((id, edges));
        }

        let listed = resolved.len();
        for (id, edges) in resolved {
            self.set_edges(id, edges);
        }
        if listed < self.node_count() {
            warn!(listed, total = self.node_count(), "AINodes document does not cover every node");
        }

        self.rebuild_grid();
        Ok(())
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let xml = self.edges_to_xml()?;
        fs::write(path, xml).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), nodes = self.node_count(), "Saved nav edges");
        Ok(())
    }

    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        let xml = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        self.apply_edges_xml(&xml)
            .with_context(|| format!("Failed to load nav edges from {}", path.display()))?;
        info!(path = %path.display(), edges = self.edge_count(), "Loaded nav edges");
        Ok(())
    }

    /// Loads cached edges from `path` when possible, otherwise compiles the
    /// graph and writes the cache. Returns true if the cache was used.
    pub fn load_or_compile(&mut self, path: &Path) -> Result<bool> {
        if path.exists() {
            match self.load_from_file(path) {
                Ok(()) => return Ok(true),
                Err(e) => warn!(error = %format!("{e:#}"), "Ignoring unusable nav edge cache"),
            }
        }
        self.compile();
        self.save_to_file(path)?;
        Ok(false)
    }
}
