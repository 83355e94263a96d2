// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Printable views of chunk nodes.

use serde::Serialize;
use tiles_lite_engine::{ChunkLoaderFactory, ChunkNode, Refine};

#[derive(Debug, Serialize)]
pub struct NodeReport {
    pub id: String,
    pub level: u32,
    pub parent: Option<String>,
    pub geometric_error: f64,
    pub refine: Refine,
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub has_content: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentReport>,
}

#[derive(Debug, Serialize)]
pub struct ContentReport {
    pub url: String,
    pub batch_length: u32,
    pub meshes: Option<usize>,
    pub primitives: Option<usize>,
}

impl NodeReport {
    pub fn new(node: &ChunkNode) -> Self {
        Self {
            id: node.id.to_string(),
            level: node.id.level,
            parent: node.parent.map(|p| p.to_string()),
            geometric_error: node.geometric_error,
            refine: node.refine,
            min: [node.bbox.min.x, node.bbox.min.y, node.bbox.min.z],
            max: [node.bbox.max.x, node.bbox.max.y, node.bbox.max.z],
            has_content: node.has_content,
            content: None,
        }
    }

    /// Load the b3dm payload of the node, if any, and record what it holds.
    pub fn load_content(&mut self, factory: &ChunkLoaderFactory<'_>, node: &ChunkNode) -> anyhow::Result<()> {
        let Some(loader) = factory.content(&node.id)? else {
            return Ok(());
        };
        let Some(payload) = loader.payload()? else {
            return Ok(());
        };
        let model = loader.model()?;
        self.content = Some(ContentReport {
            url: payload.url.clone(),
            batch_length: payload.feature_table.batch_length,
            meshes: model.map(|m| m.mesh_count),
            primitives: model.map(|m| m.primitive_count),
        });
        Ok(())
    }

    pub fn line(&self) -> String {
        let indent = "  ".repeat(self.level as usize);
        let mut line = format!(
            "{indent}{} error={:.3} refine={:?} min=({:.3}, {:.3}, {:.3}) max=({:.3}, {:.3}, {:.3})",
            self.id,
            self.geometric_error,
            self.refine,
            self.min[0],
            self.min[1],
            self.min[2],
            self.max[0],
            self.max[1],
            self.max[2],
        );
        if let Some(content) = &self.content {
            line.push_str(&format!(
                " content={} batch={} meshes={}",
                content.url,
                content.batch_length,
                content.meshes.map_or_else(|| "-".to_string(), |m| m.to_string()),
            ));
        } else if self.has_content {
            line.push_str(" content");
        }
        line
    }
}
