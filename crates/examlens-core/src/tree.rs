//! Browsing mastery roll-up over a content tree.
//!
//! Leaves carry a mastery score on the 0–100 browsing scale; every internal
//! node is set to the unweighted mean of its direct children, children
//! first. This scale and its levels are unrelated to the 0–1 diagnostic
//! score in [`crate::statistics`].

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Browsing mastery level on the 0–100 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowseLevel {
    Mastered,
    Review,
    Weak,
    #[default]
    Unlearned,
}

impl BrowseLevel {
    /// `≥ 80` mastered, `≥ 60` review, `> 0` weak, otherwise unlearned.
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            Some(s) if s >= 80.0 => BrowseLevel::Mastered,
            Some(s) if s >= 60.0 => BrowseLevel::Review,
            Some(s) if s > 0.0 => BrowseLevel::Weak,
            _ => BrowseLevel::Unlearned,
        }
    }
}

/// A content tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub title: String,
    /// Mastery on the 0–100 browsing scale; `None` means unlearned.
    #[serde(default)]
    pub mastery_score: Option<f64>,
    #[serde(default)]
    pub mastery_level: BrowseLevel,
    #[serde(default)]
    pub is_weak_point: bool,
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),
}

/// A forest of content nodes stored as an index arena.
#[derive(Debug, Clone)]
pub struct MasteryForest {
    nodes: Vec<TreeNode>,
    index: HashMap<String, usize>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl MasteryForest {
    /// Build the arena: index every id, then link children to parents.
    ///
    /// Nodes whose parent is missing (or themselves) become roots. Nodes
    /// caught in a parent cycle are unreachable and left as they are.
    pub fn build(nodes: Vec<TreeNode>) -> Result<Self, TreeError> {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(TreeError::DuplicateNode(node.id.clone()));
            }
        }

        let mut children = vec![Vec::new(); nodes.len()];
        let mut roots = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            let parent = node
                .parent_id
                .as_deref()
                .filter(|p| *p != node.id)
                .and_then(|p| index.get(p).copied());
            match parent {
                Some(p) => children[p].push(i),
                None => roots.push(i),
            }
        }

        Ok(Self {
            nodes,
            index,
            children,
            roots,
        })
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<TreeNode> {
        self.nodes
    }

    pub fn roots(&self) -> impl Iterator<Item = &TreeNode> {
        self.roots.iter().map(|&i| &self.nodes[i])
    }

    /// Direct children of `id` in input order; empty for unknown ids.
    pub fn children_of(&self, id: &str) -> Vec<&TreeNode> {
        self.index
            .get(id)
            .map(|&i| self.children[i].iter().map(|&c| &self.nodes[c]).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, id: &str) -> Option<&TreeNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Recompute every internal node's score, children first.
    pub fn roll_up(&mut self) {
        let mut stack: Vec<(usize, bool)> = self.roots.iter().rev().map(|&r| (r, false)).collect();
        while let Some((idx, expanded)) = stack.pop() {
            if expanded {
                self.settle(idx);
                continue;
            }
            stack.push((idx, true));
            for &child in self.children[idx].iter().rev() {
                stack.push((child, false));
            }
        }
    }

    fn settle(&mut self, idx: usize) {
        if self.children[idx].is_empty() {
            return;
        }
        let scores: Vec<f64> = self.children[idx]
            .iter()
            .filter_map(|&c| self.nodes[c].mastery_score)
            .collect();
        let score = if scores.is_empty() {
            None
        } else {
            let mean = scores.iter().sum::<f64>() / scores.len() as f64;
            Some((mean * 10.0).round() / 10.0)
        };

        let node = &mut self.nodes[idx];
        node.mastery_score = score;
        node.mastery_level = BrowseLevel::from_score(score);
        node.is_weak_point = node.mastery_level == BrowseLevel::Weak;
    }
}

/// Build, roll up and flatten a forest in one call.
pub fn roll_up_mastery(nodes: Vec<TreeNode>) -> Result<Vec<TreeNode>, TreeError> {
    let mut forest = MasteryForest::build(nodes)?;
    forest.roll_up();
    Ok(forest.into_nodes())
}

/// Load a flat JSON array of nodes from a file.
pub fn load_nodes_json(path: &Path) -> anyhow::Result<Vec<TreeNode>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tree from {}", path.display()))?;
    serde_json::from_str(&content).context("failed to parse tree JSON")
}
