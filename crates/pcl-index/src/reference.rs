use std::path::PathBuf;

use pcl_syntax::{Position, Range};
use smol_str::SmolStr;

use crate::{NodeId, Tree};

/// A variable bound by a reference: the node declaring it and its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableTarget {
    pub node: NodeId,
    pub name: SmolStr,
}

/// One occurrence of a name inside a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: SmolStr,
    pub position: Position,
    pub file: PathBuf,
    /// Node whose definitions contain the occurrence.
    pub scope: NodeId,
    /// `@name` rather than a bare name.
    pub is_variable: bool,
    /// Bound by an enclosing `foreach`; never resolved against the tree.
    pub loop_local: bool,
    pub target: Option<NodeId>,
    pub variable: Option<VariableTarget>,
}

impl Reference {
    pub fn is_resolved(&self) -> bool {
        self.target.is_some() || self.variable.is_some()
    }

    pub fn range(&self) -> Range {
        let sigil = u32::from(self.is_variable);
        let width = (self.name.chars().count() as u32 + sigil).saturating_sub(1);
        Range::new(
            self.position,
            Position::new(self.position.line, self.position.column + width),
        )
    }
}

impl Tree {
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.references.values().flatten()
    }

    pub fn references_in(&self, file: &std::path::Path) -> &[Reference] {
        self.references.get(file).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every reference currently bound to `node_id`.
    pub fn references_to(&self, node_id: NodeId) -> Vec<&Reference> {
        self.references()
            .filter(|reference| reference.target == Some(node_id))
            .collect()
    }
}
