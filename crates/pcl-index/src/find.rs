use std::path::Path;

use pcl_syntax::{Position, Range, Value};
use smol_str::SmolStr;

use crate::node::VariableInfo;
use crate::reference::Reference;
use crate::{NodeId, Tree};

/// What sits under a cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Node(NodeId),
    Field {
        node: NodeId,
        name: SmolStr,
        value: Value,
        position: Position,
    },
    Variable {
        node: NodeId,
        info: VariableInfo,
    },
    Reference(Reference),
}

fn name_range(name: &str, position: Position) -> Range {
    let width = name.chars().count().saturating_sub(1) as u32;
    Range::new(position, Position::new(position.line, position.column + width))
}

impl Tree {
    /// Innermost node whose object span in `file` contains `position`,
    /// falling back to the file's package node.
    pub fn node_at(&self, file: &Path, position: Position) -> Option<NodeId> {
        let entry = self.files.get(file)?;

        let innermost = entry
            .nodes
            .iter()
            .filter_map(|node_id| {
                let node = self.nodes.get(*node_id)?;
                node.fragments
                    .iter()
                    .filter(|fragment| fragment.file == file)
                    .filter_map(|fragment| fragment.range)
                    .find(|range| range.contains(&position))
                    .map(|range| (*node_id, range))
            })
            .max_by_key(|(_, range)| (range.start, std::cmp::Reverse(range.end)))
            .map(|(node_id, _)| node_id);

        innermost.or(Some(entry.top))
    }

    pub fn entity_at(&self, file: &Path, line: u32, column: u32) -> Option<Entity> {
        let position = Position::new(line, column);

        if let Some(reference) = self
            .references_in(file)
            .iter()
            .find(|reference| reference.range().contains(&position))
        {
            return Some(Entity::Reference(reference.clone()));
        }

        let node_id = self.node_at(file, position)?;
        let node = self.nodes.get(node_id)?;

        let field = node.fields.iter().find_map(|(name, entries)| {
            entries
                .iter()
                .find(|entry| entry.file == file && name_range(name, entry.position).contains(&position))
                .map(|entry| Entity::Field {
                    node: node_id,
                    name: name.clone(),
                    value: entry.value.clone(),
                    position: entry.position,
                })
        });
        if field.is_some() {
            return field;
        }

        let variable = node
            .variables
            .values()
            .find(|info| info.file == file && name_range(&info.name, info.position).contains(&position))
            .map(|info| Entity::Variable {
                node: node_id,
                info: info.clone(),
            });

        variable.or(Some(Entity::Node(node_id)))
    }
}
