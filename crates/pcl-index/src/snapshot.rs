use slotmap::{SecondaryMap, SlotMap};

use crate::name_index::NameIndex;
use crate::tree::FileEntry;
use crate::{NodeId, Tree};

impl Tree {
    /// Deep copy whose cross references point into the copy.
    ///
    /// Node ids are reassigned, so ids taken from `self` must not be used
    /// against the copy; compare by [`Tree::path`] instead. Link targets and reference bindings are not
    /// carried over; the copy rebuilds its name index and resolves them
    /// again against its own nodes.
    pub fn snapshot(&self) -> Tree {
        let order = self.preorder();
        let mut nodes = SlotMap::with_capacity_and_key(order.len());
        let mut ids: SecondaryMap<NodeId, NodeId> = SecondaryMap::with_capacity(order.len());

        for (node_id, _) in &order {
            let copy = nodes.insert(self.nodes[*node_id].clone());
            ids.insert(*node_id, copy);
        }

        let remap = |node_id: NodeId| ids.get(node_id).copied();
        for (_, node) in nodes.iter_mut() {
            node.parent = node.parent.and_then(remap);
            node.target = None;
            node.children = std::mem::take(&mut node.children)
                .into_iter()
                .filter_map(|(name, child)| remap(child).map(|child| (name, child)))
                .collect();
        }

        let mut references = self.references.clone();
        for reference in references.values_mut().flatten() {
            reference.scope = remap(reference.scope).unwrap_or_default();
            reference.target = None;
            reference.variable = None;
        }

        let files = self
            .files
            .iter()
            .filter_map(|(path, entry)| {
                Some((
                    path.clone(),
                    FileEntry {
                        top: remap(entry.top)?,
                        nodes: entry.nodes.iter().copied().filter_map(remap).collect(),
                    },
                ))
            })
            .collect();

        let mut tree = Tree {
            nodes,
            root: remap(self.root).unwrap_or_default(),
            isolated: self
                .isolated
                .iter()
                .filter_map(|(path, root)| remap(*root).map(|root| (path.clone(), root)))
                .collect(),
            name_index: NameIndex::default(),
            references,
            templates: self.templates.clone(),
            global_pragmas: self.global_pragmas.clone(),
            files,
            options: self.options.clone(),
        };

        tree.rebuild_name_index();
        tree.resolve_references();
        tree
    }
}
