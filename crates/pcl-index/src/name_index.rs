use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::node::normalize_name;
use crate::{Node, NodeId, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Candidate must be an immediate child of the anchor.
    Strict,
    /// Candidate must be a descendant of the anchor.
    Scoped,
}

/// Flat map from normalized and real names to every node carrying them.
///
/// Several nodes may share a name; lookups disambiguate by scope.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: FxHashMap<SmolStr, Vec<NodeId>>,
}

impl NameIndex {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> &[NodeId] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, name: &str, node_id: NodeId) -> bool {
        self.get(name).contains(&node_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &[NodeId])> {
        self.entries.iter().map(|(name, ids)| (name, ids.as_slice()))
    }

    pub(crate) fn insert(&mut self, name: &str, node_id: NodeId) {
        let ids = self.entries.entry(SmolStr::new(name)).or_default();
        if !ids.contains(&node_id) {
            ids.push(node_id);
        }
    }

    pub(crate) fn insert_node(&mut self, node_id: NodeId, node: &Node) {
        self.insert(&node.name, node_id);
        self.insert(&node.real_name, node_id);
    }

    pub(crate) fn remove(&mut self, name: &str, node_id: NodeId) {
        if let Some(ids) = self.entries.get_mut(name) {
            ids.retain(|id| *id != node_id);
            if ids.is_empty() {
                self.entries.remove(name);
            }
        }
    }

    pub(crate) fn remove_node(&mut self, node_id: NodeId, node: &Node) {
        self.remove(&node.name, node_id);
        self.remove(&node.real_name, node_id);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Tree {
    pub fn name_index(&self) -> &NameIndex {
        &self.name_index
    }

    pub(crate) fn rebuild_name_index(&mut self) {
        self.name_index.clear();
        for (node_id, _) in self.preorder() {
            self.name_index.insert_node(node_id, &self.nodes[node_id]);
        }
        tracing::debug!("Rebuilt name index with {} names", self.name_index.entries.len());
    }

    /// Nodes named `name`, read from the index or, while the index is
    /// still empty, from a full walk.
    fn candidates(&self, name: &str) -> Vec<NodeId> {
        if self.name_index.is_empty() {
            return self
                .preorder()
                .into_iter()
                .map(|(node_id, _)| node_id)
                .filter(|node_id| {
                    let node = &self.nodes[*node_id];
                    node.name == name || node.real_name == name
                })
                .collect();
        }

        let normalized = normalize_name(name);
        let mut ids = self.name_index.get(normalized).to_vec();
        if normalized != name {
            let extra = self
                .name_index
                .get(name)
                .iter()
                .filter(|id| !ids.contains(id))
                .copied()
                .collect::<Vec<_>>();
            ids.extend(extra);
        }
        ids
    }

    /// Looks up a possibly dotted `name` relative to `anchor`.
    ///
    /// The first segment comes from the name index, the remaining ones are
    /// followed through literal children. Of the matches accepted by
    /// `predicate`, the shallowest wins, then the first by path, so the
    /// result never depends on index order.
    pub fn lookup(
        &self,
        anchor: NodeId,
        name: &str,
        mode: LookupMode,
        predicate: &dyn Fn(NodeId, &Node) -> bool,
    ) -> Option<NodeId> {
        let mut segments = name.split('.');
        let first = segments.next().map(normalize_name).filter(|s| !s.is_empty())?;
        let rest = segments.collect::<Vec<_>>();

        let found = self.candidates(first).into_iter().filter_map(|candidate| {
            let in_scope = match mode {
                LookupMode::Strict => self.nodes[candidate].parent == Some(anchor),
                LookupMode::Scoped => self.is_descendant(candidate, anchor),
            };
            if !in_scope {
                return None;
            }

            let found = rest
                .iter()
                .try_fold(candidate, |node_id, segment| self.nodes[node_id].child(segment))?;

            predicate(found, &self.nodes[found]).then_some(found)
        });

        found.min_by_key(|node_id| (self.ancestors(*node_id).count(), self.path(*node_id)))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pcl_syntax::{Configuration, Definition, Value};

    use super::*;

    fn any(_: NodeId, _: &Node) -> bool {
        true
    }

    fn tree() -> Tree {
        let mut tree = Tree::default();
        tree.add_file(
            PathBuf::from("a.pcl"),
            &Configuration::new(
                Some("App"),
                vec![
                    Definition::object("+Timer", vec![Definition::field("Period", Value::int(1))]),
                    Definition::object(
                        "+Data",
                        vec![Definition::object("+Timer", vec![Definition::field("Period", Value::int(2))])],
                    ),
                ],
            ),
        );
        tree
    }

    #[test]
    fn test_index_holds_normalized_and_real_names() {
        let tree = tree();
        assert_eq!(tree.name_index().get("Timer").len(), 2);
        assert_eq!(tree.name_index().get("+Timer").len(), 2);
        assert!(tree.name_index().get("Missing").is_empty());
    }

    #[test]
    fn test_strict_lookup_requires_direct_child() {
        let tree = tree();
        let app = tree.lookup(tree.root(), "App", LookupMode::Strict, &any).unwrap();

        assert!(tree.lookup(app, "Data", LookupMode::Strict, &any).is_some());
        let timer = tree.lookup(app, "Timer", LookupMode::Strict, &any).unwrap();
        assert_eq!(tree.path(timer), "App.Timer");
        assert!(tree.lookup(tree.root(), "Timer", LookupMode::Strict, &any).is_none());
    }

    #[test]
    fn test_scoped_lookup_finds_descendants() {
        let tree = tree();
        let data = tree.lookup(tree.root(), "App.Data", LookupMode::Scoped, &any).unwrap();
        let timer = tree.lookup(data, "Timer", LookupMode::Scoped, &any).unwrap();

        assert_eq!(tree.path(timer), "App.Data.Timer");
    }

    #[test]
    fn test_dotted_lookup_with_predicate() {
        let tree = tree();
        let found = tree.lookup(
            tree.root(),
            "Timer",
            LookupMode::Scoped,
            &|_: NodeId, node: &Node| node.field("Period").is_some_and(|entry| entry.value == Value::int(2)),
        );

        assert_eq!(found.map(|id| tree.path(id)).as_deref(), Some("App.Data.Timer"));
        assert!(tree.lookup(tree.root(), "App.Data.Missing", LookupMode::Scoped, &any).is_none());
    }

    #[test]
    fn test_scoped_lookup_prefers_shallowest_match() {
        let mut tree = Tree::default();
        tree.add_file(
            PathBuf::from("deep.pcl"),
            &Configuration::new(Some("App.Data"), vec![Definition::object("+Timer", Vec::new())]),
        );
        tree.add_file(
            PathBuf::from("shallow.pcl"),
            &Configuration::new(Some("App"), vec![Definition::object("+Timer", Vec::new())]),
        );
        let app = tree.child(tree.root(), "App").unwrap();

        let timer = tree.lookup(app, "Timer", LookupMode::Scoped, &any).unwrap();
        assert_eq!(tree.path(timer), "App.Timer");

        tree.rebuild_name_index();
        assert_eq!(tree.lookup(app, "Timer", LookupMode::Scoped, &any), Some(timer));
    }

    #[test]
    fn test_lookup_falls_back_to_walk_when_index_empty() {
        let mut tree = tree();
        tree.name_index.clear();

        let found = tree.lookup(tree.root(), "App.Data", LookupMode::Scoped, &any);
        assert!(found.is_some());

        tree.rebuild_name_index();
        assert_eq!(tree.name_index().get("Data").len(), 1);
    }
}
