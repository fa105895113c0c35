use crate::name_index::LookupMode;
use crate::node::{VariableInfo, normalize_variable};
use crate::reference::{Reference, VariableTarget};
use crate::{Node, NodeId, Tree};

impl Tree {
    /// Finds the variable `name` declared on `scope` or one of its
    /// ancestors, then on the global root.
    pub fn resolve_variable(&self, scope: NodeId, name: &str) -> Option<(NodeId, &VariableInfo)> {
        let name = normalize_variable(name);

        self.ancestors(scope)
            .chain(std::iter::once(self.root))
            .find_map(|node_id| {
                self.nodes
                    .get(node_id)
                    .and_then(|node| node.variables.get(name))
                    .map(|info| (node_id, info))
            })
    }

    pub fn resolve_name(&self, scope: NodeId, name: &str) -> Option<NodeId> {
        self.resolve_name_with(scope, name, &|_, _| true)
    }

    /// Resolves a node name from `scope`: a scoped lookup anchored at each
    /// ancestor in turn, then one strict lookup at the global root.
    pub fn resolve_name_with(
        &self,
        scope: NodeId,
        name: &str,
        predicate: &dyn Fn(NodeId, &Node) -> bool,
    ) -> Option<NodeId> {
        self.ancestors(scope)
            .find_map(|anchor| self.lookup(anchor, name, LookupMode::Scoped, predicate))
            .or_else(|| self.lookup(self.root, name, LookupMode::Strict, predicate))
    }

    fn resolve_reference(&self, reference: &Reference) -> (Option<NodeId>, Option<VariableTarget>) {
        if reference.loop_local {
            return (None, None);
        }

        let variable = self
            .resolve_variable(reference.scope, &reference.name)
            .map(|(node, info)| VariableTarget {
                node,
                name: info.name.clone(),
            });
        if variable.is_some() || reference.is_variable {
            return (None, variable);
        }

        (self.resolve_name(reference.scope, &reference.name), None)
    }

    /// Name of the node a link node points at, if `node_id` is one.
    pub fn link_name(&self, node_id: NodeId) -> Option<&str> {
        let node = self.nodes.get(node_id)?;
        self.options
            .link_fields
            .iter()
            .filter_map(|field| node.field(field))
            .find_map(|entry| match &entry.value.kind {
                pcl_syntax::ValueKind::Reference(name) => Some(name.as_str()),
                _ => None,
            })
    }

    /// Binds every reference and link node of the tree.
    ///
    /// Returns the number of references left unresolved.
    pub fn resolve_references(&mut self) -> usize {
        if self.name_index.is_empty() {
            self.rebuild_name_index();
        }

        let mut references = std::mem::take(&mut self.references);
        let mut unresolved = 0;
        for reference in references.values_mut().flatten() {
            let (target, variable) = self.resolve_reference(reference);
            reference.target = target;
            reference.variable = variable;
            if !reference.is_resolved() && !reference.loop_local {
                unresolved += 1;
            }
        }
        self.references = references;

        let links = self
            .nodes
            .keys()
            .filter_map(|node_id| {
                let name = self.link_name(node_id)?;
                let scope = self.nodes[node_id].parent.unwrap_or(node_id);
                Some((node_id, self.resolve_name_with(scope, name, &|id, _| id != node_id)))
            })
            .collect::<Vec<_>>();
        for (node_id, target) in &links {
            self.nodes[*node_id].target = *target;
        }

        tracing::debug!(
            "Resolved references ({} unresolved, {} links)",
            unresolved,
            links.len()
        );
        unresolved
    }
}
