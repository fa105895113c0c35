use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use pcl_syntax::{Configuration, Definitions, Position, Value};

use crate::eval::{EvalOptions, EvaluationContext, Evaluator};
use crate::find::Entity;
use crate::node::VariableInfo;
use crate::options::IndexOptions;
use crate::{Node, NodeId, Tree};

/// Handle to a tree shared between threads.
///
/// Every method takes the lock once and then works on [`Tree`], which never
/// locks. Cloning the handle shares the same tree; use
/// [`SharedTree::snapshot`] for an independent copy.
#[derive(Debug, Clone, Default)]
pub struct SharedTree {
    inner: Arc<RwLock<Tree>>,
}

impl From<Tree> for SharedTree {
    fn from(tree: Tree) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }
}

impl SharedTree {
    pub fn new(options: IndexOptions) -> Self {
        Tree::new(options).into()
    }

    /// Read guard for queries spanning several calls. Calling other
    /// `SharedTree` methods while holding it can deadlock against a waiting
    /// writer; use the guard's `Tree` methods instead.
    pub fn read(&self) -> RwLockReadGuard<'_, Tree> {
        self.inner.read()
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, config: &Configuration) {
        self.inner.write().add_file(path, config);
    }

    pub fn remove_file(&self, path: &Path) -> bool {
        self.inner.write().remove_file(path)
    }

    pub fn resolve_references(&self) -> usize {
        self.inner.write().resolve_references()
    }

    pub fn reevaluate_fields(&self, options: &EvalOptions) -> usize {
        self.inner.write().reevaluate_fields(options)
    }

    /// Visits every node under one read lock. The callback gets the locked
    /// tree for paths and lookups; calling back into this handle from it can
    /// deadlock against a queued writer.
    pub fn walk(&self, mut f: impl FnMut(&Tree, NodeId, &Node)) {
        let guard = self.inner.read();
        let tree: &Tree = &guard;
        tree.walk(|node_id, node| f(tree, node_id, node));
    }

    pub fn node_at(&self, file: &Path, position: Position) -> Option<NodeId> {
        self.inner.read().node_at(file, position)
    }

    pub fn entity_at(&self, file: &Path, line: u32, column: u32) -> Option<Entity> {
        self.inner.read().entity_at(file, line, column)
    }

    pub fn resolve_name(
        &self,
        scope: NodeId,
        name: &str,
        predicate: &dyn Fn(NodeId, &Node) -> bool,
    ) -> Option<NodeId> {
        self.inner.read().resolve_name_with(scope, name, predicate)
    }

    pub fn resolve_variable(&self, scope: NodeId, name: &str) -> Option<(NodeId, VariableInfo)> {
        self.inner
            .read()
            .resolve_variable(scope, name)
            .map(|(node_id, info)| (node_id, info.clone()))
    }

    pub fn evaluate_value(&self, value: &Value, scope: NodeId, options: &EvalOptions) -> Value {
        self.inner.read().evaluate_value(value, scope, options)
    }

    /// Evaluates `definitions` in a fresh context rooted at `scope`.
    pub fn evaluate_definitions(
        &self,
        definitions: &Definitions,
        scope: NodeId,
        options: &EvalOptions,
    ) -> Definitions {
        let tree = self.inner.read();
        let mut ctx = EvaluationContext::new(&tree).with_scope(scope);
        Evaluator::new(options.clone()).evaluate_definitions(definitions, &mut ctx)
    }

    pub fn path(&self, node_id: NodeId) -> String {
        self.inner.read().path(node_id)
    }

    pub fn files(&self) -> Vec<PathBuf> {
        self.inner.read().files().map(Path::to_path_buf).collect()
    }

    pub fn snapshot(&self) -> Tree {
        self.inner.read().snapshot()
    }
}
