use std::sync::Arc;

use pcl_syntax::{TemplateDef, Value};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::node::normalize_variable;
use crate::{NodeId, Tree};

/// Transient variable bindings for one evaluation.
///
/// Contexts chain to their parent the way nodes chain to theirs, but the
/// two chains are independent: loop and template bindings live here and are
/// never written to the tree.
#[derive(Debug, Default)]
pub struct EvaluationContext<'a> {
    bindings: FxHashMap<SmolStr, Value>,
    templates: FxHashMap<SmolStr, Arc<TemplateDef>>,
    parent: Option<&'a EvaluationContext<'a>>,
    tree: Option<&'a Tree>,
    scope: Option<NodeId>,
}

impl<'a> EvaluationContext<'a> {
    /// A root context that falls back to `tree` for variables and templates.
    pub fn new(tree: &'a Tree) -> Self {
        Self {
            tree: Some(tree),
            ..Default::default()
        }
    }

    pub fn with_scope(mut self, scope: NodeId) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn child(&self) -> EvaluationContext<'_> {
        EvaluationContext {
            bindings: FxHashMap::default(),
            templates: FxHashMap::default(),
            parent: Some(self),
            tree: self.tree,
            scope: None,
        }
    }

    #[inline(always)]
    pub fn define(&mut self, name: &str, value: Value) {
        self.bindings.insert(SmolStr::new(normalize_variable(name)), value);
    }

    pub fn define_template(&mut self, template: Arc<TemplateDef>) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Looks `name` up through this context and its parents.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let name = normalize_variable(name);
        match self.bindings.get(name) {
            Some(value) => Some(value),
            None => self.parent.and_then(|parent| parent.lookup(name)),
        }
    }

    /// Template registered in the context chain, then in the tree.
    pub fn template(&self, name: &str) -> Option<Arc<TemplateDef>> {
        match self.templates.get(name) {
            Some(template) => Some(Arc::clone(template)),
            None => match self.parent {
                Some(parent) => parent.template(name),
                None => self
                    .tree
                    .and_then(|tree| tree.template(name))
                    .map(|entry| Arc::clone(&entry.definition)),
            },
        }
    }

    pub fn tree(&self) -> Option<&'a Tree> {
        self.tree
    }

    /// Node scope of the nearest context that has one.
    pub fn scope(&self) -> Option<NodeId> {
        self.scope.or_else(|| self.parent.and_then(|parent| parent.scope()))
    }
}
