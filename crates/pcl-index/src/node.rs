use std::collections::BTreeMap;
use std::path::PathBuf;

use pcl_syntax::{Position, Value};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::fragment::Fragment;

slotmap::new_key_type! {
    /// Arena key of a node. Only meaningful in the tree that issued it; a
    /// key from another tree may name a different live node.
    pub struct NodeId;
}

/// Strips the declaration sigils (`+`, `$`) from an object name.
#[inline(always)]
pub fn normalize_name(name: &str) -> &str {
    name.trim_start_matches(['+', '$'])
}

/// Strips the `@` sigil from a variable name.
#[inline(always)]
pub fn normalize_variable(name: &str) -> &str {
    name.trim_start_matches('@')
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub name: SmolStr,
    pub file: PathBuf,
    pub doc: Option<String>,
    pub type_name: SmolStr,
    pub default: Option<Value>,
    pub constant: bool,
    pub position: Position,
}

/// One contribution to a field, in fragment order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub file: PathBuf,
    pub value: Value,
    pub position: Position,
    pub conditional: bool,
    /// Filled by [`Tree::reevaluate_fields`](crate::Tree::reevaluate_fields).
    pub evaluated: Option<Value>,
}

/// A namespace entity: a package segment or a declared object.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub name: SmolStr,
    pub real_name: SmolStr,
    pub doc: String,
    pub fragments: Vec<Fragment>,
    pub children: BTreeMap<SmolStr, NodeId>,
    /// Non-owning; only used to walk the scope chain upwards.
    pub parent: Option<NodeId>,
    pub metadata: FxHashMap<SmolStr, String>,
    /// Set on link nodes once references are resolved.
    pub target: Option<NodeId>,
    pub pragmas: Vec<String>,
    pub variables: FxHashMap<SmolStr, VariableInfo>,
    pub fields: FxHashMap<SmolStr, Vec<FieldEntry>>,
    pub conditional: bool,
}

impl Node {
    pub fn new(name: &str, real_name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: SmolStr::new(name),
            real_name: SmolStr::new(real_name),
            parent,
            ..Default::default()
        }
    }

    #[inline(always)]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[inline(always)]
    pub fn is_object(&self) -> bool {
        self.fragments.iter().any(|fragment| fragment.is_object)
    }

    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(normalize_name(name)).copied()
    }

    /// Latest contribution to `name`, if any file sets it.
    pub fn field(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.get(name).and_then(|entries| entries.last())
    }

    pub fn has_fragment_from(&self, file: &std::path::Path) -> bool {
        self.fragments.iter().any(|fragment| fragment.file == file)
    }
}
