use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;
use pcl_syntax::{Pragma, TemplateDef};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smol_str::SmolStr;

use crate::name_index::NameIndex;
use crate::options::IndexOptions;
use crate::reference::Reference;
use crate::{Node, NodeId};

#[derive(Debug, Clone)]
pub struct TemplateEntry {
    pub definition: Arc<TemplateDef>,
    pub file: PathBuf,
}

/// What one indexed file contributed.
#[derive(Debug, Clone)]
pub(crate) struct FileEntry {
    /// Package node, or the isolated root for files without a package.
    pub top: NodeId,
    /// Every node holding a fragment of this file.
    pub nodes: Vec<NodeId>,
}

/// The semantic index of a set of files.
///
/// `Tree` holds no lock and never takes one. Concurrent callers go through
/// [`SharedTree`](crate::SharedTree), which locks once per call and then
/// works on a `Tree`.
#[derive(Debug)]
pub struct Tree {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    pub(crate) root: NodeId,
    pub(crate) isolated: BTreeMap<PathBuf, NodeId>,
    pub(crate) name_index: NameIndex,
    pub(crate) references: FxHashMap<PathBuf, Vec<Reference>>,
    pub(crate) templates: FxHashMap<SmolStr, Vec<TemplateEntry>>,
    pub(crate) global_pragmas: FxHashMap<PathBuf, Vec<Pragma>>,
    pub(crate) files: FxHashMap<PathBuf, FileEntry>,
    pub(crate) options: IndexOptions,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new(IndexOptions::default())
    }
}

impl Clone for Tree {
    fn clone(&self) -> Self {
        self.snapshot()
    }
}

impl Tree {
    pub fn new(options: IndexOptions) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new("", "", None));
        let mut name_index = NameIndex::default();
        name_index.insert_node(root, &nodes[root]);

        Self {
            nodes,
            root,
            isolated: BTreeMap::new(),
            name_index,
            references: FxHashMap::default(),
            templates: FxHashMap::default(),
            global_pragmas: FxHashMap::default(),
            files: FxHashMap::default(),
            options,
        }
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    #[inline(always)]
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Roots of files declared without a package, ordered by path.
    pub fn isolated_roots(&self) -> impl Iterator<Item = (&Path, NodeId)> {
        self.isolated.iter().map(|(path, node_id)| (path.as_path(), *node_id))
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path).sorted()
    }

    pub fn contains_file(&self, file: &Path) -> bool {
        self.files.contains_key(file)
    }

    /// The package node of `file`, or its isolated root.
    pub fn file_node(&self, file: &Path) -> Option<NodeId> {
        self.files.get(file).map(|entry| entry.top)
    }

    pub fn global_pragmas(&self, file: &Path) -> &[Pragma] {
        self.global_pragmas.get(file).map(Vec::as_slice).unwrap_or_default()
    }

    /// Latest registration of the template `name`.
    pub fn template(&self, name: &str) -> Option<&TemplateEntry> {
        self.templates.get(name).and_then(|entries| entries.last())
    }

    pub fn templates(&self) -> impl Iterator<Item = (&SmolStr, &TemplateEntry)> {
        self.templates
            .iter()
            .filter_map(|(name, entries)| entries.last().map(|entry| (name, entry)))
    }

    pub fn child(&self, node_id: NodeId, name: &str) -> Option<NodeId> {
        self.nodes.get(node_id).and_then(|node| node.child(name))
    }

    /// `node_id` followed by each of its ancestors.
    pub fn ancestors(&self, node_id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(node_id).filter(|id| self.nodes.contains_key(*id)), |id| {
            self.nodes.get(*id).and_then(|node| node.parent)
        })
    }

    /// Whether `ancestor` lies strictly above `node_id`.
    pub fn is_descendant(&self, node_id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(node_id).skip(1).any(|id| id == ancestor)
    }

    /// Dotted path of normalized names from the root, e.g. `App.Data.Timer`.
    pub fn path(&self, node_id: NodeId) -> String {
        let mut names = self
            .ancestors(node_id)
            .filter_map(|id| self.nodes.get(id))
            .filter(|node| !node.is_root())
            .map(|node| node.name.as_str())
            .collect::<Vec<_>>();
        names.reverse();
        names.join(".")
    }

    /// Every node with its depth, pre-order from the global root and then
    /// from each isolated root.
    pub(crate) fn preorder(&self) -> Vec<(NodeId, usize)> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let roots = std::iter::once(self.root).chain(self.isolated.values().copied());

        for root in roots {
            let mut stack = vec![(root, 0)];
            while let Some((node_id, depth)) = stack.pop() {
                let Some(node) = self.nodes.get(node_id) else {
                    continue;
                };
                order.push((node_id, depth));
                stack.extend(node.children.values().rev().map(|child| (*child, depth + 1)));
            }
        }

        order
    }

    pub fn walk(&self, mut f: impl FnMut(NodeId, &Node)) {
        for (node_id, _) in self.preorder() {
            f(node_id, &self.nodes[node_id]);
        }
    }

    /// Deterministic text rendering of the whole tree, used to compare
    /// trees structurally.
    pub fn dump(&self) -> String {
        let mut out = String::new();

        for (node_id, depth) in self.preorder() {
            let node = &self.nodes[node_id];
            let indent = "  ".repeat(depth);
            let _ = writeln!(
                out,
                "{indent}{} ({}){}",
                node.real_name,
                node.name,
                if node.conditional { " conditional" } else { "" }
            );
            if !node.doc.is_empty() {
                let _ = writeln!(out, "{indent}  doc: {:?}", node.doc);
            }
            for (key, value) in node.metadata.iter().sorted() {
                let _ = writeln!(out, "{indent}  meta {key} = {value}");
            }
            for pragma in &node.pragmas {
                let _ = writeln!(out, "{indent}  pragma {pragma}");
            }
            for (name, info) in node.variables.iter().sorted_by_key(|(name, _)| *name) {
                let default = info.default.as_ref().map(|v| v.to_string()).unwrap_or_default();
                let _ = writeln!(out, "{indent}  var {name} = {default} ({})", info.file.display());
            }
            for (name, entries) in node.fields.iter().sorted_by_key(|(name, _)| *name) {
                let values = entries
                    .iter()
                    .map(|entry| format!("{} ({})", entry.value, entry.file.display()))
                    .join(", ");
                let _ = writeln!(out, "{indent}  field {name} = {values}");
            }
            for fragment in &node.fragments {
                let _ = writeln!(
                    out,
                    "{indent}  fragment {} {} defs={}{}",
                    fragment.file.display(),
                    if fragment.is_object { "object" } else { "file" },
                    fragment.definitions.len(),
                    if fragment.conditional { " conditional" } else { "" }
                );
            }
        }

        for (name, entry) in self.templates.iter().sorted_by_key(|(name, _)| *name) {
            let files = entry.iter().map(|e| e.file.display().to_string()).join(", ");
            let _ = writeln!(out, "template {name} ({files})");
        }
        for (file, pragmas) in self.global_pragmas.iter().sorted_by_key(|(file, _)| *file) {
            for pragma in pragmas {
                let _ = writeln!(out, "global pragma {} {}", file.display(), pragma.text);
            }
        }
        for (file, references) in self.references.iter().sorted_by_key(|(file, _)| *file) {
            for reference in references {
                let _ = writeln!(
                    out,
                    "reference {} {}{} at {}",
                    file.display(),
                    if reference.is_variable { "@" } else { "" },
                    reference.name,
                    reference.position
                );
            }
        }

        out
    }
}
