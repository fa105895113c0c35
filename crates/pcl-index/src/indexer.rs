use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;
use pcl_syntax::{Configuration, Definition, Definitions, Range, Value, ValueKind};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::fragment::{DocTable, Fragment, for_each_definition};
use crate::node::{FieldEntry, VariableInfo, normalize_name};
use crate::reference::Reference;
use crate::tree::{FileEntry, TemplateEntry};
use crate::{Node, NodeId, Tree};

/// Walks one file's definitions and records what they contribute.
struct FileIndexer<'a> {
    tree: &'a mut Tree,
    file: PathBuf,
    docs: DocTable,
    touched: Vec<NodeId>,
    references: Vec<Reference>,
    /// Object fragments of this file: span, node, index into `fragments`.
    spans: Vec<(Range, NodeId, usize)>,
}

impl FileIndexer<'_> {
    fn touch(&mut self, node_id: NodeId) {
        if !self.touched.contains(&node_id) {
            self.touched.push(node_id);
        }
    }

    fn collect_references(&mut self, value: &Value, scope: NodeId, locals: &[SmolStr]) {
        let file = &self.file;
        value.visit(&mut |value| {
            let (name, is_variable) = match &value.kind {
                ValueKind::Reference(name) => (name.as_str(), false),
                ValueKind::Variable(name) => (name.trim_start_matches('@'), true),
                _ => return,
            };
            let head = name.split('.').next().unwrap_or(name);

            self.references.push(Reference {
                name: SmolStr::new(name),
                position: value.position,
                file: file.clone(),
                scope,
                is_variable,
                loop_local: locals.iter().any(|local| local == head),
                target: None,
                variable: None,
            });
        });
    }

    fn index_definitions(
        &mut self,
        scope: NodeId,
        definitions: &Definitions,
        conditional: bool,
        locals: &[SmolStr],
        docs: &mut FxHashMap<SmolStr, String>,
    ) {
        for definition in definitions {
            match &**definition {
                Definition::Field(field) => {
                    self.collect_references(&field.value, scope, locals);
                    if let Some(doc) = self.docs.doc_before(field.position) {
                        docs.insert(field.name.clone(), doc);
                    }
                }
                Definition::Variable(variable) => {
                    if let Some(default) = &variable.default {
                        self.collect_references(default, scope, locals);
                    }
                    if let Some(doc) = self.docs.doc_before(variable.position) {
                        docs.insert(variable.name.clone(), doc);
                    }
                }
                Definition::Object(object) => {
                    if !matches!(object.name.kind, ValueKind::Reference(_)) {
                        self.collect_references(&object.name, scope, locals);
                    }

                    let declared = object.name_text();
                    let child = self.tree.get_or_create_child(scope, &declared);
                    self.touch(child);

                    let mut fragment = Fragment::new(self.file.clone(), &declared, object.definitions.clone());
                    fragment.is_object = true;
                    fragment.range = Some(object.range());
                    fragment.doc = self.docs.doc_before(object.position);
                    fragment.conditional = conditional;

                    let mut child_docs = FxHashMap::default();
                    self.index_definitions(child, &object.definitions, conditional, locals, &mut child_docs);
                    fragment.docs = child_docs;

                    self.push_fragment(child, fragment);
                }
                Definition::If(block) => {
                    self.collect_references(&block.condition, scope, locals);
                    self.index_definitions(scope, &block.then_definitions, true, locals, docs);
                    self.index_definitions(scope, &block.else_definitions, true, locals, docs);
                }
                Definition::Foreach(block) => {
                    self.collect_references(&block.iterable, scope, locals);
                    let locals = locals
                        .iter()
                        .chain(block.bound_names())
                        .cloned()
                        .collect::<Vec<_>>();
                    self.index_definitions(scope, &block.definitions, true, &locals, docs);
                }
                Definition::Template(template) => {
                    let params = locals
                        .iter()
                        .chain(template.params.iter().map(|param| &param.name))
                        .cloned()
                        .collect::<Vec<_>>();
                    for param in &template.params {
                        if let Some(default) = &param.default {
                            self.collect_references(default, scope, locals);
                        }
                    }
                    self.collect_body_references(&template.definitions, scope, &params);

                    self.tree
                        .templates
                        .entry(template.name.clone())
                        .or_default()
                        .push(TemplateEntry {
                            definition: Arc::clone(template),
                            file: self.file.clone(),
                        });
                }
                Definition::Instantiation(instance) => {
                    let child = self.tree.get_or_create_child(scope, &instance.name);
                    self.touch(child);

                    for argument in &instance.arguments {
                        self.collect_references(&argument.value, scope, locals);
                    }

                    let arguments = instance
                        .arguments
                        .iter()
                        .map(|argument| Arc::new(Definition::Field(argument.clone())))
                        .collect();
                    let mut fragment = Fragment::new(self.file.clone(), &instance.name, arguments);
                    fragment.is_object = true;
                    fragment.range = Some(Range::new(instance.position, instance.end));
                    fragment.doc = self.docs.doc_before(instance.position);
                    fragment.conditional = conditional;
                    fragment.template = Some(instance.template.clone());

                    self.push_fragment(child, fragment);
                }
            }
        }
    }

    /// References inside a template body. The body creates no nodes until it
    /// is instantiated, so everything is scoped to the declaring node.
    fn collect_body_references(&mut self, definitions: &Definitions, scope: NodeId, locals: &[SmolStr]) {
        for definition in definitions {
            match &**definition {
                Definition::Field(field) => self.collect_references(&field.value, scope, locals),
                Definition::Variable(variable) => {
                    if let Some(default) = &variable.default {
                        self.collect_references(default, scope, locals);
                    }
                }
                Definition::Object(object) => self.collect_body_references(&object.definitions, scope, locals),
                Definition::If(block) => {
                    self.collect_references(&block.condition, scope, locals);
                    self.collect_body_references(&block.then_definitions, scope, locals);
                    self.collect_body_references(&block.else_definitions, scope, locals);
                }
                Definition::Foreach(block) => {
                    self.collect_references(&block.iterable, scope, locals);
                    let locals = locals
                        .iter()
                        .chain(block.bound_names())
                        .cloned()
                        .collect::<Vec<_>>();
                    self.collect_body_references(&block.definitions, scope, &locals);
                }
                Definition::Template(_) => {}
                Definition::Instantiation(instance) => {
                    for argument in &instance.arguments {
                        self.collect_references(&argument.value, scope, locals);
                    }
                }
            }
        }
    }

    fn push_fragment(&mut self, node_id: NodeId, fragment: Fragment) {
        let range = fragment.range;
        let node = &mut self.tree.nodes[node_id];
        node.fragments.push(fragment);

        if let Some(range) = range {
            self.spans.push((range, node_id, node.fragments.len() - 1));
        }
    }
}

impl Tree {
    /// Indexes `config` as the content of `path`, replacing whatever the
    /// file contributed before.
    pub fn add_file(&mut self, path: impl Into<PathBuf>, config: &Configuration) {
        let path = path.into();

        if self.name_index.is_empty() {
            self.rebuild_name_index();
        }
        self.remove_file(&path);

        let segments = config
            .package
            .as_ref()
            .map(|package| package.segments().collect::<Vec<_>>())
            .unwrap_or_default();

        let mut touched = Vec::new();
        let top = if segments.is_empty() {
            let root = self.nodes.insert(Node::new("", "", None));
            self.name_index.insert_node(root, &self.nodes[root]);
            self.isolated.insert(path.clone(), root);
            root
        } else {
            segments.iter().fold(self.root, |parent, segment| {
                let child = self.get_or_create_child(parent, segment);
                touched.push(child);
                child
            })
        };
        if !touched.contains(&top) {
            touched.push(top);
        }

        let mut indexer = FileIndexer {
            docs: DocTable::new(config),
            file: path.clone(),
            tree: self,
            touched,
            references: Vec::new(),
            spans: Vec::new(),
        };

        let declared = segments.last().copied().unwrap_or_default();
        let mut fragment = Fragment::new(path.clone(), declared, config.definitions.clone());
        fragment.doc = config
            .package
            .as_ref()
            .and_then(|package| indexer.docs.doc_before(package.position));

        let mut docs = FxHashMap::default();
        indexer.index_definitions(top, &config.definitions, false, &[], &mut docs);
        fragment.docs = docs;
        indexer.tree.nodes[top].fragments.push(fragment);

        let FileIndexer {
            touched,
            references,
            spans,
            ..
        } = indexer;

        let mut global_pragmas = Vec::new();
        for pragma in &config.pragmas {
            let innermost = spans
                .iter()
                .filter(|(range, _, _)| range.contains(&pragma.position))
                .max_by_key(|(range, _, _)| (range.start, std::cmp::Reverse(range.end)));

            match innermost {
                Some((_, node_id, index)) => {
                    self.nodes[*node_id].fragments[*index].pragmas.push(pragma.text.clone());
                }
                None => global_pragmas.push(pragma.clone()),
            }
        }
        if !global_pragmas.is_empty() {
            self.global_pragmas.insert(path.clone(), global_pragmas);
        }

        for node_id in &touched {
            self.refresh(*node_id);
        }

        tracing::debug!(
            "Indexed {} ({} nodes, {} references)",
            path.display(),
            touched.len(),
            references.len()
        );

        self.references.insert(path.clone(), references);
        self.files.insert(path, FileEntry { top, nodes: touched });
    }

    /// Drops everything `path` contributed and prunes nodes left empty.
    ///
    /// Returns `false` when the file was never indexed.
    pub fn remove_file(&mut self, path: &Path) -> bool {
        let Some(entry) = self.files.remove(path) else {
            return false;
        };

        self.references.remove(path);
        self.global_pragmas.remove(path);
        self.templates.retain(|_, entries| {
            entries.retain(|entry| entry.file != path);
            !entries.is_empty()
        });

        for node_id in &entry.nodes {
            if let Some(node) = self.nodes.get_mut(*node_id) {
                node.fragments.retain(|fragment| fragment.file != path);
            }
        }
        for node_id in &entry.nodes {
            if self.nodes.contains_key(*node_id) {
                self.refresh(*node_id);
            }
        }

        let deepest_first = entry
            .nodes
            .iter()
            .copied()
            .sorted_by_key(|node_id| std::cmp::Reverse(self.ancestors(*node_id).count()))
            .collect::<Vec<_>>();
        for node_id in deepest_first {
            self.prune(node_id);
        }

        if let Some(root) = self.isolated.get(path).copied() {
            let empty = self
                .nodes
                .get(root)
                .is_none_or(|node| node.fragments.is_empty() && node.children.is_empty());
            if empty {
                self.isolated.remove(path);
                if let Some(node) = self.nodes.remove(root) {
                    self.name_index.remove_node(root, &node);
                }
            }
        }

        self.clear_dangling();
        tracing::debug!("Removed {} ({} nodes touched)", path.display(), entry.nodes.len());
        true
    }

    /// Child of `parent` named `declared` after normalization, created on demand.
    pub(crate) fn get_or_create_child(&mut self, parent: NodeId, declared: &str) -> NodeId {
        let name = normalize_name(declared);
        if let Some(child) = self.nodes[parent].children.get(name) {
            return *child;
        }

        let child = self.nodes.insert(Node::new(name, declared, Some(parent)));
        self.nodes[parent].children.insert(SmolStr::new(name), child);
        self.name_index.insert_node(child, &self.nodes[child]);
        child
    }

    /// Removes `node_id` and then each ancestor left without fragments and
    /// children. Roots are never removed here.
    fn prune(&mut self, node_id: NodeId) {
        let mut current = Some(node_id);

        while let Some(node_id) = current {
            let Some(node) = self.nodes.get(node_id) else {
                return;
            };
            let Some(parent) = node.parent else {
                return;
            };
            if !node.fragments.is_empty() || !node.children.is_empty() {
                return;
            }

            let name = node.name.clone();
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.remove(&name);
            }
            if let Some(node) = self.nodes.remove(node_id) {
                self.name_index.remove_node(node_id, &node);
            }
            current = Some(parent);
        }
    }

    /// Recomputes every aggregate of `node_id` from its remaining fragments.
    pub(crate) fn refresh(&mut self, node_id: NodeId) {
        let Tree {
            nodes,
            name_index,
            options,
            ..
        } = self;
        let Some(node) = nodes.get_mut(node_id) else {
            return;
        };

        let docs = node.fragments.iter().filter_map(|fragment| fragment.doc.as_deref());
        node.doc = docs.filter(|doc| !doc.is_empty()).join("\n");

        let real_name = node
            .fragments
            .iter()
            .map(|fragment| &fragment.declared_name)
            .find(|declared| !declared.is_empty() && **declared != node.name)
            .cloned()
            .unwrap_or_else(|| node.name.clone());

        if real_name != node.real_name {
            if node.real_name != node.name {
                name_index.remove(&node.real_name, node_id);
            }
            node.real_name = real_name;
            name_index.insert(&node.real_name, node_id);
        }

        let mut metadata = FxHashMap::default();
        let mut variables = FxHashMap::default();
        let mut fields: FxHashMap<SmolStr, Vec<FieldEntry>> = FxHashMap::default();
        let mut pragmas = Vec::new();
        let mut has_link = false;

        for fragment in &node.fragments {
            pragmas.extend(fragment.pragmas.iter().cloned());
            if let Some(template) = &fragment.template {
                metadata.insert(SmolStr::new("Template"), template.to_string());
            }

            for_each_definition(&fragment.definitions, fragment.conditional, &mut |definition, conditional| {
                match definition {
                    Definition::Field(field) => {
                        if let Some(key) = options.metadata_key(&field.name) {
                            metadata.insert(key.clone(), field.value.text());
                        }
                        if options.is_link_field(&field.name) && matches!(field.value.kind, ValueKind::Reference(_)) {
                            has_link = true;
                        }
                        fields.entry(field.name.clone()).or_default().push(FieldEntry {
                            file: fragment.file.clone(),
                            value: field.value.clone(),
                            position: field.position,
                            conditional,
                            evaluated: None,
                        });
                    }
                    Definition::Variable(variable) => {
                        variables.insert(
                            variable.name.clone(),
                            VariableInfo {
                                name: variable.name.clone(),
                                file: fragment.file.clone(),
                                doc: fragment.docs.get(&variable.name).cloned(),
                                type_name: variable.type_name.clone(),
                                default: variable.default.clone(),
                                constant: variable.constant,
                                position: variable.position,
                            },
                        );
                    }
                    _ => {}
                }
            });
        }

        node.metadata = metadata;
        node.variables = variables;
        node.fields = fields;
        node.pragmas = pragmas;
        node.conditional = !node.fragments.is_empty() && node.fragments.iter().all(|fragment| fragment.conditional);
        if !has_link {
            node.target = None;
        }
    }

    /// Nulls targets pointing at nodes or variables that no longer exist.
    fn clear_dangling(&mut self) {
        let Tree { nodes, references, .. } = self;

        for reference in references.values_mut().flatten() {
            if reference.target.is_some_and(|target| !nodes.contains_key(target)) {
                reference.target = None;
            }
            let dangling = reference.variable.as_ref().is_some_and(|variable| {
                nodes
                    .get(variable.node)
                    .is_none_or(|node| !node.variables.contains_key(&variable.name))
            });
            if dangling {
                reference.variable = None;
            }
        }

        let stale = nodes
            .iter()
            .filter(|(_, node)| node.target.is_some_and(|target| !nodes.contains_key(target)))
            .map(|(node_id, _)| node_id)
            .collect::<Vec<_>>();
        for node_id in stale {
            nodes[node_id].target = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use pcl_syntax::{Comment, ForeachBlock, Instantiation, ObjectDef, Position, Pragma, TemplateDef};
    use rstest::rstest;

    use super::*;

    fn object_at(name: &str, start: (u32, u32), end: (u32, u32), definitions: Definitions) -> Arc<Definition> {
        Arc::new(Definition::Object(ObjectDef {
            name: Value::reference(name).at(start.0, start.1),
            definitions,
            position: Position::new(start.0, start.1),
            end: Position::new(end.0, end.1),
        }))
    }

    #[test]
    fn test_packages_share_nodes_across_files() {
        let mut tree = Tree::default();
        tree.add_file(
            "a.pcl",
            &Configuration::new(Some("App.Data"), vec![Definition::field("A", Value::int(1))]),
        );
        tree.add_file(
            "b.pcl",
            &Configuration::new(Some("App.Data"), vec![Definition::field("B", Value::int(2))]),
        );

        let app = tree.child(tree.root(), "App").unwrap();
        let data = tree.child(app, "Data").unwrap();
        let node = tree.node(data).unwrap();

        assert_eq!(tree.node(app).unwrap().children.len(), 1);
        assert_eq!(node.fragments.len(), 2);
        assert!(node.field("A").is_some());
        assert!(node.field("B").is_some());
    }

    #[test]
    fn test_re_adding_file_does_not_duplicate() {
        let mut tree = Tree::default();
        let config = Configuration::new(
            Some("App"),
            vec![Definition::object("+Timer", vec![Definition::field("Period", Value::int(1))])],
        );
        tree.add_file("a.pcl", &config);
        let before = tree.dump();
        tree.add_file("a.pcl", &config);

        assert_eq!(tree.dump(), before);
        let app = tree.child(tree.root(), "App").unwrap();
        assert_eq!(tree.node(app).unwrap().children.len(), 1);
    }

    #[test]
    fn test_remove_file_prunes_empty_nodes() {
        let mut tree = Tree::default();
        tree.add_file(
            "a.pcl",
            &Configuration::new(Some("App.Data"), vec![Definition::object("+Timer", Vec::new())]),
        );
        tree.add_file(
            "b.pcl",
            &Configuration::new(Some("App"), vec![Definition::field("B", Value::int(2))]),
        );

        assert!(tree.remove_file(Path::new("a.pcl")));
        let app = tree.child(tree.root(), "App").unwrap();
        assert!(tree.child(app, "Data").is_none());
        assert!(tree.name_index().get("Timer").is_empty());
        assert!(!tree.remove_file(Path::new("a.pcl")));

        assert!(tree.remove_file(Path::new("b.pcl")));
        assert!(tree.node(tree.root()).unwrap().children.is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_prune_detaches_chain_but_keeps_siblings() {
        let mut tree = Tree::default();
        tree.add_file(
            "deep.pcl",
            &Configuration::new(
                Some("App.Data"),
                vec![Definition::object("+Timer", vec![Definition::object("$Relay", Vec::new())])],
            ),
        );
        tree.add_file(
            "other.pcl",
            &Configuration::new(Some("App"), vec![Definition::object("+Other", Vec::new())]),
        );
        let len = tree.len();

        assert!(tree.remove_file(Path::new("deep.pcl")));

        let app = tree.child(tree.root(), "App").unwrap();
        let children = tree.node(app).unwrap().children.keys().cloned().collect::<Vec<_>>();
        assert_eq!(children, vec![SmolStr::new("Other")]);
        assert_eq!(tree.len(), len - 3);
        assert!(tree.name_index().get("Relay").is_empty());
        assert!(tree.name_index().get("$Relay").is_empty());
    }

    #[test]
    fn test_isolated_root_removed_with_file() {
        let mut tree = Tree::default();
        tree.add_file(
            "loose.pcl",
            &Configuration::new(None, vec![Definition::object("+Loose", Vec::new())]),
        );
        assert_eq!(tree.isolated_roots().count(), 1);

        tree.remove_file(Path::new("loose.pcl"));
        assert_eq!(tree.isolated_roots().count(), 0);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_aggregates_recomputed_after_removal() {
        let mut tree = Tree::default();
        let mut a = Configuration::new(
            Some("App"),
            vec![object_at(
                "+Timer",
                (3, 1),
                (5, 1),
                vec![Definition::field("Class", Value::reference("Periodic"))],
            )],
        );
        a.comments.push(Comment {
            text: "From a".to_string(),
            doc: true,
            position: Position::new(2, 1),
        });
        let b = Configuration::new(
            Some("App"),
            vec![Definition::object("Timer", vec![Definition::field("Type", Value::string("fast"))])],
        );
        tree.add_file("a.pcl", &a);
        tree.add_file("b.pcl", &b);

        let app = tree.child(tree.root(), "App").unwrap();
        let timer = tree.child(app, "Timer").unwrap();
        let node = tree.node(timer).unwrap();
        assert_eq!(node.doc, "From a");
        assert_eq!(node.real_name, "+Timer");
        assert_eq!(node.metadata.get("Class").map(String::as_str), Some("Periodic"));
        assert_eq!(node.metadata.get("Type").map(String::as_str), Some("fast"));

        tree.remove_file(Path::new("a.pcl"));
        let node = tree.node(timer).unwrap();
        assert_eq!(node.doc, "");
        assert_eq!(node.real_name, "Timer");
        assert!(!node.metadata.contains_key("Class"));
        assert!(tree.name_index().get("+Timer").is_empty());
        assert_eq!(tree.name_index().get("Timer"), &[timer]);
    }

    #[test]
    fn test_conditional_children() {
        let mut tree = Tree::default();
        let block = Arc::new(Definition::If(pcl_syntax::IfBlock {
            condition: Value::reference("Debug"),
            then_definitions: vec![Definition::object("+Trace", Vec::new())],
            else_definitions: Vec::new(),
            position: Position::default(),
            end: Position::default(),
        }));
        tree.add_file("a.pcl", &Configuration::new(Some("App"), vec![block]));

        let app = tree.child(tree.root(), "App").unwrap();
        let trace = tree.child(app, "Trace").unwrap();
        assert!(tree.node(trace).unwrap().conditional);

        tree.add_file(
            "b.pcl",
            &Configuration::new(Some("App"), vec![Definition::object("Trace", Vec::new())]),
        );
        assert!(!tree.node(trace).unwrap().conditional);
    }

    #[test]
    fn test_pragmas_go_to_innermost_object() {
        let mut tree = Tree::default();
        let mut config = Configuration::new(
            Some("App"),
            vec![object_at(
                "+Outer",
                (2, 1),
                (8, 1),
                vec![object_at("+Inner", (4, 3), (6, 3), Vec::new())],
            )],
        );
        config.pragmas = vec![
            Pragma {
                text: "global".to_string(),
                position: Position::new(1, 1),
            },
            Pragma {
                text: "outer".to_string(),
                position: Position::new(3, 3),
            },
            Pragma {
                text: "inner".to_string(),
                position: Position::new(5, 5),
            },
        ];
        tree.add_file("a.pcl", &config);

        let app = tree.child(tree.root(), "App").unwrap();
        let outer = tree.child(app, "Outer").unwrap();
        let inner = tree.child(outer, "Inner").unwrap();
        assert_eq!(tree.node(outer).unwrap().pragmas, vec!["outer".to_string()]);
        assert_eq!(tree.node(inner).unwrap().pragmas, vec!["inner".to_string()]);
        assert_eq!(tree.global_pragmas(Path::new("a.pcl")).len(), 1);

        tree.remove_file(Path::new("a.pcl"));
        assert!(tree.global_pragmas(Path::new("a.pcl")).is_empty());
    }

    #[test]
    fn test_templates_registered_and_unregistered() {
        let mut tree = Tree::default();
        let template = |body: i64| {
            Arc::new(Definition::Template(Arc::new(TemplateDef {
                name: SmolStr::new("Sensor"),
                params: Vec::new(),
                definitions: vec![Definition::field("Rate", Value::int(body))],
                position: Position::default(),
                end: Position::default(),
            })))
        };
        tree.add_file("a.pcl", &Configuration::new(Some("App"), vec![template(1)]));
        tree.add_file("b.pcl", &Configuration::new(Some("App"), vec![template(2)]));
        assert_eq!(tree.template("Sensor").unwrap().file, PathBuf::from("b.pcl"));

        tree.remove_file(Path::new("b.pcl"));
        assert_eq!(tree.template("Sensor").unwrap().file, PathBuf::from("a.pcl"));
        tree.remove_file(Path::new("a.pcl"));
        assert!(tree.template("Sensor").is_none());
    }

    #[test]
    fn test_instantiation_creates_child() {
        let mut tree = Tree::default();
        let instance = Arc::new(Definition::Instantiation(Instantiation {
            name: SmolStr::new("Front"),
            template: SmolStr::new("Sensor"),
            arguments: vec![pcl_syntax::FieldDef {
                name: SmolStr::new("Rate"),
                value: Value::int(5),
                position: Position::default(),
            }],
            position: Position::default(),
            end: Position::default(),
        }));
        tree.add_file("a.pcl", &Configuration::new(Some("App"), vec![instance]));

        let app = tree.child(tree.root(), "App").unwrap();
        let front = tree.child(app, "Front").unwrap();
        let node = tree.node(front).unwrap();
        assert!(node.is_object());
        assert_eq!(node.metadata.get("Template").map(String::as_str), Some("Sensor"));
        assert_eq!(node.field("Rate").map(|entry| &entry.value), Some(&Value::int(5)));
    }

    #[rstest]
    #[case("v", true)]
    #[case("i", true)]
    #[case("Other", false)]
    fn test_foreach_names_are_loop_local(#[case] name: &str, #[case] loop_local: bool) {
        let mut tree = Tree::default();
        let block = Arc::new(Definition::Foreach(ForeachBlock {
            key: Some(SmolStr::new("i")),
            value: Some(SmolStr::new("v")),
            iterable: Value::array(vec![Value::int(1)]),
            definitions: vec![Definition::field("N", Value::reference(name))],
            position: Position::default(),
            end: Position::default(),
        }));
        tree.add_file("a.pcl", &Configuration::new(Some("App"), vec![block]));

        let references = tree.references_in(Path::new("a.pcl"));
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].loop_local, loop_local);
    }
}
