use std::collections::BTreeMap;
use std::path::PathBuf;

use itertools::Itertools;
use pcl_syntax::{Configuration, Definition, Definitions, Position, Range};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// The part of one file that contributes to one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub file: PathBuf,
    pub definitions: Definitions,
    pub is_object: bool,
    /// Source span, object fragments only.
    pub range: Option<Range>,
    /// Name as declared by this fragment, sigils included.
    pub declared_name: SmolStr,
    pub doc: Option<String>,
    /// Documentation of the fields and variables declared in this fragment.
    pub docs: FxHashMap<SmolStr, String>,
    pub pragmas: Vec<String>,
    pub conditional: bool,
    /// Template name when the fragment comes from an instantiation.
    pub template: Option<SmolStr>,
}

impl Fragment {
    pub fn new(file: PathBuf, declared_name: &str, definitions: Definitions) -> Self {
        Self {
            file,
            definitions,
            is_object: false,
            range: None,
            declared_name: SmolStr::new(declared_name),
            doc: None,
            docs: FxHashMap::default(),
            pragmas: Vec::new(),
            conditional: false,
            template: None,
        }
    }

    /// Calls `f` for every definition of the fragment, descending into
    /// conditional and loop bodies but not into nested objects.
    pub fn for_each_definition(&self, f: &mut impl FnMut(&Definition, bool)) {
        for_each_definition(&self.definitions, self.conditional, f);
    }
}

pub(crate) fn for_each_definition(definitions: &Definitions, conditional: bool, f: &mut impl FnMut(&Definition, bool)) {
    for definition in definitions {
        f(definition, conditional);
        match &**definition {
            Definition::If(block) => {
                for_each_definition(&block.then_definitions, true, f);
                for_each_definition(&block.else_definitions, true, f);
            }
            Definition::Foreach(block) => for_each_definition(&block.definitions, true, f),
            _ => {}
        }
    }
}

/// Doc comments of one file, keyed by line.
#[derive(Debug, Default)]
pub(crate) struct DocTable {
    lines: BTreeMap<u32, String>,
}

impl DocTable {
    pub fn new(config: &Configuration) -> Self {
        let mut lines: BTreeMap<u32, Vec<&str>> = BTreeMap::new();

        for comment in config.doc_comments().sorted_by_key(|comment| comment.position) {
            lines
                .entry(comment.position.line)
                .or_default()
                .push(comment.text.trim());
        }

        Self {
            lines: lines
                .into_iter()
                .map(|(line, texts)| (line, texts.join(" ")))
                .collect(),
        }
    }

    /// Doc comment block ending on the line right above `position`.
    pub fn doc_before(&self, position: Position) -> Option<String> {
        let mut block = Vec::new();
        let mut line = position.line;

        while line > 1 {
            line -= 1;
            match self.lines.get(&line) {
                Some(text) => block.push(text.as_str()),
                None => break,
            }
        }

        if block.is_empty() {
            None
        } else {
            block.reverse();
            Some(block.join("\n"))
        }
    }
}
