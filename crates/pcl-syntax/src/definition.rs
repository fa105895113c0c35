use std::sync::Arc;

#[cfg(feature = "ast-json")]
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::range::{Position, Range};
use crate::value::{Value, ValueKind};

pub type Definitions = Vec<Arc<Definition>>;

#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: SmolStr,
    pub value: Value,
    pub position: Position,
}

#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDef {
    /// Usually a bare name such as `+Timer`, but any expression is allowed.
    pub name: Value,
    pub definitions: Definitions,
    pub position: Position,
    pub end: Position,
}

impl ObjectDef {
    /// Declared name exactly as written, sigils included.
    pub fn name_text(&self) -> String {
        self.name.text()
    }

    pub fn range(&self) -> Range {
        Range::new(self.position, self.end)
    }
}

#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: SmolStr,
    pub type_name: SmolStr,
    pub default: Option<Value>,
    pub constant: bool,
    pub position: Position,
}

#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct IfBlock {
    pub condition: Value,
    pub then_definitions: Definitions,
    pub else_definitions: Definitions,
    pub position: Position,
    pub end: Position,
}

#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ForeachBlock {
    pub key: Option<SmolStr>,
    pub value: Option<SmolStr>,
    pub iterable: Value,
    pub definitions: Definitions,
    pub position: Position,
    pub end: Position,
}

impl ForeachBlock {
    pub fn bound_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.key.iter().chain(self.value.iter())
    }
}

#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateParam {
    pub name: SmolStr,
    pub default: Option<Value>,
    pub position: Position,
}

#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDef {
    pub name: SmolStr,
    pub params: Vec<TemplateParam>,
    pub definitions: Definitions,
    pub position: Position,
    pub end: Position,
}

/// `Name = Template { arg = value ... }`
#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Instantiation {
    pub name: SmolStr,
    pub template: SmolStr,
    pub arguments: Vec<FieldDef>,
    pub position: Position,
    pub end: Position,
}

#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Field(FieldDef),
    Object(ObjectDef),
    Variable(VariableDef),
    If(IfBlock),
    Foreach(ForeachBlock),
    Template(Arc<TemplateDef>),
    Instantiation(Instantiation),
}

impl Definition {
    pub fn field(name: &str, value: Value) -> Arc<Self> {
        let position = value.position;
        Arc::new(Definition::Field(FieldDef {
            name: SmolStr::new(name),
            value,
            position,
        }))
    }

    pub fn object(name: &str, definitions: Definitions) -> Arc<Self> {
        Arc::new(Definition::Object(ObjectDef {
            name: Value::new(ValueKind::Reference(SmolStr::new(name)), Position::default()),
            definitions,
            position: Position::default(),
            end: Position::default(),
        }))
    }

    pub fn variable(name: &str, default: Option<Value>) -> Arc<Self> {
        Arc::new(Definition::Variable(VariableDef {
            name: SmolStr::new(name),
            type_name: SmolStr::default(),
            default,
            constant: false,
            position: Position::default(),
        }))
    }

    pub fn position(&self) -> Position {
        match self {
            Definition::Field(def) => def.position,
            Definition::Object(def) => def.position,
            Definition::Variable(def) => def.position,
            Definition::If(def) => def.position,
            Definition::Foreach(def) => def.position,
            Definition::Template(def) => def.position,
            Definition::Instantiation(def) => def.position,
        }
    }

    /// Declared name for definitions that introduce one.
    pub fn name(&self) -> Option<SmolStr> {
        match self {
            Definition::Field(def) => Some(def.name.clone()),
            Definition::Object(def) => Some(SmolStr::new(def.name_text())),
            Definition::Variable(def) => Some(def.name.clone()),
            Definition::Template(def) => Some(def.name.clone()),
            Definition::Instantiation(def) => Some(def.name.clone()),
            Definition::If(_) | Definition::Foreach(_) => None,
        }
    }

    /// Span covered by the declared name, on the line it starts.
    pub fn name_range(&self) -> Option<Range> {
        self.name().map(|name| {
            let start = self.position();
            let width = name.chars().count().saturating_sub(1) as u32;
            Range::new(start, Position::new(start.line, start.column + width))
        })
    }
}
