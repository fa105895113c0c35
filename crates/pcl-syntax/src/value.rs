use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use itertools::Itertools;
#[cfg(feature = "ast-json")]
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::range::Position;

#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Concat => "..",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }

    #[inline(always)]
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte
        )
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(PartialEq, Debug, Clone)]
pub enum ValueKind {
    String { value: SmolStr, quoted: bool },
    Int(i64),
    Float(f64),
    Bool(bool),
    Reference(SmolStr),
    Variable(SmolStr),
    Binary { op: BinaryOp, left: Arc<Value>, right: Arc<Value> },
    Unary { op: UnaryOp, operand: Arc<Value> },
    Array(Vec<Value>),
}

/// A value expression together with the position it was written at.
///
/// Positions never take part in equality, so an evaluated value compares
/// equal to a literal written anywhere else.
#[cfg_attr(feature = "ast-json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Value {
    pub kind: ValueKind,
    pub position: Position,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Value {
    pub fn new(kind: ValueKind, position: Position) -> Self {
        Self { kind, position }
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.position = Position::new(line, column);
        self
    }

    pub fn string(value: &str) -> Self {
        Self::new(
            ValueKind::String {
                value: SmolStr::new(value),
                quoted: true,
            },
            Position::default(),
        )
    }

    pub fn unquoted(value: &str) -> Self {
        Self::new(
            ValueKind::String {
                value: SmolStr::new(value),
                quoted: false,
            },
            Position::default(),
        )
    }

    pub fn int(value: i64) -> Self {
        Self::new(ValueKind::Int(value), Position::default())
    }

    pub fn float(value: f64) -> Self {
        Self::new(ValueKind::Float(value), Position::default())
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ValueKind::Bool(value), Position::default())
    }

    pub fn reference(name: &str) -> Self {
        Self::new(ValueKind::Reference(SmolStr::new(name)), Position::default())
    }

    pub fn variable(name: &str) -> Self {
        Self::new(ValueKind::Variable(SmolStr::new(name)), Position::default())
    }

    pub fn binary(op: BinaryOp, left: Value, right: Value) -> Self {
        let position = left.position;
        Self::new(
            ValueKind::Binary {
                op,
                left: Arc::new(left),
                right: Arc::new(right),
            },
            position,
        )
    }

    pub fn unary(op: UnaryOp, operand: Value) -> Self {
        let position = operand.position;
        Self::new(
            ValueKind::Unary {
                op,
                operand: Arc::new(operand),
            },
            position,
        )
    }

    pub fn array(values: Vec<Value>) -> Self {
        Self::new(ValueKind::Array(values), Position::default())
    }

    #[inline(always)]
    pub fn is_number(&self) -> bool {
        matches!(self.kind, ValueKind::Int(_) | ValueKind::Float(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.kind {
            ValueKind::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Int(i) => Some(i as f64),
            ValueKind::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Name of a bare or `@` reference, with the sigil stripped.
    pub fn reference_name(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Reference(name) => Some(name.as_str()),
            ValueKind::Variable(name) => Some(name.trim_start_matches('@')),
            _ => None,
        }
    }

    /// Textual form used by string concatenation: strings lose their quotes,
    /// everything else prints as written.
    pub fn text(&self) -> String {
        match &self.kind {
            ValueKind::String { value, .. } => value.to_string(),
            _ => self.to_string(),
        }
    }

    /// Calls `f` for this value and every value nested inside it, parents first.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Value)) {
        f(self);
        match &self.kind {
            ValueKind::Binary { left, right, .. } => {
                left.visit(f);
                right.visit(f);
            }
            ValueKind::Unary { operand, .. } => operand.visit(f),
            ValueKind::Array(values) => values.iter().for_each(|value| value.visit(f)),
            _ => {}
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::String { value, quoted: true } => write!(f, "\"{}\"", value),
            ValueKind::String { value, quoted: false } => write!(f, "{}", value),
            ValueKind::Int(i) => write!(f, "{}", i),
            ValueKind::Float(n) => write!(f, "{}", n),
            ValueKind::Bool(b) => write!(f, "{}", b),
            ValueKind::Reference(name) => write!(f, "{}", name),
            ValueKind::Variable(name) => write!(f, "@{}", name.trim_start_matches('@')),
            ValueKind::Binary { op, left, right } => write!(f, "{} {} {}", left, op, right),
            ValueKind::Unary { op, operand } => write!(f, "{}{}", op, operand),
            ValueKind::Array(values) => write!(f, "{{{}}}", values.iter().join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Value::string("abc"), "\"abc\"")]
    #[case(Value::unquoted("abc"), "abc")]
    #[case(Value::int(-3), "-3")]
    #[case(Value::float(5.0), "5")]
    #[case(Value::float(2.5), "2.5")]
    #[case(Value::bool(true), "true")]
    #[case(Value::variable("@x"), "@x")]
    #[case(Value::variable("x"), "@x")]
    #[case(Value::binary(BinaryOp::Concat, Value::string("a"), Value::int(1)), "\"a\" .. 1")]
    #[case(Value::unary(UnaryOp::Not, Value::reference("Flag")), "!Flag")]
    #[case(Value::array(vec![Value::int(1), Value::int(2)]), "{1, 2}")]
    fn test_display(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(value.to_string(), expected);
    }

    #[rstest]
    #[case(Value::string("abc"), "abc")]
    #[case(Value::float(1.5), "1.5")]
    #[case(Value::reference("Node"), "Node")]
    fn test_text(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(value.text(), expected);
    }

    #[test]
    fn test_eq_ignores_position() {
        assert_eq!(Value::int(1).at(3, 4), Value::int(1));
        assert_ne!(Value::int(1), Value::float(1.0));
    }

    #[test]
    fn test_visit_order() {
        let value = Value::binary(
            BinaryOp::Add,
            Value::reference("a"),
            Value::array(vec![Value::variable("b")]),
        );
        let mut names = Vec::new();
        value.visit(&mut |v| {
            if let Some(name) = v.reference_name() {
                names.push(name.to_string());
            }
        });
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }
}
