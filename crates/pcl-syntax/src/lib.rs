//! `pcl-syntax` is the AST model of the pcl configuration language.
//!
//! The parser itself is an external collaborator: anything implementing
//! [`Parse`] can feed the index. Values are a closed sum type so every
//! consumer matches them exhaustively.
//!
//! ## Example
//!
//! ```rust
//! use pcl_syntax::{BinaryOp, Configuration, Definition, Value};
//!
//! let config = Configuration::new(
//!     Some("App.Timers"),
//!     vec![Definition::field(
//!         "Period",
//!         Value::binary(BinaryOp::Mul, Value::int(2), Value::reference("Base")),
//!     )],
//! );
//!
//! assert_eq!(config.package.unwrap().segments().count(), 2);
//! ```
mod configuration;
mod definition;
mod parse;
mod range;
mod value;

pub use configuration::{Comment, Configuration, Package, Pragma};
pub use definition::{
    Definition, Definitions, FieldDef, ForeachBlock, IfBlock, Instantiation, ObjectDef, TemplateDef, TemplateParam,
    VariableDef,
};
pub use parse::{Parse, ParseError};
pub use range::{Position, Range};
pub use value::{BinaryOp, UnaryOp, Value, ValueKind};
