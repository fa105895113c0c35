//! `pcl-index` is the incremental semantic index of pcl configuration files.
//!
//! Files are merged into a namespace tree keyed by package and object
//! name. Every node remembers which file contributed what, so a file can be
//! re-indexed or removed on its own while the rest of the tree stays put.
//! On top of the tree sit name and variable resolution along the lexical
//! scope chain, and a tree-walking evaluator that expands conditionals,
//! loops and template instantiations.
//!
//! [`Tree`] never locks. Share it between threads through [`SharedTree`].
//!
//! ## Example
//!
//! ```rust
//! use pcl_index::{EvalOptions, Tree};
//! use pcl_syntax::{BinaryOp, Configuration, Definition, Value};
//!
//! let mut tree = Tree::default();
//! tree.add_file(
//!     "app/timer.pcl",
//!     &Configuration::new(
//!         Some("App"),
//!         vec![
//!             Definition::variable("Base", Some(Value::int(20))),
//!             Definition::object(
//!                 "+Timer",
//!                 vec![Definition::field(
//!                     "Period",
//!                     Value::binary(BinaryOp::Mul, Value::variable("Base"), Value::int(2)),
//!                 )],
//!             ),
//!         ],
//!     ),
//! );
//! tree.resolve_references();
//!
//! let timer = tree.resolve_name(tree.root(), "App.Timer").unwrap();
//! let period = &tree.node(timer).unwrap().field("Period").unwrap().value;
//! assert_eq!(
//!     tree.evaluate_value(period, timer, &EvalOptions::default()),
//!     Value::int(40)
//! );
//! ```
mod error;
mod eval;
mod find;
mod fragment;
mod indexer;
mod name_index;
mod node;
mod options;
mod reference;
mod resolve;
mod scan;
mod shared;
mod snapshot;
mod tree;

pub use error::IndexError;
pub use eval::{EvalOptions, EvaluationContext, Evaluator, ZeroDivision};
pub use find::Entity;
pub use fragment::Fragment;
pub use name_index::{LookupMode, NameIndex};
pub use node::{FieldEntry, Node, NodeId, VariableInfo, normalize_name, normalize_variable};
pub use options::{IndexOptions, ScanOptions};
pub use reference::{Reference, VariableTarget};
pub use scan::ScanReport;
pub use shared::SharedTree;
pub use tree::{TemplateEntry, Tree};
