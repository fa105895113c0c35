//! Tree-walking evaluation of values and definitions.
//!
//! Evaluation never mutates the tree. Everything it binds lives in an
//! [`EvaluationContext`], and anything it cannot reduce is returned as
//! written so callers can still print it.
mod context;
mod ops;

use std::cell::RefCell;
use std::sync::Arc;

use pcl_syntax::{Definition, Definitions, FieldDef, Instantiation, ObjectDef, Value, ValueKind};
use smol_str::SmolStr;

pub use context::EvaluationContext;

use crate::node::normalize_variable;
use crate::{NodeId, Tree};

/// What division or modulo by zero produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroDivision {
    /// Yield zero of the operand type.
    #[default]
    Zero,
    /// Leave the expression unevaluated.
    Unevaluated,
}

#[derive(Debug, Clone)]
pub struct EvalOptions {
    pub zero_division: ZeroDivision,
    /// Bound on nested variable default and template expansion.
    pub max_depth: u32,
}

#[cfg(debug_assertions)]
impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            zero_division: ZeroDivision::Zero,
            max_depth: 64,
        }
    }
}

#[cfg(not(debug_assertions))]
impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            zero_division: ZeroDivision::Zero,
            max_depth: 192,
        }
    }
}

/// A tree variable default or a template body being expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Expansion {
    Variable(NodeId, SmolStr),
    Template(SmolStr),
}

#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    options: EvalOptions,
    /// Expansions in progress, outermost first. One that comes back while
    /// still active is left unevaluated.
    expanding: RefCell<Vec<Expansion>>,
}

impl Evaluator {
    pub fn new(options: EvalOptions) -> Self {
        Self {
            options,
            expanding: RefCell::default(),
        }
    }

    /// Runs `f` with `expansion` marked active, or returns `None` when it
    /// already is.
    fn expand<T>(&self, expansion: Expansion, f: impl FnOnce() -> T) -> Option<T> {
        if self.expanding.borrow().contains(&expansion) {
            tracing::debug!("Cyclic expansion of {:?}", expansion);
            return None;
        }

        self.expanding.borrow_mut().push(expansion);
        let result = f();
        self.expanding.borrow_mut().pop();
        Some(result)
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    pub fn evaluate(&self, value: &Value, ctx: &EvaluationContext<'_>) -> Value {
        self.eval_value(value, ctx, 0)
    }

    /// Evaluates `definitions`, expanding conditionals, loops and template
    /// instantiations. Variable and template definitions are bound in `ctx`
    /// and do not appear in the result.
    pub fn evaluate_definitions(&self, definitions: &Definitions, ctx: &mut EvaluationContext<'_>) -> Definitions {
        let mut out = Vec::with_capacity(definitions.len());
        self.eval_definitions(definitions, ctx, 0, &mut out);
        out
    }

    fn eval_value(&self, value: &Value, ctx: &EvaluationContext<'_>, depth: u32) -> Value {
        match &value.kind {
            ValueKind::String { .. } | ValueKind::Int(_) | ValueKind::Float(_) | ValueKind::Bool(_) => value.clone(),
            ValueKind::Reference(name) | ValueKind::Variable(name) => {
                self.eval_variable(name, ctx, depth).unwrap_or_else(|| value.clone())
            }
            ValueKind::Binary { op, left, right } => {
                let left = self.eval_value(left, ctx, depth);
                let right = self.eval_value(right, ctx, depth);
                match ops::binary(*op, &left, &right, self.options.zero_division) {
                    Some(result) => Value::new(result.kind, value.position),
                    None => Value::new(
                        ValueKind::Binary {
                            op: *op,
                            left: Arc::new(left),
                            right: Arc::new(right),
                        },
                        value.position,
                    ),
                }
            }
            ValueKind::Unary { op, operand } => {
                let operand = self.eval_value(operand, ctx, depth);
                match ops::unary(*op, &operand) {
                    Some(result) => Value::new(result.kind, value.position),
                    None => Value::new(
                        ValueKind::Unary {
                            op: *op,
                            operand: Arc::new(operand),
                        },
                        value.position,
                    ),
                }
            }
            ValueKind::Array(values) => Value::new(
                ValueKind::Array(values.iter().map(|v| self.eval_value(v, ctx, depth)).collect()),
                value.position,
            ),
        }
    }

    /// Context chain first, then the variables of the node scope.
    fn eval_variable(&self, name: &str, ctx: &EvaluationContext<'_>, depth: u32) -> Option<Value> {
        let name = normalize_variable(name);
        if let Some(value) = ctx.lookup(name) {
            return Some(value.clone());
        }

        let tree = ctx.tree()?;
        if depth >= self.options.max_depth {
            tracing::debug!("Evaluation depth {} reached at @{}", depth, name);
            return None;
        }

        let scope = ctx.scope().unwrap_or(tree.root());
        let (node_id, info) = tree.resolve_variable(scope, name)?;
        let default = info.default.as_ref()?;
        let owner = EvaluationContext::new(tree).with_scope(node_id);
        self.expand(Expansion::Variable(node_id, info.name.clone()), || {
            self.eval_value(default, &owner, depth + 1)
        })
    }

    fn eval_definitions(
        &self,
        definitions: &Definitions,
        ctx: &mut EvaluationContext<'_>,
        depth: u32,
        out: &mut Definitions,
    ) {
        for definition in definitions {
            match &**definition {
                Definition::Field(field) => out.push(Arc::new(Definition::Field(FieldDef {
                    name: field.name.clone(),
                    value: self.eval_value(&field.value, ctx, depth),
                    position: field.position,
                }))),
                Definition::Object(object) => {
                    let name = match &object.name.kind {
                        ValueKind::Reference(_) => object.name.clone(),
                        _ => self.eval_value(&object.name, ctx, depth),
                    };
                    let scope = child_scope(ctx, &name.text());

                    let mut child = ctx.child();
                    if let Some(scope) = scope {
                        child = child.with_scope(scope);
                    }
                    let mut body = Vec::with_capacity(object.definitions.len());
                    self.eval_definitions(&object.definitions, &mut child, depth, &mut body);

                    out.push(Arc::new(Definition::Object(ObjectDef {
                        name,
                        definitions: body,
                        position: object.position,
                        end: object.end,
                    })));
                }
                Definition::Variable(variable) => {
                    if let Some(default) = &variable.default {
                        let value = self.eval_value(default, ctx, depth);
                        ctx.define(&variable.name, value);
                    }
                }
                Definition::If(block) => {
                    let condition = self.eval_value(&block.condition, ctx, depth);
                    let branch = if ops::is_truthy(&condition) {
                        &block.then_definitions
                    } else {
                        &block.else_definitions
                    };
                    self.eval_definitions(branch, ctx, depth, out);
                }
                Definition::Foreach(block) => {
                    let iterable = self.eval_value(&block.iterable, ctx, depth);
                    let ValueKind::Array(items) = iterable.kind else {
                        continue;
                    };

                    for (index, item) in items.into_iter().enumerate() {
                        let mut child = ctx.child();
                        if let Some(key) = &block.key {
                            child.define(key, Value::int(index as i64));
                        }
                        if let Some(value) = &block.value {
                            child.define(value, item);
                        }
                        self.eval_definitions(&block.definitions, &mut child, depth, out);
                    }
                }
                Definition::Template(template) => ctx.define_template(Arc::clone(template)),
                Definition::Instantiation(instance) => out.push(self.instantiate(instance, ctx, depth)),
            }
        }
    }

    /// Expands `instance` into an object named after it. A missing template
    /// or an exhausted depth yields an object holding just the arguments.
    fn instantiate(&self, instance: &Instantiation, ctx: &EvaluationContext<'_>, depth: u32) -> Arc<Definition> {
        let arguments = instance
            .arguments
            .iter()
            .map(|argument| FieldDef {
                name: argument.name.clone(),
                value: self.eval_value(&argument.value, ctx, depth),
                position: argument.position,
            })
            .collect::<Vec<_>>();
        let name = Value::reference(&instance.name).at(instance.position.line, instance.position.column);

        let template = ctx.template(&instance.template).filter(|_| depth < self.options.max_depth);
        let expanded = template.and_then(|template| {
            self.expand(Expansion::Template(template.name.clone()), || {
                let mut child = ctx.child();
                if let Some(scope) = child_scope(ctx, &instance.name) {
                    child = child.with_scope(scope);
                }

                for param in &template.params {
                    match arguments.iter().find(|argument| argument.name == param.name) {
                        Some(argument) => child.define(&param.name, argument.value.clone()),
                        None => {
                            if let Some(default) = &param.default {
                                let value = self.eval_value(default, &child, depth + 1);
                                child.define(&param.name, value);
                            }
                        }
                    }
                }

                let mut body = Vec::with_capacity(template.definitions.len());
                self.eval_definitions(&template.definitions, &mut child, depth + 1, &mut body);
                body
            })
        });
        let definitions = match expanded {
            Some(body) => body,
            None => {
                tracing::debug!("Template {} not expanded for {}", instance.template, instance.name);
                arguments
                    .into_iter()
                    .map(|argument| Arc::new(Definition::Field(argument)))
                    .collect()
            }
        };

        Arc::new(Definition::Object(ObjectDef {
            name,
            definitions,
            position: instance.position,
            end: instance.end,
        }))
    }
}

/// Tree node matching an object named `name` under the context's scope.
fn child_scope(ctx: &EvaluationContext<'_>, name: &str) -> Option<NodeId> {
    let tree = ctx.tree()?;
    let scope = ctx.scope()?;
    tree.child(scope, name)
}

impl Tree {
    /// Evaluates `value` as if written inside `scope`.
    pub fn evaluate_value(&self, value: &Value, scope: NodeId, options: &EvalOptions) -> Value {
        let ctx = EvaluationContext::new(self).with_scope(scope);
        Evaluator::new(options.clone()).evaluate(value, &ctx)
    }

    /// Evaluates every field of every node and stores the result in the
    /// field history. Returns the number of fields evaluated.
    pub fn reevaluate_fields(&mut self, options: &EvalOptions) -> usize {
        let evaluator = Evaluator::new(options.clone());

        let mut results = Vec::new();
        for (node_id, node) in &self.nodes {
            let ctx = EvaluationContext::new(self).with_scope(node_id);
            for (name, entries) in &node.fields {
                for (index, entry) in entries.iter().enumerate() {
                    results.push((node_id, name.clone(), index, evaluator.evaluate(&entry.value, &ctx)));
                }
            }
        }

        let count = results.len();
        for (node_id, name, index, value) in results {
            if let Some(entry) = self.nodes[node_id]
                .fields
                .get_mut(&name)
                .and_then(|entries| entries.get_mut(index))
            {
                entry.evaluated = Some(value);
            }
        }

        tracing::debug!("Re-evaluated {} fields", count);
        count
    }
}

#[cfg(test)]
mod tests {
    use pcl_syntax::{BinaryOp, Configuration, ForeachBlock, IfBlock, Position, TemplateDef, TemplateParam, UnaryOp};
    use rstest::rstest;
    use smol_str::SmolStr;

    use super::*;

    fn field(definition: &Definition) -> (&str, &Value) {
        match definition {
            Definition::Field(field) => (field.name.as_str(), &field.value),
            other => panic!("expected field, got {:?}", other),
        }
    }

    #[rstest]
    #[case(Value::binary(BinaryOp::Add, Value::int(2), Value::int(3)), Value::int(5))]
    #[case(Value::binary(BinaryOp::Add, Value::float(2.0), Value::int(3)), Value::float(5.0))]
    #[case(Value::binary(BinaryOp::Concat, Value::string("a"), Value::string("b")), Value::string("ab"))]
    #[case(Value::binary(BinaryOp::Div, Value::int(5), Value::int(0)), Value::int(0))]
    #[case(Value::unary(UnaryOp::Neg, Value::binary(BinaryOp::Mul, Value::int(2), Value::int(4))), Value::int(-8))]
    #[case(
        Value::binary(BinaryOp::Add, Value::reference("Unknown"), Value::int(1)),
        Value::binary(BinaryOp::Add, Value::reference("Unknown"), Value::int(1))
    )]
    #[case(
        Value::array(vec![Value::binary(BinaryOp::Sub, Value::int(3), Value::int(1))]),
        Value::array(vec![Value::int(2)])
    )]
    fn test_evaluate(#[case] value: Value, #[case] expected: Value) {
        let ctx = EvaluationContext::default();
        assert_eq!(Evaluator::default().evaluate(&value, &ctx), expected);
    }

    #[test]
    fn test_zero_division_policy() {
        let evaluator = Evaluator::new(EvalOptions {
            zero_division: ZeroDivision::Unevaluated,
            ..Default::default()
        });
        let value = Value::binary(BinaryOp::Div, Value::int(5), Value::int(0));
        assert_eq!(evaluator.evaluate(&value, &EvaluationContext::default()), value);
    }

    #[test]
    fn test_if_expands_one_branch() {
        let definitions = vec![Arc::new(Definition::If(IfBlock {
            condition: Value::binary(BinaryOp::Eq, Value::int(1), Value::int(1)),
            then_definitions: vec![Definition::field("Foo", Value::int(1))],
            else_definitions: vec![Definition::field("Foo", Value::int(2))],
            position: Position::default(),
            end: Position::default(),
        }))];

        let mut ctx = EvaluationContext::default();
        let out = Evaluator::default().evaluate_definitions(&definitions, &mut ctx);
        assert_eq!(out.len(), 1);
        assert_eq!(field(&out[0]), ("Foo", &Value::int(1)));
    }

    #[test]
    fn test_foreach_in_source_order() {
        let definitions = vec![Arc::new(Definition::Foreach(ForeachBlock {
            key: Some(SmolStr::new("i")),
            value: Some(SmolStr::new("v")),
            iterable: Value::array(vec![Value::int(1), Value::int(2), Value::int(3)]),
            definitions: vec![
                Definition::field("N", Value::reference("v")),
                Definition::field("I", Value::variable("i")),
            ],
            position: Position::default(),
            end: Position::default(),
        }))];

        let mut ctx = EvaluationContext::default();
        let out = Evaluator::default().evaluate_definitions(&definitions, &mut ctx);
        let values = out.iter().map(|d| field(d).1.clone()).collect::<Vec<_>>();
        assert_eq!(
            values,
            vec![
                Value::int(1),
                Value::int(0),
                Value::int(2),
                Value::int(1),
                Value::int(3),
                Value::int(2)
            ]
        );
        assert!(ctx.lookup("v").is_none());
    }

    #[test]
    fn test_foreach_over_non_array_is_empty() {
        let definitions = vec![Arc::new(Definition::Foreach(ForeachBlock {
            key: None,
            value: Some(SmolStr::new("v")),
            iterable: Value::int(3),
            definitions: vec![Definition::field("N", Value::reference("v"))],
            position: Position::default(),
            end: Position::default(),
        }))];

        let out = Evaluator::default().evaluate_definitions(&definitions, &mut EvaluationContext::default());
        assert!(out.is_empty());
    }

    #[rstest]
    #[case(vec![FieldDef { name: SmolStr::new("p"), value: Value::int(5), position: Position::default() }], 5)]
    #[case(Vec::new(), 10)]
    #[case(vec![FieldDef { name: SmolStr::new("other"), value: Value::int(1), position: Position::default() }], 10)]
    fn test_template_instantiation(#[case] arguments: Vec<FieldDef>, #[case] expected: i64) {
        let template = Arc::new(TemplateDef {
            name: SmolStr::new("T"),
            params: vec![TemplateParam {
                name: SmolStr::new("p"),
                default: Some(Value::int(10)),
                position: Position::default(),
            }],
            definitions: vec![Definition::field("Val", Value::reference("p"))],
            position: Position::default(),
            end: Position::default(),
        });
        let definitions = vec![
            Arc::new(Definition::Template(template)),
            Arc::new(Definition::Instantiation(Instantiation {
                name: SmolStr::new("Inst"),
                template: SmolStr::new("T"),
                arguments,
                position: Position::default(),
                end: Position::default(),
            })),
        ];

        let out = Evaluator::default().evaluate_definitions(&definitions, &mut EvaluationContext::default());
        assert_eq!(out.len(), 1);
        let Definition::Object(object) = &*out[0] else {
            panic!("expected object");
        };
        assert_eq!(object.name_text(), "Inst");
        assert_eq!(object.definitions.len(), 1);
        assert_eq!(field(&object.definitions[0]), ("Val", &Value::int(expected)));
    }

    #[test]
    fn test_missing_template_keeps_arguments() {
        let definitions = vec![Arc::new(Definition::Instantiation(Instantiation {
            name: SmolStr::new("Inst"),
            template: SmolStr::new("Missing"),
            arguments: vec![FieldDef {
                name: SmolStr::new("p"),
                value: Value::binary(BinaryOp::Add, Value::int(1), Value::int(1)),
                position: Position::default(),
            }],
            position: Position::default(),
            end: Position::default(),
        }))];

        let out = Evaluator::default().evaluate_definitions(&definitions, &mut EvaluationContext::default());
        let Definition::Object(object) = &*out[0] else {
            panic!("expected object");
        };
        assert_eq!(field(&object.definitions[0]), ("p", &Value::int(2)));
    }

    #[test]
    fn test_variables_absorbed_into_context() {
        let definitions = vec![
            Definition::variable("Base", Some(Value::int(4))),
            Definition::field("Period", Value::binary(BinaryOp::Mul, Value::variable("Base"), Value::int(2))),
        ];

        let mut ctx = EvaluationContext::default();
        let out = Evaluator::default().evaluate_definitions(&definitions, &mut ctx);
        assert_eq!(out.len(), 1);
        assert_eq!(field(&out[0]), ("Period", &Value::int(8)));
        assert_eq!(ctx.lookup("Base"), Some(&Value::int(4)));
    }

    #[test]
    fn test_tree_variables_and_reevaluation() {
        let mut tree = Tree::default();
        tree.add_file(
            "a.pcl",
            &Configuration::new(
                Some("App"),
                vec![
                    Definition::variable("Base", Some(Value::int(4))),
                    Definition::variable(
                        "Double",
                        Some(Value::binary(BinaryOp::Mul, Value::variable("Base"), Value::int(2))),
                    ),
                    Definition::object(
                        "+Timer",
                        vec![Definition::field(
                            "Period",
                            Value::binary(BinaryOp::Add, Value::variable("Double"), Value::int(1)),
                        )],
                    ),
                ],
            ),
        );

        let app = tree.child(tree.root(), "App").unwrap();
        let timer = tree.child(app, "Timer").unwrap();
        let value = Value::variable("Double");
        assert_eq!(tree.evaluate_value(&value, timer, &EvalOptions::default()), Value::int(8));

        assert_eq!(tree.reevaluate_fields(&EvalOptions::default()), 1);
        let entry = tree.node(timer).unwrap().field("Period").unwrap();
        assert_eq!(entry.evaluated, Some(Value::int(9)));
    }

    #[test]
    fn test_self_referencing_variable_stops_at_max_depth() {
        let mut tree = Tree::default();
        tree.add_file(
            "a.pcl",
            &Configuration::new(
                Some("App"),
                vec![Definition::variable(
                    "Loop",
                    Some(Value::binary(BinaryOp::Add, Value::variable("Loop"), Value::int(1))),
                )],
            ),
        );
        let app = tree.child(tree.root(), "App").unwrap();
        let options = EvalOptions {
            max_depth: 3,
            ..Default::default()
        };

        let value = tree.evaluate_value(&Value::variable("Loop"), app, &options);
        assert!(matches!(value.kind, ValueKind::Binary { .. }));
    }

    #[test]
    fn test_branching_variable_cycle_left_unevaluated() {
        let twice = |name: &str| Value::binary(BinaryOp::Add, Value::variable(name), Value::variable(name));
        let mut tree = Tree::default();
        tree.add_file(
            "a.pcl",
            &Configuration::new(
                Some("App"),
                vec![
                    Definition::variable("Loop", Some(twice("Loop"))),
                    Definition::variable("Ping", Some(twice("Pong"))),
                    Definition::variable("Pong", Some(twice("Ping"))),
                ],
            ),
        );
        let app = tree.child(tree.root(), "App").unwrap();

        let value = tree.evaluate_value(&Value::variable("Loop"), app, &EvalOptions::default());
        assert_eq!(value, twice("Loop"));

        let value = tree.evaluate_value(&Value::variable("Ping"), app, &EvalOptions::default());
        assert_eq!(value, Value::binary(BinaryOp::Add, twice("Ping"), twice("Ping")));
    }

    #[test]
    fn test_self_instantiating_template_expands_once() {
        let instance = |name: &str| {
            Arc::new(Definition::Instantiation(Instantiation {
                name: SmolStr::new(name),
                template: SmolStr::new("T"),
                arguments: Vec::new(),
                position: Position::default(),
                end: Position::default(),
            }))
        };
        let template = Arc::new(TemplateDef {
            name: SmolStr::new("T"),
            params: Vec::new(),
            definitions: vec![instance("Left"), instance("Right")],
            position: Position::default(),
            end: Position::default(),
        });
        let definitions = vec![Arc::new(Definition::Template(template)), instance("Root")];

        let out = Evaluator::default().evaluate_definitions(&definitions, &mut EvaluationContext::default());

        let Definition::Object(root) = &*out[0] else {
            panic!("expected object");
        };
        let names = root
            .definitions
            .iter()
            .map(|definition| match &**definition {
                Definition::Object(object) => {
                    assert!(object.definitions.is_empty());
                    object.name_text()
                }
                other => panic!("expected object, got {:?}", other),
            })
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Left".to_string(), "Right".to_string()]);
    }
}
