use pcl_syntax::{BinaryOp, UnaryOp, Value, ValueKind};

use super::ZeroDivision;

/// Applies `op` to two evaluated operands. `None` means no rule covers the
/// combination and the expression stays as written.
pub(crate) fn binary(op: BinaryOp, left: &Value, right: &Value, zero_division: ZeroDivision) -> Option<Value> {
    if op == BinaryOp::Concat {
        return Some(Value::string(&format!("{}{}", left.text(), right.text())));
    }

    match (&left.kind, &right.kind) {
        (ValueKind::Int(l), ValueKind::Int(r)) => int(op, *l, *r, zero_division),
        (ValueKind::Bool(l), ValueKind::Bool(r)) => boolean(op, *l, *r),
        (ValueKind::String { value: l, .. }, ValueKind::String { value: r, .. }) => match op {
            BinaryOp::Eq => Some(Value::bool(l == r)),
            BinaryOp::NotEq => Some(Value::bool(l != r)),
            _ => None,
        },
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(l), Some(r)) => float(op, l, r, zero_division),
            _ => None,
        },
    }
}

pub(crate) fn unary(op: UnaryOp, operand: &Value) -> Option<Value> {
    match (op, &operand.kind) {
        (UnaryOp::Neg, ValueKind::Int(i)) => Some(Value::int(i.wrapping_neg())),
        (UnaryOp::Neg, ValueKind::Float(f)) => Some(Value::float(-f)),
        (UnaryOp::Not, ValueKind::Bool(b)) => Some(Value::bool(!b)),
        _ => None,
    }
}

/// Truthiness of a condition: booleans by value, numbers when nonzero,
/// strings when non-empty.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match &value.kind {
        ValueKind::Bool(b) => *b,
        ValueKind::Int(i) => *i != 0,
        ValueKind::Float(f) => *f != 0.0,
        ValueKind::String { value, .. } => !value.is_empty(),
        ValueKind::Reference(_)
        | ValueKind::Variable(_)
        | ValueKind::Binary { .. }
        | ValueKind::Unary { .. }
        | ValueKind::Array(_) => false,
    }
}

/// Result of dividing by zero under the configured policy.
fn divide_by_zero(zero_division: ZeroDivision, zero: Value) -> Option<Value> {
    match zero_division {
        ZeroDivision::Zero => Some(zero),
        ZeroDivision::Unevaluated => None,
    }
}

fn shift_amount(r: i64) -> Option<u32> {
    u32::try_from(r).ok().filter(|r| *r < i64::BITS)
}

fn int(op: BinaryOp, l: i64, r: i64, zero_division: ZeroDivision) -> Option<Value> {
    let value = match op {
        BinaryOp::Add => Value::int(l.wrapping_add(r)),
        BinaryOp::Sub => Value::int(l.wrapping_sub(r)),
        BinaryOp::Mul => Value::int(l.wrapping_mul(r)),
        BinaryOp::Div if r == 0 => return divide_by_zero(zero_division, Value::int(0)),
        BinaryOp::Div => Value::int(l.wrapping_div(r)),
        BinaryOp::Mod if r == 0 => return divide_by_zero(zero_division, Value::int(0)),
        BinaryOp::Mod => Value::int(l.wrapping_rem(r)),
        BinaryOp::BitAnd => Value::int(l & r),
        BinaryOp::BitOr => Value::int(l | r),
        BinaryOp::BitXor => Value::int(l ^ r),
        BinaryOp::Shl => Value::int(shift_amount(r).map_or(0, |r| l.wrapping_shl(r))),
        BinaryOp::Shr => Value::int(shift_amount(r).map_or(0, |r| l.wrapping_shr(r))),
        BinaryOp::Eq => Value::bool(l == r),
        BinaryOp::NotEq => Value::bool(l != r),
        BinaryOp::Lt => Value::bool(l < r),
        BinaryOp::Lte => Value::bool(l <= r),
        BinaryOp::Gt => Value::bool(l > r),
        BinaryOp::Gte => Value::bool(l >= r),
        BinaryOp::And | BinaryOp::Or | BinaryOp::Concat => return None,
    };
    Some(value)
}

fn float(op: BinaryOp, l: f64, r: f64, zero_division: ZeroDivision) -> Option<Value> {
    let value = match op {
        BinaryOp::Add => Value::float(l + r),
        BinaryOp::Sub => Value::float(l - r),
        BinaryOp::Mul => Value::float(l * r),
        BinaryOp::Div | BinaryOp::Mod if r == 0.0 => return divide_by_zero(zero_division, Value::float(0.0)),
        BinaryOp::Div => Value::float(l / r),
        BinaryOp::Mod => Value::float(l % r),
        BinaryOp::Eq => Value::bool(l == r),
        BinaryOp::NotEq => Value::bool(l != r),
        BinaryOp::Lt => Value::bool(l < r),
        BinaryOp::Lte => Value::bool(l <= r),
        BinaryOp::Gt => Value::bool(l > r),
        BinaryOp::Gte => Value::bool(l >= r),
        _ => return None,
    };
    Some(value)
}

fn boolean(op: BinaryOp, l: bool, r: bool) -> Option<Value> {
    match op {
        BinaryOp::Eq => Some(Value::bool(l == r)),
        BinaryOp::NotEq => Some(Value::bool(l != r)),
        BinaryOp::And => Some(Value::bool(l && r)),
        BinaryOp::Or => Some(Value::bool(l || r)),
        _ => None,
    }
}
