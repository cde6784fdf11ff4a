//! Call-chain parsing.
//!
//! Turns `Name(args).m1(args).m2(args)` into one constructor call plus the
//! ordered list of modifiers. Arguments are captured, not evaluated.

use crate::ast::{Argument, Expression};
use crate::{EvalError, EvalResult};

#[derive(Debug, Clone, PartialEq)]
pub struct CallNode {
    pub name: String,
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModifierNode {
    pub name: String,
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub constructor: CallNode,
    /// Source order, innermost first.
    pub modifiers: Vec<ModifierNode>,
}

/// Parse a fluent builder chain. Any other shape fails with
/// `UnsupportedExpression`.
pub fn parse(expr: &Expression) -> EvalResult<ViewNode> {
    let Expression::Call { callee, arguments } = expr else {
        return Err(unsupported(expr));
    };
    match callee.as_ref() {
        Expression::Identifier(name) => Ok(ViewNode {
            constructor: CallNode {
                name: name.clone(),
                arguments: arguments.clone(),
            },
            modifiers: Vec::new(),
        }),
        Expression::Member {
            base: Some(base),
            name,
        } if matches!(base.as_ref(), Expression::Call { .. }) => {
            let mut node = parse(base)?;
            node.modifiers.push(ModifierNode {
                name: name.clone(),
                arguments: arguments.clone(),
            });
            Ok(node)
        }
        _ => Err(unsupported(expr)),
    }
}

/// Name of the constructor at the root of a chain, without building it.
pub fn constructor_name(expr: &Expression) -> Option<&str> {
    let Expression::Call { callee, .. } = expr else {
        return None;
    };
    match callee.as_ref() {
        Expression::Identifier(name) => Some(name),
        Expression::Member {
            base: Some(base), ..
        } => constructor_name(base),
        _ => None,
    }
}

fn unsupported(expr: &Expression) -> EvalError {
    EvalError::unsupported(format!("`{}` is not a view construction chain", expr))
}
