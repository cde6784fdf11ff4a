use tracing::debug;

use crate::ast::{Argument, Expression, Literal};
use crate::chain;
use crate::registry::{HandlerKind, MemberCall, Place};
use crate::scope::ScopeId;
use crate::value::{FunctionBody, FunctionValue, ResolvedArgument, Value};
use crate::{EvalError, EvalResult};

use super::Interpreter;

impl Interpreter {
    /// Evaluate one expression to a value under `scope`.
    pub fn evaluate(&mut self, expr: &Expression, scope: ScopeId) -> EvalResult<Value> {
        match expr {
            Expression::Literal(lit) => Ok(Self::eval_literal(lit)),
            Expression::Identifier(_) | Expression::Member { base: Some(_), .. } => {
                Ok(self.eval_target(expr, scope)?.0)
            }
            Expression::Member { base: None, name } => Ok(Value::MemberAccess(vec![name.clone()])),
            Expression::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.evaluate(item, scope)?);
                }
                Ok(Value::Array(values))
            }
            Expression::Call { callee, arguments } => {
                self.eval_call(expr, callee, arguments, scope)
            }
        }
    }

    /// Resolve arguments left to right. Writes land in that order, but no
    /// argument observes what a sibling wrote: every read sees the binding as
    /// it was before the sibling ran.
    pub fn resolve_arguments(
        &mut self,
        arguments: &[Argument],
        scope: ScopeId,
    ) -> EvalResult<Vec<ResolvedArgument>> {
        self.scopes.open_arguments();
        let result = self.resolve_each(arguments, scope);
        self.scopes.close_arguments();
        result
    }

    fn resolve_each(
        &mut self,
        arguments: &[Argument],
        scope: ScopeId,
    ) -> EvalResult<Vec<ResolvedArgument>> {
        let mut resolved = Vec::with_capacity(arguments.len());
        for (index, argument) in arguments.iter().enumerate() {
            self.scopes.begin_argument(index);
            resolved.push(ResolvedArgument {
                label: argument.label.clone(),
                value: self.evaluate(&argument.value, scope)?,
            });
        }
        Ok(resolved)
    }

    /// Invoke a function value. Expression-bodied functions run in a fresh
    /// function scope that is released before returning, on success or not.
    pub fn call_function(
        &mut self,
        function: &FunctionValue,
        arguments: Vec<ResolvedArgument>,
        receiver: Option<ScopeId>,
    ) -> EvalResult<Value> {
        match &function.body {
            FunctionBody::Native(native) => native(&arguments),
            FunctionBody::Expression {
                parameters,
                body,
                closure,
            } => {
                if parameters.len() != arguments.len() {
                    return Err(EvalError::invalid_arguments(format!(
                        "{} expects {} argument(s), got {}",
                        function.name,
                        parameters.len(),
                        arguments.len()
                    )));
                }
                let parent = receiver.or(*closure).unwrap_or(self.global());
                let frame = self.scopes.push_function(parent)?;
                debug!("calling {} in scope #{}", function.name, frame.index());
                let result = parameters
                    .iter()
                    .zip(arguments)
                    .try_for_each(|(parameter, argument)| {
                        self.scopes.define(frame, parameter.as_str(), argument.value)
                    })
                    .and_then(|_| self.evaluate(body, frame));
                self.scopes.pop_function(frame)?;
                result
            }
        }
    }

    fn eval_literal(lit: &Literal) -> Value {
        match lit {
            Literal::Integer(i) => Value::Int(*i),
            Literal::Double(d) => Value::Double(*d),
            Literal::Boolean(b) => Value::Bool(*b),
            Literal::String(s) => Value::String(s.clone()),
        }
    }

    // Value of an identifier or member path, plus the binding it was read
    // from when it has one.
    fn eval_target(
        &mut self,
        expr: &Expression,
        scope: ScopeId,
    ) -> EvalResult<(Value, Option<Place>)> {
        match expr {
            Expression::Identifier(name) => {
                let owner = self
                    .scopes
                    .resolve(scope, name)
                    .ok_or_else(|| EvalError::UnknownIdentifier(name.clone()))?;
                let value = self
                    .scopes
                    .get_local(owner, name)
                    .ok_or_else(|| EvalError::UnknownIdentifier(name.clone()))?;
                Ok((value, Some(Place::new(owner, name.as_str()))))
            }
            Expression::Member {
                base: Some(base),
                name,
            } => {
                // `Foo.bar` with `Foo` unbound stays a path
                if let Expression::Identifier(head) = base.as_ref() {
                    if self.scopes.resolve(scope, head).is_none() {
                        return Ok((Value::MemberAccess(vec![head.clone(), name.clone()]), None));
                    }
                }
                let (receiver, _) = self.eval_target(base, scope)?;
                match &receiver {
                    Value::Instance(instance) => {
                        if let Some(value) = self.scopes.get_local(instance.scope(), name) {
                            return Ok((value, Some(Place::new(instance.scope(), name.as_str()))));
                        }
                    }
                    Value::MemberAccess(path) => {
                        let mut path = path.clone();
                        path.push(name.clone());
                        return Ok((Value::MemberAccess(path), None));
                    }
                    _ => {}
                }
                match Self::member_of(&receiver, name) {
                    Some(value) => Ok((value, None)),
                    None => match expr.as_path() {
                        Some(path) => Ok((
                            Value::MemberAccess(path.into_iter().map(String::from).collect()),
                            None,
                        )),
                        None => Err(EvalError::unsupported(format!(
                            "{} has no member `{}`",
                            receiver.type_name(),
                            name
                        ))),
                    },
                }
            }
            _ => Ok((self.evaluate(expr, scope)?, None)),
        }
    }

    fn member_of(receiver: &Value, name: &str) -> Option<Value> {
        match (receiver, name) {
            (Value::Type(ty), _) => ty.member(name).cloned(),
            (Value::Array(items), "count") => Some(Value::Int(items.len() as i64)),
            (Value::Array(items), "isEmpty") => Some(Value::Bool(items.is_empty())),
            (Value::String(s), "count") => Some(Value::Int(s.chars().count() as i64)),
            (Value::String(s), "isEmpty") => Some(Value::Bool(s.is_empty())),
            _ => None,
        }
    }

    fn eval_call(
        &mut self,
        expr: &Expression,
        callee: &Expression,
        arguments: &[Argument],
        scope: ScopeId,
    ) -> EvalResult<Value> {
        // Nested view: a chain rooted at a name nobody bound, or a decorated
        // chain rooted at a registered constructor (`Image(..).resizable()`).
        if let Some(root) = chain::constructor_name(expr) {
            let unbound = self.scopes.resolve(scope, root).is_none();
            let decorated = !matches!(callee, Expression::Identifier(_))
                && self.registry.contains(HandlerKind::Constructor, root);
            if unbound || decorated {
                return self.render(expr, scope).map(Value::Artifact);
            }
        }

        match callee {
            Expression::Identifier(name) => match self.eval_target(callee, scope)?.0 {
                Value::Function(function) => {
                    let arguments = self.resolve_arguments(arguments, scope)?;
                    self.call_function(&function, arguments, None)
                }
                Value::Type(ty) => {
                    let arguments = self.resolve_arguments(arguments, scope)?;
                    ty.make_value(&arguments, self)
                }
                _ => Err(EvalError::UnknownFunction(name.clone())),
            },
            Expression::Member {
                base: Some(base),
                name,
            } => self.eval_member_call(base, name, arguments, scope),
            Expression::Member { base: None, name } => Err(EvalError::unsupported(format!(
                "implicit member `.{}` cannot be called",
                name
            ))),
            _ => match self.evaluate(callee, scope)? {
                Value::Function(function) => {
                    let arguments = self.resolve_arguments(arguments, scope)?;
                    self.call_function(&function, arguments, None)
                }
                _ => Err(EvalError::UnknownFunction(callee.to_string())),
            },
        }
    }

    /// `base.name(arguments)`: a nested type's initializer (`Image.Scale(..)`),
    /// an instance's own function if it binds one, otherwise the
    /// member-function registry.
    fn eval_member_call(
        &mut self,
        base: &Expression,
        name: &str,
        arguments: &[Argument],
        scope: ScopeId,
    ) -> EvalResult<Value> {
        let (receiver, place) = self.eval_target(base, scope)?;

        if let Value::Type(ty) = &receiver {
            if let Some(Value::Type(nested)) = ty.member(name).cloned() {
                let arguments = self.resolve_arguments(arguments, scope)?;
                return nested.make_value(&arguments, self);
            }
        }

        if let Value::Instance(instance) = &receiver {
            match self.scopes.get_local(instance.scope(), name) {
                Some(Value::Function(function)) => {
                    let arguments = self.resolve_arguments(arguments, scope)?;
                    return self.call_function(&function, arguments, Some(instance.scope()));
                }
                Some(other) => {
                    return Err(EvalError::UnknownFunction(format!(
                        "{} ({} is not a function)",
                        name,
                        other.type_name()
                    )))
                }
                None => {}
            }
        }

        let handler = self.registry.member(name)?;
        let arguments = self.resolve_arguments(arguments, scope)?;
        debug!(
            "dispatching .{} on {} ({} argument(s))",
            name,
            receiver.type_name(),
            arguments.len()
        );
        let mut call = MemberCall {
            name,
            receiver,
            place,
            arguments,
            scopes: &mut self.scopes,
            rng: self.rng.as_mut(),
        };
        handler(&mut call)
    }
}
