use core::fmt;
use std::any::Any;
use std::rc::Rc;

use crate::ast::Expression;
use crate::scope::ScopeId;
use crate::types::RuntimeType;
use crate::EvalResult;

// Runtime value. The set is closed: host objects only ever appear wrapped
// in `Artifact`.
#[derive(Clone, Debug)]
pub enum Value {
    Int(i64),
    Double(f64),
    Bool(bool),
    String(String),
    Array(Vec<Value>),
    /// Dotted reference that did not resolve to a constant, e.g. `.title`.
    MemberAccess(Vec<String>),
    Artifact(Artifact),
    Function(Rc<FunctionValue>),
    Type(Rc<RuntimeType>),
    Instance(InstanceRef),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Double(_) => "Double",
            Value::Bool(_) => "Bool",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::MemberAccess(_) => "MemberAccess",
            Value::Artifact(_) => "Artifact",
            Value::Function(_) => "Function",
            Value::Type(_) => "Type",
            Value::Instance(_) => "Instance",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Name carried by enum-like values: the last segment of a member path
    /// (`.title`, `Font.title` when unresolved) or a catalog string.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::MemberAccess(path) => path.last().map(String::as_str),
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_artifact(&self) -> Option<&Artifact> {
        match self {
            Value::Artifact(artifact) => Some(artifact),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::MemberAccess(a), Value::MemberAccess(b)) => a == b,
            (Value::Artifact(a), Value::Artifact(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{:?}", d),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::MemberAccess(path) if path.len() == 1 => write!(f, ".{}", path[0]),
            Value::MemberAccess(path) => write!(f, "{}", path.join(".")),
            Value::Artifact(_) => write!(f, "<artifact>"),
            Value::Function(function) => write!(f, "<function {}>", function.name),
            Value::Type(ty) => write!(f, "<type {}>", ty.name()),
            Value::Instance(instance) => write!(f, "<instance #{}>", instance.scope().index()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

/// Opaque host object. Only the handler that built it knows its concrete
/// type; everyone else passes it through.
#[derive(Clone)]
pub struct Artifact(Rc<dyn Any>);

impl Artifact {
    pub fn new<T: Any>(inner: T) -> Self {
        Self(Rc::new(inner))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Artifact) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Artifact({:p})", Rc::as_ptr(&self.0))
    }
}

/// Handle to a mutable object backed by an instance scope.
///
/// Every clone holds a lease on the scope. Once the last handle is gone the
/// arena may reclaim the slot; a bare `ScopeId` does not keep it alive.
#[derive(Clone)]
pub struct InstanceRef {
    scope: ScopeId,
    lease: Rc<()>,
}

impl InstanceRef {
    pub(crate) fn new(scope: ScopeId, lease: Rc<()>) -> Self {
        Self { scope, lease }
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Number of live handles to this instance, this one included.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.lease)
    }
}

impl PartialEq for InstanceRef {
    fn eq(&self, other: &Self) -> bool {
        self.scope == other.scope
    }
}

impl Eq for InstanceRef {}

impl std::hash::Hash for InstanceRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.scope.hash(state);
    }
}

impl fmt::Debug for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InstanceRef({:?})", self.scope)
    }
}

pub type NativeFunction = Rc<dyn Fn(&[ResolvedArgument]) -> EvalResult<Value>>;

pub struct FunctionValue {
    pub name: String,
    pub body: FunctionBody,
}

pub enum FunctionBody {
    Native(NativeFunction),
    /// Evaluated in a fresh function scope whose parent is `closure`
    /// (or the receiving instance for method calls).
    Expression {
        parameters: Vec<String>,
        body: Expression,
        closure: Option<ScopeId>,
    },
}

impl FunctionValue {
    pub fn native<S, F>(name: S, function: F) -> Self
    where
        S: Into<String>,
        F: Fn(&[ResolvedArgument]) -> EvalResult<Value> + 'static,
    {
        Self {
            name: name.into(),
            body: FunctionBody::Native(Rc::new(function)),
        }
    }

    pub fn expression<S: Into<String>>(
        name: S,
        parameters: Vec<String>,
        body: Expression,
        closure: Option<ScopeId>,
    ) -> Self {
        Self {
            name: name.into(),
            body: FunctionBody::Expression {
                parameters,
                body,
                closure,
            },
        }
    }

    pub fn arity(&self) -> Option<usize> {
        match &self.body {
            FunctionBody::Native(_) => None,
            FunctionBody::Expression { parameters, .. } => Some(parameters.len()),
        }
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.body {
            FunctionBody::Native(_) => write!(f, "FunctionValue({}, native)", self.name),
            FunctionBody::Expression {
                parameters, body, ..
            } => write!(
                f,
                "FunctionValue({}({}) = {})",
                self.name,
                parameters.join(", "),
                body
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArgument {
    pub label: Option<String>,
    pub value: Value,
}

impl ResolvedArgument {
    pub fn positional(value: Value) -> Self {
        Self { label: None, value }
    }

    pub fn labeled<S: Into<String>>(label: S, value: Value) -> Self {
        Self {
            label: Some(label.into()),
            value,
        }
    }
}

/// Lookup helpers for handler argument lists.
pub trait ArgumentsExt {
    fn labeled(&self, label: &str) -> Option<&Value>;
    /// The `index`-th unlabeled argument.
    fn positional(&self, index: usize) -> Option<&Value>;
}

impl ArgumentsExt for [ResolvedArgument] {
    fn labeled(&self, label: &str) -> Option<&Value> {
        self.iter()
            .find(|argument| argument.label.as_deref() == Some(label))
            .map(|argument| &argument.value)
    }

    fn positional(&self, index: usize) -> Option<&Value> {
        self.iter()
            .filter(|argument| argument.label.is_none())
            .nth(index)
            .map(|argument| &argument.value)
    }
}
