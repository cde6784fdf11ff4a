use std::collections::HashMap;
use std::rc::Rc;

use rand::RngCore;
use tracing::{debug, warn};

use crate::config::DuplicatePolicy;
use crate::eval::collection;
use crate::scope::{ScopeId, Scopes};
use crate::value::{Artifact, ResolvedArgument, Value};
use crate::{EvalError, EvalResult};

pub type ConstructorFn = Rc<dyn Fn(&[ResolvedArgument]) -> EvalResult<Artifact>>;
pub type DecoratorFn = Rc<dyn Fn(&[ResolvedArgument], Artifact) -> EvalResult<Artifact>>;
pub type MemberFn = Rc<dyn Fn(&mut MemberCall<'_>) -> EvalResult<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum HandlerKind {
    Constructor,
    Decorator,
    #[strum(serialize = "Member function")]
    Member,
}

#[derive(Clone)]
pub enum Handler {
    Constructor(ConstructorFn),
    Decorator(DecoratorFn),
    Member(MemberFn),
}

impl Handler {
    pub fn kind(&self) -> HandlerKind {
        match self {
            Handler::Constructor(_) => HandlerKind::Constructor,
            Handler::Decorator(_) => HandlerKind::Decorator,
            Handler::Member(_) => HandlerKind::Member,
        }
    }
}

/// A named binding that a member function may rewrite.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub scope: ScopeId,
    pub name: String,
}

impl Place {
    pub fn new<S: Into<String>>(scope: ScopeId, name: S) -> Self {
        Self {
            scope,
            name: name.into(),
        }
    }
}

/// Everything a member-function handler sees: the receiver, where it came
/// from, its resolved arguments, and the interpreter state it may touch.
pub struct MemberCall<'a> {
    pub name: &'a str,
    pub receiver: Value,
    /// `None` when the receiver is a transient value (a literal, a call
    /// result) rather than a named binding.
    pub place: Option<Place>,
    pub arguments: Vec<ResolvedArgument>,
    pub scopes: &'a mut Scopes,
    pub rng: &'a mut dyn RngCore,
}

impl MemberCall<'_> {
    /// Store `value` into the receiver's binding, notifying observers of the
    /// owning instance.
    pub fn write_back(&mut self, value: Value) -> EvalResult<()> {
        let place = self.place.as_ref().ok_or_else(|| {
            EvalError::invalid_arguments(format!(
                "{}() requires a mutable binding, got a transient {}",
                self.name,
                self.receiver.type_name()
            ))
        })?;
        self.scopes.set(place.scope, &place.name, value)
    }

    pub fn expect_no_arguments(&self) -> EvalResult<()> {
        if self.arguments.is_empty() {
            Ok(())
        } else {
            Err(EvalError::invalid_arguments(format!(
                "{}() takes no arguments, got {}",
                self.name,
                self.arguments.len()
            )))
        }
    }
}

/// Name-keyed handler tables. Names are exact and case-sensitive.
pub struct Registry {
    tables: HashMap<HandlerKind, HashMap<String, Handler>>,
    policy: DuplicatePolicy,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

impl Registry {
    /// An empty registry
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            tables: HashMap::new(),
            policy,
        }
    }

    /// A registry preloaded with the collection member functions
    /// (`contains`, `shuffle`, `shuffled`)
    pub fn with_builtins(policy: DuplicatePolicy) -> Self {
        let mut registry = Self::new(policy);
        for (name, handler) in collection::handlers() {
            registry
                .tables
                .entry(HandlerKind::Member)
                .or_default()
                .insert(name.to_string(), Handler::Member(handler));
        }
        registry
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn register<S: Into<String>>(&mut self, name: S, handler: Handler) -> EvalResult<()> {
        let name = name.into();
        let kind = handler.kind();
        let table = self.tables.entry(kind).or_default();
        if table.contains_key(&name) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    warn!("rejected duplicate {} `{}`", kind, name);
                    return Err(EvalError::DuplicateRegistration { kind, name });
                }
                DuplicatePolicy::Replace => debug!("replacing {} `{}`", kind, name),
            }
        }
        table.insert(name, handler);
        Ok(())
    }

    pub fn register_constructor<S, F>(&mut self, name: S, handler: F) -> EvalResult<()>
    where
        S: Into<String>,
        F: Fn(&[ResolvedArgument]) -> EvalResult<Artifact> + 'static,
    {
        self.register(name, Handler::Constructor(Rc::new(handler)))
    }

    pub fn register_decorator<S, F>(&mut self, name: S, handler: F) -> EvalResult<()>
    where
        S: Into<String>,
        F: Fn(&[ResolvedArgument], Artifact) -> EvalResult<Artifact> + 'static,
    {
        self.register(name, Handler::Decorator(Rc::new(handler)))
    }

    pub fn register_member<S, F>(&mut self, name: S, handler: F) -> EvalResult<()>
    where
        S: Into<String>,
        F: Fn(&mut MemberCall<'_>) -> EvalResult<Value> + 'static,
    {
        self.register(name, Handler::Member(Rc::new(handler)))
    }

    pub fn constructor(&self, name: &str) -> EvalResult<ConstructorFn> {
        match self.lookup(HandlerKind::Constructor, name) {
            Some(Handler::Constructor(handler)) => Ok(handler.clone()),
            _ => Err(EvalError::UnknownConstructor(name.to_string())),
        }
    }

    pub fn decorator(&self, name: &str) -> EvalResult<DecoratorFn> {
        match self.lookup(HandlerKind::Decorator, name) {
            Some(Handler::Decorator(handler)) => Ok(handler.clone()),
            _ => Err(EvalError::UnsupportedModifier(name.to_string())),
        }
    }

    pub fn member(&self, name: &str) -> EvalResult<MemberFn> {
        match self.lookup(HandlerKind::Member, name) {
            Some(Handler::Member(handler)) => Ok(handler.clone()),
            _ => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }

    pub fn contains(&self, kind: HandlerKind, name: &str) -> bool {
        self.lookup(kind, name).is_some()
    }

    /// Registered names of one kind, sorted
    pub fn names(&self, kind: HandlerKind) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .tables
            .get(&kind)
            .map(|table| table.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    fn lookup(&self, kind: HandlerKind, name: &str) -> Option<&Handler> {
        self.tables.get(&kind)?.get(name)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn tag(name: &'static str) -> impl Fn(&[ResolvedArgument]) -> EvalResult<Artifact> {
        move |_| Ok(Artifact::new(name))
    }

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        let mut registry = Registry::default();
        registry.register_constructor("Text", tag("Text")).unwrap();
        assert!(registry.constructor("Text").is_ok());
        assert_eq!(
            registry.constructor("text").err(),
            Some(EvalError::UnknownConstructor("text".to_string()))
        );
        assert!(registry.constructor("Tex").is_err());
    }

    #[test]
    fn test_kinds_are_separate_tables() {
        let mut registry = Registry::default();
        registry.register_constructor("bold", tag("bold")).unwrap();
        registry
            .register_decorator("bold", |_, artifact| Ok(artifact))
            .unwrap();
        assert_eq!(
            registry.member("bold").err(),
            Some(EvalError::UnknownFunction("bold".to_string()))
        );
        assert_eq!(
            registry.decorator("italic").err(),
            Some(EvalError::UnsupportedModifier("italic".to_string()))
        );
    }

    #[test]
    fn test_duplicate_rejected_by_default() {
        let mut registry = Registry::default();
        registry.register_constructor("Text", tag("first")).unwrap();
        let err = registry.register_constructor("Text", tag("second")).unwrap_err();
        assert_eq!(
            err,
            EvalError::DuplicateRegistration {
                kind: HandlerKind::Constructor,
                name: "Text".to_string()
            }
        );
        let artifact = registry.constructor("Text").unwrap()(&[]).unwrap();
        assert_eq!(artifact.downcast_ref::<&str>(), Some(&"first"));
    }

    #[test]
    fn test_duplicate_replaced_when_configured() {
        let mut registry = Registry::new(DuplicatePolicy::Replace);
        registry.register_constructor("Text", tag("first")).unwrap();
        registry.register_constructor("Text", tag("second")).unwrap();
        let artifact = registry.constructor("Text").unwrap()(&[]).unwrap();
        assert_eq!(artifact.downcast_ref::<&str>(), Some(&"second"));
    }

    #[test]
    fn test_builtin_member_functions() {
        let registry = Registry::with_builtins(DuplicatePolicy::Reject);
        assert_eq!(
            registry.names(HandlerKind::Member),
            vec!["contains", "shuffle", "shuffled"]
        );
        for kind in HandlerKind::iter().filter(|kind| *kind != HandlerKind::Member) {
            assert!(registry.names(kind).is_empty());
        }
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(HandlerKind::Member.to_string(), "Member function");
        assert_eq!(HandlerKind::Decorator.to_string(), "Decorator");
    }
}
