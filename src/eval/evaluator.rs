use rand::{rngs::StdRng, RngCore, SeedableRng};
use tracing::{debug, instrument};

use crate::ast::Expression;
use crate::chain::{self, ViewNode};
use crate::config::EngineConfig;
use crate::parser::parse_expression;
use crate::registry::Registry;
use crate::scope::{ScopeId, Scopes};
use crate::types::{builtin_types, RuntimeType};
use crate::value::{Artifact, InstanceRef, Value};
use crate::{EvalResult, ViewchainResult};

use std::rc::Rc;

/// The evaluation engine: one scope arena, one handler registry, one RNG.
///
/// Evaluation is synchronous; each call to [`Interpreter::render`] or
/// [`Interpreter::evaluate`] runs to completion before returning.
pub struct Interpreter {
    pub(crate) scopes: Scopes,
    pub(crate) registry: Registry,
    pub(crate) rng: Box<dyn RngCore>,
    config: EngineConfig,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Interpreter {
    /// An interpreter whose registry holds only the built-in member functions
    pub fn new(config: EngineConfig) -> Self {
        let registry = Registry::with_builtins(config.duplicate_registration);
        Self::with_registry(config, registry)
    }

    pub fn with_registry(config: EngineConfig, registry: Registry) -> Self {
        let rng: Box<dyn RngCore> = match config.shuffle_seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(StdRng::from_entropy()),
        };
        let types = builtin_types().into_iter().map(|definition| {
            let name = definition.name();
            (name, Value::Type(Rc::new(RuntimeType::from_definition(definition))))
        });
        let scopes = Scopes::with_globals(config.assignment, types);
        Self {
            scopes,
            registry,
            rng,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn global(&self) -> ScopeId {
        self.scopes.global()
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    pub fn scopes_mut(&mut self) -> &mut Scopes {
        &mut self.scopes
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Swap the randomness source used by `shuffle`/`shuffled`.
    pub fn set_rng<R: RngCore + 'static>(&mut self, rng: R) {
        self.rng = Box::new(rng);
    }

    /// Create an instance scope holding `members`, parented to the global
    /// scope so its functions can see built-ins.
    pub fn new_instance<I, S>(&mut self, members: I) -> EvalResult<InstanceRef>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let global = self.global();
        let instance = self.scopes.new_instance(Some(global))?;
        for (name, value) in members {
            self.scopes.define(instance.scope(), name, value)?;
        }
        Ok(instance)
    }

    /// Constant member of a global type, e.g. `("Color", "mint")`.
    pub fn type_member(&self, type_name: &str, member: &str) -> Option<Value> {
        match self.scopes.get(self.global(), type_name)? {
            Value::Type(ty) => ty.member(member).cloned(),
            _ => None,
        }
    }

    /// Parse and render a view chain in the global scope.
    pub fn render_source(&mut self, source: &str) -> ViewchainResult<Artifact> {
        let expr = parse_expression(source)?;
        let global = self.global();
        Ok(self.render(&expr, global)?)
    }

    /// Parse and evaluate a value expression in `scope`.
    pub fn evaluate_source(&mut self, source: &str, scope: ScopeId) -> ViewchainResult<Value> {
        let expr = parse_expression(source)?;
        Ok(self.evaluate(&expr, scope)?)
    }

    /// Build the artifact for a construction chain.
    ///
    /// All or nothing: the first failure is returned and no partial artifact
    /// escapes. Side effects of argument evaluation that already happened
    /// (e.g. a `shuffle` write-back) are not rolled back.
    #[instrument(level = "debug", skip(self, expr), fields(expr = %expr))]
    pub fn render(&mut self, expr: &Expression, scope: ScopeId) -> EvalResult<Artifact> {
        let node = chain::parse(expr)?;
        self.render_node(&node, scope)
    }

    pub fn render_node(&mut self, node: &ViewNode, scope: ScopeId) -> EvalResult<Artifact> {
        let constructor = self.registry.constructor(&node.constructor.name)?;
        let arguments = self.resolve_arguments(&node.constructor.arguments, scope)?;
        debug!(
            "constructing {} with {} argument(s)",
            node.constructor.name,
            arguments.len()
        );
        let mut artifact = constructor(&arguments)?;

        for modifier in &node.modifiers {
            let decorator = self.registry.decorator(&modifier.name)?;
            let arguments = self.resolve_arguments(&modifier.arguments, scope)?;
            debug!("applying .{} with {} argument(s)", modifier.name, arguments.len());
            artifact = decorator(&arguments, artifact)?;
        }
        Ok(artifact)
    }
}
