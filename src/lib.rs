//! # viewchain: call-chain evaluation for declarative UI previews
//!
//! viewchain interprets a small expression language shaped like a
//! declarative UI builder, `Text("hi").font(.title).padding(8)`, and turns
//! it into host artifacts through registered handlers.
//!
//! ## Processing pipeline
//!
//! ```text
//! Source → Parser → Expression → Chain parser → Resolver → Handlers → Artifact
//! ```
//!
//! - [`parser`] turns source text into an [`ast::Expression`].
//! - [`chain`] recognises the construction shape: one constructor call and
//!   the ordered modifiers applied to it.
//! - [`eval`] resolves arguments against the [`scope`] chain and the
//!   built-in [`types`], then folds the chain through the [`registry`].
//! - [`host`] ships a recording host that renders artifacts as text.
//!
//! ## Example
//!
//! ```
//! use viewchain::{host, Interpreter};
//!
//! let mut interpreter = Interpreter::default();
//! host::install_defaults(interpreter.registry_mut()).unwrap();
//! let artifact = interpreter.render_source(r#"Text("hi").font(.title)"#).unwrap();
//! let view = artifact.downcast_ref::<host::DescribedView>().unwrap();
//! assert_eq!(view.to_string(), r#"Text("hi").font(.title)"#);
//! ```

pub mod ast;
pub mod chain;
pub mod config;
pub mod error;
pub mod eval;
pub mod host;
pub mod parser;
pub mod registry;
pub mod scope;
pub mod types;
pub mod value;

// Re-exports
pub use config::EngineConfig;
pub use error::*;
pub use eval::Interpreter;
pub use parser::{parse_expression, SyntaxError};
pub use registry::{HandlerKind, Registry};
pub use scope::{ScopeId, Scopes};
pub use value::{Artifact, ResolvedArgument, Value};

#[cfg(test)]
mod tests {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    #[ctor::ctor]
    fn init_tests() {
        // once per test binary; RUST_LOG picks the level
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}
