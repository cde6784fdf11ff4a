//! Evaluation engine
//!
//! Turns parsed expressions into values and construction chains into host
//! artifacts.
//!
//! # Components
//!
//! ## Interpreter
//! Owns the scope arena, the handler registry and the randomness source
//! used by `shuffle`. Drives rendering: one constructor call, then each
//! modifier folded over the artifact in source order.
//!
//! ## Expression resolver
//! Maps an expression to a [`crate::value::Value`]: literals, identifiers,
//! member paths against built-in types and instances, arrays, function
//! calls, member-function dispatch, and nested views.
//!
//! ## Collection member functions
//! `contains`, `shuffle` and `shuffled`, registered in every interpreter.
//!
//! # Failure model
//!
//! Evaluation is fail-fast. The first error aborts the top-level call and
//! propagates unchanged; writes already made by member functions stay.

pub mod collection;
pub mod evaluator;
pub mod expression;

pub use evaluator::Interpreter;
