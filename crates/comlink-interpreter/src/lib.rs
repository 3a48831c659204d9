// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Tree-walking interpreter for Comlink Map AST documents.
//!
//! [`Interpreter`] runs a [`ast::MapDefinition`] against `{input,
//! parameters}`, dispatching `JessieExpression` evaluation to a
//! [`comlink_sandbox::Sandbox`] and HTTP calls to an [`collaborators::HttpExecutor`]
//! without depending on either crate concretely — see [`collaborators`] for
//! why.

pub mod ast;
pub mod collaborators;
mod driver;
mod outcome;
mod sync_eval;

pub use driver::Interpreter;
pub use outcome::Outcome;
