// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Use-case driver: binds a profile+provider against the registry, runs
//! the interpreter, and drives the failure policy router's retry and
//! failover decisions around each attempt (spec §4.5).
//!
//! This crate is the one place every other collaborator crate in the
//! workspace meets: `comlink-registry` resolves bindings, `comlink-http`
//! executes requests, `comlink-sandbox` evaluates expressions,
//! `comlink-interpreter` walks the map AST, `comlink-policy` decides
//! retries/failover, and `comlink-events` carries the whole thing's
//! telemetry. Nothing here re-implements what those crates already do;
//! this crate only wires them together the way spec §4.5 describes.

mod cache;
mod fetch_hook;
mod provider;
mod timers;
mod usecase;

pub use cache::{CacheKey, ProfileProviderCache};
pub use fetch_hook::EventedHttpExecutor;
pub use provider::{translate_provider, BoundSecurityProvider};
pub use timers::{ManualTimers, SystemTimers, Timers};
pub use usecase::{PerformOptions, UseCaseDriver, UseCaseDriverConfig};
