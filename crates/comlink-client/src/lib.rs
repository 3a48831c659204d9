// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Public facade (spec §6): `Client(config, superJson?, external-interfaces)`,
//! `Client.getProfile`, `Profile.getUseCase`, `UseCase.perform`.
//!
//! This crate is the composition root: every other crate in the
//! workspace is a collaborator assembled here, wiring the registry
//! client, policy engine, and telemetry into one orchestrator a caller
//! constructs once and drives through a small surface.

mod client;
mod error;
mod manifest;
mod profile;
mod usecase;

pub use client::Client;
pub use error::ClientError;
pub use manifest::{
    BackoffManifest, PolicyManifest, ProfileManifest, SafetyManifest, SuperJson, UseCaseManifest,
};
pub use profile::Profile;
pub use usecase::UseCase;

pub use comlink_runtime::PerformOptions;
