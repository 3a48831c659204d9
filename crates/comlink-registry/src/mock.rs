// SPDX-License-Identifier: MIT OR Apache-2.0
//! A canned-response [`RegistryClient`] for tests: a fixed-answer
//! stand-in so callers don't need a real registry to exercise the bind
//! path.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::client::{BindRequest, BindResponse, RegistryClient};
use crate::error::RegistryError;

fn key(request: &BindRequest) -> (String, String, Option<String>, Option<String>) {
    (
        request.profile_id.clone(),
        request.provider_name.clone(),
        request.map_variant.clone(),
        request.map_revision.clone(),
    )
}

/// Returns pre-programmed bind results instead of calling a real
/// registry.
///
/// Responses can be queued per exact `(profile, provider, variant,
/// revision)` key (consumed in FIFO order, for tests that bind the same
/// key more than once and expect different answers each time — e.g.
/// "first bind succeeds, second bind after eviction returns a fresh
/// map"), or a single fallback applies to every key that has no queue of
/// its own.
#[derive(Default)]
pub struct MockRegistryClient {
    queued: Mutex<BTreeMap<(String, String, Option<String>, Option<String>), VecDeque<Result<BindResponse, RegistryError>>>>,
    fallback: Mutex<Option<Result<BindResponse, RegistryError>>>,
}

impl MockRegistryClient {
    /// An empty mock: every bind fails with `RegistryError::MissingMap`
    /// unless a response is queued first.
    #[must_use]
    pub fn new() -> Self {
        MockRegistryClient::default()
    }

    /// Queue `response` to be returned the next time `request` is bound.
    pub fn queue(&self, request: &BindRequest, response: Result<BindResponse, RegistryError>) {
        self.queued
            .lock()
            .expect("mock registry mutex poisoned")
            .entry(key(request))
            .or_default()
            .push_back(response);
    }

    /// Set the response returned for any bind with no queued entry.
    pub fn set_fallback(&self, response: Result<BindResponse, RegistryError>) {
        *self.fallback.lock().expect("mock registry mutex poisoned") = Some(response);
    }
}

#[async_trait]
impl RegistryClient for MockRegistryClient {
    async fn bind(&self, request: &BindRequest) -> Result<BindResponse, RegistryError> {
        let queued = {
            let mut queued = self.queued.lock().expect("mock registry mutex poisoned");
            queued.get_mut(&key(request)).and_then(VecDeque::pop_front)
        };
        if let Some(response) = queued {
            return response;
        }
        if let Some(response) = self.fallback.lock().expect("mock registry mutex poisoned").as_ref() {
            return clone_result(response);
        }
        Err(RegistryError::MissingMap { usecase: request.provider_name.clone() })
    }
}

fn clone_result(result: &Result<BindResponse, RegistryError>) -> Result<BindResponse, RegistryError> {
    match result {
        Ok(response) => Ok(response.clone()),
        Err(error) => Err(RegistryError::Http {
            status_code: 0,
            title: error.to_string(),
            detail: None,
        }),
    }
}
