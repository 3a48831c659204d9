// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lifecycle hooks for binary data handles embedded in a [`crate::Variable`] tree.

use async_trait::async_trait;

/// Errors raised by a [`BinaryData`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum BinaryDataError {
    /// The handle could not be initialized (e.g. the backing stream failed to open).
    #[error("failed to initialize binary data handle: {0}")]
    InitializeFailed(String),
    /// The handle could not be cleaned up.
    #[error("failed to destroy binary data handle: {0}")]
    DestroyFailed(String),
    /// The handle's full contents could not be materialized.
    #[error("failed to read binary data handle: {0}")]
    ReadFailed(String),
}

/// A handle to binary data (typically a streamed HTTP request/response body)
/// with explicit lifecycle management.
///
/// The interpreter calls [`initialize`](BinaryData::initialize) on every
/// binary handle reachable from a use-case's input before a perform begins,
/// and [`destroy`](BinaryData::destroy) on every handle reachable from the
/// input *after a successful* perform — error outcomes do not destroy their
/// input handles, since the caller still owns cleanup (spec §9 "Binary
/// data").
#[async_trait]
pub trait BinaryData: Send + Sync + std::fmt::Debug {
    /// Prepare the handle for use (e.g. open the underlying stream).
    async fn initialize(&self) -> Result<(), BinaryDataError>;

    /// Release any resources held by the handle.
    async fn destroy(&self) -> Result<(), BinaryDataError>;

    /// Materialize the handle's full contents into memory.
    ///
    /// Called during final outcome resolution to turn any still-streaming
    /// binary data reachable from the result into an in-memory
    /// [`crate::Variable::Bytes`] value.
    async fn get_all_data(&self) -> Result<Vec<u8>, BinaryDataError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Default)]
    pub struct InMemoryBinary {
        pub data: Vec<u8>,
        pub initialized: AtomicBool,
        pub destroyed: AtomicBool,
    }

    impl InMemoryBinary {
        pub fn new(data: impl Into<Vec<u8>>) -> Self {
            Self {
                data: data.into(),
                initialized: AtomicBool::new(false),
                destroyed: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl BinaryData for InMemoryBinary {
        async fn initialize(&self) -> Result<(), BinaryDataError> {
            self.initialized.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn destroy(&self) -> Result<(), BinaryDataError> {
            self.destroyed.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn get_all_data(&self) -> Result<Vec<u8>, BinaryDataError> {
            Ok(self.data.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::InMemoryBinary;
    use super::*;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn lifecycle_hooks_flip_flags() {
        let handle = InMemoryBinary::new(b"hello".to_vec());
        assert!(!handle.initialized.load(Ordering::SeqCst));
        handle.initialize().await.unwrap();
        assert!(handle.initialized.load(Ordering::SeqCst));

        let data = handle.get_all_data().await.unwrap();
        assert_eq!(data, b"hello");

        handle.destroy().await.unwrap();
        assert!(handle.destroyed.load(Ordering::SeqCst));
    }
}
