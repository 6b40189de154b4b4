//! Store lifecycle: `Uninitialized -> Ready -> Closed`.

use serde::Serialize;

use crate::error::StorageError;

/// Observable lifecycle state of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StoreState {
    Uninitialized,
    Ready,
    Closed,
}

/// Lifecycle slot holding the backend handle while the store is `Ready`.
pub(crate) enum Lifecycle<H> {
    Uninitialized,
    Ready(H),
    Closed,
}

impl<H> Lifecycle<H> {
    pub(crate) fn state(&self) -> StoreState {
        match self {
            Lifecycle::Uninitialized => StoreState::Uninitialized,
            Lifecycle::Ready(_) => StoreState::Ready,
            Lifecycle::Closed => StoreState::Closed,
        }
    }

    /// The live handle, or the lifecycle fault explaining why there is none.
    pub(crate) fn ready(&self) -> Result<&H, StorageError> {
        match self {
            Lifecycle::Ready(handle) => Ok(handle),
            Lifecycle::Uninitialized => Err(StorageError::NotInitialized),
            Lifecycle::Closed => Err(StorageError::Closed),
        }
    }

    pub(crate) fn ready_mut(&mut self) -> Result<&mut H, StorageError> {
        match self {
            Lifecycle::Ready(handle) => Ok(handle),
            Lifecycle::Uninitialized => Err(StorageError::NotInitialized),
            Lifecycle::Closed => Err(StorageError::Closed),
        }
    }

    /// Checks that `init` may run; only an uninitialized store can be initialized.
    pub(crate) fn ensure_uninitialized(&self) -> Result<(), StorageError> {
        match self {
            Lifecycle::Uninitialized => Ok(()),
            Lifecycle::Ready(_) => Err(StorageError::AlreadyInitialized),
            Lifecycle::Closed => Err(StorageError::Closed),
        }
    }

    /// Moves to `Closed`, handing back the handle if there was one.
    pub(crate) fn close(&mut self) -> Option<H> {
        match std::mem::replace(self, Lifecycle::Closed) {
            Lifecycle::Ready(handle) => Some(handle),
            _ => None,
        }
    }
}
