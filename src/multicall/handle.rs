//! The result slot returned by [`super::MulticallBatch::call`].

use std::sync::{Arc, Mutex};

use alloy_dyn_abi::DynSolValue;

use crate::error::RpcClientError;

/// The resolved outcome of one batched call.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub success: bool,
    pub data: Option<DynSolValue>,
    pub revert_reason: Option<String>,
}

pub(crate) struct Slot(Mutex<Option<BatchResult>>);

impl Slot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(None)))
    }

    pub(crate) fn resolve(&self, result: BatchResult) {
        *self.0.lock().unwrap() = Some(result);
    }
}

/// A handle to one call recorded in a [`super::MulticallBatch`].
///
/// `pending` until the batch's `execute()` resolves it; reading `result()`
/// before resolution fails.
pub struct BatchHandle {
    slot: Arc<Slot>,
}

impl BatchHandle {
    pub(crate) fn new(slot: Arc<Slot>) -> Self {
        Self { slot }
    }

    pub fn result(&self) -> Result<BatchResult, RpcClientError> {
        self.slot
            .0
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RpcClientError::illegal_state("batch handle has not been resolved"))
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.0.lock().unwrap().is_some()
    }
}
