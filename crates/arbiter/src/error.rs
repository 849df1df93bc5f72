// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArbiterError {
    #[error("namespace lock wait timed out after {0:?}")]
    LockWaitTimeout(std::time::Duration),

    #[error("token wait timed out after {0:?}")]
    TokenWaitTimeout(std::time::Duration),

    #[error("cancelled while waiting")]
    Cancelled,
}
