//! Logger contract and recovery policy
//!
//! The broker never decides on its own whether an execution-time failure may
//! be swallowed: every registered logger must record the error and report
//! success. The aggregate is an explicit [`RecoveryDecision`] evaluated in
//! ordinary control flow.

use std::sync::Arc;

use crate::connection::TransactionHandle;
use crate::error::Error;

/// External logging contract consumed by the broker.
///
/// `write_log` must return `true` to signal the error was durably recorded;
/// a `false` (or a panic-free failure to record) keeps the error propagating.
pub trait ExceptionLogger: Send + Sync {
    /// Record an error outside any transaction
    fn write_log(&self, error: &Error) -> bool;

    /// Record an error raised while a transaction was active
    fn write_log_in_transaction(&self, error: &Error, _transaction: &TransactionHandle) -> bool {
        self.write_log(error)
    }
}

/// Outcome of the recovery policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    /// Every logger recorded the error; it may be suppressed
    Swallow,
    /// At least one logger failed, or no logger is registered
    Propagate,
}

/// Fan the error out to every logger and combine the results with logical
/// AND. An empty logger set propagates.
pub fn decide(
    loggers: &[Arc<dyn ExceptionLogger>],
    error: &Error,
    transaction: Option<&TransactionHandle>,
) -> RecoveryDecision {
    if loggers.is_empty() {
        return RecoveryDecision::Propagate;
    }

    let mut recorded = true;
    for logger in loggers {
        // Every logger runs, independent of earlier outcomes.
        recorded &= match transaction {
            Some(tx) => logger.write_log_in_transaction(error, tx),
            None => logger.write_log(error),
        };
    }

    if recorded {
        RecoveryDecision::Swallow
    } else {
        RecoveryDecision::Propagate
    }
}

/// Reference logger that records through `tracing` and always reports
/// success.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ExceptionLogger for TracingLogger {
    fn write_log(&self, error: &Error) -> bool {
        tracing::error!(error = %error, category = %error.category(), "repository call failed");
        true
    }

    fn write_log_in_transaction(&self, error: &Error, transaction: &TransactionHandle) -> bool {
        tracing::error!(
            error = %error,
            category = %error.category(),
            connection_id = transaction.connection_id(),
            "repository call failed in transaction"
        );
        true
    }
}
