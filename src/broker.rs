//! Connection and transaction broker
//!
//! One broker holds the connection binding of one repository instance: a
//! connection created lazily from the provider (or adopted from the caller),
//! cached across calls, and torn down only on dispose or when the settings
//! entry changes. Every unit of work runs through [`DbAccess::execute`],
//! which resolves the connection, enforces transaction ownership, and
//! applies the logger-gated recovery policy on failure.

use std::sync::Arc;

use crate::command::Command;
use crate::connection::{Connection, ConnectionProvider, TransactionHandle};
use crate::error::{Error, Result};
use crate::logger::{self, ExceptionLogger, RecoveryDecision};

/// How a brokered unit of work ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerOutcome {
    /// The work ran to completion
    Completed,
    /// The work failed and every logger recorded the error
    Suppressed,
}

struct CachedConnection {
    connection: Box<dyn Connection>,
    /// Created by the provider, as opposed to adopted from the caller.
    /// Only owned connections are closed on teardown.
    owned: bool,
}

struct Failure {
    error: Error,
    /// Transaction active when the work failed
    transaction: Option<TransactionHandle>,
    /// Whether that transaction was supplied by the caller
    external: bool,
}

/// Connection and transaction broker for one repository instance
pub struct DbAccess {
    provider: Arc<dyn ConnectionProvider>,
    settings_name: String,
    loggers: Vec<Arc<dyn ExceptionLogger>>,
    cached: Option<CachedConnection>,
}

impl DbAccess {
    /// Create a broker with no live connection
    pub fn new(
        provider: Arc<dyn ConnectionProvider>,
        settings_name: String,
        loggers: Vec<Arc<dyn ExceptionLogger>>,
    ) -> Self {
        Self {
            provider,
            settings_name,
            loggers,
            cached: None,
        }
    }

    /// Name of the configuration entry connections are created from
    pub fn settings_name(&self) -> &str {
        &self.settings_name
    }

    /// Switch the configuration entry, tearing down the held connection
    pub fn set_settings_name(&mut self, settings_name: String) -> Result<()> {
        self.teardown()?;
        self.settings_name = settings_name;
        Ok(())
    }

    /// The held connection, if any
    pub fn connection(&self) -> Option<&dyn Connection> {
        self.cached.as_ref().map(|entry| entry.connection.as_ref())
    }

    /// Adopt a caller-owned connection in place of a provider-created one.
    ///
    /// Adopted connections are reopened when broken or closed, but never
    /// closed by the broker.
    pub fn set_connection(&mut self, connection: Box<dyn Connection>) -> Result<()> {
        self.teardown()?;
        self.cached = Some(CachedConnection {
            connection,
            owned: false,
        });
        Ok(())
    }

    /// Run one unit of work against the resolved connection.
    ///
    /// An external transaction handle must belong to the resolved connection;
    /// the mismatch check runs before any work. Without one, a broker-owned
    /// transaction is begun when `use_transaction` is set, committed after
    /// successful work and rolled back on failure. Recoverable failures pass
    /// through the logger gate; a swallow rolls back any still-active
    /// transaction and reports [`BrokerOutcome::Suppressed`].
    pub fn execute<F>(
        &mut self,
        external_transaction: Option<TransactionHandle>,
        use_transaction: bool,
        work: F,
    ) -> Result<BrokerOutcome>
    where
        F: FnOnce(&mut dyn Connection, &mut Command, Option<TransactionHandle>) -> Result<()>,
    {
        let failure = match self.attempt(external_transaction, use_transaction, work) {
            Ok(()) => return Ok(BrokerOutcome::Completed),
            Err(failure) => failure,
        };

        if !failure.error.is_recoverable() {
            return Err(failure.error);
        }

        match logger::decide(&self.loggers, &failure.error, failure.transaction.as_ref()) {
            RecoveryDecision::Swallow => {
                // Broker-owned transactions were already rolled back on the
                // failure path; an external one is rolled back only here.
                if failure.external {
                    if let (Some(tx), Some(entry)) = (failure.transaction, self.cached.as_mut()) {
                        entry.connection.rollback(tx)?;
                    }
                }
                Ok(BrokerOutcome::Suppressed)
            }
            RecoveryDecision::Propagate => Err(failure.error),
        }
    }

    /// Close and drop the held connection.
    ///
    /// Adopted connections are dropped without `close()`. Idempotent.
    pub fn teardown(&mut self) -> Result<()> {
        if let Some(mut entry) = self.cached.take() {
            if entry.owned {
                entry.connection.close()?;
            }
        }
        Ok(())
    }

    fn attempt<F>(
        &mut self,
        external_transaction: Option<TransactionHandle>,
        use_transaction: bool,
        work: F,
    ) -> std::result::Result<(), Failure>
    where
        F: FnOnce(&mut dyn Connection, &mut Command, Option<TransactionHandle>) -> Result<()>,
    {
        let entry = match self.ensure_connection() {
            Ok(entry) => entry,
            Err(error) => {
                return Err(Failure {
                    error,
                    transaction: None,
                    external: false,
                })
            }
        };

        if let Some(tx) = external_transaction {
            if tx.connection_id() != entry.connection.connection_id() {
                return Err(Failure {
                    error: Error::TransactionMismatch,
                    transaction: Some(tx),
                    external: true,
                });
            }
        }

        let owned_transaction = if external_transaction.is_none() && use_transaction {
            match entry.connection.begin_transaction() {
                Ok(tx) => Some(tx),
                Err(error) => {
                    return Err(Failure {
                        error,
                        transaction: None,
                        external: false,
                    })
                }
            }
        } else {
            None
        };
        let active = external_transaction.or(owned_transaction);

        let mut command = Command::new();
        match work(entry.connection.as_mut(), &mut command, active) {
            Ok(()) => {
                if let Some(tx) = owned_transaction {
                    if let Err(error) = entry.connection.commit(tx) {
                        // The transaction must not stay open; the commit
                        // failure is the one reported.
                        if let Err(rollback_error) = entry.connection.rollback(tx) {
                            tracing::debug!(
                                error = %rollback_error,
                                "rollback after failed commit also failed"
                            );
                        }
                        return Err(Failure {
                            error,
                            transaction: Some(tx),
                            external: false,
                        });
                    }
                }
                Ok(())
            }
            Err(error) => {
                if let Some(tx) = owned_transaction {
                    // The work's failure is the one reported.
                    if let Err(rollback_error) = entry.connection.rollback(tx) {
                        tracing::debug!(
                            error = %rollback_error,
                            "rollback after failed unit of work also failed"
                        );
                    }
                }
                Err(Failure {
                    error,
                    transaction: active,
                    external: external_transaction.is_some(),
                })
            }
        }
    }

    /// Resolve the cached connection, creating it from the provider when
    /// absent and reopening it when broken or closed.
    fn ensure_connection(&mut self) -> Result<&mut CachedConnection> {
        if self.cached.is_none() {
            tracing::debug!(settings = %self.settings_name, "creating connection");
            let connection = self.provider.create(&self.settings_name)?;
            self.cached = Some(CachedConnection {
                connection,
                owned: true,
            });
        }

        let entry = self
            .cached
            .as_mut()
            .ok_or_else(|| Error::connection("connection cache empty after creation"))?;
        if entry.connection.state().needs_open() {
            entry.connection.open()?;
        }
        Ok(entry)
    }
}
