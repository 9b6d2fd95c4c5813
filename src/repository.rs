//! Repository surface and factory
//!
//! A [`Repository`] is the caller-facing handle: one contract, one engine,
//! one connection binding. [`DynamicRepository`] builds them. Behaviour is
//! tuned per instance through [`RepositoryOperations`] flags and the
//! table-valued parameter naming template.

use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;

use crate::call::{CallArg, CallOutcome};
use crate::connection::{Connection, ConnectionProvider, TransactionHandle};
use crate::descriptor::ContractDescriptor;
use crate::engine::RepositoryEngine;
use crate::entity::Entity;
use crate::error::Result;
use crate::logger::ExceptionLogger;

bitflags! {
    /// Per-instance behaviour switches, changeable between calls
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RepositoryOperations: u8 {
        /// Project collection arguments into table-valued parameters
        const USE_TABLE_VALUED_PARAMETER = 1;
        /// Accumulate wall-clock time across whole invocations
        const LOG_TOTAL_EXECUTION_TIME = 1 << 1;
        /// Accumulate wall-clock time spent inside driver executions
        const LOG_QUERY_EXECUTION_TIME = 1 << 2;
        /// Suppress call failures, returning [`CallOutcome::Suppressed`]
        const IGNORE_EXCEPTION = 1 << 3;

        /// Both time counters, nothing else
        const TIME_LOGGER_ONLY =
            Self::LOG_TOTAL_EXECUTION_TIME.bits() | Self::LOG_QUERY_EXECUTION_TIME.bits();
        /// Every switch
        const ALL = Self::USE_TABLE_VALUED_PARAMETER.bits()
            | Self::LOG_TOTAL_EXECUTION_TIME.bits()
            | Self::LOG_QUERY_EXECUTION_TIME.bits()
            | Self::IGNORE_EXCEPTION.bits();
    }
}

/// Naming template for table-valued parameters.
///
/// `{type}` is replaced by the collection element type name; the default
/// template is `{type}TVP`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TvpNameTemplate(String);

impl Default for TvpNameTemplate {
    fn default() -> Self {
        Self("{type}TVP".to_owned())
    }
}

impl TvpNameTemplate {
    /// Create a template; `{type}` marks the element type name
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// The raw template text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Produce the parameter name for an element type
    pub fn render(&self, element_type: &str) -> String {
        self.0.replace("{type}", element_type)
    }
}

/// Caller-facing repository handle.
///
/// Owns exactly one engine and, transitively, one connection binding. Calls
/// take `&mut self`; concurrent use of one instance is not supported.
pub struct Repository {
    engine: RepositoryEngine,
}

impl Repository {
    pub(crate) fn from_engine(engine: RepositoryEngine) -> Self {
        Self { engine }
    }

    /// Invoke a contract method.
    ///
    /// Output and input/output arguments are written back in place after a
    /// successful execution.
    pub fn invoke(&mut self, method: &str, args: &mut [CallArg]) -> Result<CallOutcome> {
        self.engine.invoke(method, args)
    }

    /// Invoke a rowset-returning method and materialize typed entities
    pub fn fetch_all<E: Entity>(&mut self, method: &str, args: &mut [CallArg]) -> Result<Vec<E>> {
        self.engine.invoke(method, args)?.into_entities()
    }

    /// Invoke an entity-returning method and materialize the typed result
    pub fn fetch_one<E: Entity>(&mut self, method: &str, args: &mut [CallArg]) -> Result<E> {
        self.engine.invoke(method, args)?.into_entity()
    }

    /// Current operation flags
    pub fn operations(&self) -> RepositoryOperations {
        self.engine.operations()
    }

    /// Replace the operation flags; takes effect on the next call
    pub fn set_operations(&mut self, operations: RepositoryOperations) {
        self.engine.set_operations(operations);
    }

    /// Current table-valued parameter naming template
    pub fn tvp_template(&self) -> &TvpNameTemplate {
        self.engine.tvp_template()
    }

    /// Replace the table-valued parameter naming template
    pub fn set_tvp_template(&mut self, template: TvpNameTemplate) {
        self.engine.set_tvp_template(template);
    }

    /// Name of the configuration entry the connection is created from
    pub fn settings_name(&self) -> &str {
        self.engine.settings_name()
    }

    /// Switch to a different configuration entry.
    ///
    /// The held connection is torn down; the next call opens lazily against
    /// the new entry.
    pub fn set_settings_name(&mut self, settings_name: impl Into<String>) -> Result<()> {
        self.engine.set_settings_name(settings_name.into())
    }

    /// The live connection, if one is currently held
    pub fn connection(&self) -> Option<&dyn Connection> {
        self.engine.connection()
    }

    /// Hand the repository an externally owned connection.
    ///
    /// It is used in place of a provider-created one, reopened when broken
    /// or closed, and never closed by the repository.
    pub fn set_connection(&mut self, connection: Box<dyn Connection>) -> Result<()> {
        self.engine.set_connection(connection)
    }

    /// Join an externally begun transaction.
    ///
    /// The handle must belong to the connection the repository resolves;
    /// a mismatch fails the next call before any work runs.
    pub fn join_transaction(&mut self, transaction: TransactionHandle) {
        self.engine.set_external_transaction(Some(transaction));
    }

    /// Detach from a previously joined transaction
    pub fn leave_transaction(&mut self) {
        self.engine.set_external_transaction(None);
    }

    /// Whether calls without an external transaction run inside one begun
    /// and committed by the broker
    pub fn use_transaction(&self) -> bool {
        self.engine.use_transaction()
    }

    /// Set whether the broker wraps calls in its own transaction
    pub fn set_use_transaction(&mut self, use_transaction: bool) {
        self.engine.set_use_transaction(use_transaction);
    }

    /// Accumulated whole-invocation time, when the counter is active
    pub fn total_execution_time(&self) -> Option<Duration> {
        self.engine.total_execution_time()
    }

    /// Accumulated in-driver execution time, when the counter is active
    pub fn query_execution_time(&self) -> Option<Duration> {
        self.engine.query_execution_time()
    }

    /// Tear down the connection binding.
    ///
    /// Idempotent; the repository stays usable and reconnects lazily.
    pub fn dispose(&mut self) -> Result<()> {
        self.engine.dispose()
    }
}

impl Drop for Repository {
    fn drop(&mut self) {
        if let Err(error) = self.engine.dispose() {
            tracing::debug!(error = %error, "connection teardown on drop failed");
        }
    }
}

/// Factory for dynamic repositories
pub struct DynamicRepository;

impl DynamicRepository {
    /// Build a repository over a contract, provider and configuration entry
    pub fn create(
        contract: ContractDescriptor,
        provider: Arc<dyn ConnectionProvider>,
        settings_name: impl Into<String>,
    ) -> Repository {
        Self::create_with_loggers(contract, provider, settings_name, Vec::new())
    }

    /// Build a repository with exception loggers driving the broker's
    /// recovery policy
    pub fn create_with_loggers(
        contract: ContractDescriptor,
        provider: Arc<dyn ConnectionProvider>,
        settings_name: impl Into<String>,
        loggers: Vec<Arc<dyn ExceptionLogger>>,
    ) -> Repository {
        Repository::from_engine(RepositoryEngine::new(
            Arc::new(contract),
            provider,
            settings_name.into(),
            loggers,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_flag_composition() {
        let ops = RepositoryOperations::TIME_LOGGER_ONLY;
        assert!(ops.contains(RepositoryOperations::LOG_TOTAL_EXECUTION_TIME));
        assert!(ops.contains(RepositoryOperations::LOG_QUERY_EXECUTION_TIME));
        assert!(!ops.contains(RepositoryOperations::USE_TABLE_VALUED_PARAMETER));
        assert!(!ops.contains(RepositoryOperations::IGNORE_EXCEPTION));

        assert_eq!(RepositoryOperations::ALL.bits(), 0b1111);
        assert!(RepositoryOperations::default().is_empty());
    }

    #[test]
    fn test_tvp_template_rendering() {
        assert_eq!(TvpNameTemplate::default().render("User"), "UserTVP");
        assert_eq!(
            TvpNameTemplate::new("tvp_{type}").render("Order"),
            "tvp_Order"
        );
        assert_eq!(TvpNameTemplate::new("Fixed").render("User"), "Fixed");
    }
}
