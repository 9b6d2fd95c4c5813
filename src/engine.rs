//! Invocation engine
//!
//! Ties the pieces together for one repository instance: resolve the method
//! descriptor, validate the arguments, select the execution plan, then hand
//! the broker a unit of work that binds, executes and materializes. Output
//! values are written back into the caller's argument slots only after the
//! work completed.

use std::sync::Arc;
use std::time::Duration;

use crate::broker::{BrokerOutcome, DbAccess};
use crate::call::{CallArg, CallContext, CallOutcome, Stopwatch};
use crate::connection::{Connection, ConnectionProvider, TransactionHandle};
use crate::descriptor::{ContractDescriptor, MethodDescriptor};
use crate::error::{Error, Result};
use crate::logger::ExceptionLogger;
use crate::repository::{RepositoryOperations, TvpNameTemplate};
use crate::strategy;

/// Dynamic dispatch core behind a repository handle
pub(crate) struct RepositoryEngine {
    contract: Arc<ContractDescriptor>,
    broker: DbAccess,
    operations: RepositoryOperations,
    tvp_naming: TvpNameTemplate,
    external_transaction: Option<TransactionHandle>,
    use_transaction: bool,
    query_time: Option<Stopwatch>,
    total_time: Option<Stopwatch>,
}

impl RepositoryEngine {
    pub fn new(
        contract: Arc<ContractDescriptor>,
        provider: Arc<dyn ConnectionProvider>,
        settings_name: String,
        loggers: Vec<Arc<dyn ExceptionLogger>>,
    ) -> Self {
        Self {
            contract,
            broker: DbAccess::new(provider, settings_name, loggers),
            operations: RepositoryOperations::default(),
            tvp_naming: TvpNameTemplate::default(),
            external_transaction: None,
            use_transaction: false,
            query_time: None,
            total_time: None,
        }
    }

    /// Invoke a contract method with positional arguments
    pub fn invoke(&mut self, method_name: &str, args: &mut [CallArg]) -> Result<CallOutcome> {
        let contract = Arc::clone(&self.contract);
        let method = contract
            .find(method_name)
            .ok_or_else(|| Error::unknown_method(method_name))?;
        method.validate_args(args)?;
        self.reconcile_timers();

        if let Some(watch) = self.total_time.as_mut() {
            watch.start();
        }
        let result = self.dispatch(method, args);
        if let Some(watch) = self.total_time.as_mut() {
            watch.stop();
        }

        match result {
            Ok(outcome) => Ok(outcome),
            Err(error) if self.operations.contains(RepositoryOperations::IGNORE_EXCEPTION) => {
                tracing::warn!(
                    method = method_name,
                    error = %error,
                    "suppressing repository call failure"
                );
                Ok(CallOutcome::Suppressed)
            }
            Err(error) => Err(error),
        }
    }

    fn dispatch(&mut self, method: &MethodDescriptor, args: &mut [CallArg]) -> Result<CallOutcome> {
        let tvp_enabled = self
            .operations
            .contains(RepositoryOperations::USE_TABLE_VALUED_PARAMETER);
        // Ambiguous expansion fails here, before a connection is resolved.
        let plan = strategy::select_plan(method, args, tvp_enabled)?;
        let mut ctx = CallContext::new(method)?;

        let broker = &mut self.broker;
        let naming = &self.tvp_naming;
        let query_time = self.query_time.as_mut();
        let external_transaction = self.external_transaction;
        let use_transaction = self.use_transaction;

        let work_args: &[CallArg] = args;
        let brokered = broker.execute(
            external_transaction,
            use_transaction,
            |connection, command, transaction| {
                strategy::run(
                    &plan,
                    &mut ctx,
                    work_args,
                    connection,
                    transaction,
                    command,
                    tvp_enabled,
                    naming,
                    query_time,
                )
            },
        )?;

        match brokered {
            BrokerOutcome::Suppressed => Ok(CallOutcome::Suppressed),
            BrokerOutcome::Completed => {
                ctx.write_back(args);
                Ok(ctx.into_outcome())
            }
        }
    }

    /// Allocate or drop the elapsed-time counters to match the flags
    fn reconcile_timers(&mut self) {
        if self
            .operations
            .contains(RepositoryOperations::LOG_QUERY_EXECUTION_TIME)
        {
            if self.query_time.is_none() {
                self.query_time = Some(Stopwatch::default());
            }
        } else {
            self.query_time = None;
        }

        if self
            .operations
            .contains(RepositoryOperations::LOG_TOTAL_EXECUTION_TIME)
        {
            if self.total_time.is_none() {
                self.total_time = Some(Stopwatch::default());
            }
        } else {
            self.total_time = None;
        }
    }

    pub fn operations(&self) -> RepositoryOperations {
        self.operations
    }

    pub fn set_operations(&mut self, operations: RepositoryOperations) {
        self.operations = operations;
        self.reconcile_timers();
    }

    pub fn tvp_template(&self) -> &TvpNameTemplate {
        &self.tvp_naming
    }

    pub fn set_tvp_template(&mut self, template: TvpNameTemplate) {
        self.tvp_naming = template;
    }

    pub fn settings_name(&self) -> &str {
        self.broker.settings_name()
    }

    pub fn set_settings_name(&mut self, settings_name: String) -> Result<()> {
        self.broker.set_settings_name(settings_name)
    }

    pub fn connection(&self) -> Option<&dyn Connection> {
        self.broker.connection()
    }

    pub fn set_connection(&mut self, connection: Box<dyn Connection>) -> Result<()> {
        self.broker.set_connection(connection)
    }

    pub fn set_external_transaction(&mut self, transaction: Option<TransactionHandle>) {
        self.external_transaction = transaction;
    }

    pub fn use_transaction(&self) -> bool {
        self.use_transaction
    }

    pub fn set_use_transaction(&mut self, use_transaction: bool) {
        self.use_transaction = use_transaction;
    }

    pub fn total_execution_time(&self) -> Option<Duration> {
        self.total_time.as_ref().map(Stopwatch::elapsed)
    }

    pub fn query_execution_time(&self) -> Option<Duration> {
        self.query_time.as_ref().map(Stopwatch::elapsed)
    }

    /// Tear down the connection binding; the next call reconnects lazily
    pub fn dispose(&mut self) -> Result<()> {
        self.broker.teardown()
    }
}
