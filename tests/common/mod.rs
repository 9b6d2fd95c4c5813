//! Shared test harness: a scripted mock driver, a provider keyed by settings
//! name, and a recording exception logger.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sprocket::command::{Command, CommandParameter};
use sprocket::connection::{
    Connection, ConnectionProvider, ConnectionState, TransactionHandle,
};
use sprocket::error::{Error, Result};
use sprocket::impl_entity;
use sprocket::types::{Row, Value};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct User {
    pub id: i32,
    pub name: String,
}

impl_entity!(User { id: i32, name: String });

/// Which driver entry point an execution went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    NonQuery,
    Scalar,
    Query,
}

/// One recorded driver execution
#[derive(Debug, Clone)]
pub struct ExecutedCall {
    pub text: String,
    pub parameters: Vec<CommandParameter>,
    pub kind: CallKind,
    pub in_transaction: bool,
    pub prepared: bool,
}

impl ExecutedCall {
    pub fn parameter(&self, name: &str) -> Option<&CommandParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Scripted behaviour plus everything the mock driver observed
#[derive(Default)]
pub struct MockState {
    /// Rows returned by every query execution
    pub rows: Vec<Row>,
    /// Value returned by scalar executions
    pub scalar: Value,
    /// Output parameter values written back during execution, by name
    pub outputs: HashMap<String, Value>,
    /// Fail this many executions (recorded, then reported as driver errors)
    pub fail_executions: usize,
    /// Overrides the reported connection state until the next `open()`
    pub force_state: Option<ConnectionState>,

    pub executions: Vec<ExecutedCall>,
    pub created: usize,
    pub opens: usize,
    pub closes: usize,
    pub prepares: usize,
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
}

impl MockState {
    pub fn execution_count(&self) -> usize {
        self.executions.len()
    }
}

pub struct MockConnection {
    id: u64,
    state: ConnectionState,
    sequence: u64,
    shared: Arc<Mutex<MockState>>,
}

impl MockConnection {
    pub fn new(id: u64, shared: Arc<Mutex<MockState>>) -> Self {
        Self {
            id,
            state: ConnectionState::Closed,
            sequence: 0,
            shared,
        }
    }

    fn record(
        &mut self,
        command: &mut Command,
        transaction: Option<TransactionHandle>,
        kind: CallKind,
    ) -> Result<()> {
        let mut state = self.shared.lock().unwrap();

        // Drivers write output parameter values during execution.
        for parameter in command.parameters_mut() {
            if parameter.direction.is_output() {
                if let Some(value) = state.outputs.get(&parameter.name) {
                    parameter.value = value.clone();
                }
            }
        }

        state.executions.push(ExecutedCall {
            text: command.text().to_owned(),
            parameters: command.parameters().to_vec(),
            kind,
            in_transaction: transaction.is_some(),
            prepared: command.is_prepared(),
        });

        if state.fail_executions > 0 {
            state.fail_executions -= 1;
            return Err(Error::execution_in(command.text(), "scripted failure"));
        }
        Ok(())
    }
}

impl Connection for MockConnection {
    fn open(&mut self) -> Result<()> {
        self.state = ConnectionState::Open;
        let mut shared = self.shared.lock().unwrap();
        shared.force_state = None;
        shared.opens += 1;
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        self.shared.lock().unwrap().force_state.unwrap_or(self.state)
    }

    fn connection_id(&self) -> u64 {
        self.id
    }

    fn begin_transaction(&mut self) -> Result<TransactionHandle> {
        self.sequence += 1;
        self.shared.lock().unwrap().begins += 1;
        Ok(TransactionHandle::new(self.id, self.sequence))
    }

    fn commit(&mut self, _transaction: TransactionHandle) -> Result<()> {
        self.shared.lock().unwrap().commits += 1;
        Ok(())
    }

    fn rollback(&mut self, _transaction: TransactionHandle) -> Result<()> {
        self.shared.lock().unwrap().rollbacks += 1;
        Ok(())
    }

    fn prepare(&mut self, command: &mut Command) -> Result<()> {
        self.shared.lock().unwrap().prepares += 1;
        command.mark_prepared();
        Ok(())
    }

    fn execute_non_query(
        &mut self,
        command: &mut Command,
        transaction: Option<TransactionHandle>,
    ) -> Result<u64> {
        self.record(command, transaction, CallKind::NonQuery)?;
        Ok(1)
    }

    fn execute_scalar(
        &mut self,
        command: &mut Command,
        transaction: Option<TransactionHandle>,
    ) -> Result<Value> {
        self.record(command, transaction, CallKind::Scalar)?;
        Ok(self.shared.lock().unwrap().scalar.clone())
    }

    fn execute_query(
        &mut self,
        command: &mut Command,
        transaction: Option<TransactionHandle>,
    ) -> Result<Vec<Row>> {
        self.record(command, transaction, CallKind::Query)?;
        Ok(self.shared.lock().unwrap().rows.clone())
    }

    fn close(&mut self) -> Result<()> {
        self.state = ConnectionState::Closed;
        self.shared.lock().unwrap().closes += 1;
        Ok(())
    }
}

/// Provider handing out mock connections, one scripted state per settings
/// entry so tests can inspect what happened after the fact.
#[derive(Default)]
pub struct MockProvider {
    states: Mutex<HashMap<String, Arc<Mutex<MockState>>>>,
    counter: AtomicU64,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Scripted state for a settings entry, created on first access
    pub fn state_for(&self, settings_name: &str) -> Arc<Mutex<MockState>> {
        self.states
            .lock()
            .unwrap()
            .entry(settings_name.to_owned())
            .or_default()
            .clone()
    }
}

impl ConnectionProvider for MockProvider {
    fn create(&self, settings_name: &str) -> Result<Box<dyn Connection>> {
        if settings_name == "missing" {
            return Err(Error::configuration(format!(
                "no connection settings named {settings_name}"
            )));
        }
        let shared = self.state_for(settings_name);
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        shared.lock().unwrap().created += 1;
        Ok(Box::new(MockConnection::new(id, shared)))
    }
}

/// Exception logger with a fixed verdict and call counters
pub struct RecordingLogger {
    verdict: bool,
    pub calls: AtomicUsize,
    pub transactional_calls: AtomicUsize,
}

impl RecordingLogger {
    pub fn new(verdict: bool) -> Arc<Self> {
        Arc::new(Self {
            verdict,
            calls: AtomicUsize::new(0),
            transactional_calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl sprocket::logger::ExceptionLogger for RecordingLogger {
    fn write_log(&self, _error: &Error) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict
    }

    fn write_log_in_transaction(&self, _error: &Error, _transaction: &TransactionHandle) -> bool {
        self.transactional_calls.fetch_add(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict
    }
}

/// A user row as the mock driver would return it
pub fn user_row(id: i32, name: &str) -> Row {
    Row::new(
        vec!["id".into(), "name".into()],
        vec![Value::Int32(id), Value::String(name.to_owned())],
    )
}
