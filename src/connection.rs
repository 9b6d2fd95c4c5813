//! Connection traits for sprocket
//!
//! Core abstractions the engine depends on, implemented by database drivers:
//! - [`Connection`]: open/state/command execution against one live session
//! - [`TransactionHandle`]: copyable token for an active transaction
//! - [`ConnectionProvider`]: resolves a named configuration entry into a
//!   fresh connection
//!
//! Everything here is synchronous and blocking: one invocation runs to
//! completion on the calling thread, and database round trips are the only
//! blocking points. Timeouts are the driver's responsibility.

use crate::command::Command;
use crate::error::Result;
use crate::types::{Row, Value};

/// Observable state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not yet opened, or closed
    Closed,
    /// Live and usable
    Open,
    /// Faulted; must be reopened before use
    Broken,
}

impl ConnectionState {
    /// Whether the connection must be (re)opened before use
    #[inline]
    pub const fn needs_open(self) -> bool {
        matches!(self, Self::Closed | Self::Broken)
    }
}

/// Copyable token identifying an active transaction.
///
/// The handle is tagged with the id of the connection that began it; the
/// broker rejects handles presented against a different connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHandle {
    connection_id: u64,
    sequence: u64,
}

impl TransactionHandle {
    /// Mint a handle (called by drivers when a transaction begins)
    pub fn new(connection_id: u64, sequence: u64) -> Self {
        Self {
            connection_id,
            sequence,
        }
    }

    /// Id of the owning connection
    #[inline]
    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Driver-assigned sequence number
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// A live connection to a database.
///
/// Drivers execute stored-procedure commands ADO-style: output parameter
/// values are written back into the command's parameter list during
/// execution.
pub trait Connection: Send {
    /// Open the connection (idempotent when already open)
    fn open(&mut self) -> Result<()>;

    /// Current state
    fn state(&self) -> ConnectionState;

    /// Stable identifier for transaction ownership checks
    fn connection_id(&self) -> u64;

    /// Begin a transaction
    fn begin_transaction(&mut self) -> Result<TransactionHandle>;

    /// Commit the transaction behind the handle
    fn commit(&mut self, transaction: TransactionHandle) -> Result<()>;

    /// Roll back the transaction behind the handle
    fn rollback(&mut self, transaction: TransactionHandle) -> Result<()>;

    /// Prepare a fully bound command.
    ///
    /// Called after every (re)binding pass and before the corresponding
    /// execution; a driver may rely on all parameters being present.
    fn prepare(&mut self, command: &mut Command) -> Result<()>;

    /// Execute without reading a result set, returns the affected row count
    fn execute_non_query(
        &mut self,
        command: &mut Command,
        transaction: Option<TransactionHandle>,
    ) -> Result<u64>;

    /// Execute and read the first column of the first row
    fn execute_scalar(
        &mut self,
        command: &mut Command,
        transaction: Option<TransactionHandle>,
    ) -> Result<Value>;

    /// Execute and read the full result set
    fn execute_query(
        &mut self,
        command: &mut Command,
        transaction: Option<TransactionHandle>,
    ) -> Result<Vec<Row>>;

    /// Close the connection
    fn close(&mut self) -> Result<()>;
}

/// Resolves a named configuration entry to a fresh connection.
///
/// Configuration loading itself (connection strings, catalogs) lives outside
/// the engine; the provider is the seam where it plugs in. An unknown
/// settings name is a configuration error.
pub trait ConnectionProvider: Send + Sync {
    /// Create an unopened connection for the given settings entry
    fn create(&self, settings_name: &str) -> Result<Box<dyn Connection>>;
}
