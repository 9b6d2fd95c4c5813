//! # sprocket
//!
//! A dynamic stored-procedure repository engine for relational databases.
//!
//! Application code declares abstract repository contracts; at runtime each
//! invocation is converted into a parameterized stored-procedure call,
//! executed over a shared connection, and marshaled back into typed objects.
//!
//! ## Features
//!
//! - **Contract Descriptors**: declarative method descriptors instead of
//!   runtime reflection — procedure name, parameter specs, return shape
//! - **Entity Marshaling**: struct fields become command parameters and
//!   result-set columns become struct fields, via the [`impl_entity!`] macro
//! - **Execution Strategies**: single execution, per-element re-execution
//!   over collection arguments, or table-valued parameter projection
//! - **Connection Brokering**: one lazily created, instance-cached
//!   connection; external connections and transactions are honored and
//!   never disposed
//! - **Logger-Gated Recovery**: registered exception loggers decide whether
//!   an execution failure is swallowed or propagated
//! - **Elapsed-Time Counters**: optional query-time and total-time counters
//!   switched through operation flags
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sprocket::prelude::*;
//!
//! #[derive(Debug, Default, Clone)]
//! struct User {
//!     id: i32,
//!     name: String,
//! }
//!
//! impl_entity!(User { id: i32, name: String });
//!
//! let contract = ContractDescriptor::new("UserRepository")
//!     .method(MethodDescriptor::new("ReadUser", ReturnShape::List)
//!         .in_param("id", ParamKind::Scalar));
//!
//! let mut repository = DynamicRepository::create(contract, provider, "main");
//! let users: Vec<User> =
//!     repository.fetch_all("ReadUser", &mut [CallArg::Scalar(Value::Int32(1))])?;
//! ```
//!
//! Drivers plug in through the [`connection::Connection`] and
//! [`connection::ConnectionProvider`] traits; this crate ships no vendor
//! backend.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod broker;
pub mod call;
pub mod command;
pub mod connection;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod logger;
pub mod repository;
pub mod types;

mod binder;
mod engine;
mod materialize;
mod strategy;

/// Prelude module for convenient imports
pub mod prelude {
    // Error types
    pub use crate::error::{Error, ErrorCategory, Result};

    // Value and type system
    pub use crate::types::{FromValue, Row, TableValue, Value};

    // Entity layer
    pub use crate::entity::{Entity, EntitySet, Record};

    // Contract descriptors
    pub use crate::descriptor::{
        ContractDescriptor, MethodDescriptor, ParamKind, ParamSpec, ProcedureOverride, ReturnShape,
    };

    // Call surface
    pub use crate::call::{CallArg, CallOutcome};

    // Command model
    pub use crate::command::{Command, CommandParameter, Direction, UNBOUNDED_SIZE};

    // Connection traits
    pub use crate::connection::{
        Connection, ConnectionProvider, ConnectionState, TransactionHandle,
    };

    // Broker and recovery policy
    pub use crate::broker::{BrokerOutcome, DbAccess};
    pub use crate::logger::{ExceptionLogger, RecoveryDecision, TracingLogger};

    // Repository surface
    pub use crate::repository::{
        DynamicRepository, Repository, RepositoryOperations, TvpNameTemplate,
    };

    pub use crate::impl_entity;
}

// Re-export commonly used items at crate root
pub use error::{Error, Result};
pub use types::Value;
