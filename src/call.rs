//! Per-invocation call state
//!
//! Arguments cross the dynamic boundary as [`CallArg`] values and results
//! come back as a [`CallOutcome`]. The [`CallContext`] holds everything one
//! invocation accumulates - output bindings, output parameter groups, the
//! row collector - and is discarded after write-back, isolating calls from
//! one another.

use std::time::{Duration, Instant};

use crate::descriptor::{MethodDescriptor, ReturnShape};
use crate::entity::{Entity, EntitySet, Record};
use crate::error::{Error, Result};
use crate::types::Value;

/// One argument of a dynamic repository call
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    /// Single primitive value
    Scalar(Value),
    /// Class-typed value as a record
    Entity(Record),
    /// Collection of primitive values
    Values(Vec<Value>),
    /// Collection of entity records
    Entities(EntitySet),
}

impl CallArg {
    /// Build an entity argument from a typed value
    pub fn entity<E: Entity>(entity: &E) -> Self {
        Self::Entity(entity.to_record())
    }

    /// Build a collection argument from typed values
    pub fn entities<E: Entity>(items: &[E]) -> Self {
        Self::Entities(EntitySet::from_entities(items))
    }

    /// Whether this argument is collection-shaped
    #[inline]
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Values(_) | Self::Entities(_))
    }

    /// View as a record, if entity-shaped
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Entity(r) => Some(r),
            _ => None,
        }
    }

    /// View as a scalar value, if scalar-shaped
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }
}

/// Result of a dynamic repository call
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// Method returns nothing
    Unit,
    /// Single primitive value
    Scalar(Value),
    /// Single object as a record (empty when the result set had no rows)
    Entity(Record),
    /// Accumulated result rows (list and array shapes)
    Rows(Vec<Record>),
    /// The call failed and the failure was suppressed; no result exists
    Suppressed,
}

impl CallOutcome {
    /// Whether the call was suppressed by the ignore-exceptions path
    #[inline]
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed)
    }

    /// Extract the scalar value
    pub fn into_scalar(self) -> Option<Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Extract the raw result rows
    pub fn into_rows(self) -> Vec<Record> {
        match self {
            Self::Rows(rows) => rows,
            _ => Vec::new(),
        }
    }

    /// Materialize the single-object result as a typed entity
    pub fn into_entity<E: Entity>(self) -> Result<E> {
        match self {
            Self::Entity(record) => E::from_record(&record),
            other => Err(Error::type_conversion(format!(
                "expected an entity outcome, got {other:?}"
            ))),
        }
    }

    /// Materialize the result rows as typed entities
    pub fn into_entities<E: Entity>(self) -> Result<Vec<E>> {
        match self {
            Self::Rows(rows) => rows.iter().map(E::from_record).collect(),
            other => Err(Error::type_conversion(format!(
                "expected a rowset outcome, got {other:?}"
            ))),
        }
    }
}

/// A scalar output parameter registered for write-back
#[derive(Debug, Clone)]
pub(crate) struct OutputBinding {
    /// Argument position to write back into
    pub position: usize,
    /// Command parameter carrying the value
    pub parameter: String,
}

/// Command parameters produced by decomposing a class-typed output argument
#[derive(Debug, Clone)]
pub(crate) struct OutputGroup {
    /// Argument position to write back into
    pub position: usize,
    /// Member parameter names, in field-declaration order
    pub fields: Vec<String>,
}

/// Per-invocation state; created fresh for every call
pub(crate) struct CallContext<'a> {
    /// Descriptor of the invoked method
    pub method: &'a MethodDescriptor,
    /// Effective remote procedure name
    pub procedure: String,
    /// Scalar output bindings of the current iteration
    pub outputs: Vec<OutputBinding>,
    /// Output parameter groups of the current iteration
    pub groups: Vec<OutputGroup>,
    /// Row collector for list/array shapes
    pub rows: Vec<Record>,
    /// Single-object slot for entity shape
    pub entity: Option<Record>,
    /// Scalar slot for scalar shape
    pub scalar: Option<Value>,
    /// Values to write back into argument slots, by position (last write wins)
    written: Vec<(usize, CallArg)>,
}

impl<'a> CallContext<'a> {
    pub fn new(method: &'a MethodDescriptor) -> Result<Self> {
        Ok(Self {
            method,
            procedure: method.procedure_name()?,
            outputs: Vec::new(),
            groups: Vec::new(),
            rows: Vec::new(),
            entity: None,
            scalar: None,
            written: Vec::new(),
        })
    }

    /// Record a value for later write-back, replacing any earlier value for
    /// the same position
    pub fn store_written(&mut self, position: usize, arg: CallArg) {
        match self.written.iter_mut().find(|(p, _)| *p == position) {
            Some((_, slot)) => *slot = arg,
            None => self.written.push((position, arg)),
        }
    }

    /// Copy recorded output values into the caller's argument slots
    pub fn write_back(&mut self, args: &mut [CallArg]) {
        for (position, arg) in self.written.drain(..) {
            if let Some(slot) = args.get_mut(position) {
                *slot = arg;
            }
        }
    }

    /// Convert the accumulated state into the call outcome
    pub fn into_outcome(self) -> CallOutcome {
        match self.method.returns {
            ReturnShape::Unit => CallOutcome::Unit,
            ReturnShape::Scalar => CallOutcome::Scalar(self.scalar.unwrap_or(Value::Null)),
            ReturnShape::Entity => CallOutcome::Entity(self.entity.unwrap_or_default()),
            ReturnShape::List | ReturnShape::Array => CallOutcome::Rows(self.rows),
        }
    }
}

/// Accumulating stopwatch behind the elapsed-time counters
#[derive(Debug, Default)]
pub(crate) struct Stopwatch {
    elapsed: Duration,
    started_at: Option<Instant>,
}

impl Stopwatch {
    /// Start measuring (no-op while already running)
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Stop measuring and accumulate
    pub fn stop(&mut self) {
        if let Some(started) = self.started_at.take() {
            self.elapsed += started.elapsed();
        }
    }

    /// Whether the watch is currently running
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Accumulated time, including a still-running segment
    pub fn elapsed(&self) -> Duration {
        match self.started_at {
            Some(started) => self.elapsed + started.elapsed(),
            None => self.elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{MethodDescriptor, ParamKind, ReturnShape};

    #[test]
    fn test_outcome_accessors() {
        assert!(CallOutcome::Suppressed.is_suppressed());
        assert_eq!(
            CallOutcome::Scalar(Value::Int32(5)).into_scalar(),
            Some(Value::Int32(5))
        );
        assert!(CallOutcome::Unit.into_rows().is_empty());
    }

    #[test]
    fn test_context_write_back_replaces_slots() {
        let method = MethodDescriptor::new("Touch", ReturnShape::Unit)
            .out_param("name", ParamKind::Scalar)
            .in_param("id", ParamKind::Scalar);
        let mut ctx = CallContext::new(&method).unwrap();

        ctx.store_written(0, CallArg::Scalar(Value::String("first".into())));
        ctx.store_written(0, CallArg::Scalar(Value::String("second".into())));

        let mut args = vec![
            CallArg::Scalar(Value::Null),
            CallArg::Scalar(Value::Int32(1)),
        ];
        ctx.write_back(&mut args);

        assert_eq!(args[0], CallArg::Scalar(Value::String("second".into())));
        assert_eq!(args[1], CallArg::Scalar(Value::Int32(1)));
    }

    #[test]
    fn test_context_outcome_defaults() {
        let method = MethodDescriptor::new("Get", ReturnShape::Entity);
        let ctx = CallContext::new(&method).unwrap();
        assert_eq!(ctx.into_outcome(), CallOutcome::Entity(Record::default()));

        let method = MethodDescriptor::new("Count", ReturnShape::Scalar);
        let ctx = CallContext::new(&method).unwrap();
        assert_eq!(ctx.into_outcome(), CallOutcome::Scalar(Value::Null));
    }

    #[test]
    fn test_stopwatch_accumulates() {
        let mut watch = Stopwatch::default();
        watch.start();
        assert!(watch.is_running());
        std::thread::sleep(Duration::from_millis(2));
        watch.stop();

        let first = watch.elapsed();
        assert!(first >= Duration::from_millis(2));

        watch.start();
        std::thread::sleep(Duration::from_millis(2));
        watch.stop();
        assert!(watch.elapsed() > first);
    }
}
