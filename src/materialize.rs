//! Result materializer
//!
//! Dispatches one prepared command to the driver call matching the method's
//! return shape and folds the response into the call context. The optional
//! query-time stopwatch brackets exactly the driver round trip and stops
//! even when the execution fails.

use crate::call::{CallContext, Stopwatch};
use crate::command::Command;
use crate::connection::{Connection, TransactionHandle};
use crate::descriptor::ReturnShape;
use crate::entity::Record;
use crate::error::Result;

/// Execute the bound command once and record the result in the context
pub(crate) fn execute(
    ctx: &mut CallContext<'_>,
    connection: &mut dyn Connection,
    transaction: Option<TransactionHandle>,
    command: &mut Command,
    mut query_time: Option<&mut Stopwatch>,
) -> Result<()> {
    if let Some(watch) = query_time.as_mut() {
        watch.start();
    }
    let result = dispatch(ctx, connection, transaction, command);
    if let Some(watch) = query_time {
        watch.stop();
    }
    result
}

fn dispatch(
    ctx: &mut CallContext<'_>,
    connection: &mut dyn Connection,
    transaction: Option<TransactionHandle>,
    command: &mut Command,
) -> Result<()> {
    match ctx.method.returns {
        ReturnShape::Unit => {
            connection.execute_non_query(command, transaction)?;
        }
        ReturnShape::Scalar => {
            ctx.scalar = Some(connection.execute_scalar(command, transaction)?);
        }
        ReturnShape::Entity => {
            let rows = connection.execute_query(command, transaction)?;
            ctx.entity = rows.first().map(Record::from_row);
        }
        ReturnShape::List | ReturnShape::Array => {
            let rows = connection.execute_query(command, transaction)?;
            ctx.rows.extend(rows.iter().map(Record::from_row));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionState;
    use crate::descriptor::MethodDescriptor;
    use crate::error::Error;
    use crate::types::{Row, Value};
    use std::time::Duration;

    /// Minimal driver stub: canned rows, optional failure
    struct StubConnection {
        rows: Vec<Row>,
        fail: bool,
    }

    impl Connection for StubConnection {
        fn open(&mut self) -> Result<()> {
            Ok(())
        }

        fn state(&self) -> ConnectionState {
            ConnectionState::Open
        }

        fn connection_id(&self) -> u64 {
            1
        }

        fn begin_transaction(&mut self) -> Result<TransactionHandle> {
            Ok(TransactionHandle::new(1, 1))
        }

        fn commit(&mut self, _transaction: TransactionHandle) -> Result<()> {
            Ok(())
        }

        fn rollback(&mut self, _transaction: TransactionHandle) -> Result<()> {
            Ok(())
        }

        fn prepare(&mut self, command: &mut Command) -> Result<()> {
            command.mark_prepared();
            Ok(())
        }

        fn execute_non_query(
            &mut self,
            _command: &mut Command,
            _transaction: Option<TransactionHandle>,
        ) -> Result<u64> {
            if self.fail {
                return Err(Error::execution("forced"));
            }
            Ok(1)
        }

        fn execute_scalar(
            &mut self,
            _command: &mut Command,
            _transaction: Option<TransactionHandle>,
        ) -> Result<Value> {
            Ok(Value::Int64(41))
        }

        fn execute_query(
            &mut self,
            _command: &mut Command,
            _transaction: Option<TransactionHandle>,
        ) -> Result<Vec<Row>> {
            Ok(self.rows.clone())
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn row(id: i32) -> Row {
        Row::new(vec!["id".into()], vec![Value::Int32(id)])
    }

    #[test]
    fn test_scalar_shape_fills_scalar_slot() {
        let method = MethodDescriptor::new("Count", ReturnShape::Scalar);
        let mut ctx = CallContext::new(&method).unwrap();
        let mut connection = StubConnection {
            rows: Vec::new(),
            fail: false,
        };

        execute(&mut ctx, &mut connection, None, &mut Command::new(), None).unwrap();
        assert_eq!(ctx.scalar, Some(Value::Int64(41)));
    }

    #[test]
    fn test_entity_shape_takes_first_row() {
        let method = MethodDescriptor::new("Get", ReturnShape::Entity);
        let mut ctx = CallContext::new(&method).unwrap();
        let mut connection = StubConnection {
            rows: vec![row(7), row(8)],
            fail: false,
        };

        execute(&mut ctx, &mut connection, None, &mut Command::new(), None).unwrap();
        let entity = ctx.entity.expect("first row");
        assert_eq!(entity.get("id"), Some(&Value::Int32(7)));
        assert!(ctx.rows.is_empty());
    }

    #[test]
    fn test_list_shape_accumulates_across_executions() {
        let method = MethodDescriptor::new("Read", ReturnShape::List);
        let mut ctx = CallContext::new(&method).unwrap();
        let mut connection = StubConnection {
            rows: vec![row(1), row(2)],
            fail: false,
        };

        execute(&mut ctx, &mut connection, None, &mut Command::new(), None).unwrap();
        execute(&mut ctx, &mut connection, None, &mut Command::new(), None).unwrap();
        assert_eq!(ctx.rows.len(), 4);
    }

    #[test]
    fn test_query_timer_stops_on_failure() {
        let method = MethodDescriptor::new("Touch", ReturnShape::Unit);
        let mut ctx = CallContext::new(&method).unwrap();
        let mut connection = StubConnection {
            rows: Vec::new(),
            fail: true,
        };

        let mut watch = Stopwatch::default();
        let err = execute(
            &mut ctx,
            &mut connection,
            None,
            &mut Command::new(),
            Some(&mut watch),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
        assert!(!watch.is_running());
        assert!(watch.elapsed() < Duration::from_secs(1));
    }
}
