//! Execution strategy selector
//!
//! Chooses, once per call, whether the procedure runs a single time or once
//! per element of the collection arguments, then drives the selected plan:
//! bind, prepare, execute, collect outputs, per iteration. The ambiguity
//! check runs before any command exists.

use crate::binder::{self, ElementRef};
use crate::call::{CallArg, CallContext, Stopwatch};
use crate::command::Command;
use crate::connection::{Connection, TransactionHandle};
use crate::descriptor::MethodDescriptor;
use crate::error::{Error, Result};
use crate::materialize;
use crate::repository::TvpNameTemplate;

/// How many times the procedure executes for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExecutionPlan {
    /// One execution; collections (if any) ride along as table parameters
    Single,
    /// One execution per element, for each driving collection in argument
    /// order
    PerElement {
        /// Positions of the collection arguments
        driving: Vec<usize>,
    },
}

/// Select the plan for a validated argument list.
///
/// Several collections with a non-rowset return shape cannot be expanded
/// unambiguously and are rejected here, before any command is prepared.
pub(crate) fn select_plan(
    method: &MethodDescriptor,
    args: &[CallArg],
    tvp_enabled: bool,
) -> Result<ExecutionPlan> {
    if tvp_enabled {
        return Ok(ExecutionPlan::Single);
    }

    let driving: Vec<usize> = args
        .iter()
        .enumerate()
        .filter(|(_, arg)| arg.is_collection())
        .map(|(position, _)| position)
        .collect();

    if driving.is_empty() {
        return Ok(ExecutionPlan::Single);
    }
    if driving.len() > 1 && !method.returns.is_rowset() {
        return Err(Error::unsupported(format!(
            "{} takes several collections but returns a single result",
            method.name
        )));
    }
    Ok(ExecutionPlan::PerElement { driving })
}

/// Run the plan to completion against a live connection.
///
/// An empty driving collection executes nothing; rows and output values
/// accumulate in the context across iterations.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run(
    plan: &ExecutionPlan,
    ctx: &mut CallContext<'_>,
    args: &[CallArg],
    connection: &mut dyn Connection,
    transaction: Option<TransactionHandle>,
    command: &mut Command,
    tvp_enabled: bool,
    naming: &TvpNameTemplate,
    mut query_time: Option<&mut Stopwatch>,
) -> Result<()> {
    match plan {
        ExecutionPlan::Single => {
            binder::bind_single(ctx, args, command, tvp_enabled, naming)?;
            connection.prepare(command)?;
            materialize::execute(ctx, connection, transaction, command, query_time)?;
            binder::collect_outputs(ctx, command);
        }
        ExecutionPlan::PerElement { driving } => {
            for &position in driving {
                match &args[position] {
                    CallArg::Values(values) => {
                        for value in values {
                            step(
                                ctx,
                                args,
                                position,
                                ElementRef::Value(value),
                                connection,
                                transaction,
                                command,
                                query_time.as_deref_mut(),
                            )?;
                        }
                    }
                    CallArg::Entities(set) => {
                        for record in &set.items {
                            step(
                                ctx,
                                args,
                                position,
                                ElementRef::Record(record),
                                connection,
                                transaction,
                                command,
                                query_time.as_deref_mut(),
                            )?;
                        }
                    }
                    // Plan selection only records collection positions.
                    CallArg::Scalar(_) | CallArg::Entity(_) => {}
                }
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn step(
    ctx: &mut CallContext<'_>,
    args: &[CallArg],
    position: usize,
    element: ElementRef<'_>,
    connection: &mut dyn Connection,
    transaction: Option<TransactionHandle>,
    command: &mut Command,
    query_time: Option<&mut Stopwatch>,
) -> Result<()> {
    binder::bind_iteration(ctx, args, position, element, command)?;
    connection.prepare(command)?;
    materialize::execute(ctx, connection, transaction, command, query_time)?;
    binder::collect_outputs(ctx, command);
    Ok(())
}
