//! Parameter binder
//!
//! Converts the declared parameter list plus the supplied arguments into
//! command parameters:
//! - scalars bind one-to-one, with direction taken from the declaration
//! - class-typed arguments decompose into one parameter per field; output
//!   directions register an output parameter group for reconstruction
//! - collections project into a single table-valued parameter when TVP mode
//!   is active, and are otherwise fed in element by element through
//!   [`bind_iteration`]
//!
//! Every binding pass starts from a cleared command; the caller prepares the
//! command only after the pass completes.

use crate::call::{CallArg, CallContext, OutputBinding, OutputGroup};
use crate::command::{Command, Direction};
use crate::descriptor::ParamSpec;
use crate::entity::{EntitySet, Record};
use crate::error::{Error, Result};
use crate::repository::TvpNameTemplate;
use crate::types::{TableValue, Value};

/// One element of a driving collection during row-by-row execution
#[derive(Debug, Clone, Copy)]
pub(crate) enum ElementRef<'a> {
    /// Element of a scalar collection
    Value(&'a Value),
    /// Element of an entity collection
    Record(&'a Record),
}

/// Bind all parameters for a single-execution plan.
///
/// In TVP mode collection arguments become table parameters; otherwise a
/// single-execution plan implies no collections are present.
pub(crate) fn bind_single(
    ctx: &mut CallContext<'_>,
    args: &[CallArg],
    command: &mut Command,
    tvp_enabled: bool,
    naming: &TvpNameTemplate,
) -> Result<()> {
    let method = ctx.method;
    reset(ctx, command);

    for (position, (spec, arg)) in method.params.iter().zip(args).enumerate() {
        match arg {
            CallArg::Scalar(value) => bind_scalar(position, spec, value, ctx, command),
            CallArg::Entity(record) => bind_entity(position, spec, record, ctx, command),
            CallArg::Values(values) => {
                if tvp_enabled {
                    project_values(spec, values, command);
                }
            }
            CallArg::Entities(set) => {
                if tvp_enabled {
                    project_entities(set, naming, command)?;
                }
            }
        }
    }

    command.set_text(ctx.procedure.clone());
    Ok(())
}

/// Bind all parameters for one iteration of a per-element plan.
///
/// The element supplies the parameters of the driving collection; other
/// collection arguments are absent for this iteration.
pub(crate) fn bind_iteration(
    ctx: &mut CallContext<'_>,
    args: &[CallArg],
    driving: usize,
    element: ElementRef<'_>,
    command: &mut Command,
) -> Result<()> {
    let method = ctx.method;
    reset(ctx, command);

    for (position, (spec, arg)) in method.params.iter().zip(args).enumerate() {
        if position == driving {
            bind_element(spec, element, command);
            continue;
        }
        match arg {
            CallArg::Scalar(value) => bind_scalar(position, spec, value, ctx, command),
            CallArg::Entity(record) => bind_entity(position, spec, record, ctx, command),
            CallArg::Values(_) | CallArg::Entities(_) => {}
        }
    }

    command.set_text(ctx.procedure.clone());
    Ok(())
}

/// Copy output parameter values reported by the command back into the
/// context, keyed by argument position. Called after every execution; the
/// last iteration wins.
pub(crate) fn collect_outputs(ctx: &mut CallContext<'_>, command: &Command) {
    let bindings: Vec<OutputBinding> = ctx.outputs.clone();
    for binding in bindings {
        if let Some(parameter) = command.parameter(&binding.parameter) {
            ctx.store_written(binding.position, CallArg::Scalar(parameter.value.clone()));
        }
    }

    let groups: Vec<OutputGroup> = ctx.groups.clone();
    for group in groups {
        let mut record = Record::with_capacity(group.fields.len());
        for field in &group.fields {
            if let Some(parameter) = command.parameter(field) {
                record.push(field.clone(), parameter.value.clone());
            }
        }
        ctx.store_written(group.position, CallArg::Entity(record));
    }
}

fn reset(ctx: &mut CallContext<'_>, command: &mut Command) {
    command.clear_parameters();
    ctx.outputs.clear();
    ctx.groups.clear();
}

fn bind_scalar(
    position: usize,
    spec: &ParamSpec,
    value: &Value,
    ctx: &mut CallContext<'_>,
    command: &mut Command,
) {
    command.add_parameter(spec.name.clone(), value.clone(), spec.direction, None);
    if spec.direction.is_output() {
        ctx.outputs.push(OutputBinding {
            position,
            parameter: spec.name.clone(),
        });
    }
}

fn bind_entity(
    position: usize,
    spec: &ParamSpec,
    record: &Record,
    ctx: &mut CallContext<'_>,
    command: &mut Command,
) {
    for (field, value) in record.iter() {
        command.add_parameter(field, value.clone(), spec.direction, None);
    }
    if spec.direction.is_output() {
        ctx.groups.push(OutputGroup {
            position,
            fields: record.field_names().map(str::to_owned).collect(),
        });
    }
}

fn bind_element(spec: &ParamSpec, element: ElementRef<'_>, command: &mut Command) {
    match element {
        ElementRef::Value(value) => {
            command.add_parameter(spec.name.clone(), value.clone(), Direction::Input, None);
        }
        ElementRef::Record(record) => {
            for (field, value) in record.iter() {
                command.add_parameter(field, value.clone(), Direction::Input, None);
            }
        }
    }
}

fn project_entities(
    set: &EntitySet,
    naming: &TvpNameTemplate,
    command: &mut Command,
) -> Result<()> {
    let mut table = TableValue::new(set.element_type.clone(), set.columns.clone());
    for record in &set.items {
        let mut row = Vec::with_capacity(set.columns.len());
        for column in &set.columns {
            let value = record.get(column).cloned().unwrap_or(Value::Null);
            if matches!(value, Value::Table(_)) {
                return Err(Error::unsupported(format!(
                    "nested table value in column {column} of {}",
                    set.element_type
                )));
            }
            row.push(value);
        }
        table.rows.push(row);
    }

    command.add_parameter(
        naming.render(&set.element_type),
        Value::Table(table),
        Direction::Input,
        None,
    );
    Ok(())
}

fn project_values(spec: &ParamSpec, values: &[Value], command: &mut Command) {
    let mut table = TableValue::new(spec.name.clone(), vec![spec.name.clone()]);
    table.rows = values.iter().map(|v| vec![v.clone()]).collect();
    command.add_parameter(spec.name.clone(), Value::Table(table), Direction::Input, None);
}
