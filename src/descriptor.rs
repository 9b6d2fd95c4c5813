//! Contract descriptors
//!
//! A repository contract is data, not reflection: each method is described
//! once - name, optional procedure-name override, ordered parameter specs,
//! return-shape tag - and the descriptor is shared across every invocation
//! of that contract. By convention the method name is the remote procedure
//! name; an override may qualify or replace it.

use crate::call::CallArg;
use crate::command::Direction;
use crate::error::{Error, Result};

/// Declared kind of a contract method parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Single primitive value
    Scalar,
    /// Class-typed value, decomposed into one command parameter per field
    Entity,
    /// Collection of scalars or entities
    Collection,
}

/// One declared method parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Parameter name (also the command parameter name for scalars)
    pub name: String,
    /// In/out declaration
    pub direction: Direction,
    /// Declared kind
    pub kind: ParamKind,
}

impl ParamSpec {
    /// Create a parameter spec
    pub fn new(name: impl Into<String>, direction: Direction, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            direction,
            kind,
        }
    }

    fn matches(&self, arg: &CallArg) -> bool {
        matches!(
            (self.kind, arg),
            (ParamKind::Scalar, CallArg::Scalar(_))
                | (ParamKind::Entity, CallArg::Entity(_))
                | (ParamKind::Collection, CallArg::Values(_))
                | (ParamKind::Collection, CallArg::Entities(_))
        )
    }
}

/// Shape tag of a method's declared return type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReturnShape {
    /// No return value; executed as non-query
    #[default]
    Unit,
    /// Single primitive value (including bare strings); executed as scalar
    Scalar,
    /// Single reconstructible object; first row of a reader
    Entity,
    /// Growable list of objects; full reader loop
    List,
    /// Fixed array of objects; collected as a list, converted at the end
    Array,
}

impl ReturnShape {
    /// Whether results accumulate row by row
    #[inline]
    pub const fn is_rowset(self) -> bool {
        matches!(self, Self::List | Self::Array)
    }
}

/// Per-method override of the effective procedure name.
///
/// Database and/or schema prefix the name, a custom name replaces the
/// method name, and an override carrying none of the three is a
/// configuration error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcedureOverride {
    /// Database qualifier
    pub database: Option<String>,
    /// Schema qualifier
    pub schema: Option<String>,
    /// Replacement procedure name
    pub custom_name: Option<String>,
}

impl ProcedureOverride {
    /// Override with a schema qualifier only
    pub fn schema(schema: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            ..Self::default()
        }
    }

    /// Override with database and schema qualifiers
    pub fn qualified(database: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            database: Some(database.into()),
            schema: Some(schema.into()),
            ..Self::default()
        }
    }

    /// Override replacing the procedure name
    pub fn name(custom_name: impl Into<String>) -> Self {
        Self {
            custom_name: Some(custom_name.into()),
            ..Self::default()
        }
    }

    /// Set the replacement procedure name
    pub fn with_custom_name(mut self, custom_name: impl Into<String>) -> Self {
        self.custom_name = Some(custom_name.into());
        self
    }

    /// Build the effective procedure name for a method
    pub fn qualify(&self, method_name: &str) -> Result<String> {
        let database = self.database.as_deref().filter(|s| !s.is_empty());
        let schema = self.schema.as_deref().filter(|s| !s.is_empty());
        let custom = self.custom_name.as_deref().filter(|s| !s.is_empty());

        let prefix = match (database, schema) {
            (Some(d), Some(s)) => Some(format!("{d}.{s}")),
            (Some(d), None) => Some(d.to_owned()),
            (None, Some(s)) => Some(s.to_owned()),
            (None, None) => None,
        };

        match (prefix, custom) {
            (Some(p), custom) => Ok(format!("{p}.{}", custom.unwrap_or(method_name))),
            (None, Some(c)) => Ok(c.to_owned()),
            (None, None) => Err(Error::configuration(
                "procedure override carries neither database, schema nor custom name",
            )),
        }
    }
}

/// Descriptor of one contract method
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    /// Method name; the remote procedure name unless overridden
    pub name: String,
    /// Optional procedure-name override
    pub procedure: Option<ProcedureOverride>,
    /// Ordered parameter specs
    pub params: Vec<ParamSpec>,
    /// Declared return shape
    pub returns: ReturnShape,
}

impl MethodDescriptor {
    /// Create a method descriptor with no parameters
    pub fn new(name: impl Into<String>, returns: ReturnShape) -> Self {
        Self {
            name: name.into(),
            procedure: None,
            params: Vec::new(),
            returns,
        }
    }

    /// Append an input parameter
    pub fn in_param(self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.param(name, Direction::Input, kind)
    }

    /// Append an output parameter
    pub fn out_param(self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.param(name, Direction::Output, kind)
    }

    /// Append an input/output parameter
    pub fn inout_param(self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.param(name, Direction::InputOutput, kind)
    }

    /// Append a parameter with an explicit direction
    pub fn param(mut self, name: impl Into<String>, direction: Direction, kind: ParamKind) -> Self {
        self.params.push(ParamSpec::new(name, direction, kind));
        self
    }

    /// Attach a procedure-name override
    pub fn with_procedure(mut self, procedure: ProcedureOverride) -> Self {
        self.procedure = Some(procedure);
        self
    }

    /// Effective remote procedure name
    pub fn procedure_name(&self) -> Result<String> {
        match &self.procedure {
            Some(p) => p.qualify(&self.name),
            None => Ok(self.name.clone()),
        }
    }

    /// Check supplied arguments against the declared parameter list
    pub fn validate_args(&self, args: &[CallArg]) -> Result<()> {
        if args.len() != self.params.len() {
            return Err(Error::configuration(format!(
                "{} expects {} arguments, got {}",
                self.name,
                self.params.len(),
                args.len()
            )));
        }
        for (spec, arg) in self.params.iter().zip(args) {
            if !spec.matches(arg) {
                return Err(Error::configuration(format!(
                    "argument {} of {} does not match its declared kind",
                    spec.name, self.name
                )));
            }
        }
        Ok(())
    }
}

/// Descriptor of a whole repository contract
#[derive(Debug, Clone, Default)]
pub struct ContractDescriptor {
    /// Contract name (diagnostic only)
    pub name: String,
    methods: Vec<MethodDescriptor>,
}

impl ContractDescriptor {
    /// Create an empty contract
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Add a method
    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// All declared methods
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Look up a method by name
    pub fn find(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }
}
