//! Command model
//!
//! A [`Command`] is the unit handed to a driver: the effective procedure
//! name plus an ordered parameter list. Commands are always stored-procedure
//! calls; the engine never emits inline SQL text.

use crate::types::Value;

/// Size marker for string parameters bound without a length limit
pub const UNBOUNDED_SIZE: i32 = -1;

/// Direction of a command parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Value flows caller to procedure
    Input,
    /// Value flows procedure to caller
    Output,
    /// Value flows both ways
    InputOutput,
}

impl Direction {
    /// Whether the procedure writes a value back through this parameter
    #[inline]
    pub const fn is_output(self) -> bool {
        matches!(self, Self::Output | Self::InputOutput)
    }
}

/// One parameter of a stored-procedure command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandParameter {
    /// Parameter name (no vendor prefix; drivers add their own)
    pub name: String,
    /// Parameter direction
    pub direction: Direction,
    /// Bound value; drivers overwrite this for output directions
    pub value: Value,
    /// Declared size; [`UNBOUNDED_SIZE`] for unbounded strings
    pub size: Option<i32>,
}

/// A stored-procedure command bound to parameters
#[derive(Debug, Clone, Default)]
pub struct Command {
    text: String,
    parameters: Vec<CommandParameter>,
    prepared: bool,
}

impl Command {
    /// Create an empty command
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective procedure name
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Set the effective procedure name
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// All bound parameters, in binding order
    #[inline]
    pub fn parameters(&self) -> &[CommandParameter] {
        &self.parameters
    }

    /// Mutable access to the bound parameters (drivers write output values here)
    #[inline]
    pub fn parameters_mut(&mut self) -> &mut [CommandParameter] {
        &mut self.parameters
    }

    /// Look up a parameter by exact name
    pub fn parameter(&self, name: &str) -> Option<&CommandParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Bind a parameter.
    ///
    /// String values are bound with unbounded size unless a size was given.
    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        value: Value,
        direction: Direction,
        size: Option<i32>,
    ) {
        let size = match size {
            Some(s) => Some(s),
            None if matches!(value, Value::String(_)) => Some(UNBOUNDED_SIZE),
            None => None,
        };
        self.parameters.push(CommandParameter {
            name: name.into(),
            direction,
            value,
            size,
        });
        self.prepared = false;
    }

    /// Drop all parameters and the prepared mark, keeping the text
    pub fn clear_parameters(&mut self) {
        self.parameters.clear();
        self.prepared = false;
    }

    /// Whether the driver has prepared this command since it was last bound
    #[inline]
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Record that the driver prepared the command (called by drivers)
    pub fn mark_prepared(&mut self) {
        self.prepared = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_output() {
        assert!(!Direction::Input.is_output());
        assert!(Direction::Output.is_output());
        assert!(Direction::InputOutput.is_output());
    }

    #[test]
    fn test_string_parameters_bind_unbounded() {
        let mut command = Command::new();
        command.add_parameter("name", Value::String("a".into()), Direction::Input, None);
        command.add_parameter("id", Value::Int32(1), Direction::Input, None);

        assert_eq!(command.parameter("name").unwrap().size, Some(UNBOUNDED_SIZE));
        assert_eq!(command.parameter("id").unwrap().size, None);
    }

    #[test]
    fn test_binding_invalidates_prepared_mark() {
        let mut command = Command::new();
        command.set_text("ReadEntity");
        command.add_parameter("id", Value::Int32(1), Direction::Input, None);
        command.mark_prepared();
        assert!(command.is_prepared());

        command.clear_parameters();
        assert!(!command.is_prepared());
        assert_eq!(command.text(), "ReadEntity");

        command.add_parameter("id", Value::Int32(2), Direction::Input, None);
        command.mark_prepared();
        command.add_parameter("other", Value::Int32(3), Direction::Input, None);
        assert!(!command.is_prepared());
    }
}
