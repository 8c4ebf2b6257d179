//! One store operation: a command word plus its arguments.

use std::fmt;

/// A single command sent to the underlying store.
///
/// Built with a small fluent API:
///
/// ```
/// use kvguard_core::Command;
///
/// let cmd = Command::new("SET").arg("greeting").arg("hello");
/// assert_eq!(cmd.name(), "SET");
/// assert_eq!(cmd.args(), ["greeting", "hello"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: &'static str,
    args: Vec<String>,
}

impl Command {
    /// Creates a command with the given command word and no arguments.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg<T: ToString>(mut self, arg: T) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Appends every argument from an iterator.
    pub fn args_from<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.args.extend(args.into_iter().map(|a| a.to_string()));
        self
    }

    /// The command word (e.g. `GET`, `HSET`).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The arguments, in order.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_in_order() {
        let cmd = Command::new("HSET").arg("h").arg("field").arg(42);
        assert_eq!(cmd.name(), "HSET");
        assert_eq!(cmd.args(), ["h", "field", "42"]);
    }

    #[test]
    fn args_from_extends() {
        let cmd = Command::new("DEL").args_from(["a", "b", "c"]);
        assert_eq!(cmd.args().len(), 3);
    }

    #[test]
    fn display_is_space_separated() {
        let cmd = Command::new("SET").arg("k").arg("v");
        assert_eq!(cmd.to_string(), "SET k v");
    }
}
