//! `ToolCommand`: an external program invocation, rendered but not yet run.

use std::fmt;
use std::path::Path;
use std::process::Command;

/// A program plus its argument vector.
///
/// Every build action (compile, link, objcopy, size, upload) is produced as a
/// `ToolCommand` so it can be inspected in tests and printed in verbose mode
/// before it is handed to [`std::process::Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Executable name or path.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Start a command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a path argument.
    pub fn path(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build the process, ready to spawn.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}
