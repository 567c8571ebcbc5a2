//! Outbound command vocabulary.
//!
//! A command is rendered as a single line: the wire name and its
//! string-rendered arguments joined by single spaces.

use std::fmt;

/// A command to the peer debugger.
///
/// The vocabulary is fixed by the protocol; every command is ephemeral,
/// rendered to one line via [`fmt::Display`] and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Select the program file to debug.
    SetFile(String),
    /// Start execution under the debugger.
    Run,
    /// Start execution without debugging.
    RunNoDebug,
    /// Resume execution to the end or the next breakpoint.
    Continue,
    StepInto,
    StepOver,
    Pause,
    /// Set an unconditional breakpoint.
    Breakpoint { path: String, line: u64 },
    /// Set a conditional breakpoint; the condition is sent double-quoted.
    ExprBreakpoint {
        path: String,
        line: u64,
        condition: String,
    },
    /// Clear one breakpoint by line, or every breakpoint in the file when
    /// `line` is `None`.
    Clear { path: String, line: Option<u64> },
    /// Request a stack snapshot.
    Stack,
    /// Request a frame snapshot (locals) for the given frame index.
    Frame(u64),
    /// Ask the peer to shut down gracefully.
    Exit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetFile(path) => write!(f, "file {path}"),
            Command::Run => f.write_str("run"),
            Command::RunNoDebug => f.write_str("run_no_debug"),
            Command::Continue => f.write_str("continue"),
            Command::StepInto => f.write_str("step_into"),
            Command::StepOver => f.write_str("step_over"),
            Command::Pause => f.write_str("pause"),
            Command::Breakpoint { path, line } => write!(f, "break {path} {line}"),
            Command::ExprBreakpoint {
                path,
                line,
                condition,
            } => write!(f, "break_expr {path} {line} \"{condition}\""),
            Command::Clear { path, line: None } => write!(f, "clear {path}"),
            Command::Clear {
                path,
                line: Some(line),
            } => write!(f, "clear {path} {line}"),
            Command::Stack => f.write_str("stack"),
            Command::Frame(index) => write!(f, "frame {index}"),
            Command::Exit => f.write_str("exit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_argument_free_commands() {
        assert_eq!(Command::Run.to_string(), "run");
        assert_eq!(Command::RunNoDebug.to_string(), "run_no_debug");
        assert_eq!(Command::Continue.to_string(), "continue");
        assert_eq!(Command::StepInto.to_string(), "step_into");
        assert_eq!(Command::StepOver.to_string(), "step_over");
        assert_eq!(Command::Pause.to_string(), "pause");
        assert_eq!(Command::Stack.to_string(), "stack");
        assert_eq!(Command::Exit.to_string(), "exit");
    }

    #[test]
    fn render_set_file() {
        assert_eq!(
            Command::SetFile("/tmp/program.tt".to_string()).to_string(),
            "file /tmp/program.tt"
        );
    }

    #[test]
    fn render_breakpoints() {
        assert_eq!(
            Command::Breakpoint {
                path: "a/b.tt".to_string(),
                line: 5
            }
            .to_string(),
            "break a/b.tt 5"
        );
        assert_eq!(
            Command::ExprBreakpoint {
                path: "a/b.tt".to_string(),
                line: 5,
                condition: "x > 1".to_string()
            }
            .to_string(),
            "break_expr a/b.tt 5 \"x > 1\""
        );
    }

    #[test]
    fn render_clear() {
        assert_eq!(
            Command::Clear {
                path: "a.tt".to_string(),
                line: Some(3)
            }
            .to_string(),
            "clear a.tt 3"
        );
        assert_eq!(
            Command::Clear {
                path: "a.tt".to_string(),
                line: None
            }
            .to_string(),
            "clear a.tt"
        );
    }

    #[test]
    fn render_frame() {
        assert_eq!(Command::Frame(0).to_string(), "frame 0");
    }
}
