//! Data types exposed to the owning session.

/// A breakpoint record.
///
/// Created unverified; flips to verified only once the peer confirms the
/// same line number. Identity is the id: insertion order matters for
/// iteration but not for identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    /// Process-wide monotonically increasing id, starting at 1. Never reused.
    pub id: u64,
    /// One-based source line.
    pub line: u64,
    /// Whether the peer confirmed the breakpoint at the requested line.
    pub verified: bool,
    /// Optional condition expression for conditional breakpoints.
    pub condition: Option<String>,
}

/// One frame of a stack snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Zero-based frame index, outermost call last.
    pub index: usize,
    /// Display name of the frame.
    pub name: String,
    /// The active source file.
    pub file: String,
    /// One-based line number.
    pub line: u64,
}

/// The windowed result of a stack snapshot query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackSnapshot {
    pub frames: Vec<StackFrame>,
    /// Number of frames in the window.
    pub count: usize,
}

/// A local variable with its value rendered to canonical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    /// Strings render directly, absent values as empty text, structured
    /// values as compact JSON.
    pub value: String,
}
