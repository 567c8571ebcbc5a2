//! Per-file breakpoint records.
//!
//! A keyed store behind accessor operations; callers normalize paths with
//! [`crate::utils::normalise_path`] before touching the store. Verification
//! round trips happen outside the store, which only owns the records.

use std::collections::HashMap;

use crate::types::Breakpoint;

pub(crate) struct BreakpointStore {
    /// Normalized path → breakpoints in creation order.
    files: HashMap<String, Vec<Breakpoint>>,
    next_id: u64,
}

impl BreakpointStore {
    pub(crate) fn new() -> Self {
        Self {
            files: HashMap::new(),
            next_id: 1,
        }
    }

    /// Allocate a fresh, unverified breakpoint and append it to the file's
    /// sequence. Ids are process-wide monotonic and never reused.
    pub(crate) fn add(&mut self, path: &str, line: u64, condition: Option<String>) -> Breakpoint {
        let breakpoint = Breakpoint {
            id: self.next_id,
            line,
            verified: false,
            condition,
        };
        self.next_id += 1;
        self.files
            .entry(path.to_owned())
            .or_default()
            .push(breakpoint.clone());
        breakpoint
    }

    /// Mark a breakpoint verified, returning the updated record.
    pub(crate) fn mark_verified(&mut self, path: &str, id: u64) -> Option<Breakpoint> {
        let breakpoint = self
            .files
            .get_mut(path)?
            .iter_mut()
            .find(|bp| bp.id == id)?;
        breakpoint.verified = true;
        Some(breakpoint.clone())
    }

    /// Remove the first breakpoint matching the line, returning it.
    pub(crate) fn remove(&mut self, path: &str, line: u64) -> Option<Breakpoint> {
        let breakpoints = self.files.get_mut(path)?;
        let index = breakpoints.iter().position(|bp| bp.line == line)?;
        Some(breakpoints.remove(index))
    }

    /// Drop the entire per-file sequence.
    pub(crate) fn remove_file(&mut self, path: &str) {
        self.files.remove(path);
    }

    /// Pure local lookup; no wire traffic.
    pub(crate) fn exists(&self, path: &str, line: u64) -> bool {
        self.files
            .get(path)
            .is_some_and(|bps| bps.iter().any(|bp| bp.line == line))
    }
}
