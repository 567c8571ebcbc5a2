//! Test utilities for transport-level code.

mod memory;

pub use memory::MemoryTransport;
