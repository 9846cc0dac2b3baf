pub mod memory;
pub mod tags;

pub use memory::{MemoryRecord, MemoryUpdate, NewMemory, ScoredMemory};
