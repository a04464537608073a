pub mod generic;
pub mod memory;

pub use memory::MemoryStore;
