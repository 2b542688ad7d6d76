//! Job store implementations
//!
//! - `memory`: in-memory table for tests and throwaway runs
//! - `file`: durable bincode snapshot on disk
//! - `test`: memory store with fault injection and call recording

pub mod file;
pub mod memory;

pub use file::FileJobStore;
pub use memory::MemoryJobStore;
pub use test::TestJobStore;
