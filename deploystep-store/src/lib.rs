#![forbid(unsafe_code)]

pub mod memory;
pub mod store;

pub use crate::memory::InMemoryExecutionStore;
pub use crate::store::{ExecutionStore, StatusUpdate, StoreError};
