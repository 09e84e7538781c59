mod trait_store;
mod types;

pub use trait_store::{ExecutionStore, StoreError};
pub use types::StatusUpdate;
