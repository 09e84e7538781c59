pub mod config;
pub mod select;
pub mod simulate;
pub mod traffic;
pub mod verify;
