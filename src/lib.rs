pub mod addr;
pub mod assemble;
pub mod cache;
pub mod cluster;
pub mod compose;
pub mod config;
pub mod controller;
pub mod error;
pub mod factory;
pub mod integrate;
pub mod latency;

pub use assemble::{DeviceLevels, Topology};
pub use compose::compose;
pub use error::{ComposeError, ComposeResult};
