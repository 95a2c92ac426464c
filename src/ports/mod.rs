//! Port traits for the external collaborators of the engine.

pub mod config_port;
pub mod data_port;
pub mod report_port;
