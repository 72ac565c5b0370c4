//! Background workers of the status engine

pub mod poller;
pub mod relay;
