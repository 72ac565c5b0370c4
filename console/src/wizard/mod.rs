//! Deployment request wizard

pub mod fsm;
pub mod schema;
