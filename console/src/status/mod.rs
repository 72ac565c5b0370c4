//! Deployment status reconciliation

pub mod engine;
pub mod reconcile;
pub mod tracker;
