//! Deployment Console Library
//!
//! Core modules for building gated deployment requests and following them
//! through review, merge and cluster sync.

pub mod app;
pub mod approvals;
pub mod authn;
pub mod errors;
pub mod http;
pub mod logs;
pub mod models;
pub mod pipeline;
pub mod status;
pub mod storage;
pub mod submission;
pub mod utils;
pub mod wizard;
pub mod workers;
