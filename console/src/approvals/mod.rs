//! Approval queue

pub mod queue;
