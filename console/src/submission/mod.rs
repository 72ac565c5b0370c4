//! Deployment submission

pub mod gateway;
