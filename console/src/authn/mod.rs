//! Authentication module

pub mod session;
