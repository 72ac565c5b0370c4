//! Wire models for the deployment pipeline backend

pub mod models;
