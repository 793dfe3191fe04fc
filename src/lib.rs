//! diabetes-predict: serves a pre-trained binary classifier over HTTP.
//!
//! - [`config`]: CLI and file configuration
//! - [`model`]: Model Handle contract and the bundled predictor families
//! - [`service`]: request shaping, inference and result mapping
//! - [`server`]: axum router and handlers

pub mod config;
pub mod model;
pub mod server;
pub mod service;
