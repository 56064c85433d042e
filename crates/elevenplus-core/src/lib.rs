//! elevenplus-core: Session state machine, scoring and history engine.
//!
//! This crate defines the question model, the answer rules, the test-session
//! controller and the history/trend statistics that the `elevenplus` CLI
//! (or any other presentation layer) builds on.

pub mod answer;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod model;
pub mod parser;
pub mod sampling;
pub mod scoring;
pub mod session;
pub mod statistics;
pub mod storage;
pub mod timer;
