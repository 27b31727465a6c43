//! Trigger Network Library
//!
//! A polyphonic trigger router: sixteen nodes that cycle incoming triggers
//! across their local outputs and a shared CV/gate bus.

pub mod dsp;
pub mod engine;
pub mod modules;
pub mod persistence;
