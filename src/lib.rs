//! Periodic host resource sampling with a bounded in-memory history.
//!
//! A [`monitor::Monitor`] owns a single scheduler task that drives the
//! [`sampler::Sampler`]; consumers read through a [`monitor::MonitorHandle`].

pub mod api;
pub mod bus;
pub mod config;
pub mod console;
pub mod error;
pub mod history;
pub mod metrics;
pub mod monitor;
pub mod providers;
pub mod runtime;
pub mod sampler;
pub mod scheduler;
pub mod settings;
