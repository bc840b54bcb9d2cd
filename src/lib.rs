//! fitflow — onboarding flow controller for a fitness app.

pub mod config;
pub mod error;
pub mod onboarding;
pub mod plans;
pub mod progress;
pub mod store;
