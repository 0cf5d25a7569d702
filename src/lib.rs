//! uMODA onboarding: scripted conversational flows that sign a driver up,
//! register a vehicle, tune the assistant and review the profile.

pub mod cli;
pub mod config;
pub mod error;
pub mod flow;
pub mod journey;
pub mod onboarding;
pub mod store;
