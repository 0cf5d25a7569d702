//! Persistence layer: the backend trait plus a simulated and an on-disk
//! implementation.

pub mod json_file;
pub mod simulated;
pub mod traits;

pub use json_file::JsonFileBackend;
pub use simulated::SimulatedBackend;
pub use traits::{
    Candidate, NewAccount, NewVehicle, OnboardingBackend, ProfileUpdate, Provider, Record,
};
