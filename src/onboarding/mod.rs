//! Onboarding: the four conversational flows a new uMODA user goes through,
//! the static form variant, and the async session that runs a flow.

pub mod account;
pub mod forms;
pub mod model;
pub mod personalization;
pub mod profile;
pub mod session;
pub mod vehicle;

pub use forms::{AccountForm, FormErrors, FormMode, VehicleForm};
pub use model::{
    AIPreferences, CommunicationStyle, NotificationPreferences, ResponseLength, Transmission, User,
    Vehicle,
};
pub use session::{Awaiting, FlowSession};
