//! Conversational step flows.
//!
//! A flow is a declarative table of steps ([`step`]) driven by a synchronous
//! engine ([`engine`]). Assistant lines go through an ordered emission queue
//! ([`schedule`]) on an injected logical clock ([`clock`]), land in an
//! append-only transcript ([`message`]), and the answers pile up in
//! [`CollectedData`] until the confirmation step hands them to the
//! completion handler ([`completion`]).

pub mod clock;
pub mod completion;
pub mod data;
pub mod engine;
pub mod message;
pub mod schedule;
pub mod state;
pub mod step;
pub mod validate;

pub use clock::{Clock, ManualClock, TokioClock};
pub use completion::{Completion, SignIn};
pub use data::{CollectedData, FieldValue};
pub use engine::{FlowEngine, FlowEvent, Submission};
pub use message::{Message, MessageLog, Sender};
pub use state::{FlowSnapshot, FlowState, FlowStatus};
pub use step::{ChoiceOption, FlowDefinition, Next, Step, StepId, StepKind};
