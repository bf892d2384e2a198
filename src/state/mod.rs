//! Journey state: accumulated answers, conversation history, and the store
//! that owns them.

pub mod answers;
pub mod history;
pub mod store;

pub use answers::{
    Answers, AnswersPatch, EmploymentType, Gender, KycMethod, Product, SelectedRider, VehicleKind,
};
pub use history::{ChatMessage, Sender};
pub use store::{JourneyState, StateStore};
