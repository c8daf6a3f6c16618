mod catalog;
mod completion;
mod ids;
mod protocol;

pub use catalog::{CatalogProtocol, Category, Difficulty, UnknownCategory};
pub use completion::CompletionEntry;
pub use ids::{IdError, ProtocolId, UserId};
pub use protocol::{ProtocolDetails, ProtocolError, ToggleOutcome, TrackedProtocol};
