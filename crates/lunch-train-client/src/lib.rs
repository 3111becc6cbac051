pub mod board;
pub mod config;
pub mod error;
pub mod identity;
pub mod optimistic;
pub mod orchestrator;
pub mod switch;
pub mod transport;

pub use board::Board;
pub use config::ClientConfig;
pub use error::ClientError;
pub use identity::{ClientContext, IdentityStore, UserIdentity};
pub use orchestrator::{JoinResult, Orchestrator};
pub use switch::{AutoConfirm, SwitchConfirmer, SwitchPrompt};
pub use transport::{HttpTrainApi, LeaveOutcome, TrainApi};
