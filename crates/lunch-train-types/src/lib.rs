pub mod api;
pub mod models;
pub mod window;

pub use models::{CreateTrainInput, Participant, Train, TrainPatch, TrainStatus};
pub use window::VisibilityWindow;
