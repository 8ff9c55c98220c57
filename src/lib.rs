pub mod challenge;
pub mod cli;
pub mod config;
pub mod database;
pub mod debounce;
pub mod models;
pub mod notes;
pub mod remote;
pub mod store;
pub mod utils;
pub mod views;

pub use challenge::ChallengeTracker;
pub use config::Config;
pub use database::Database;
pub use models::{List, Note, Task};
pub use notes::NoteStore;
pub use store::TaskStore;
pub use utils::Profile;
