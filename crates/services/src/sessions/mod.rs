mod controller;
mod launcher;
mod progress;
mod state;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::SessionController;
pub use launcher::{LaunchedSession, SubjectLauncher};
pub use progress::{SessionOverview, percent_of};
pub use state::{Navigation, SessionState};
