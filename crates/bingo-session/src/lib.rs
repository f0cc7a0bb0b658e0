pub mod authority;
pub mod config;
pub mod driver;
pub mod error;
pub mod reconcile;
pub mod rematch;
pub mod session;
pub mod timer;
pub mod waiting;

pub use authority::{RemoteError, RoomAuthority, TicketRows};
pub use config::SessionConfig;
pub use driver::{SessionCommand, SessionHandle, SessionOutcome, run_session, spawn_session};
pub use error::SessionError;
pub use rematch::{RematchCommand, RematchEvent, RematchOutcome, run_rematch};
pub use session::{Session, SessionEvent, SessionPhase};
pub use waiting::{prepare_rematch, wait_for_opponent};
