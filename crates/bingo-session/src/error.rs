use bingo_core::player::IdentityError;
use bingo_core::ticket::TicketError;

use crate::authority::RemoteError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Player or room id missing; the session cannot start.
    Identity(IdentityError),
    Ticket(TicketError),
    Remote(RemoteError),
    Cancelled,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Identity(e) => write!(f, "no session identity: {e}"),
            Self::Ticket(e) => write!(f, "invalid ticket: {e}"),
            Self::Remote(e) => write!(f, "{e}"),
            Self::Cancelled => write!(f, "session cancelled"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<IdentityError> for SessionError {
    fn from(e: IdentityError) -> Self {
        Self::Identity(e)
    }
}

impl From<TicketError> for SessionError {
    fn from(e: TicketError) -> Self {
        Self::Ticket(e)
    }
}

impl From<RemoteError> for SessionError {
    fn from(e: RemoteError) -> Self {
        Self::Remote(e)
    }
}
