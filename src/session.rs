//! Partner selection behind a shared passcode. This keeps the two partners'
//! views apart; it does not protect any data.

use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub use crate::model::Partner;
use crate::AppError;

pub const DEFAULT_PASSCODE: &str = "0808";

pub const SESSION_WRONG_CODE: &str = "SESSION/WRONG_CODE";
pub const SESSION_UNKNOWN_PARTNER: &str = "SESSION/UNKNOWN_PARTNER";
pub const SESSION_BAD_PASSCODE: &str = "SESSION/BAD_PASSCODE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("incorrect passcode")]
    WrongCode,
    #[error("{0:?} is not one of the partners")]
    UnknownPartner(String),
    #[error("passcode must be exactly 4 characters")]
    BadPasscode,
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::WrongCode => SESSION_WRONG_CODE,
            SessionError::UnknownPartner(_) => SESSION_UNKNOWN_PARTNER,
            SessionError::BadPasscode => SESSION_BAD_PASSCODE,
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::new(err.code(), err.to_string())
    }
}

/// The configured passcode, checked to be four characters long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passcode(String);

impl Passcode {
    pub fn new(code: impl Into<String>) -> Result<Self, SessionError> {
        let code = code.into();
        if code.chars().count() != 4 {
            return Err(SessionError::BadPasscode);
        }
        Ok(Passcode(code))
    }

    pub fn matches(&self, attempt: &str) -> bool {
        self.0 == attempt.trim()
    }
}

impl Default for Passcode {
    fn default() -> Self {
        Passcode(DEFAULT_PASSCODE.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Session {
    pub partner: Partner,
}

/// Opens a session for `partner` when `attempt` matches the passcode.
pub fn unlock(passcode: &Passcode, attempt: &str, partner: &str) -> Result<Session, SessionError> {
    let partner = Partner::from_str(partner)
        .map_err(|_| SessionError::UnknownPartner(partner.to_string()))?;
    if !passcode.matches(attempt) {
        warn!(target: "together", event = "session_denied", partner = partner.as_str());
        return Err(SessionError::WrongCode);
    }
    info!(target: "together", event = "session_unlocked", partner = partner.as_str());
    Ok(Session { partner })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlocks_with_the_default_code() {
        let session = unlock(&Passcode::default(), "0808", "edwina").expect("unlock");
        assert_eq!(session.partner, Partner::Edwina);
    }

    #[test]
    fn wrong_code_and_unknown_partner_are_distinct() {
        let code = Passcode::default();
        assert_eq!(unlock(&code, "1234", "Richmond"), Err(SessionError::WrongCode));
        assert_eq!(
            unlock(&code, "0808", "Someone"),
            Err(SessionError::UnknownPartner("Someone".into()))
        );
        let err: AppError = SessionError::WrongCode.into();
        assert_eq!(err.code(), SESSION_WRONG_CODE);
    }

    #[test]
    fn passcode_must_be_four_characters() {
        assert_eq!(Passcode::new("123"), Err(SessionError::BadPasscode));
        assert!(Passcode::new("4321").expect("valid").matches(" 4321 "));
    }
}
