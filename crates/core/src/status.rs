//! Closed status/purpose enums stored as text columns.
//!
//! Each enum round-trips through its database string via `as_str` and
//! `parse`, so handlers and repositories never pass raw strings around.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Review state of a proof. Transitions only via a recorded decision or a
/// new-version upload (which resets to `Pending`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofStatus {
    Pending,
    Approved,
    Declined,
}

impl ProofStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Declined => "declined",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "declined" => Ok(Self::Declined),
            other => Err(CoreError::Validation(format!(
                "Unknown proof status '{other}'"
            ))),
        }
    }
}

/// Delivery state of a customer notification row.
///
/// Rows are created as `Queued` inside the triggering request's transaction;
/// the mailer worker moves them to `Sent` or `Failed`. Terminal states are
/// never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Queued,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "queued" => Ok(Self::Queued),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown notification status '{other}'"
            ))),
        }
    }
}

/// Purpose of a customer auth token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Invite,
    Reset,
}

impl TokenPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invite => "invite",
            Self::Reset => "reset",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "invite" => Ok(Self::Invite),
            "reset" => Ok(Self::Reset),
            other => Err(CoreError::Validation(format!(
                "Unknown token purpose '{other}'"
            ))),
        }
    }
}

/// Staff roles. A closed set: route guards check against these two values.
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_DESIGNER: &str = "designer";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_status_round_trip() {
        for status in [
            ProofStatus::Pending,
            ProofStatus::Approved,
            ProofStatus::Declined,
        ] {
            assert_eq!(ProofStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(ProofStatus::parse("rejected").is_err());
    }

    #[test]
    fn notification_status_round_trip() {
        for status in [
            NotificationStatus::Queued,
            NotificationStatus::Sent,
            NotificationStatus::Failed,
        ] {
            assert_eq!(NotificationStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(NotificationStatus::parse("bounced").is_err());
    }

    #[test]
    fn token_purpose_round_trip() {
        assert_eq!(TokenPurpose::parse("invite").unwrap(), TokenPurpose::Invite);
        assert_eq!(TokenPurpose::parse("reset").unwrap(), TokenPurpose::Reset);
        assert!(TokenPurpose::parse("magic").is_err());
    }
}
