//! Verification request model
//!
//! Users file a verification request (optionally pointing at an uploaded
//! document) and an admin reviews it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ParseEnumError;
use crate::access::{Document, Value};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VerificationRequest {
    pub id: i64,
    /// Requesting user
    pub user_id: i64,
    /// Supporting document (media id)
    pub document_id: Option<i64>,
    pub notes: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: VerificationStatus,
    /// Set when the status leaves `pending`
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerificationRequest {
    /// Apply a review update.
    ///
    /// Moving the status to a different non-pending value stamps
    /// `reviewed_at`/`reviewed_by`; moving it back to `pending` clears them.
    pub fn apply_update(&mut self, input: UpdateVerificationInput, reviewer: i64, now: DateTime<Utc>) {
        if let Some(status) = input.status {
            if status != self.status {
                if status == VerificationStatus::Pending {
                    self.reviewed_at = None;
                    self.reviewed_by = None;
                } else {
                    self.reviewed_at = Some(now);
                    self.reviewed_by = Some(reviewer);
                }
                self.status = status;
            }
        }

        if let Some(notes) = input.notes {
            self.notes = if notes.trim().is_empty() { None } else { Some(notes) };
        }

        if let Some(document_id) = input.document_id {
            self.document_id = Some(document_id);
        }

        self.updated_at = now;
    }
}

impl Document for VerificationRequest {
    fn field(&self, name: &str) -> Value {
        match name {
            "id" => self.id.into(),
            "user_id" => self.user_id.into(),
            "status" => self.status.to_string().into(),
            _ => Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationStatus::Pending => write!(f, "pending"),
            VerificationStatus::Approved => write!(f, "approved"),
            VerificationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(VerificationStatus::Pending),
            "approved" => Ok(VerificationStatus::Approved),
            "rejected" => Ok(VerificationStatus::Rejected),
            _ => Err(ParseEnumError::new("verification status", s)),
        }
    }
}

impl TryFrom<String> for VerificationStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateVerificationInput {
    pub document_id: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVerificationInput {
    pub status: Option<VerificationStatus>,
    pub notes: Option<String>,
    pub document_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending() -> VerificationRequest {
        let created = Utc::now() - Duration::days(1);
        VerificationRequest {
            id: 1,
            user_id: 2,
            document_id: None,
            notes: None,
            status: VerificationStatus::Pending,
            reviewed_at: None,
            reviewed_by: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_leaving_pending_stamps_review() {
        let mut request = pending();
        let now = Utc::now();
        request.apply_update(
            UpdateVerificationInput {
                status: Some(VerificationStatus::Approved),
                ..Default::default()
            },
            9,
            now,
        );
        assert_eq!(request.status, VerificationStatus::Approved);
        assert_eq!(request.reviewed_at, Some(now));
        assert_eq!(request.reviewed_by, Some(9));
    }

    #[test]
    fn test_notes_only_update_keeps_review_unset() {
        let mut request = pending();
        request.apply_update(
            UpdateVerificationInput {
                notes: Some("passport attached".into()),
                ..Default::default()
            },
            9,
            Utc::now(),
        );
        assert_eq!(request.status, VerificationStatus::Pending);
        assert!(request.reviewed_at.is_none());
        assert_eq!(request.notes.as_deref(), Some("passport attached"));
    }

    #[test]
    fn test_back_to_pending_clears_review() {
        let mut request = pending();
        request.apply_update(
            UpdateVerificationInput { status: Some(VerificationStatus::Rejected), ..Default::default() },
            9,
            Utc::now(),
        );
        request.apply_update(
            UpdateVerificationInput { status: Some(VerificationStatus::Pending), ..Default::default() },
            9,
            Utc::now(),
        );
        assert!(request.reviewed_at.is_none());
        assert!(request.reviewed_by.is_none());
    }
}
