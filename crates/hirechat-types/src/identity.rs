//! Participant identities and roles.
//!
//! Users and job applications are owned by external collaborators
//! (identity/session management and job-post CRUD). Only their identifiers
//! cross into the messaging subsystem.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

uuid_id!(
    /// Identifier of an authenticated user (employer or candidate).
    UserId
);

uuid_id!(
    /// Identifier of a job application. A conversation is tied 1:1 to one.
    ApplicationId
);

/// The side a participant occupies in a conversation.
///
/// Always derived from the stored conversation row. A role supplied by a
/// client is at most a UI hint and never an authorization input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Employer,
    Candidate,
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantRole::Employer => write!(f, "employer"),
            ParticipantRole::Candidate => write!(f, "candidate"),
        }
    }
}

impl FromStr for ParticipantRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "employer" => Ok(ParticipantRole::Employer),
            "candidate" => Ok(ParticipantRole::Candidate),
            other => Err(format!("invalid participant role: '{other}'")),
        }
    }
}

/// A job application as seen by the messaging subsystem.
///
/// Read from the job-post collaborator; never written here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: ApplicationId,
    pub employer_id: UserId,
    pub candidate_id: UserId,
}
