use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RsvpStatus {
    Going,
    Maybe,
    #[serde(rename = "Not Going")]
    NotGoing,
}

impl RsvpStatus {
    pub const ALL: [RsvpStatus; 3] = [RsvpStatus::Going, RsvpStatus::Maybe, RsvpStatus::NotGoing];

    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpStatus::Going => "Going",
            RsvpStatus::Maybe => "Maybe",
            RsvpStatus::NotGoing => "Not Going",
        }
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown RSVP status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for RsvpStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RsvpStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl TryFrom<String> for RsvpStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Rsvp {
    pub id: Uuid,
    #[serde(rename = "event")]
    pub event_id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: RsvpStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRsvp {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: RsvpStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_display_names() {
        assert_eq!("Going".parse::<RsvpStatus>().unwrap(), RsvpStatus::Going);
        assert_eq!("Not Going".parse::<RsvpStatus>().unwrap(), RsvpStatus::NotGoing);
        assert!("going".parse::<RsvpStatus>().is_err());
        assert!("NotGoing".parse::<RsvpStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_with_space() {
        let json = serde_json::to_string(&RsvpStatus::NotGoing).unwrap();
        assert_eq!(json, "\"Not Going\"");
    }
}
