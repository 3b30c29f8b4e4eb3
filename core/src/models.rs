use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::role::Role;

/// Username of the bootstrap admin when configuration supplies none.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Daily target given to the bootstrap admin.
pub const INITIAL_ADMIN_CALORIES_PER_DAY: i64 = 2000;

/// A stored account. Never serialized directly; use [`User::to_public`] so the
/// credential does not leave the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub hashed_password: String,
    pub role: Role,
    pub expected_calories_per_day: i64,
}

impl User {
    #[must_use]
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            username: self.username.clone(),
            role: self.role,
            expected_calories_per_day: self.expected_calories_per_day,
        }
    }
}

/// A user record with the credential stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub username: String,
    pub role: Role,
    pub expected_calories_per_day: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalorieEntry {
    pub id: i64,
    pub text: String,
    pub number_of_calories: i64,
    pub username: String,
    pub date: String,
    pub time: String,
    pub below_expected: bool,
}

impl CalorieEntry {
    #[must_use]
    pub fn to_record(&self) -> CalorieRecord {
        CalorieRecord {
            id: self.id,
            text: self.text.clone(),
            number_of_calories: self.number_of_calories,
            username: self.username.clone(),
            date: self.date.clone(),
            time: self.time.clone(),
        }
    }
}

/// Projection returned by filtered reads: an entry without `below_expected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalorieRecord {
    pub id: i64,
    pub text: String,
    pub number_of_calories: i64,
    pub username: String,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewCalorieEntry {
    pub username: String,
    pub date: String,
    pub time: String,
    pub text: String,
    #[serde(default)]
    pub number_of_calories: i64,
}

/// The three read modes of the calorie ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalorieQuery {
    ById(i64),
    ByUser {
        username: String,
        filter: Option<String>,
    },
    All {
        filter: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CalorieRead {
    Entry(CalorieEntry),
    Entries(BTreeMap<i64, CalorieEntry>),
    Matches(BTreeMap<i64, CalorieRecord>),
}

impl CalorieRead {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Entry(_) => 1,
            Self::Entries(entries) => entries.len(),
            Self::Matches(matches) => matches.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn ids(&self) -> Vec<i64> {
        match self {
            Self::Entry(entry) => vec![entry.id],
            Self::Entries(entries) => entries.keys().copied().collect(),
            Self::Matches(matches) => matches.keys().copied().collect(),
        }
    }

    /// Flatten into projections, in id order.
    #[must_use]
    pub fn into_records(self) -> Vec<CalorieRecord> {
        match self {
            Self::Entry(entry) => vec![entry.to_record()],
            Self::Entries(entries) => entries.values().map(CalorieEntry::to_record).collect(),
            Self::Matches(matches) => matches.into_values().collect(),
        }
    }
}

/// A single-field change to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserUpdate {
    Password(String),
    Role(Role),
    ExpectedCaloriesPerDay(i64),
}

impl UserUpdate {
    /// Build an update from optional inputs, exactly one of which must be set.
    pub fn from_fields(
        hashed_password: Option<String>,
        role: Option<Role>,
        expected_calories_per_day: Option<i64>,
    ) -> Result<Self> {
        match (hashed_password, role, expected_calories_per_day) {
            (Some(hash), None, None) => Ok(Self::Password(hash)),
            (None, Some(role), None) => Ok(Self::Role(role)),
            (None, None, Some(n)) => Ok(Self::ExpectedCaloriesPerDay(n)),
            (None, None, None) => Err(Error::invalid(
                "Nothing to update. Provide one of password, role, or expected_calories_per_day",
            )),
            _ => Err(Error::invalid("Only one field can be updated at a time")),
        }
    }
}

pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(Error::invalid("username must not be empty"));
    }
    Ok(())
}

pub fn validate_expected_calories(n: i64) -> Result<()> {
    if n <= 0 {
        return Err(Error::invalid(format!(
            "expected_calories_per_day must be greater than 0 (got {n})"
        )));
    }
    Ok(())
}

pub fn validate_number_of_calories(n: i64) -> Result<()> {
    if n < 0 {
        return Err(Error::invalid(format!(
            "number_of_calories must not be negative (got {n})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> CalorieEntry {
        CalorieEntry {
            id: 1,
            text: "banana".to_string(),
            number_of_calories: 89,
            username: "bob".to_string(),
            date: "2020-06-01".to_string(),
            time: "09:30".to_string(),
            below_expected: true,
        }
    }

    #[test]
    fn test_public_user_has_no_credential() {
        let user = User {
            username: "bob".to_string(),
            hashed_password: "secret-hash".to_string(),
            role: Role::Regular,
            expected_calories_per_day: 2000,
        };
        let json = serde_json::to_value(user.to_public()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "username": "bob",
                "role": 0,
                "expected_calories_per_day": 2000,
            })
        );
    }

    #[test]
    fn test_record_projection_drops_below_expected() {
        let json = serde_json::to_value(sample_entry().to_record()).unwrap();
        assert!(json.get("below_expected").is_none());
        assert_eq!(json["text"], "banana");
    }

    #[test]
    fn test_new_entry_defaults_calories_to_zero() {
        let entry: NewCalorieEntry = serde_json::from_str(
            r#"{"username":"bob","date":"2020-06-01","time":"09:30","text":"water"}"#,
        )
        .unwrap();
        assert_eq!(entry.number_of_calories, 0);
    }

    #[test]
    fn test_user_update_requires_exactly_one_field() {
        assert_eq!(
            UserUpdate::from_fields(None, Some(Role::Admin), None).unwrap(),
            UserUpdate::Role(Role::Admin)
        );
        assert!(matches!(
            UserUpdate::from_fields(None, None, None),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            UserUpdate::from_fields(Some("h".into()), None, Some(1800)),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validators() {
        assert!(validate_expected_calories(1).is_ok());
        assert!(validate_expected_calories(0).is_err());
        assert!(validate_number_of_calories(0).is_ok());
        assert!(validate_number_of_calories(-5).is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username("alice").is_ok());
    }

    #[test]
    fn test_calorie_read_ids_and_records() {
        let single = CalorieRead::Entry(sample_entry());
        assert_eq!(single.ids(), vec![1]);
        assert_eq!(single.len(), 1);

        let mut entries = BTreeMap::new();
        let mut second = sample_entry();
        second.id = 5;
        entries.insert(5, second);
        entries.insert(1, sample_entry());
        let listing = CalorieRead::Entries(entries);
        assert_eq!(listing.ids(), vec![1, 5]);
        let records = listing.into_records();
        assert_eq!(records[1].id, 5);

        assert!(CalorieRead::Matches(BTreeMap::new()).is_empty());
    }
}
