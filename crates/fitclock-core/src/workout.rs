//! Workout records as returned by the workouts API.
//!
//! The controller only needs the duration; the rest is carried so a
//! frontend can label the session and show the completion notice.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, SessionError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Accepts a plain date or an ISO timestamp (the date part is kept).
    #[serde(with = "workout_date")]
    pub workout_date: NaiveDate,
    /// Minutes.
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub calories: Option<i64>,
}

impl Workout {
    /// Duration converted to seconds. Non-positive values are passed through
    /// and rejected by the controller.
    pub fn duration_secs(&self) -> Result<i64, SessionError> {
        let minutes = self.duration.ok_or(SessionError::MissingDuration {
            workout_id: self.id,
        })?;
        Ok(minutes.saturating_mul(60))
    }

    /// Parse a single workout, a bare array, or the `{ "workouts": [...] }`
    /// envelope the list endpoint returns.
    pub fn parse_document(json: &str) -> Result<Vec<Workout>, CoreError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Document {
            Envelope { workouts: Vec<Workout> },
            List(Vec<Workout>),
            Single(Box<Workout>),
        }

        let doc: Document = serde_json::from_str(json)?;
        Ok(match doc {
            Document::Envelope { workouts } | Document::List(workouts) => workouts,
            Document::Single(workout) => vec![*workout],
        })
    }
}

mod workout_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        let date_part = raw.split('T').next().unwrap_or_default();
        NaiveDate::parse_from_str(date_part, FORMAT).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = r#"{
        "success": true,
        "workouts": [
            {
                "id": 1,
                "user_id": 1,
                "title": "Morning Run",
                "description": "5km run around the park",
                "workout_date": "2025-03-20T00:00:00.000Z",
                "duration": 30,
                "calories": 250,
                "created_at": "2025-03-20T08:00:00Z"
            },
            {
                "id": 2,
                "title": "Stretching",
                "workout_date": "2025-03-22",
                "duration": null
            }
        ]
    }"#;

    #[test]
    fn parses_list_envelope() {
        let workouts = Workout::parse_document(LIST).unwrap();
        assert_eq!(workouts.len(), 2);
        assert_eq!(workouts[0].title, "Morning Run");
        assert_eq!(
            workouts[0].workout_date,
            NaiveDate::from_ymd_opt(2025, 3, 20).unwrap()
        );
        assert_eq!(workouts[1].duration, None);
    }

    #[test]
    fn parses_single_workout() {
        let json = r#"{"id": 9, "title": "Plank", "workout_date": "2025-01-02", "duration": 2}"#;
        let workouts = Workout::parse_document(json).unwrap();
        assert_eq!(workouts.len(), 1);
        assert_eq!(workouts[0].duration_secs().unwrap(), 120);
    }

    #[test]
    fn missing_duration_is_an_error() {
        let workouts = Workout::parse_document(LIST).unwrap();
        assert_eq!(
            workouts[1].duration_secs(),
            Err(SessionError::MissingDuration { workout_id: 2 })
        );
    }

    #[test]
    fn rejects_bad_date() {
        let json = r#"{"id": 1, "title": "x", "workout_date": "yesterday"}"#;
        assert!(Workout::parse_document(json).is_err());
    }

    #[test]
    fn date_serializes_without_time() {
        let workouts = Workout::parse_document(LIST).unwrap();
        let json = serde_json::to_value(&workouts[0]).unwrap();
        assert_eq!(json["workout_date"], "2025-03-20");
    }
}
