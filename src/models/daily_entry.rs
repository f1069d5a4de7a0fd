use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// ── Rows ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date: DateTime<Utc>,
    pub mood_id: Uuid,
    pub sleep_id: Option<Uuid>,
    pub exercise_id: Option<Uuid>,
    pub diet_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Mood {
    pub id: Uuid,
    pub rating: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sleep {
    pub id: Uuid,
    pub hours: f64,
    pub quality: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exercise {
    pub id: Uuid,
    pub did_exercise: DidExercise,
    pub exercise_type: Option<String>,
    pub duration: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Diet {
    pub id: Uuid,
    pub rating: i32,
    pub food_choices: Vec<String>,
    pub water_intake: WaterIntake,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "did_exercise", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DidExercise {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "water_intake")]
pub enum WaterIntake {
    #[sqlx(rename = "less-than-1l")]
    #[serde(rename = "less-than-1l")]
    LessThanOneLitre,
    #[sqlx(rename = "1l-1.5l")]
    #[serde(rename = "1l-1.5l")]
    OneToOneAndAHalf,
    #[sqlx(rename = "1.5l-2l")]
    #[serde(rename = "1.5l-2l")]
    OneAndAHalfToTwo,
    #[sqlx(rename = "2l-plus")]
    #[serde(rename = "2l-plus")]
    TwoPlus,
}

// ── Section payloads ─────────────────────────────────────────────────────────
//
// The same shapes are accepted on create/update and returned on read.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MoodSection {
    #[validate(range(min = 1, max = 5, message = "Mood rating must be 1-5"))]
    pub rating: i32,

    #[validate(length(max = 5000, message = "Notes must be under 5000 characters"))]
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SleepSection {
    #[validate(range(min = 0.0, max = 24.0, message = "Sleep hours must be 0-24"))]
    pub hours: f64,

    /// 1-5; 0 marks a placeholder written on quick entries.
    #[validate(range(min = 0, max = 5, message = "Sleep quality must be 0-5"))]
    pub quality: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSection {
    pub did_exercise: DidExercise,

    #[validate(length(max = 100, message = "Exercise type must be under 100 characters"))]
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub exercise_type: Option<String>,

    /// Minutes.
    #[validate(range(min = 0, max = 1440, message = "Duration must be 0-1440 minutes"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DietSection {
    /// 1-5; 0 marks a placeholder written on quick entries.
    #[validate(range(min = 0, max = 5, message = "Diet rating must be 0-5"))]
    pub rating: i32,

    #[validate(length(max = 20, message = "At most 20 food choices"))]
    #[serde(default)]
    pub food_choices: Vec<String>,

    pub water_intake: WaterIntake,
}

impl SleepSection {
    /// Written when an entry is created without sleep data.
    pub fn placeholder() -> Self {
        Self {
            hours: 0.0,
            quality: 0,
        }
    }
}

impl ExerciseSection {
    pub fn placeholder() -> Self {
        Self {
            did_exercise: DidExercise::No,
            exercise_type: None,
            duration: None,
        }
    }
}

impl DietSection {
    pub fn placeholder() -> Self {
        Self {
            rating: 0,
            food_choices: Vec::new(),
            water_intake: WaterIntake::LessThanOneLitre,
        }
    }
}

impl From<Mood> for MoodSection {
    fn from(m: Mood) -> Self {
        Self {
            rating: m.rating,
            notes: m.notes,
        }
    }
}

impl From<Sleep> for SleepSection {
    fn from(s: Sleep) -> Self {
        Self {
            hours: s.hours,
            quality: s.quality,
        }
    }
}

impl From<Exercise> for ExerciseSection {
    fn from(e: Exercise) -> Self {
        Self {
            did_exercise: e.did_exercise,
            exercise_type: e.exercise_type,
            duration: e.duration,
        }
    }
}

impl From<Diet> for DietSection {
    fn from(d: Diet) -> Self {
        Self {
            rating: d.rating,
            food_choices: d.food_choices,
            water_intake: d.water_intake,
        }
    }
}

// ── Requests ─────────────────────────────────────────────────────────────────

/// Body of POST /api/daily-entry and PUT /api/daily-entry/{id}.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DailyEntryRequest {
    #[validate]
    pub mood: MoodSection,
    #[validate]
    #[serde(default)]
    pub sleep: Option<SleepSection>,
    #[validate]
    #[serde(default)]
    pub exercise: Option<ExerciseSection>,
    #[validate]
    #[serde(default)]
    pub diet: Option<DietSection>,
    /// Defaults to now.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Range used by the check and status lookups. Both bounds are required.
#[derive(Debug, Deserialize)]
pub struct EntryRangeQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl EntryRangeQuery {
    pub fn require(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start <= end => Ok((start, end)),
            (Some(_), Some(_)) => Err("Start date must not be after end date".into()),
            _ => Err("Start and end dates are required".into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EntryListQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

// ── Responses ────────────────────────────────────────────────────────────────

/// An entry with its sections joined in. Disconnected sections are `null`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyEntryDetail {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub mood: MoodSection,
    pub sleep: Option<SleepSection>,
    pub exercise: Option<ExerciseSection>,
    pub diet: Option<DietSection>,
    pub mood_id: Uuid,
    pub sleep_id: Option<Uuid>,
    pub exercise_id: Option<Uuid>,
    pub diet_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryCheckResponse {
    pub exists: bool,
    pub entry_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    None,
    Started,
    Completed,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryStatusResponse {
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quick_entry_body_parses_with_null_sections() {
        let body: DailyEntryRequest = serde_json::from_value(json!({
            "mood": { "rating": 4 },
            "sleep": null,
            "exercise": null,
            "diet": null,
        }))
        .unwrap();
        assert_eq!(body.mood.rating, 4);
        assert!(body.sleep.is_none() && body.exercise.is_none() && body.diet.is_none());
        assert!(body.date.is_none());
        assert!(body.validate().is_ok());
    }

    #[test]
    fn test_quick_entry_read_back_validates() {
        // A quick entry returns placeholder sections; sending them back must pass
        let body = DailyEntryRequest {
            mood: MoodSection {
                rating: 4,
                notes: None,
            },
            sleep: Some(SleepSection::placeholder()),
            exercise: Some(ExerciseSection::placeholder()),
            diet: Some(DietSection::placeholder()),
            date: None,
        };
        assert!(body.validate().is_ok());

        let body: DailyEntryRequest = serde_json::from_value(json!({
            "mood": { "rating": 4 },
            "sleep": { "hours": 0.0, "quality": 6 },
        }))
        .unwrap();
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_missing_mood_is_rejected() {
        let result = serde_json::from_value::<DailyEntryRequest>(json!({ "sleep": null }));
        assert!(result.is_err());
    }

    #[test]
    fn test_nested_section_validation() {
        let body: DailyEntryRequest = serde_json::from_value(json!({
            "mood": { "rating": 3 },
            "sleep": { "hours": 30.0, "quality": 3 },
        }))
        .unwrap();
        assert!(body.validate().is_err());

        let body: DailyEntryRequest = serde_json::from_value(json!({
            "mood": { "rating": 9 },
        }))
        .unwrap();
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_wire_names_for_enums() {
        let diet: DietSection = serde_json::from_value(json!({
            "rating": 4,
            "foodChoices": ["fruits-veggies"],
            "waterIntake": "1.5l-2l",
        }))
        .unwrap();
        assert_eq!(diet.water_intake, WaterIntake::OneAndAHalfToTwo);

        let exercise: ExerciseSection = serde_json::from_value(json!({
            "didExercise": "yes",
            "type": "running",
            "duration": 45,
        }))
        .unwrap();
        assert_eq!(exercise.did_exercise, DidExercise::Yes);
        assert_eq!(exercise.exercise_type.as_deref(), Some("running"));
    }

    #[test]
    fn test_placeholders_are_neutral() {
        assert_eq!(SleepSection::placeholder(), SleepSection { hours: 0.0, quality: 0 });

        let exercise = ExerciseSection::placeholder();
        assert_eq!(exercise.did_exercise, DidExercise::No);
        assert!(exercise.exercise_type.is_none() && exercise.duration.is_none());

        let diet = DietSection::placeholder();
        assert_eq!(diet.rating, 0);
        assert!(diet.food_choices.is_empty());
        assert_eq!(diet.water_intake, WaterIntake::LessThanOneLitre);
    }

    #[test]
    fn test_range_query_requires_both_bounds() {
        let q = EntryRangeQuery {
            start: Some(Utc::now()),
            end: None,
        };
        assert!(q.require().is_err());

        let now = Utc::now();
        let q = EntryRangeQuery {
            start: Some(now),
            end: Some(now - chrono::Duration::hours(1)),
        };
        assert!(q.require().is_err());
    }
}
