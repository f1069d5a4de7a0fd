//! Chart payloads reduced from date-ranged entries.
//!
//! The reductions are pure. Sample payloads exist for empty result sets and
//! always carry a marker so clients can tell them apart from real data.

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use rand::Rng;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

// ── Time ranges ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Week,
    Month,
    ThreeMonths,
    SixMonths,
    Year,
}

impl TimeRange {
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        match raw {
            None | Some("week") => Ok(Self::Week),
            Some("month") => Ok(Self::Month),
            Some("3months") => Ok(Self::ThreeMonths),
            Some("6months") => Ok(Self::SixMonths),
            Some("year") => Ok(Self::Year),
            Some(other) => Err(format!(
                "Unknown timeRange '{}'; expected week, month, 3months, 6months or year",
                other
            )),
        }
    }

    /// Earliest instant covered when looking back from `now`.
    pub fn start_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let months = match self {
            TimeRange::Week => return now - Duration::days(7),
            TimeRange::Month => 1,
            TimeRange::ThreeMonths => 3,
            TimeRange::SixMonths => 6,
            TimeRange::Year => 12,
        };
        now.checked_sub_months(Months::new(months)).unwrap_or(now)
    }
}

// ── Mood ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodPoint {
    pub date: DateTime<Utc>,
    pub rating: i32,
}

pub fn mood_series(rows: Vec<(DateTime<Utc>, i32)>) -> Vec<MoodPoint> {
    let mut points: Vec<MoodPoint> = rows
        .into_iter()
        .map(|(date, rating)| MoodPoint { date, rating })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

// ── Mood vs. sleep ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodSleepPoint {
    /// Short label such as "Oct 07".
    pub date: String,
    pub mood: f64,
    pub sleep_hours: f64,
    pub sleep_quality: i32,
}

#[derive(Debug, Clone)]
pub struct MoodSleepRow {
    pub date: DateTime<Utc>,
    pub mood: i32,
    pub sleep_hours: f64,
    pub sleep_quality: i32,
}

pub fn chart_label(date: NaiveDate) -> String {
    date.format("%b %d").to_string()
}

/// Chart points in date order. Placeholder sleep rows (quality 0) are
/// skipped, as in [`summarize`].
pub fn mood_sleep_series(mut rows: Vec<MoodSleepRow>) -> Vec<MoodSleepPoint> {
    rows.sort_by_key(|r| r.date);
    rows.into_iter()
        .filter(|r| r.sleep_quality > 0)
        .map(|r| MoodSleepPoint {
            date: chart_label(r.date.date_naive()),
            mood: f64::from(r.mood),
            sleep_hours: r.sleep_hours,
            sleep_quality: r.sleep_quality,
        })
        .collect()
}

/// Seven days ending `today` of loosely correlated mood/sleep values.
pub fn sample_mood_sleep<R: Rng>(today: NaiveDate, rng: &mut R) -> Vec<MoodSleepPoint> {
    (0..7)
        .map(|i| {
            let date = today - Duration::days(6 - i);
            let sleep_quality: i32 = rng.gen_range(1..=5);
            let base_mood = sleep_quality + rng.gen_range(0..3) - 1;
            let mood = (f64::from(base_mood) * 1.5).clamp(1.0, 10.0);
            MoodSleepPoint {
                date: chart_label(date),
                mood,
                sleep_hours: f64::from(rng.gen_range(5..=8i32)),
                sleep_quality,
            }
        })
        .collect()
}

// ── Diet ─────────────────────────────────────────────────────────────────────

/// Counts keyed by food choice, serialized as a JSON object in descending
/// count order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderedCounts(pub Vec<(String, i64)>);

impl Serialize for OrderedCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in &self.0 {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DietBreakdown {
    pub food_categories: OrderedCounts,
    /// Number of food-choice selections counted, not number of entries.
    pub total_entries: i64,
    pub is_sample: bool,
}

pub fn food_breakdown<I>(choices: I) -> DietBreakdown
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut counts: Vec<(String, i64)> = Vec::new();
    let mut total = 0i64;

    for food in choices.into_iter().flatten() {
        match counts.iter_mut().find(|(name, _)| *name == food) {
            Some((_, count)) => *count += 1,
            None => counts.push((food, 1)),
        }
        total += 1;
    }

    // Descending by count, ties by name so output is stable
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    DietBreakdown {
        food_categories: OrderedCounts(counts),
        total_entries: total,
        is_sample: false,
    }
}

pub fn sample_food_breakdown() -> DietBreakdown {
    let counts = [
        ("fruits-veggies", 5),
        ("whole-grains", 3),
        ("lean-protein", 4),
        ("dairy", 2),
        ("sugary-items", 1),
    ];
    DietBreakdown {
        food_categories: OrderedCounts(
            counts
                .into_iter()
                .map(|(name, count)| (name.to_string(), count))
                .collect(),
        ),
        total_entries: 15,
        is_sample: true,
    }
}

// ── Summary ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub mood: i32,
    pub sleep: Option<(f64, i32)>,
    pub did_exercise: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub entry_count: i64,
    pub average_mood: Option<f64>,
    pub average_sleep_hours: Option<f64>,
    pub exercise_days: i64,
}

/// Averages over the given rows. Placeholder sleep rows (quality 0) are left
/// out of the sleep average.
pub fn summarize(rows: &[SummaryRow]) -> EntrySummary {
    let entry_count = rows.len() as i64;
    let average_mood = average(rows.iter().map(|r| f64::from(r.mood)));
    let average_sleep_hours = average(
        rows.iter()
            .filter_map(|r| r.sleep)
            .filter(|(_, quality)| *quality > 0)
            .map(|(hours, _)| hours),
    );
    let exercise_days = rows
        .iter()
        .filter(|r| r.did_exercise == Some(true))
        .count() as i64;

    EntrySummary {
        entry_count,
        average_mood,
        average_sleep_hours,
        exercise_days,
    }
}

fn average<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0u32), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / f64::from(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_time_range_parse() {
        assert_eq!(TimeRange::parse(None), Ok(TimeRange::Week));
        assert_eq!(TimeRange::parse(Some("3months")), Ok(TimeRange::ThreeMonths));
        assert!(TimeRange::parse(Some("fortnight")).is_err());
    }

    #[test]
    fn test_time_range_start() {
        let now = at(2026, 3, 31);
        assert_eq!(TimeRange::Week.start_from(now), at(2026, 3, 24));
        // Clamped to the last day of February
        assert_eq!(TimeRange::Month.start_from(now), at(2026, 2, 28));
        assert_eq!(TimeRange::Year.start_from(now), at(2025, 3, 31));
    }

    #[test]
    fn test_mood_series_sorted_ascending() {
        let series = mood_series(vec![(at(2026, 1, 3), 2), (at(2026, 1, 1), 5)]);
        assert_eq!(series[0].rating, 5);
        assert_eq!(series[1].rating, 2);
    }

    #[test]
    fn test_mood_sleep_labels() {
        let series = mood_sleep_series(vec![MoodSleepRow {
            date: at(2026, 10, 7),
            mood: 4,
            sleep_hours: 7.5,
            sleep_quality: 3,
        }]);
        assert_eq!(series[0].date, "Oct 07");
        assert_eq!(series[0].mood, 4.0);

        let json = serde_json::to_value(&series[0]).unwrap();
        assert_eq!(json["sleepHours"], 7.5);
        assert_eq!(json["sleepQuality"], 3);
    }

    #[test]
    fn test_mood_sleep_skips_placeholder_sleep() {
        let row = |day, sleep_hours, sleep_quality| MoodSleepRow {
            date: at(2026, 10, day),
            mood: 3,
            sleep_hours,
            sleep_quality,
        };
        let series = mood_sleep_series(vec![row(8, 7.0, 4), row(7, 0.0, 0)]);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, "Oct 08");

        let summary = summarize(&[SummaryRow {
            mood: 3,
            sleep: Some((0.0, 0)),
            did_exercise: None,
        }]);
        assert!(mood_sleep_series(vec![row(7, 0.0, 0)]).is_empty());
        assert_eq!(summary.average_sleep_hours, None);
    }

    #[test]
    fn test_sample_mood_sleep_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let sample = sample_mood_sleep(today, &mut rng);

        assert_eq!(sample.len(), 7);
        assert_eq!(sample[6].date, "Oct 19");
        assert_eq!(sample[0].date, "Oct 13");
        for p in &sample {
            assert!((1.0..=10.0).contains(&p.mood));
            assert!((5.0..=8.0).contains(&p.sleep_hours));
            assert!((1..=5).contains(&p.sleep_quality));
        }
    }

    #[test]
    fn test_food_breakdown_counts_and_orders() {
        let breakdown = food_breakdown(vec![
            vec!["dairy".to_string(), "whole-grains".to_string()],
            vec!["whole-grains".to_string()],
            vec![],
            vec!["whole-grains".to_string(), "dairy".to_string(), "fruits-veggies".to_string()],
        ]);

        assert_eq!(breakdown.total_entries, 6);
        assert!(!breakdown.is_sample);
        assert_eq!(
            breakdown.food_categories.0,
            vec![
                ("whole-grains".to_string(), 3),
                ("dairy".to_string(), 2),
                ("fruits-veggies".to_string(), 1),
            ]
        );

        let json = serde_json::to_string(&breakdown).unwrap();
        assert!(json.starts_with(r#"{"foodCategories":{"whole-grains":3,"dairy":2,"fruits-veggies":1}"#));
    }

    #[test]
    fn test_empty_breakdown_and_sample() {
        let empty = food_breakdown(Vec::<Vec<String>>::new());
        assert_eq!(empty.total_entries, 0);
        assert!(empty.food_categories.0.is_empty());

        let sample = sample_food_breakdown();
        assert!(sample.is_sample);
        assert_eq!(sample.total_entries, 15);
        assert_eq!(sample.food_categories.0.len(), 5);

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["foodCategories"]["lean-protein"], 4);
        assert_eq!(json["isSample"], true);
    }

    #[test]
    fn test_summarize_skips_placeholder_sleep() {
        let rows = vec![
            SummaryRow { mood: 4, sleep: Some((8.0, 4)), did_exercise: Some(true) },
            SummaryRow { mood: 2, sleep: Some((0.0, 0)), did_exercise: Some(false) },
            SummaryRow { mood: 3, sleep: None, did_exercise: None },
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.entry_count, 3);
        assert_eq!(summary.average_mood, Some(3.0));
        assert_eq!(summary.average_sleep_hours, Some(8.0));
        assert_eq!(summary.exercise_days, 1);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.entry_count, 0);
        assert_eq!(summary.average_mood, None);
        assert_eq!(summary.average_sleep_hours, None);
    }
}
