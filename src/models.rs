use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::bucket::{Measure, RawRecord, RecordTime};
use crate::weeks::ChallengePeriod;

// Upstream ids come back as uuids, slugs or serial integers depending on the table.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Str(String),
    Int(i64),
}

fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Str(s) => s,
        IdRepr::Int(i) => i.to_string(),
    })
}

/// Numeric columns sometimes arrive as strings; anything unparseable is treated as absent.
fn de_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite()))
}

/// Blank or non-string values are treated as absent.
fn de_lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChallengeUser {
    #[serde(alias = "user_id", alias = "userId", deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, alias = "display_name", alias = "displayName", alias = "username")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodDto {
    #[serde(default, rename = "startDate", alias = "start_date")]
    pub start_date: Option<String>,
    #[serde(default, rename = "endDate", alias = "end_date")]
    pub end_date: Option<String>,
}

impl PeriodDto {
    pub fn parse(&self) -> Option<ChallengePeriod> {
        ChallengePeriod::parse(self.start_date.as_deref(), self.end_date.as_deref())
    }
}

/// Rows may carry any mix of these; `date` wins, then `created_at`, then `timestamp`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Stamp {
    #[serde(default, deserialize_with = "de_lenient_text")]
    pub date: Option<String>,
    #[serde(default, alias = "createdAt", deserialize_with = "de_lenient_text")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_text")]
    pub timestamp: Option<String>,
}

impl Stamp {
    fn time(&self) -> RecordTime {
        self.date
            .as_ref()
            .or(self.created_at.as_ref())
            .or(self.timestamp.as_ref())
            .map_or(RecordTime::Missing, |raw| RecordTime::At(raw.clone()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardioEntry {
    #[serde(alias = "userId", deserialize_with = "de_id")]
    pub user_id: String,
    #[serde(flatten)]
    pub stamp: Stamp,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub points: Option<f64>,
    #[serde(default, alias = "cardioPoints", deserialize_with = "de_lenient_f64")]
    pub cardio_points: Option<f64>,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub value: Option<f64>,
    #[serde(default, alias = "type", alias = "workout_type", alias = "workoutType")]
    pub kind: Option<String>,
}

impl CardioEntry {
    pub fn points(&self) -> f64 {
        self.points.or(self.cardio_points).or(self.value).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrengthEntry {
    #[serde(alias = "userId", deserialize_with = "de_id")]
    pub user_id: String,
    #[serde(flatten)]
    pub stamp: Stamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MealEntry {
    #[serde(alias = "userId", deserialize_with = "de_id")]
    pub user_id: String,
    #[serde(flatten)]
    pub stamp: Stamp,
    #[serde(default, alias = "meal_type", alias = "mealType", alias = "slot")]
    pub meal: Option<String>,
}

/// `GET /api/challenges/{id}/chart-data`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartData {
    #[serde(default)]
    pub users: Vec<ChallengeUser>,
    #[serde(default, alias = "cardioData")]
    pub cardio: Vec<CardioEntry>,
    #[serde(default, alias = "strengthData")]
    pub strength: Vec<StrengthEntry>,
    #[serde(default, alias = "mealData")]
    pub meals: Vec<MealEntry>,
    #[serde(default, rename = "challengePeriod", alias = "challenge_period")]
    pub challenge_period: Option<PeriodDto>,
}

impl ChartData {
    pub fn period(&self) -> Option<ChallengePeriod> {
        self.challenge_period.as_ref().and_then(PeriodDto::parse)
    }

    /// Flattens every entry list into raw records, in cardio, strength, meal order.
    pub fn records(&self) -> Vec<RawRecord> {
        let cardio = self.cardio.iter().map(|c| RawRecord {
            user_id: c.user_id.clone(),
            time: c.stamp.time(),
            measure: Measure::Cardio {
                points: c.points(),
                kind: c.kind.clone(),
            },
        });
        let strength = self.strength.iter().map(|s| RawRecord {
            user_id: s.user_id.clone(),
            time: s.stamp.time(),
            measure: Measure::Strength { sessions: 1 },
        });
        let meals = self.meals.iter().map(|m| RawRecord {
            user_id: m.user_id.clone(),
            time: m.stamp.time(),
            measure: Measure::Meal { slot: m.meal.clone() },
        });

        cardio.chain(strength).chain(meals).collect()
    }
}

/// `GET /api/challenges/{id}/leaderboard`
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(alias = "userId", deserialize_with = "de_id")]
    pub user_id: String,
    #[serde(default, deserialize_with = "de_lenient_f64")]
    pub points: Option<f64>,
}

/// `GET /api/challenges/{id}/today-count`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodayCount {
    #[serde(default, alias = "todayCount")]
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeeklyRecordDto {
    #[serde(default, alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, alias = "endDate")]
    pub end_date: Option<String>,
    #[serde(default, alias = "cardioPointsTotal", deserialize_with = "de_lenient_f64")]
    pub cardio_points_total: Option<f64>,
    #[serde(default, alias = "strengthSessionsCount", deserialize_with = "de_lenient_f64")]
    pub strength_sessions_count: Option<f64>,
}

/// One element of `GET /api/challenges/{id}/weekly-detail`
#[derive(Debug, Clone, Deserialize)]
pub struct UserWeeklyDetail {
    #[serde(rename = "userId", alias = "user_id", deserialize_with = "de_id")]
    pub user_id: String,
    #[serde(default, rename = "weeklyRecords", alias = "weekly_records")]
    pub weekly_records: Vec<WeeklyRecordDto>,
}

impl UserWeeklyDetail {
    /// Each server bucket becomes a cardio and a strength record sharing its range.
    pub fn records(&self) -> Vec<RawRecord> {
        let mut out = Vec::with_capacity(self.weekly_records.len() * 2);
        for week in &self.weekly_records {
            let time = match (&week.start_date, &week.end_date) {
                (Some(start), Some(end)) => RecordTime::Range {
                    start: start.clone(),
                    end: end.clone(),
                },
                _ => RecordTime::Missing,
            };
            if let Some(points) = week.cardio_points_total {
                out.push(RawRecord {
                    user_id: self.user_id.clone(),
                    time: time.clone(),
                    measure: Measure::Cardio { points, kind: None },
                });
            }
            if let Some(sessions) = week.strength_sessions_count {
                out.push(RawRecord {
                    user_id: self.user_id.clone(),
                    time: time.clone(),
                    measure: Measure::Strength {
                        sessions: sessions.max(0.0).round() as u32,
                    },
                });
            }
        }
        out
    }
}
