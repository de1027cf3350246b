//! A single remembered fact and the decay curve that weights it.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Exponential importance decay with a fixed half-life.
///
/// `current = base · e^(−λ·Δt)` with `λ = ln 2 / half_life`, floored at
/// [`DecayCurve::MIN_IMPORTANCE`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayCurve {
    lambda: f64,
}

impl DecayCurve {
    /// Importance never drops below this.
    pub const MIN_IMPORTANCE: f64 = 0.01;

    pub fn with_half_life(half_life: Duration) -> Self {
        Self::with_half_life_secs(half_life.as_secs_f64())
    }

    /// An infinite half-life means no decay; zero, negative or NaN decays
    /// as fast as possible.
    pub fn with_half_life_days(days: f64) -> Self {
        Self::with_half_life_secs(days * 86_400.0)
    }

    fn with_half_life_secs(secs: f64) -> Self {
        let secs = if secs.is_nan() { 0.0 } else { secs };
        Self {
            lambda: std::f64::consts::LN_2 / secs.max(f64::MIN_POSITIVE),
        }
    }

    /// One-week half-life.
    pub fn weekly() -> Self {
        Self::with_half_life_days(7.0)
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Importance of `base` after `elapsed_secs`. Negative elapsed time counts as zero.
    pub fn decay(&self, base: f64, elapsed_secs: f64) -> f64 {
        let elapsed = elapsed_secs.max(0.0);
        (base * (-self.lambda * elapsed).exp()).max(Self::MIN_IMPORTANCE)
    }
}

impl Default for DecayCurve {
    fn default() -> Self {
        Self::weekly()
    }
}

/// A timestamped fact with a base importance.
///
/// `time` and `message` never change after creation. `current_importance` is
/// a cache; the store recomputes it before every sort or selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    #[serde(default = "new_id")]
    id: String,

    #[serde(rename = "time", with = "iso_time")]
    created_at: DateTime<Local>,

    message: String,

    #[serde(rename = "importance", default = "default_importance")]
    base_importance: f64,

    #[serde(default)]
    current_importance: f64,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_importance() -> f64 {
    1.0
}

impl MemoryItem {
    /// A new fact with base importance `1.0 + boost`.
    pub fn new(message: impl Into<String>, created_at: DateTime<Local>, boost: f64) -> Self {
        let base = (1.0 + boost).max(DecayCurve::MIN_IMPORTANCE);
        Self {
            id: new_id(),
            created_at,
            message: message.into(),
            base_importance: base,
            current_importance: base,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn time(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn base_importance(&self) -> f64 {
        self.base_importance
    }

    /// The cached importance as of the last refresh.
    pub fn current_importance(&self) -> f64 {
        self.current_importance
    }

    /// Importance at `now` without touching the cache.
    pub fn importance_at(&self, curve: &DecayCurve, now: DateTime<Local>) -> f64 {
        let elapsed = (now - self.created_at).num_microseconds().unwrap_or(i64::MAX) as f64 / 1e6;
        curve.decay(self.base_importance, elapsed)
    }

    pub(crate) fn refresh(&mut self, curve: &DecayCurve, now: DateTime<Local>) {
        self.current_importance = self.importance_at(curve, now);
    }

    pub(crate) fn reinforce(&mut self, amount: f64) {
        if amount > 0.0 {
            self.base_importance += amount;
        }
    }

    /// Repair values that a hand-edited file might carry.
    pub(crate) fn sanitize(&mut self) {
        if self.id.trim().is_empty() {
            self.id = new_id();
        }
        if !self.base_importance.is_finite() || self.base_importance < DecayCurve::MIN_IMPORTANCE {
            self.base_importance = DecayCurve::MIN_IMPORTANCE;
        }
    }
}

/// ISO-8601 timestamps. Written with the local offset; values without an
/// offset are read as local time.
mod iso_time {
    use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(time: &DateTime<Local>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.to_rfc3339_opts(SecondsFormat::AutoSi, false))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Local>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<Local>> {
        if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
            return Some(t.with_timezone(&Local));
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()?;
        Local.from_local_datetime(&naive).earliest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    #[test]
    fn lambda_matches_one_week_half_life() {
        let expected = std::f64::consts::LN_2 / (7.0 * 86_400.0);
        assert!((DecayCurve::weekly().lambda() - expected).abs() < 1e-18);
    }

    #[test]
    fn decay_halves_after_half_life() {
        let curve = DecayCurve::weekly();
        let after = curve.decay(1.0, 7.0 * 86_400.0);
        assert!((after - 0.5).abs() < 1e-9);
    }

    #[test]
    fn decay_is_monotonic_and_floored() {
        let curve = DecayCurve::weekly();
        let mut previous = f64::INFINITY;
        for day in 0..200 {
            let value = curve.decay(3.0, day as f64 * 86_400.0);
            assert!(value >= DecayCurve::MIN_IMPORTANCE);
            if value > DecayCurve::MIN_IMPORTANCE {
                assert!(value < previous, "day {day}: {value} !< {previous}");
            }
            previous = value;
        }
        assert_eq!(curve.decay(1.0, 1e12), DecayCurve::MIN_IMPORTANCE);
    }

    #[test]
    fn out_of_range_half_lives_do_not_panic() {
        assert_eq!(DecayCurve::with_half_life_days(f64::INFINITY).lambda(), 0.0);
        assert_eq!(DecayCurve::with_half_life_days(f64::INFINITY).decay(2.0, 1e9), 2.0);

        let huge = DecayCurve::with_half_life_days(1e300);
        assert!(huge.lambda().is_finite() && huge.lambda() >= 0.0);

        for days in [f64::NAN, 0.0, -3.0, f64::NEG_INFINITY] {
            let curve = DecayCurve::with_half_life_days(days);
            assert!(curve.lambda().is_finite(), "{days}");
            assert_eq!(curve.decay(1.0, 1.0), DecayCurve::MIN_IMPORTANCE, "{days}");
        }
    }

    #[test]
    fn future_timestamps_do_not_grow() {
        let curve = DecayCurve::weekly();
        assert_eq!(curve.decay(2.0, -86_400.0), 2.0);
    }

    #[test]
    fn new_item_base_is_one_plus_boost() {
        let item = MemoryItem::new("fact", Local::now(), 0.25);
        assert_eq!(item.base_importance(), 1.25);
        assert_eq!(item.current_importance(), 1.25);

        let floored = MemoryItem::new("fact", Local::now(), -5.0);
        assert_eq!(floored.base_importance(), DecayCurve::MIN_IMPORTANCE);
    }

    #[test]
    fn reinforce_never_decreases() {
        let mut item = MemoryItem::new("fact", Local::now(), 0.0);
        item.reinforce(-1.0);
        assert_eq!(item.base_importance(), 1.0);
        item.reinforce(0.5);
        assert_eq!(item.base_importance(), 1.5);
    }

    #[test]
    fn serializes_with_file_field_names() {
        let item = MemoryItem::new("likes tea", Local::now(), 0.0);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["message"], "likes tea");
        assert_eq!(json["importance"], 1.0);
        assert!(json["time"].is_string());
        assert!(json.get("current_importance").is_some());
    }

    #[test]
    fn naive_timestamps_read_as_local() {
        let parsed = iso_time::parse("2025-03-01T12:34:56.123456").unwrap();
        let expected = Local
            .with_ymd_and_hms(2025, 3, 1, 12, 34, 56)
            .earliest()
            .unwrap()
            + ChronoDuration::microseconds(123_456);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn legacy_entry_gets_id_and_default_importance() {
        let item: MemoryItem =
            serde_json::from_str(r#"{"time":"2025-01-01T08:00:00","message":"old"}"#).unwrap();
        assert!(!item.id().is_empty());
        assert_eq!(item.base_importance(), 1.0);
    }

    #[test]
    fn garbage_timestamp_rejected() {
        let result: Result<MemoryItem, _> =
            serde_json::from_str(r#"{"time":"yesterday","message":"x"}"#);
        assert!(result.is_err());
    }
}
