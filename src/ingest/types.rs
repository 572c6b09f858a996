// src/ingest/types.rs
use chrono::{DateTime, FixedOffset, NaiveTime};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/* ----------------------------
Raw payload (as embedded in the page)
---------------------------- */

/// Decoded calendar state. Pages carry `{ "days": [...] }`; a bare list of
/// day-groups is accepted too.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCalendarState {
    Days { days: Vec<RawDay> },
    List(Vec<RawDay>),
}

impl RawCalendarState {
    pub fn into_days(self) -> Vec<RawDay> {
        match self {
            RawCalendarState::Days { days } => days,
            RawCalendarState::List(days) => days,
        }
    }
}

/// One calendar day's block of events, keyed by a label like `Wed Jan 1`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDay {
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

/// One event as found in the payload. Built from the raw JSON map so that
/// page field names (`name`, `timeLabel`, `impactTitle`) and the short forms
/// (`event`, `time`, `impact`) can coexist; the first key present wins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct RawEvent {
    pub name: String,
    pub currency: String,
    pub time_label: String,

    pub impact_title: Option<String>,
    pub impact: Option<String>,
    pub impact_name: Option<String>,
    pub impact_class: Option<String>,

    pub actual: String,
    pub forecast: String,
    pub previous: String,
    pub detail: String,
}

impl From<Map<String, Value>> for RawEvent {
    fn from(m: Map<String, Value>) -> Self {
        let pick = |keys: &[&str]| keys.iter().find_map(|k| m.get(*k).and_then(scalar));
        let text = |keys: &[&str]| pick(keys).unwrap_or_default();

        RawEvent {
            name: text(&["name", "event", "title"]),
            currency: text(&["currency"]),
            time_label: text(&["timeLabel", "time"]),
            impact_title: pick(&["impactTitle"]),
            impact: pick(&["impact"]),
            impact_name: pick(&["impactName"]),
            impact_class: pick(&["impactClass"]),
            actual: text(&["actual"]),
            forecast: text(&["forecast"]),
            previous: text(&["previous"]),
            detail: text(&["detail"]),
        }
    }
}

impl RawEvent {
    /// Impact indicators in lookup order; empty values are skipped.
    pub fn impact_candidates(&self) -> Vec<&str> {
        [
            &self.impact_title,
            &self.impact,
            &self.impact_name,
            &self.impact_class,
        ]
        .into_iter()
        .filter_map(|v| v.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect()
    }
}

// Values show up as strings, numbers or null depending on the page build.
fn scalar(v: &Value) -> Option<String> {
    match v {
        Value::Null | Value::Array(_) | Value::Object(_) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(scalar).unwrap_or_default())
}

/* ----------------------------
Normalized output
---------------------------- */

/// Closed set of impact labels written to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Impact {
    High,
    Medium,
    Low,
    NonEconomic,
}

impl Impact {
    pub const ALL: [Impact; 4] = [
        Impact::High,
        Impact::Medium,
        Impact::Low,
        Impact::NonEconomic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Impact::High => "High Impact Expected",
            Impact::Medium => "Medium Impact Expected",
            Impact::Low => "Low Impact Expected",
            Impact::NonEconomic => "Non-Economic",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parses the output labels only. Raw page indicators go through
/// `normalize::map_impact`.
impl FromStr for Impact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Impact::ALL
            .into_iter()
            .find(|i| i.label() == s)
            .ok_or_else(|| format!("not an impact label: {s:?}"))
    }
}

/// What the time label actually said. Everything except `Clock` is emitted
/// with the midnight sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    Clock(NaiveTime),
    AllDay,
    Tentative,
    MultiDay(u8),
    Unspecified,
}

impl TimeKind {
    pub fn time_of_day(self) -> NaiveTime {
        match self {
            TimeKind::Clock(t) => t,
            _ => NaiveTime::MIN,
        }
    }

    pub fn is_sentinel(self) -> bool {
        !matches!(self, TimeKind::Clock(_))
    }
}

pub const HEADER: [&str; 8] = [
    "DateTime", "Currency", "Impact", "Event", "Actual", "Forecast", "Previous", "Detail",
];

pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub datetime: DateTime<FixedOffset>,
    pub currency: String,
    pub impact: Impact,
    pub event: String,
    pub actual: String,
    pub forecast: String,
    pub previous: String,
    pub detail: String,
}

impl NormalizedEvent {
    /// The row exactly as emitted, in `HEADER` order.
    pub fn to_record(&self) -> [String; 8] {
        [
            self.datetime.format(DATETIME_FORMAT).to_string(),
            self.currency.clone(),
            self.impact.label().to_string(),
            self.event.clone(),
            self.actual.clone(),
            self.forecast.clone(),
            self.previous.clone(),
            self.detail.clone(),
        ]
    }
}
