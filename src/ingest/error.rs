// src/ingest/error.rs
use thiserror::Error;

/// Everything that can go wrong while turning saved calendar pages into rows.
///
/// File-level variants (`Io`, `MissingPayload`, `MalformedJson`) make the batch
/// skip one document. Record-level variants carry enough context
/// (file, day-group, event title) to find the offending input by hand.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{file}: read failed: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}: embedded calendar state not found")]
    MissingPayload { file: String },

    #[error("{file}: embedded calendar state is not valid JSON: {source}")]
    MalformedJson {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{file} [{day}]: cannot resolve date label with year {year}")]
    UnparseableDate { file: String, day: String, year: i32 },

    #[error("{file} [{day}] {event:?}: unrecognized time {time:?}")]
    UnparseableTime {
        file: String,
        day: String,
        event: String,
        time: String,
    },

    #[error("{file} [{day}] {event:?}: unmapped impact indicator {indicator:?}{}", hint_suffix(.hint))]
    UnmappedImpact {
        file: String,
        day: String,
        event: String,
        indicator: String,
        hint: Option<String>,
    },

    #[error("{file} [{day}] {event:?}: impact indicators disagree: {indicators:?}")]
    ConflictingImpact {
        file: String,
        day: String,
        event: String,
        indicators: Vec<String>,
    },

    #[error("{file}: csv: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("{file}:{line}: {message}")]
    BadRow {
        file: String,
        line: u64,
        message: String,
    },
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(h) => format!(" (closest known: {h:?})"),
        None => String::new(),
    }
}

impl ExtractError {
    /// True for errors that only invalidate a single record, not a whole file.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            ExtractError::UnparseableDate { .. }
                | ExtractError::UnparseableTime { .. }
                | ExtractError::UnmappedImpact { .. }
                | ExtractError::ConflictingImpact { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_impact_message_carries_context_and_hint() {
        let e = ExtractError::UnmappedImpact {
            file: "Jan 2025.html".into(),
            day: "Wed Jan 1".into(),
            event: "CPI m/m".into(),
            indicator: "icon--ff-impact-purple".into(),
            hint: Some("icon--ff-impact-red".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("Jan 2025.html"));
        assert!(msg.contains("Wed Jan 1"));
        assert!(msg.contains("CPI m/m"));
        assert!(msg.contains("closest known"));
        assert!(e.is_record_level());
    }

    #[test]
    fn missing_payload_is_file_level() {
        let e = ExtractError::MissingPayload {
            file: "a.html".into(),
        };
        assert!(!e.is_record_level());
        assert_eq!(e.to_string(), "a.html: embedded calendar state not found");
    }
}
