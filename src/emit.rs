//! Tabular emitter (and the matching reader used by `merge`).
//!
//! Fixed 8 columns, header first, standard CSV quoting, `\n` line ends.
//! Empty values are written as empty fields, never dropped.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::DateTime;

use crate::ingest::error::ExtractError;
use crate::ingest::types::{Impact, NormalizedEvent, DATETIME_FORMAT, HEADER};

fn writer<W: Write>(w: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(w)
}

/// Write header + rows to any writer.
pub fn write_events<W: Write>(w: W, events: &[NormalizedEvent]) -> csv::Result<()> {
    let mut wtr = writer(w);
    wtr.write_record(HEADER)?;
    for ev in events {
        wtr.write_record(ev.to_record())?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn events_to_string(events: &[NormalizedEvent]) -> csv::Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    write_events(&mut buf, events)?;
    Ok(match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(&e.into_bytes()).into_owned(),
    })
}

/// Create (or truncate) `path` and write the rows; parent dirs are created.
pub fn write_events_to_path(path: &Path, events: &[NormalizedEvent]) -> Result<(), ExtractError> {
    let label = path.display().to_string();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ExtractError::Io {
                file: label.clone(),
                source: e,
            })?;
        }
    }
    let file = File::create(path).map_err(|e| ExtractError::Io {
        file: label.clone(),
        source: e,
    })?;
    write_events(file, events).map_err(|e| ExtractError::Csv {
        file: label,
        source: e,
    })
}

/// Parse a previously emitted file back into events. The header must match
/// exactly; datetimes must carry an offset; impact must be a closed label.
pub fn read_events<R: Read>(label: &str, r: R) -> Result<Vec<NormalizedEvent>, ExtractError> {
    let csv_err = |e: csv::Error| ExtractError::Csv {
        file: label.to_string(),
        source: e,
    };
    let bad_row = |line: u64, message: String| ExtractError::BadRow {
        file: label.to_string(),
        line,
        message,
    };

    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(r);

    let headers = rdr.headers().map_err(csv_err)?.clone();
    if headers.iter().ne(HEADER.iter().copied()) {
        return Err(bad_row(1, format!("unexpected header {:?}", headers)));
    }

    let mut out = Vec::new();
    for result in rdr.records() {
        let rec = result.map_err(csv_err)?;
        let line = rec.position().map(|p| p.line()).unwrap_or(0);
        if rec.len() != HEADER.len() {
            return Err(bad_row(line, format!("expected 8 fields, got {}", rec.len())));
        }

        let datetime = DateTime::parse_from_str(&rec[0], DATETIME_FORMAT)
            .map_err(|e| bad_row(line, format!("DateTime {:?}: {e}", &rec[0])))?;
        let impact: Impact = rec[2].parse().map_err(|e: String| bad_row(line, e))?;

        out.push(NormalizedEvent {
            datetime,
            currency: rec[1].to_string(),
            impact,
            event: rec[3].to_string(),
            actual: rec[4].to_string(),
            forecast: rec[5].to_string(),
            previous: rec[6].to_string(),
            detail: rec[7].to_string(),
        });
    }
    Ok(out)
}

pub fn read_events_from_path(path: &Path) -> Result<Vec<NormalizedEvent>, ExtractError> {
    let label = path.display().to_string();
    let file = File::open(path).map_err(|e| ExtractError::Io {
        file: label.clone(),
        source: e,
    })?;
    read_events(&label, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::normalize::source_offset;
    use chrono::TimeZone;

    fn sample() -> NormalizedEvent {
        NormalizedEvent {
            datetime: source_offset()
                .with_ymd_and_hms(2025, 1, 1, 8, 30, 0)
                .single()
                .unwrap(),
            currency: "USD".into(),
            impact: Impact::High,
            event: "Unemployment Claims".into(),
            actual: String::new(),
            forecast: "225K".into(),
            previous: "228K".into(),
            detail: String::new(),
        }
    }

    #[test]
    fn emits_header_and_exact_row() {
        let s = events_to_string(&[sample()]).unwrap();
        assert_eq!(
            s,
            "DateTime,Currency,Impact,Event,Actual,Forecast,Previous,Detail\n\
             2025-01-01T08:30:00-08:00,USD,High Impact Expected,Unemployment Claims,,225K,228K,\n"
        );
    }

    #[test]
    fn awkward_text_survives_quoting() {
        let mut ev = sample();
        ev.event = "Fed \"Beige Book\", Q1\nnotes".into();
        ev.detail = " leading space".into();
        let s = events_to_string(&[ev.clone()]).unwrap();
        let back = read_events("mem", s.as_bytes()).unwrap();
        assert_eq!(back, vec![ev]);
    }

    #[test]
    fn reader_rejects_unknown_impact_and_bad_header() {
        let s = "DateTime,Currency,Impact,Event,Actual,Forecast,Previous,Detail\n\
                 2025-01-01T08:30:00-08:00,USD,High,X,,,,\n";
        assert!(matches!(
            read_events("mem", s.as_bytes()),
            Err(ExtractError::BadRow { line: 2, .. })
        ));

        let s = "When,Currency\n";
        assert!(matches!(
            read_events("mem", s.as_bytes()),
            Err(ExtractError::BadRow { line: 1, .. })
        ));
    }
}
