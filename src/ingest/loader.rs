// src/ingest/loader.rs
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ingest::error::ExtractError;

/// One saved calendar page plus the year its day labels belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub year: i32,
}

impl SourceFile {
    /// Resolve `file` against `base_dir` unless it is already absolute.
    pub fn resolve(base_dir: &Path, file: impl AsRef<Path>, year: i32) -> Self {
        let file = file.as_ref();
        let path = if file.is_absolute() {
            file.to_path_buf()
        } else {
            base_dir.join(file)
        };
        Self { path, year }
    }

    /// Short label used in logs and error reports.
    pub fn label(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Read the whole page as text. Pages saved by browsers on Windows are
/// Windows-1252; anything that isn't valid UTF-8 is decoded as such.
pub fn load_source(source: &SourceFile) -> Result<String, ExtractError> {
    let bytes = fs::read(&source.path).map_err(|e| ExtractError::Io {
        file: source.label(),
        source: e,
    })?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            debug!(target: "ingest", file = %source.label(), "not utf-8, decoding as windows-1252");
            decode_cp1252(e.as_bytes())
        }
    })
}

// 0x80..=0x9F; the rest of the range coincides with Latin-1.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

pub fn decode_cp1252(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
            _ => b as char,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_base_dir() {
        let s = SourceFile::resolve(Path::new("/data/ff"), "June 2025.html", 2025);
        assert_eq!(s.path, PathBuf::from("/data/ff/June 2025.html"));
        assert_eq!(s.label(), "June 2025.html");
    }

    #[test]
    fn cp1252_specials_decode() {
        // “Flash” – 5€ é
        let bytes = [0x93, b'F', 0x94, b' ', 0x96, b' ', b'5', 0x80, b' ', 0xE9];
        assert_eq!(decode_cp1252(&bytes), "\u{201C}F\u{201D} \u{2013} 5\u{20AC} é");
    }

    #[test]
    fn falls_back_when_not_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("page.html");
        fs::write(&p, [b'a', 0x92, b'b']).unwrap();
        let text = load_source(&SourceFile::resolve(dir.path(), "page.html", 2025)).unwrap();
        assert_eq!(text, "a\u{2019}b");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_source(&SourceFile::resolve(dir.path(), "nope.html", 2025)).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }
}
