//! Test utilities for fixture path resolution and sample packets
//!
//! Shared by unit tests, integration tests and benches.

#![cfg(any(test, feature = "benchmark"))]

use std::path::{Path, PathBuf};

use crate::packets::{Packet, Test1, Test2, Test3};

/// Guidance shown when header fixtures are missing from the checkout.
pub const FIXTURE_GUIDANCE: &str = "Header fixtures are stored under test-data/headers/ in the repository checkout.";

/// Error returned when a required fixture cannot be located.
#[derive(Debug, Clone)]
pub struct FixtureError {
    message: String,
}

impl FixtureError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl std::fmt::Display for FixtureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FixtureError {}

/// Require that a specific fixture exists on disk.
pub fn require_fixture<P: AsRef<Path>>(path: P) -> Result<PathBuf, FixtureError> {
    let path_ref = path.as_ref();
    if path_ref.exists() {
        Ok(path_ref.to_path_buf())
    } else {
        Err(FixtureError::new(format!("Missing fixture: {}. {}", path_ref.display(), FIXTURE_GUIDANCE)))
    }
}

/// The `test-data` directory of this crate, independent of the working directory.
pub fn get_test_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("test-data")
}

/// Directory holding the sample generated headers.
pub fn require_header_dir() -> Result<PathBuf, FixtureError> {
    require_fixture(get_test_data_dir().join("headers"))
}

/// A named header inside `test-data/headers`.
pub fn require_header(file_name: &str) -> Result<PathBuf, FixtureError> {
    require_fixture(require_header_dir()?.join(file_name))
}

/// All `.h` fixtures, sorted by file name.
pub fn get_header_files() -> Vec<PathBuf> {
    let Ok(dir) = require_header_dir() else {
        return vec![];
    };

    let mut headers = vec![];
    if let Ok(entries) = std::fs::read_dir(&dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("h") {
                headers.push(path);
            }
        }
    }

    headers.sort();
    headers
}

/// A recognisable record of each built-in type.
pub fn sample_packets() -> Vec<Packet> {
    vec![
        Test1 {
            sequence_no: 41,
            sample_time: 410,
            available: 1,
            dev_hz: 0.25,
            freq: 50.0,
            damping_raw: 0.125,
            damping_norm: 0.5,
            time_damping: 3.5,
            ..Default::default()
        }
        .into(),
        Test2 { sequence_no: 42, sample_time: 420 }.into(),
        Test3 {
            sequence_no: 43,
            sample_time: 430,
            c2e_upze1: 1.5,
            c2e_unze1: -1.5,
            c2e_upze2: 2.5,
            c2e_unze2: -2.5,
            c2e_upze3: 3.5,
        }
        .into(),
    ]
}

/// `count` consecutive `test2` records starting at `start`.
pub fn test2_sequence(start: u32, count: u32) -> Vec<Test2> {
    (0..count)
        .map(|offset| {
            let sequence_no = start.wrapping_add(offset);
            Test2 { sequence_no, sample_time: sequence_no.wrapping_mul(10) }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fixtures_are_present() {
        let names: Vec<String> = get_header_files()
            .iter()
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        assert_eq!(names, ["stdrtdn.h", "test1_2_2.h", "test2_2_2.h", "test3_5_7.h"]);
    }

    #[test]
    fn missing_fixture_mentions_guidance() {
        let err = require_header("nope.h").unwrap_err();
        assert!(err.to_string().contains(FIXTURE_GUIDANCE));
    }

    #[test]
    fn samples_cover_builtin_types() {
        let packets = sample_packets();
        let names: Vec<&str> = packets.iter().map(Packet::name).collect();
        assert_eq!(names, ["test1", "test2", "test3"]);
        assert_eq!(test2_sequence(u32::MAX, 2)[1].sequence_no, 0);
    }
}
