//! Validation window resolution and validation-source normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progress::resolve_window_end_exclusive;
use crate::types::ValidationSource;
use crate::{RulesError, Result, DEFAULT_ALLOWED_SOURCES, DEFAULT_VALIDATION_SOURCE};

/// The span during which a project may validate its participation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ValidationWindow {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl ValidationWindow {
    /// The last day of the window counts in full.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < resolve_window_end_exclusive(self.ends_at)
    }
}

/// Resolve the window for an event, letting each override replace its own
/// bound independently.
pub fn resolve_validation_window(
    event_starts_at: DateTime<Utc>,
    event_ends_at: DateTime<Utc>,
    override_starts_at: Option<DateTime<Utc>>,
    override_ends_at: Option<DateTime<Utc>>,
) -> Result<ValidationWindow> {
    let starts_at = override_starts_at.unwrap_or(event_starts_at);
    let ends_at = override_ends_at.unwrap_or(event_ends_at);

    if ends_at < starts_at {
        return Err(RulesError::Configuration(format!(
            "validation window ends at {ends_at} before it starts at {starts_at}"
        )));
    }

    Ok(ValidationWindow { starts_at, ends_at })
}

/// Trim and lower-case a raw source; blank or missing input is `manual`.
pub fn normalize_source(raw: Option<&str>) -> String {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_lowercase(),
        None => DEFAULT_VALIDATION_SOURCE.as_str().to_string(),
    }
}

/// Parse a comma- or semicolon-separated list of sources.
///
/// Unknown tokens and repeats are dropped and first-seen order is kept. If
/// nothing valid remains the default order `current, paste, manual` is used.
pub fn parse_allowed_sources(raw: Option<&str>) -> Vec<ValidationSource> {
    let mut sources = Vec::with_capacity(DEFAULT_ALLOWED_SOURCES.len());

    for token in raw.unwrap_or_default().split([',', ';']) {
        if token.trim().is_empty() {
            continue;
        }
        let Some(source) = ValidationSource::from_token(&normalize_source(Some(token))) else {
            continue;
        };
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    if sources.is_empty() {
        DEFAULT_ALLOWED_SOURCES.to_vec()
    } else {
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 11, d, h, 0, 0).unwrap()
    }

    #[test]
    fn window_falls_back_to_event_bounds() {
        let w = resolve_validation_window(at(1, 0), at(30, 23), None, None).unwrap();
        assert_eq!(w.starts_at, at(1, 0));
        assert_eq!(w.ends_at, at(30, 23));
    }

    #[test]
    fn window_overrides_apply_field_by_field() {
        let w = resolve_validation_window(at(1, 0), at(30, 23), Some(at(20, 0)), None).unwrap();
        assert_eq!(w.starts_at, at(20, 0));
        assert_eq!(w.ends_at, at(30, 23));

        let w = resolve_validation_window(at(1, 0), at(30, 23), None, Some(at(29, 0))).unwrap();
        assert_eq!(w.starts_at, at(1, 0));
        assert_eq!(w.ends_at, at(29, 0));
    }

    #[test]
    fn inverted_window_is_a_configuration_error() {
        let err = resolve_validation_window(at(1, 0), at(30, 23), Some(at(25, 0)), Some(at(24, 0)))
            .unwrap_err();
        assert!(matches!(err, RulesError::Configuration(_)));
    }

    #[test]
    fn zero_length_window_is_allowed() {
        assert!(resolve_validation_window(at(5, 0), at(5, 0), None, None).is_ok());
    }

    #[test]
    fn window_is_open_through_the_whole_last_day() {
        let w = resolve_validation_window(at(20, 0), at(30, 9), None, None).unwrap();
        assert!(!w.is_open(at(19, 23)));
        assert!(w.is_open(at(20, 0)));
        assert!(w.is_open(at(30, 23)));
        assert!(!w.is_open(Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn normalize_source_trims_and_lowercases() {
        assert_eq!(normalize_source(Some("  Paste ")), "paste");
        assert_eq!(normalize_source(Some("CURRENT")), "current");
    }

    #[test]
    fn normalize_source_defaults_to_manual() {
        assert_eq!(normalize_source(None), "manual");
        assert_eq!(normalize_source(Some("")), "manual");
        assert_eq!(normalize_source(Some("   ")), "manual");
    }

    #[test]
    fn allowed_sources_normalized_and_deduplicated() {
        assert_eq!(
            parse_allowed_sources(Some("CURRENT, Paste ; paste")),
            vec![ValidationSource::Current, ValidationSource::Paste]
        );
    }

    #[test]
    fn allowed_sources_keep_first_seen_order() {
        assert_eq!(
            parse_allowed_sources(Some("manual;current")),
            vec![ValidationSource::Manual, ValidationSource::Current]
        );
    }

    #[test]
    fn allowed_sources_drop_unknown_tokens() {
        assert_eq!(
            parse_allowed_sources(Some("ocr, paste, ")),
            vec![ValidationSource::Paste]
        );
    }

    #[test]
    fn allowed_sources_fall_back_to_default_order() {
        let default = vec![
            ValidationSource::Current,
            ValidationSource::Paste,
            ValidationSource::Manual,
        ];
        assert_eq!(parse_allowed_sources(None), default);
        assert_eq!(parse_allowed_sources(Some("")), default);
        assert_eq!(parse_allowed_sources(Some("ocr; scan")), default);
    }
}
