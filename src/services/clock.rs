use std::str::FromStr;

use chrono::{FixedOffset, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Evaluates "now" in the salon's timezone. Resolved once at startup: a named
/// IANA zone when the identifier is known, otherwise a fixed UTC+3 offset so
/// a bad config value degrades instead of failing every availability call.
#[derive(Debug, Clone, Copy)]
pub struct BusinessClock {
    zone: ZoneKind,
}

#[derive(Debug, Clone, Copy)]
enum ZoneKind {
    Named(Tz),
    Fixed(FixedOffset),
    Frozen(NaiveDateTime),
}

const FALLBACK_OFFSET_SECS: i32 = 3 * 3600;

impl BusinessClock {
    pub fn resolve(identifier: &str) -> Self {
        match Tz::from_str(identifier) {
            Ok(tz) => Self {
                zone: ZoneKind::Named(tz),
            },
            Err(_) => {
                tracing::warn!(
                    timezone = identifier,
                    "unknown timezone identifier, falling back to UTC+3"
                );
                Self {
                    zone: ZoneKind::Fixed(
                        FixedOffset::east_opt(FALLBACK_OFFSET_SECS)
                            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap()),
                    ),
                }
            }
        }
    }

    /// Clock pinned to one moment, for tests.
    pub fn fixed(at: NaiveDateTime) -> Self {
        Self {
            zone: ZoneKind::Frozen(at),
        }
    }

    /// Current wall-clock moment in the business timezone.
    pub fn now(&self) -> NaiveDateTime {
        match self.zone {
            ZoneKind::Named(tz) => Utc::now().with_timezone(&tz).naive_local(),
            ZoneKind::Fixed(offset) => Utc::now().with_timezone(&offset).naive_local(),
            ZoneKind::Frozen(at) => at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_resolve_named_zone() {
        let clock = BusinessClock::resolve("Europe/Istanbul");
        assert!(matches!(clock.zone, ZoneKind::Named(_)));
    }

    #[test]
    fn test_unknown_zone_falls_back_to_utc_plus_three() {
        let clock = BusinessClock::resolve("Mars/Olympus_Mons");
        match clock.zone {
            ZoneKind::Fixed(offset) => assert_eq!(offset.local_minus_utc(), 3 * 3600),
            _ => panic!("expected fixed-offset fallback"),
        }
    }

    #[test]
    fn test_istanbul_matches_fallback_offset() {
        // Istanbul is permanently UTC+3 since 2016, so the named zone and the
        // fallback must agree to the minute.
        let named = BusinessClock::resolve("Europe/Istanbul").now();
        let fixed = BusinessClock::resolve("not-a-zone").now();
        assert!((named - fixed).abs() < Duration::seconds(5));
    }
}
