//! Purpose: Timezone database capability used when loading named-zone timestamps.
//! Exports: `ZoneRules`, `ZoneResolver`, `NamedZone`, `Tzdb`, `StaticZones`.
//! Role: Keeps codec logic independent of any particular zone database.
//! Invariants: An unresolvable key yields `None`; callers never substitute UTC.
//! Invariants: Named zones compare by key, not by offset.
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::core::timestamp::UTC_SENTINEL;

/// Offset rules for one named zone.
pub trait ZoneRules: Send + Sync {
    fn key(&self) -> &str;
    fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset;
}

pub trait ZoneResolver: Send + Sync {
    fn resolve(&self, key: &str) -> Option<NamedZone>;
}

#[derive(Clone)]
pub struct NamedZone {
    rules: Arc<dyn ZoneRules>,
}

impl NamedZone {
    pub fn new(rules: Arc<dyn ZoneRules>) -> Self {
        Self { rules }
    }

    pub fn key(&self) -> &str {
        self.rules.key()
    }

    pub fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        self.rules.offset_at(instant)
    }
}

impl PartialEq for NamedZone {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for NamedZone {}

impl fmt::Debug for NamedZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedZone").field(&self.key()).finish()
    }
}

/// IANA zone database bundled with `time-tz`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Tzdb;

struct TzdbZone {
    tz: &'static time_tz::Tz,
}

impl ZoneRules for TzdbZone {
    fn key(&self) -> &str {
        self.tz.name()
    }

    fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        self.tz.get_offset_utc(&instant).to_utc()
    }
}

impl ZoneResolver for Tzdb {
    fn resolve(&self, key: &str) -> Option<NamedZone> {
        time_tz::timezones::get_by_name(key).map(|tz| NamedZone::new(Arc::new(TzdbZone { tz })))
    }
}

/// Explicit table of fixed-rule zones. An empty table resolves nothing.
#[derive(Clone, Debug, Default)]
pub struct StaticZones {
    zones: BTreeMap<String, UtcOffset>,
}

struct FixedRules {
    key: String,
    offset: UtcOffset,
}

impl ZoneRules for FixedRules {
    fn key(&self) -> &str {
        &self.key
    }

    fn offset_at(&self, _instant: OffsetDateTime) -> UtcOffset {
        self.offset
    }
}

impl StaticZones {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key`. The UTC sentinel `"Z"` is never resolved as a named zone.
    pub fn with_zone(mut self, key: impl Into<String>, offset: UtcOffset) -> Self {
        self.zones.insert(key.into(), offset);
        self
    }
}

impl ZoneResolver for StaticZones {
    fn resolve(&self, key: &str) -> Option<NamedZone> {
        if key == UTC_SENTINEL {
            return None;
        }
        self.zones.get(key).map(|offset| {
            NamedZone::new(Arc::new(FixedRules {
                key: key.to_string(),
                offset: *offset,
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{StaticZones, Tzdb, ZoneResolver};
    use time::UtcOffset;
    use time::macros::datetime;

    #[test]
    fn tzdb_tracks_daylight_saving() {
        let berlin = Tzdb.resolve("Europe/Berlin").expect("zone");
        assert_eq!(berlin.key(), "Europe/Berlin");
        let winter = berlin.offset_at(datetime!(2021-01-15 12:00 UTC));
        let summer = berlin.offset_at(datetime!(2021-07-15 12:00 UTC));
        assert_eq!(winter.whole_hours(), 1);
        assert_eq!(summer.whole_hours(), 2);
    }

    #[test]
    fn tzdb_rejects_unknown_keys() {
        assert!(Tzdb.resolve("Mars/Olympus_Mons").is_none());
    }

    #[test]
    fn static_zones_resolve_only_listed_keys() {
        let offset = UtcOffset::from_hms(5, 30, 0).expect("offset");
        let zones = StaticZones::new().with_zone("Asia/Kolkata", offset);
        let zone = zones.resolve("Asia/Kolkata").expect("zone");
        assert_eq!(zone.offset_at(datetime!(2000-01-01 0:00 UTC)), offset);
        assert!(zones.resolve("Europe/Berlin").is_none());
        assert!(StaticZones::new().resolve("Asia/Kolkata").is_none());
    }

    #[test]
    fn named_zones_compare_by_key() {
        let a = Tzdb.resolve("America/New_York").expect("zone");
        let b = Tzdb.resolve("America/New_York").expect("zone");
        let fixed = StaticZones::new()
            .with_zone("America/New_York", UtcOffset::from_hms(-5, 0, 0).expect("offset"))
            .resolve("America/New_York")
            .expect("zone");
        assert_eq!(a, b);
        assert_eq!(a, fixed);
        assert_ne!(a, Tzdb.resolve("Europe/Berlin").expect("zone"));
    }

    #[test]
    fn static_zones_never_shadow_the_utc_sentinel() {
        let zones = StaticZones::new().with_zone("Z", UtcOffset::from_hms(1, 0, 0).expect("offset"));
        assert!(zones.resolve("Z").is_none());
    }
}
