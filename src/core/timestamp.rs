//! Purpose: Zone-aware timestamp value and its leaf codec.
//! Exports: `ZonedTimestamp`, `Zone`, `TimestampNode` (crate), `INSTANT_KEY`, `ZONE_KEY`, `UTC_SENTINEL`.
//! Role: Preserves both the absolute instant and the recorded zone identity across dump/load.
//! Invariants: Wire shape is `{"instant": <RFC 3339 UTC>, "zone": "Z" | minutes | key}`.
//! Invariants: Equality compares instant and zone identity; equal instants in different zones differ.
//! Invariants: Unknown zone keys fail with `UnknownTimezone`, never fall back to UTC.
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value as Json};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::core::codec::json_mismatch;
use crate::core::error::{Error, ErrorKind};
use crate::core::zone::{NamedZone, ZoneResolver};

pub const INSTANT_KEY: &str = "instant";
pub const ZONE_KEY: &str = "zone";
/// Zone encoding for UTC. Not a zone database key, so it never collides with `"UTC"`.
pub const UTC_SENTINEL: &str = "Z";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Zone {
    Utc,
    Fixed { minutes: i16 },
    Named(NamedZone),
}

impl Zone {
    pub fn offset_at(&self, instant: OffsetDateTime) -> Result<UtcOffset, Error> {
        match self {
            Zone::Utc => Ok(UtcOffset::UTC),
            Zone::Fixed { minutes } => fixed_offset(*minutes),
            Zone::Named(zone) => Ok(zone.offset_at(instant)),
        }
    }
}

fn fixed_offset(minutes: i16) -> Result<UtcOffset, Error> {
    UtcOffset::from_whole_seconds(i32::from(minutes) * 60).map_err(|err| {
        Error::new(ErrorKind::TypeMismatch)
            .with_message(format!("fixed offset of {minutes} minutes is out of range"))
            .with_source(err)
    })
}

/// An instant plus the zone it was recorded in.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ZonedTimestamp {
    local: OffsetDateTime,
    zone: Zone,
}

impl ZonedTimestamp {
    pub fn utc(instant: OffsetDateTime) -> Result<Self, Error> {
        Ok(Self {
            local: shift(instant, UtcOffset::UTC)?,
            zone: Zone::Utc,
        })
    }

    pub fn fixed(instant: OffsetDateTime, minutes: i16) -> Result<Self, Error> {
        let offset = fixed_offset(minutes)?;
        Ok(Self {
            local: shift(instant, offset)?,
            zone: Zone::Fixed { minutes },
        })
    }

    pub fn named(instant: OffsetDateTime, zone: NamedZone) -> Result<Self, Error> {
        let offset = zone.offset_at(instant);
        Ok(Self {
            local: shift(instant, offset)?,
            zone: Zone::Named(zone),
        })
    }

    pub fn in_zone(
        instant: OffsetDateTime,
        key: &str,
        zones: &dyn ZoneResolver,
    ) -> Result<Self, Error> {
        let zone = zones.resolve(key).ok_or_else(|| unknown_timezone(key))?;
        Self::named(instant, zone)
    }

    pub fn from_parts(instant: OffsetDateTime, zone: Zone) -> Result<Self, Error> {
        let offset = zone.offset_at(instant)?;
        Ok(Self {
            local: shift(instant, offset)?,
            zone,
        })
    }

    /// The instant expressed in UTC.
    pub fn instant(&self) -> OffsetDateTime {
        self.local.to_offset(UtcOffset::UTC)
    }

    /// Wall-clock time in the recorded zone.
    pub fn local(&self) -> OffsetDateTime {
        self.local
    }

    pub fn offset(&self) -> UtcOffset {
        self.local.offset()
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }
}

// Both the UTC instant and the local wall-clock time must stay inside the
// representable date range; `instant()` relies on the former.
fn shift(instant: OffsetDateTime, offset: UtcOffset) -> Result<OffsetDateTime, Error> {
    instant
        .checked_to_offset(UtcOffset::UTC)
        .and_then(|utc| utc.checked_to_offset(offset))
        .ok_or_else(|| {
            Error::new(ErrorKind::TypeMismatch).with_message(format!(
                "{instant} at offset {offset} is outside the supported date range"
            ))
        })
}

fn unknown_timezone(key: &str) -> Error {
    Error::new(ErrorKind::UnknownTimezone)
        .with_message(format!("zone `{key}` is not in the timezone database"))
        .with_hint("Install zone data for this key or load with a resolver that knows it.")
}

pub(crate) struct TimestampNode {
    zones: Arc<dyn ZoneResolver>,
}

impl fmt::Debug for TimestampNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampNode").finish_non_exhaustive()
    }
}

impl TimestampNode {
    pub(crate) fn new(zones: Arc<dyn ZoneResolver>) -> Self {
        Self { zones }
    }

    pub(crate) fn dump(&self, value: &ZonedTimestamp) -> Result<Json, Error> {
        let instant = value.instant().format(&Rfc3339).map_err(|err| {
            Error::new(ErrorKind::TypeMismatch)
                .with_message("timestamp is not representable in RFC 3339")
                .with_source(err)
        })?;
        let zone = match &value.zone {
            Zone::Utc => Json::from(UTC_SENTINEL),
            Zone::Fixed { minutes } => Json::from(*minutes),
            Zone::Named(zone) if zone.key() == UTC_SENTINEL => {
                return Err(Error::new(ErrorKind::TypeMismatch)
                    .with_message(format!("zone key `{UTC_SENTINEL}` is reserved for UTC"))
                    .at_field(ZONE_KEY));
            }
            Zone::Named(zone) => Json::from(zone.key()),
        };
        let mut map = Map::with_capacity(2);
        map.insert(INSTANT_KEY.to_string(), Json::String(instant));
        map.insert(ZONE_KEY.to_string(), zone);
        Ok(Json::Object(map))
    }

    pub(crate) fn load(&self, json: &Json) -> Result<ZonedTimestamp, Error> {
        let map = json
            .as_object()
            .ok_or_else(|| json_mismatch("timestamp object", json))?;
        for key in map.keys() {
            if key != INSTANT_KEY && key != ZONE_KEY {
                return Err(Error::new(ErrorKind::FieldMismatch)
                    .with_message(format!("undeclared timestamp key `{key}`")));
            }
        }

        let instant = match map.get(INSTANT_KEY) {
            Some(Json::String(text)) => OffsetDateTime::parse(text, &Rfc3339).map_err(|err| {
                Error::new(ErrorKind::TypeMismatch)
                    .with_message(format!("invalid RFC 3339 instant `{text}`"))
                    .with_source(err)
                    .at_field(INSTANT_KEY)
            })?,
            Some(other) => return Err(json_mismatch("string", other).at_field(INSTANT_KEY)),
            None => return Err(missing_key(INSTANT_KEY)),
        };

        let zone = match map.get(ZONE_KEY) {
            Some(Json::String(text)) if text == UTC_SENTINEL => Zone::Utc,
            Some(Json::String(key)) => self
                .zones
                .resolve(key)
                .map(Zone::Named)
                .ok_or_else(|| unknown_timezone(key).at_field(ZONE_KEY))?,
            Some(Json::Number(number)) => {
                let minutes = number
                    .as_i64()
                    .and_then(|minutes| i16::try_from(minutes).ok())
                    .ok_or_else(|| {
                        Error::new(ErrorKind::TypeMismatch)
                            .with_message(format!("invalid fixed offset `{number}`"))
                            .at_field(ZONE_KEY)
                    })?;
                Zone::Fixed { minutes }
            }
            Some(other) => {
                return Err(json_mismatch("zone sentinel, minutes, or key", other).at_field(ZONE_KEY));
            }
            None => return Err(missing_key(ZONE_KEY)),
        };

        ZonedTimestamp::from_parts(instant, zone).map_err(|err| err.at_field(ZONE_KEY))
    }
}

fn missing_key(key: &str) -> Error {
    Error::new(ErrorKind::FieldMismatch).with_message(format!("missing timestamp key `{key}`"))
}

#[cfg(test)]
mod tests {
    use super::{TimestampNode, Zone, ZonedTimestamp};
    use crate::core::error::ErrorKind;
    use crate::core::zone::{NamedZone, StaticZones, Tzdb, ZoneResolver, ZoneRules};
    use serde_json::json;
    use std::sync::Arc;
    use time::macros::datetime;
    use time::{OffsetDateTime, UtcOffset};

    fn node() -> TimestampNode {
        TimestampNode::new(Arc::new(Tzdb))
    }

    #[test]
    fn utc_uses_sentinel_and_keeps_nanoseconds() {
        let ts = ZonedTimestamp::utc(datetime!(1991-05-03 00:01:00.123456789 UTC)).expect("utc");
        let json = node().dump(&ts).expect("dump");
        assert_eq!(json["zone"], json!("Z"));
        assert_eq!(json["instant"], json!("1991-05-03T00:01:00.123456789Z"));
        assert_eq!(node().load(&json).expect("load"), ts);
    }

    #[test]
    fn fixed_offset_encodes_minutes() {
        let ts = ZonedTimestamp::fixed(datetime!(2020-06-01 10:00 UTC), 120).expect("fixed");
        assert_eq!(ts.local().hour(), 12);
        let json = node().dump(&ts).expect("dump");
        assert_eq!(json, json!({"instant": "2020-06-01T10:00:00Z", "zone": 120}));
        assert_eq!(node().load(&json).expect("load"), ts);
    }

    #[test]
    fn named_zone_restores_key_and_local_time() {
        let ts = ZonedTimestamp::in_zone(datetime!(1997-07-04 00:00:05 UTC), "Europe/Madrid", &Tzdb)
            .expect("zone");
        let json = node().dump(&ts).expect("dump");
        assert_eq!(json["zone"], json!("Europe/Madrid"));
        let loaded = node().load(&json).expect("load");
        assert_eq!(loaded, ts);
        assert_eq!(loaded.local().hour(), 2);
        assert!(matches!(loaded.zone(), Zone::Named(zone) if zone.key() == "Europe/Madrid"));
    }

    #[test]
    fn same_instant_in_different_zones_is_not_equal() {
        let instant = datetime!(2021-07-15 12:00 UTC);
        let utc = ZonedTimestamp::utc(instant).expect("utc");
        let fixed = ZonedTimestamp::fixed(instant, 0).expect("fixed");
        let named = ZonedTimestamp::in_zone(instant, "Europe/Berlin", &Tzdb).expect("zone");
        assert_eq!(utc.instant(), named.instant());
        assert_ne!(utc, fixed);
        assert_ne!(utc, named);
        assert_ne!(fixed, named);
    }

    #[test]
    fn unknown_zone_fails_instead_of_defaulting() {
        let json = json!({"instant": "2020-01-01T00:00:00Z", "zone": "Europe/Berlin"});
        let node = TimestampNode::new(Arc::new(StaticZones::new()));
        let err = node.load(&json).expect_err("unknown zone");
        assert_eq!(err.kind(), ErrorKind::UnknownTimezone);
        assert_eq!(err.location().as_deref(), Some("$.zone"));
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let cases = [
            (json!("2020-01-01T00:00:00Z"), ErrorKind::TypeMismatch),
            (json!({"instant": "2020-01-01T00:00:00Z"}), ErrorKind::FieldMismatch),
            (
                json!({"instant": "2020-01-01T00:00:00Z", "zone": "Z", "dst": true}),
                ErrorKind::FieldMismatch,
            ),
            (json!({"instant": "yesterday", "zone": "Z"}), ErrorKind::TypeMismatch),
            (json!({"instant": "2020-01-01T00:00:00Z", "zone": 99999}), ErrorKind::TypeMismatch),
            (json!({"instant": "2020-01-01T00:00:00Z", "zone": 3000}), ErrorKind::TypeMismatch),
            (json!({"instant": "2020-01-01T00:00:00Z", "zone": 1.5}), ErrorKind::TypeMismatch),
        ];
        for (json, kind) in cases {
            let err = node().load(&json).expect_err("malformed");
            assert_eq!(err.kind(), kind, "payload: {json}");
        }
    }

    #[test]
    fn resolver_is_only_consulted_for_named_zones() {
        let node = TimestampNode::new(Arc::new(StaticZones::new()));
        let json = json!({"instant": "2020-01-01T00:00:00Z", "zone": -300});
        let loaded = node.load(&json).expect("load");
        assert_eq!(loaded.zone(), &Zone::Fixed { minutes: -300 });
        assert!(StaticZones::new().resolve("UTC").is_none());
    }

    struct SentinelRules;

    impl ZoneRules for SentinelRules {
        fn key(&self) -> &str {
            "Z"
        }

        fn offset_at(&self, _instant: OffsetDateTime) -> UtcOffset {
            UtcOffset::UTC
        }
    }

    #[test]
    fn named_zone_may_not_use_utc_sentinel() {
        let zone = NamedZone::new(Arc::new(SentinelRules));
        let ts = ZonedTimestamp::named(datetime!(2020-01-01 0:00 UTC), zone).expect("named");
        let err = node().dump(&ts).expect_err("reserved key");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.location().as_deref(), Some("$.zone"));
    }

    #[test]
    fn offsets_past_the_last_representable_day_are_errors() {
        let edge = datetime!(9999-12-31 23:00 UTC);
        assert_eq!(
            ZonedTimestamp::fixed(edge, 120).expect_err("overflow").kind(),
            ErrorKind::TypeMismatch
        );
        assert!(ZonedTimestamp::fixed(edge, -120).is_ok());
        assert!(ZonedTimestamp::utc(edge).is_ok());
    }
}
