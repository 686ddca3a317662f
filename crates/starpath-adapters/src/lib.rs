//! Record normalizers for the two SpaceX v4 collections, plus the thin API
//! client that turns API arrays into raw records.
//!
//! Normalization is total: a missing or malformed optional field becomes
//! `None` and shows up in the record's quality flag, never as an error.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use starpath_core::{
    classify_orbital_regime, resolve_active_status, EntityType, LaunchQuality, MissionType,
    NormalizedLaunch, NormalizedSatellite, RawRecord, SatelliteQuality, StatusEvidence,
    EARTH_RADIUS_KM,
};
use thiserror::Error;
use tracing::{info, info_span, warn};

pub const CRATE_NAME: &str = "starpath-adapters";

pub const SOURCE_TAG: &str = "spacex_api_v4";

// ---------------------------------------------------------------------------
// Field extraction helpers
// ---------------------------------------------------------------------------

fn json_at<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let mut cur = value;
    for segment in path {
        cur = cur.get(*segment)?;
    }
    Some(cur)
}

fn str_at(value: &JsonValue, path: &[&str]) -> Option<String> {
    json_at(value, path)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Numeric fields arrive as JSON numbers or as numeric strings depending on
/// the catalog vintage. Present-but-unparseable is a field-level defect:
/// the value becomes None, the record survives.
fn f64_at(value: &JsonValue, path: &[&str]) -> Option<f64> {
    match json_at(value, path)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn i64_at(value: &JsonValue, path: &[&str]) -> Option<i64> {
    match json_at(value, path)? {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn bool_at(value: &JsonValue, path: &[&str]) -> Option<bool> {
    json_at(value, path).and_then(JsonValue::as_bool)
}

/// The decayed flag keeps its upstream spelling so the status decision
/// table sees exactly what the source said.
fn raw_flag_at(value: &JsonValue, path: &[&str]) -> Option<String> {
    match json_at(value, path)? {
        JsonValue::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn date_at(value: &JsonValue, path: &[&str]) -> Option<NaiveDate> {
    str_at(value, path).and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

fn datetime_at(value: &JsonValue, path: &[&str]) -> Option<DateTime<Utc>> {
    str_at(value, path)
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Satellite normalizer
// ---------------------------------------------------------------------------

/// Normalize one raw Starlink payload. Pure function of the record and the
/// injected `today`; never fails on missing or malformed optional fields.
pub fn normalize_satellite(raw: &RawRecord, today: NaiveDate) -> NormalizedSatellite {
    let payload = &raw.payload;

    let name = str_at(payload, &["spaceTrack", "OBJECT_NAME"]);
    let launch_ref = str_at(payload, &["launch"]);
    let launch_date = date_at(payload, &["spaceTrack", "LAUNCH_DATE"]);

    let evidence = StatusEvidence {
        decayed_raw: raw_flag_at(payload, &["spaceTrack", "DECAYED"]),
        decay_date: str_at(payload, &["spaceTrack", "DECAY_DATE"]),
    };
    let is_active = resolve_active_status(&evidence);

    let semimajor_axis_km = f64_at(payload, &["spaceTrack", "SEMIMAJOR_AXIS"]);
    let altitude_km = semimajor_axis_km.map(|a| a - EARTH_RADIUS_KM);

    let quality_flag = satellite_quality(&name, &launch_ref, &evidence, &launch_date);

    NormalizedSatellite {
        satellite_id: raw.external_id.clone(),
        name,
        launch_ref,
        launch_date,
        is_active,
        inclination_deg: f64_at(payload, &["spaceTrack", "INCLINATION"]),
        semimajor_axis_km,
        period_min: f64_at(payload, &["spaceTrack", "PERIOD"]),
        apoapsis_km: f64_at(payload, &["spaceTrack", "APOAPSIS"]),
        periapsis_km: f64_at(payload, &["spaceTrack", "PERIAPSIS"]),
        latitude: f64_at(payload, &["latitude"]),
        longitude: f64_at(payload, &["longitude"]),
        height_km: f64_at(payload, &["height_km"]),
        velocity_kms: f64_at(payload, &["velocity_kms"]),
        catalog_id: i64_at(payload, &["spaceTrack", "NORAD_CAT_ID"]),
        decay_date_raw: evidence.decay_date.clone(),
        quality_flag,
        altitude_km,
        orbital_regime: classify_orbital_regime(altitude_km),
        age_days: launch_date.map(|d| (today - d).num_days()),
        extracted_at: raw.extracted_at,
    }
}

/// First matching condition wins, in this exact order.
fn satellite_quality(
    name: &Option<String>,
    launch_ref: &Option<String>,
    evidence: &StatusEvidence,
    launch_date: &Option<NaiveDate>,
) -> SatelliteQuality {
    if name.is_none() {
        SatelliteQuality::MissingSatelliteName
    } else if launch_ref.is_none() {
        SatelliteQuality::MissingLaunchReference
    } else if evidence.decayed_raw.is_none() && evidence.decay_date.is_none() {
        SatelliteQuality::MissingStatusInfo
    } else if launch_date.is_none() {
        SatelliteQuality::MissingLaunchDate
    } else {
        SatelliteQuality::Valid
    }
}

// ---------------------------------------------------------------------------
// Launch normalizer
// ---------------------------------------------------------------------------

/// Name-pattern batch sizes, checked in order, for Starlink missions only.
/// Early demo flights carried 2 test satellites; v1.0 batches 60; the
/// v2-mini profile 23; anything else defaults to a full production batch.
const BATCH_RULES: &[(&[&str], i64)] = &[
    (&["demo", "test", "tintin"], 2),
    (&["v1.0"], 60),
    (&["v2"], 23),
];

const DEFAULT_BATCH: i64 = 60;

pub fn is_starlink_mission(mission_name: Option<&str>) -> bool {
    mission_name
        .map(|n| n.to_ascii_lowercase().contains("starlink"))
        .unwrap_or(false)
}

pub fn estimated_batch_size(mission_name: Option<&str>, is_starlink: bool) -> i64 {
    if !is_starlink {
        return 0;
    }
    let lower = mission_name.unwrap_or_default().to_ascii_lowercase();
    for (needles, count) in BATCH_RULES {
        if needles.iter().any(|needle| lower.contains(needle)) {
            return *count;
        }
    }
    DEFAULT_BATCH
}

pub fn classify_mission_type(mission_name: Option<&str>, is_starlink: bool) -> MissionType {
    if is_starlink {
        return MissionType::Starlink;
    }
    let lower = mission_name.unwrap_or_default().to_ascii_lowercase();
    if lower.contains("crew") {
        MissionType::Crew
    } else if lower.contains("cargo") || lower.contains("crs") {
        MissionType::Cargo
    } else if lower.contains("satellite") {
        MissionType::CommercialSatellite
    } else {
        MissionType::Other
    }
}

/// Normalize one raw launch payload. Pure and total, like the satellite
/// variant.
pub fn normalize_launch(raw: &RawRecord) -> NormalizedLaunch {
    let payload = &raw.payload;

    let mission_name = str_at(payload, &["name"]);
    let launch_date_utc = datetime_at(payload, &["date_utc"]);
    let launch_success = bool_at(payload, &["success"]);
    let is_upcoming = bool_at(payload, &["upcoming"]);
    let rocket_ref = str_at(payload, &["rocket"]);

    let starlink = is_starlink_mission(mission_name.as_deref());
    let quality_flag = launch_quality(
        &mission_name,
        &launch_date_utc,
        launch_success,
        is_upcoming,
        &rocket_ref,
    );

    let date = launch_date_utc.map(|dt| dt.date_naive());

    NormalizedLaunch {
        launch_id: raw.external_id.clone(),
        estimated_satellite_count: estimated_batch_size(mission_name.as_deref(), starlink),
        mission_type: classify_mission_type(mission_name.as_deref(), starlink),
        is_starlink_mission: starlink,
        mission_name,
        launch_date_utc,
        launch_success,
        is_upcoming,
        rocket_ref,
        flight_number: i64_at(payload, &["flight_number"]),
        launchpad_ref: str_at(payload, &["launchpad"]),
        payload_count: json_at(payload, &["payloads"])
            .and_then(JsonValue::as_array)
            .map(Vec::len)
            .unwrap_or(0),
        quality_flag,
        launch_year: date.map(|d| chrono::Datelike::year(&d)),
        launch_month: date.map(|d| chrono::Datelike::month(&d)),
        launch_dow: date.map(|d| d.format("%A").to_string()),
        extracted_at: raw.extracted_at,
    }
}

/// First matching condition wins. A null success is only a defect on a
/// launch that already happened (`upcoming == false`).
fn launch_quality(
    mission_name: &Option<String>,
    launch_date_utc: &Option<DateTime<Utc>>,
    launch_success: Option<bool>,
    is_upcoming: Option<bool>,
    rocket_ref: &Option<String>,
) -> LaunchQuality {
    if launch_date_utc.is_none() {
        LaunchQuality::MissingLaunchDate
    } else if mission_name.is_none() {
        LaunchQuality::MissingMissionName
    } else if launch_success.is_none() && is_upcoming == Some(false) {
        LaunchQuality::MissingSuccessStatus
    } else if rocket_ref.is_none() {
        LaunchQuality::MissingRocketInfo
    } else {
        LaunchQuality::Valid
    }
}

// ---------------------------------------------------------------------------
// Raw record assembly + API client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ExtractBatch {
    pub records: Vec<RawRecord>,
    /// Items excluded for lacking the required `id` key. Counted, never
    /// silently dropped.
    pub rejected: usize,
}

/// Split an API response array into keyed raw records. Items without a
/// usable `id` are a structural defect and are excluded and counted.
pub fn parse_entity_array(
    body: &JsonValue,
    extracted_at: DateTime<Utc>,
    source_tag: &str,
) -> Result<ExtractBatch, ExtractError> {
    let items = body.as_array().ok_or(ExtractError::NotAnArray)?;

    let mut batch = ExtractBatch::default();
    for item in items {
        match str_at(item, &["id"]) {
            Some(external_id) => batch.records.push(RawRecord {
                external_id,
                payload: item.clone(),
                extracted_at,
                source_tag: source_tag.to_string(),
            }),
            None => batch.rejected += 1,
        }
    }
    if batch.rejected > 0 {
        warn!(rejected = batch.rejected, "excluded records without an external id");
    }
    Ok(batch)
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("building http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("response body for {url} is not a JSON array")]
    NotAnArrayAt { url: String },
    #[error("response body is not a JSON array")]
    NotAnArray,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: std::time::Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.spacexdata.com/v4".to_string(),
            user_agent: "starpath/0.1".to_string(),
            timeout: std::time::Duration::from_secs(60),
        }
    }
}

/// One GET per entity collection. Retry, backoff, and scheduling live with
/// the orchestrator, not here.
#[derive(Debug, Clone)]
pub struct SpacexClient {
    client: reqwest::Client,
    base_url: String,
}

impl SpacexClient {
    pub fn new(config: ClientConfig) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(ExtractError::Client)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn fetch_entity(
        &self,
        entity: EntityType,
        extracted_at: DateTime<Utc>,
    ) -> Result<ExtractBatch, ExtractError> {
        let url = format!("{}/{}", self.base_url, entity.api_path());
        let span = info_span!("api_fetch", entity = entity.as_str(), url = %url);
        let _guard = span.enter();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ExtractError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body: JsonValue = response
            .json()
            .await
            .map_err(|source| ExtractError::Request {
                url: url.clone(),
                source,
            })?;

        let batch = match parse_entity_array(&body, extracted_at, SOURCE_TAG) {
            Ok(batch) => batch,
            Err(ExtractError::NotAnArray) => return Err(ExtractError::NotAnArrayAt { url }),
            Err(other) => return Err(other),
        };
        info!(
            entity = entity.as_str(),
            records = batch.records.len(),
            rejected = batch.rejected,
            "fetched entity collection"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(payload: JsonValue) -> RawRecord {
        RawRecord {
            external_id: "test-id".to_string(),
            payload,
            extracted_at: DateTime::parse_from_rfc3339("2026-08-20T06:00:00Z")
                .expect("ts")
                .with_timezone(&Utc),
            source_tag: SOURCE_TAG.to_string(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 20).expect("date")
    }

    #[test]
    fn satellite_with_full_payload_is_valid() {
        let sat = normalize_satellite(
            &raw(json!({
                "launch": "launch-ref-1",
                "latitude": 44.3,
                "height_km": 547.1,
                "spaceTrack": {
                    "OBJECT_NAME": "STARLINK-1130",
                    "NORAD_CAT_ID": 44932,
                    "DECAYED": 0,
                    "LAUNCH_DATE": "2020-01-07",
                    "INCLINATION": 53.0,
                    "SEMIMAJOR_AXIS": 6925.3,
                    "PERIOD": 95.6
                }
            })),
            today(),
        );
        assert_eq!(sat.quality_flag, SatelliteQuality::Valid);
        assert!(sat.is_active);
        assert_eq!(sat.name.as_deref(), Some("STARLINK-1130"));
        assert_eq!(sat.catalog_id, Some(44932));
        assert_eq!(sat.orbital_regime, starpath_core::OrbitalRegime::Leo);
        let altitude = sat.altitude_km.expect("altitude");
        assert!((altitude - 554.3).abs() < 1e-9);
        let age = sat.age_days.expect("age");
        assert_eq!(
            age,
            (today() - NaiveDate::from_ymd_opt(2020, 1, 7).expect("date")).num_days()
        );
    }

    #[test]
    fn decayed_string_spellings_drive_status() {
        for (spelling, active) in [
            (json!("0"), true),
            (json!("false"), true),
            (json!("False"), true),
            (json!("1"), false),
            (json!("true"), false),
            (json!("True"), false),
            (json!(0), true),
            (json!(1), false),
        ] {
            let sat = normalize_satellite(
                &raw(json!({ "spaceTrack": { "DECAYED": spelling } })),
                today(),
            );
            assert_eq!(sat.is_active, active, "spelling {spelling:?}");
        }
    }

    #[test]
    fn decay_date_presence_is_status_fallback() {
        let active = normalize_satellite(&raw(json!({ "spaceTrack": {} })), today());
        assert!(active.is_active);

        let inactive = normalize_satellite(
            &raw(json!({ "spaceTrack": { "DECAY_DATE": "2021-06-01" } })),
            today(),
        );
        assert!(!inactive.is_active);
        assert_eq!(inactive.decay_date_raw.as_deref(), Some("2021-06-01"));
    }

    #[test]
    fn unparseable_numerics_become_null_not_errors() {
        let sat = normalize_satellite(
            &raw(json!({
                "spaceTrack": {
                    "OBJECT_NAME": "STARLINK-26",
                    "SEMIMAJOR_AXIS": "not-a-number",
                    "INCLINATION": "53.0",
                    "PERIOD": null
                }
            })),
            today(),
        );
        assert_eq!(sat.semimajor_axis_km, None);
        assert_eq!(sat.altitude_km, None);
        assert_eq!(sat.orbital_regime, starpath_core::OrbitalRegime::Unknown);
        assert_eq!(sat.inclination_deg, Some(53.0));
        assert_eq!(sat.period_min, None);
    }

    #[test]
    fn satellite_quality_chain_order() {
        let no_name = normalize_satellite(&raw(json!({})), today());
        assert_eq!(no_name.quality_flag, SatelliteQuality::MissingSatelliteName);

        let no_launch_ref = normalize_satellite(
            &raw(json!({ "spaceTrack": { "OBJECT_NAME": "STARLINK-1" } })),
            today(),
        );
        assert_eq!(
            no_launch_ref.quality_flag,
            SatelliteQuality::MissingLaunchReference
        );

        let no_status = normalize_satellite(
            &raw(json!({
                "launch": "l1",
                "spaceTrack": { "OBJECT_NAME": "STARLINK-1", "LAUNCH_DATE": "2020-01-07" }
            })),
            today(),
        );
        assert_eq!(no_status.quality_flag, SatelliteQuality::MissingStatusInfo);

        let no_date = normalize_satellite(
            &raw(json!({
                "launch": "l1",
                "spaceTrack": { "OBJECT_NAME": "STARLINK-1", "DECAYED": 0 }
            })),
            today(),
        );
        assert_eq!(no_date.quality_flag, SatelliteQuality::MissingLaunchDate);
    }

    #[test]
    fn starlink_classification_per_name_patterns() {
        let v2_mini = normalize_launch(&raw(json!({
            "name": "Starlink V2 Mini",
            "date_utc": "2023-02-27T23:13:00.000Z",
            "success": true, "upcoming": false, "rocket": "falcon9"
        })));
        assert!(v2_mini.is_starlink_mission);
        assert_eq!(v2_mini.estimated_satellite_count, 23);

        let crs = normalize_launch(&raw(json!({
            "name": "CRS-21",
            "date_utc": "2020-12-06T16:17:00.000Z",
            "success": true, "upcoming": false, "rocket": "falcon9"
        })));
        assert!(!crs.is_starlink_mission);
        assert_eq!(crs.estimated_satellite_count, 0);
        assert_eq!(crs.mission_type, MissionType::Cargo);

        let demo = normalize_launch(&raw(json!({
            "name": "Starlink Demo-2",
            "date_utc": "2019-11-11T14:56:00.000Z",
            "success": true, "upcoming": false, "rocket": "falcon9"
        })));
        assert_eq!(demo.estimated_satellite_count, 2);

        let v1 = normalize_launch(&raw(json!({
            "name": "Starlink V1.0 L3",
            "date_utc": "2020-01-07T02:19:00.000Z",
            "success": true, "upcoming": false, "rocket": "falcon9"
        })));
        assert_eq!(v1.estimated_satellite_count, 60);

        let unversioned = normalize_launch(&raw(json!({
            "name": "Starlink Group 6-14",
            "date_utc": "2023-09-01T00:00:00.000Z",
            "success": true, "upcoming": false, "rocket": "falcon9"
        })));
        assert_eq!(unversioned.estimated_satellite_count, 60);
    }

    #[test]
    fn mission_type_display_groups() {
        for (name, expected) in [
            ("Crew-5", MissionType::Crew),
            ("SpX CRS-25 Cargo", MissionType::Cargo),
            ("SXM-7 Satellite", MissionType::CommercialSatellite),
            ("Transporter-3", MissionType::Other),
        ] {
            assert_eq!(classify_mission_type(Some(name), false), expected, "{name}");
        }
        assert_eq!(classify_mission_type(Some("anything"), true), MissionType::Starlink);
    }

    #[test]
    fn launch_quality_chain_order() {
        let no_date = normalize_launch(&raw(json!({ "name": "Starlink" })));
        assert_eq!(no_date.quality_flag, LaunchQuality::MissingLaunchDate);

        let no_name = normalize_launch(&raw(json!({ "date_utc": "2020-01-07T02:19:00.000Z" })));
        assert_eq!(no_name.quality_flag, LaunchQuality::MissingMissionName);

        let flown_without_outcome = normalize_launch(&raw(json!({
            "name": "Starlink V1.0 L9",
            "date_utc": "2020-06-04T01:25:00.000Z",
            "upcoming": false,
            "rocket": "falcon9"
        })));
        assert_eq!(
            flown_without_outcome.quality_flag,
            LaunchQuality::MissingSuccessStatus
        );

        let upcoming_without_outcome = normalize_launch(&raw(json!({
            "name": "Starlink Group 8-1",
            "date_utc": "2026-10-01T00:00:00.000Z",
            "upcoming": true,
            "rocket": "falcon9"
        })));
        assert_eq!(upcoming_without_outcome.quality_flag, LaunchQuality::Valid);

        let no_rocket = normalize_launch(&raw(json!({
            "name": "Starlink V1.0 L9",
            "date_utc": "2020-06-04T01:25:00.000Z",
            "success": true,
            "upcoming": false
        })));
        assert_eq!(no_rocket.quality_flag, LaunchQuality::MissingRocketInfo);
    }

    #[test]
    fn launch_derived_calendar_fields() {
        let launch = normalize_launch(&raw(json!({
            "name": "Starlink V1.0 L3",
            "date_utc": "2020-01-07T02:19:00.000Z",
            "success": true, "upcoming": false, "rocket": "falcon9",
            "flight_number": 88,
            "launchpad": "ccafs-slc40",
            "payloads": ["p1", "p2"]
        })));
        assert_eq!(launch.launch_year, Some(2020));
        assert_eq!(launch.launch_month, Some(1));
        assert_eq!(launch.launch_dow.as_deref(), Some("Tuesday"));
        assert_eq!(launch.flight_number, Some(88));
        assert_eq!(launch.payload_count, 2);
    }

    #[test]
    fn entity_array_excludes_and_counts_idless_items() {
        let body = json!([
            { "id": "a", "name": "one" },
            { "name": "no id" },
            { "id": "", "name": "blank id" },
            { "id": "b" }
        ]);
        let batch = parse_entity_array(
            &body,
            DateTime::parse_from_rfc3339("2026-08-20T06:00:00Z")
                .expect("ts")
                .with_timezone(&Utc),
            SOURCE_TAG,
        )
        .expect("parse");
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.rejected, 2);
        assert_eq!(batch.records[0].external_id, "a");
        assert_eq!(batch.records[0].source_tag, SOURCE_TAG);
    }

    #[test]
    fn non_array_body_is_an_error() {
        let err = parse_entity_array(&json!({ "error": "rate limited" }), Utc::now(), SOURCE_TAG)
            .expect_err("object body must fail");
        assert!(matches!(err, ExtractError::NotAnArray));
    }
}
