//! Core domain model for Starpath: raw record envelope, normalized record
//! types, classification rules, and the injected clock.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const CRATE_NAME: &str = "starpath-core";

/// Mean Earth radius used to derive altitude from the semi-major axis.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Entity collections the raw store keeps, one directory each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Satellites,
    Launches,
    Rockets,
}

impl EntityType {
    /// Every collection, in extraction order. Extraction and store
    /// summaries iterate this so no entity is fetched but never reported,
    /// or reported but never fetched.
    pub const ALL: [EntityType; 3] = [
        EntityType::Satellites,
        EntityType::Launches,
        EntityType::Rockets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Satellites => "satellites",
            EntityType::Launches => "launches",
            EntityType::Rockets => "rockets",
        }
    }

    /// SpaceX v4 API path segment for this collection.
    pub fn api_path(&self) -> &'static str {
        match self {
            EntityType::Satellites => "starlink",
            EntityType::Launches => "launches",
            EntityType::Rockets => "rockets",
        }
    }
}

/// Opaque semi-structured payload as extracted, keyed by the upstream ID.
/// Immutable once written; re-extraction supersedes, never mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub external_id: String,
    pub payload: JsonValue,
    pub extracted_at: DateTime<Utc>,
    pub source_tag: String,
}

/// Why a normalized satellite record is incomplete, or `Valid`.
/// Checked in declaration order; the first matching condition wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SatelliteQuality {
    MissingSatelliteName,
    MissingLaunchReference,
    MissingStatusInfo,
    MissingLaunchDate,
    Valid,
}

/// Why a normalized launch record is incomplete, or `Valid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchQuality {
    MissingLaunchDate,
    MissingMissionName,
    MissingSuccessStatus,
    MissingRocketInfo,
    Valid,
}

/// Coarse altitude-based orbit classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrbitalRegime {
    Leo,
    Meo,
    Geo,
    Unknown,
}

/// Altitude buckets: [160, 2000) LEO, [2000, 35786) MEO, [35786, ..) GEO.
/// Anything below 160 km or without a usable semi-major axis is Unknown.
pub fn classify_orbital_regime(altitude_km: Option<f64>) -> OrbitalRegime {
    match altitude_km {
        Some(alt) if (160.0..2000.0).contains(&alt) => OrbitalRegime::Leo,
        Some(alt) if (2000.0..35786.0).contains(&alt) => OrbitalRegime::Meo,
        Some(alt) if alt >= 35786.0 => OrbitalRegime::Geo,
        _ => OrbitalRegime::Unknown,
    }
}

/// Display-only mission grouping derived from the mission name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionType {
    Starlink,
    Crew,
    Cargo,
    CommercialSatellite,
    Other,
}

impl MissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionType::Starlink => "Starlink",
            MissionType::Crew => "Crew",
            MissionType::Cargo => "Cargo",
            MissionType::CommercialSatellite => "Commercial Satellite",
            MissionType::Other => "Other",
        }
    }
}

/// Upstream status fields a satellite payload may or may not carry.
/// The decayed flag is kept as raw text: the source mixes `"0"`, `"false"`,
/// `"False"`, bare numbers, and their inverses across catalog vintages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusEvidence {
    pub decayed_raw: Option<String>,
    pub decay_date: Option<String>,
}

/// One row of the active-status decision table.
#[derive(Debug, Clone, Copy)]
pub struct StatusRule {
    pub name: &'static str,
    pub applies: fn(&StatusEvidence) -> bool,
    pub is_active: bool,
}

/// Ordered fallback chain for `is_active`. Evaluated top to bottom, first
/// applicable rule wins. The last two rows are exhaustive, so resolution
/// always terminates. Kept as a table so the rule order stays auditable.
pub const STATUS_RULES: &[StatusRule] = &[
    StatusRule {
        name: "decayed_flag_clear",
        applies: |e| matches!(e.decayed_raw.as_deref(), Some("0" | "false" | "False")),
        is_active: true,
    },
    StatusRule {
        name: "decayed_flag_set",
        applies: |e| matches!(e.decayed_raw.as_deref(), Some("1" | "true" | "True")),
        is_active: false,
    },
    StatusRule {
        name: "decay_date_absent",
        applies: |e| e.decay_date.is_none(),
        is_active: true,
    },
    StatusRule {
        name: "decay_date_present",
        applies: |e| e.decay_date.is_some(),
        is_active: false,
    },
];

pub fn resolve_active_status(evidence: &StatusEvidence) -> bool {
    STATUS_RULES
        .iter()
        .find(|rule| (rule.applies)(evidence))
        .map(|rule| rule.is_active)
        .unwrap_or(false)
}

/// Typed, quality-scored projection of one raw satellite payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSatellite {
    pub satellite_id: String,
    pub name: Option<String>,
    pub launch_ref: Option<String>,
    pub launch_date: Option<NaiveDate>,
    pub is_active: bool,
    pub inclination_deg: Option<f64>,
    pub semimajor_axis_km: Option<f64>,
    pub period_min: Option<f64>,
    pub apoapsis_km: Option<f64>,
    pub periapsis_km: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub height_km: Option<f64>,
    pub velocity_kms: Option<f64>,
    pub catalog_id: Option<i64>,
    pub decay_date_raw: Option<String>,
    pub quality_flag: SatelliteQuality,
    pub altitude_km: Option<f64>,
    pub orbital_regime: OrbitalRegime,
    pub age_days: Option<i64>,
    pub extracted_at: DateTime<Utc>,
}

/// Typed, quality-scored projection of one raw launch payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLaunch {
    pub launch_id: String,
    pub mission_name: Option<String>,
    pub launch_date_utc: Option<DateTime<Utc>>,
    pub launch_success: Option<bool>,
    pub is_upcoming: Option<bool>,
    pub rocket_ref: Option<String>,
    pub flight_number: Option<i64>,
    pub launchpad_ref: Option<String>,
    pub is_starlink_mission: bool,
    pub estimated_satellite_count: i64,
    pub payload_count: usize,
    pub quality_flag: LaunchQuality,
    pub launch_year: Option<i32>,
    pub launch_month: Option<u32>,
    pub launch_dow: Option<String>,
    pub mission_type: MissionType,
    pub extracted_at: DateTime<Utc>,
}

/// How stale the most recent extraction is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Freshness {
    Fresh,
    Warning,
    Stale,
}

pub fn classify_freshness(data_age_hours: Option<f64>) -> Freshness {
    match data_age_hours {
        Some(age) if age <= 24.0 => Freshness::Fresh,
        Some(age) if age <= 48.0 => Freshness::Warning,
        _ => Freshness::Stale,
    }
}

/// Point-in-time reduction of the full normalized collections. Recomputed
/// each run; never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub as_of: DateTime<Utc>,
    pub total_satellites: usize,
    pub active_satellites: usize,
    pub inactive_satellites: usize,
    /// None when the collection is empty: an undefined ratio is signaled,
    /// never silently divided.
    pub active_pct: Option<f64>,
    pub first_launch_date: Option<DateTime<Utc>>,
    pub last_launch_date: Option<DateTime<Utc>>,
    pub avg_inclination_deg: Option<f64>,
    pub avg_altitude_km: Option<f64>,
    pub avg_period_min: Option<f64>,
    pub launches_last_30d: usize,
    pub satellites_deployed_last_30d: i64,
    pub data_age_hours: Option<f64>,
    pub freshness: Freshness,
}

/// Direction of the trailing launch pace vs the prior half-year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateTrend {
    Accelerating,
    Decelerating,
    Stable,
}

/// Historical and trailing-window launch-rate statistics over qualifying
/// Starlink launches (successful, dated, inside the 24-month window).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateStats {
    pub as_of: DateTime<Utc>,
    pub launches_24mo: usize,
    pub monthly_rate: f64,
    pub yearly_rate: f64,
    pub trailing_6mo_rate: f64,
    pub prior_6mo_rate: f64,
    pub trend: RateTrend,
    pub successes_12mo: usize,
    /// Successes over dated non-upcoming Starlink attempts in the window.
    /// None when there were no attempts.
    pub success_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scenario {
    Conservative,
    CurrentPace,
    Optimistic,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Conservative => "conservative",
            Scenario::CurrentPace => "current_pace",
            Scenario::Optimistic => "optimistic",
        }
    }
}

/// Coarse reliability label for the overall projection, driven by the
/// historical sample size behind the rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    InsufficientData,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskFactor {
    DataStaleness,
    LaunchReliability,
    PaceDeceleration,
    ScaleChallenge,
    LowRisk,
}

/// One forecast scenario outcome. Null fields mean the scenario is
/// undetermined (zero denominator or no qualifying history), not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub scenario: Scenario,
    pub launches_needed: Option<i64>,
    pub months_needed: Option<f64>,
    pub completion_date: Option<NaiveDate>,
    pub confidence: Confidence,
    pub risk_factor: RiskFactor,
}

/// Satellites-per-successful-launch figures feeding the scenarios.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerLaunchAverages {
    /// Actually deployed satellites divided by successful launch count.
    pub actual: Option<f64>,
    /// Mean of the name-pattern batch estimates.
    pub estimated: Option<f64>,
}

impl PerLaunchAverages {
    /// Actual figure when available, else the estimated average.
    pub fn resolved(&self) -> Option<f64> {
        self.actual.or(self.estimated)
    }
}

/// Injected time source. The analytic core never reads the system clock
/// directly; only binaries construct a `SystemClock`.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for deterministic tests and replayed runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
