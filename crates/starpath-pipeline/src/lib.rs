//! Staged transformation and projection pipeline: status aggregation,
//! launch-rate analysis, multi-scenario forecasting, and run orchestration
//! with report + Parquet snapshot export.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{BooleanArray, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field as ArrowField, Schema};
use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use starpath_adapters::{normalize_launch, normalize_satellite};
use starpath_core::{
    classify_freshness, Clock, Confidence, EntityType, Freshness, LaunchQuality, NormalizedLaunch,
    NormalizedSatellite, PerLaunchAverages, ProjectionResult, RateStats, RateTrend, RiskFactor,
    Scenario, StatusSnapshot,
};
use starpath_store::RawRecordStore;
use tokio::fs;
use tracing::{info, info_span};
use uuid::Uuid;

pub const CRATE_NAME: &str = "starpath-pipeline";

/// Average Gregorian month length, used to spread fractional months over
/// calendar days when computing completion dates.
const DAYS_PER_MONTH: f64 = 30.4375;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Scenario constants. Injected, never embedded: the same engine serves
/// other constellations by swapping this struct.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Constellation size the business question asks about.
    pub target_satellites: i64,
    /// Known minimum batch size; the current-pace scenario never assumes
    /// fewer satellites per launch than this.
    pub current_pace_floor: f64,
    /// Improved-efficiency batch size assumed by the optimistic scenario.
    pub optimistic_per_launch: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            target_satellites: 42_000,
            current_pace_floor: 50.0,
            optimistic_per_launch: 70.0,
        }
    }
}

impl ProjectionConfig {
    /// Load from a YAML file; a missing file means defaults.
    pub fn load(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub store_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub projection_config_path: PathBuf,
    pub projection: ProjectionConfig,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        let projection_config_path = std::env::var("STARPATH_PROJECTION_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/projection.yaml"));
        let projection = ProjectionConfig::load(&projection_config_path)?;
        Ok(Self {
            store_dir: std::env::var("STARPATH_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/raw")),
            reports_dir: std::env::var("STARPATH_REPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./reports")),
            projection_config_path,
            projection,
        })
    }
}

// ---------------------------------------------------------------------------
// Status aggregator
// ---------------------------------------------------------------------------

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

/// Reduce the full normalized collections into one point-in-time snapshot.
/// Idempotent: same inputs and `as_of` give the same snapshot. Launches are
/// restricted to `quality_flag == Valid` before any launch-derived metric.
pub fn aggregate_status(
    satellites: &[NormalizedSatellite],
    launches: &[NormalizedLaunch],
    as_of: DateTime<Utc>,
) -> StatusSnapshot {
    let total = satellites.len();
    let active = satellites.iter().filter(|s| s.is_active).count();
    let inactive = total - active;
    let active_pct = (total > 0).then(|| round1(active as f64 / total as f64 * 100.0));

    let valid_launches: Vec<&NormalizedLaunch> = launches
        .iter()
        .filter(|l| l.quality_flag == LaunchQuality::Valid)
        .collect();
    // Launch history bounds come from launches that actually happened; a
    // dated upcoming launch must not push "last launch" into the future.
    let launch_dates = || {
        valid_launches
            .iter()
            .filter(|l| l.is_upcoming != Some(true))
            .filter_map(|l| l.launch_date_utc)
    };

    let active_sats = || satellites.iter().filter(|s| s.is_active);
    let window_start = as_of - Duration::days(30);
    let recent: Vec<&&NormalizedLaunch> = valid_launches
        .iter()
        .filter(|l| {
            l.launch_date_utc
                .map(|d| d > window_start && d <= as_of)
                .unwrap_or(false)
        })
        .collect();

    let last_extraction = satellites
        .iter()
        .map(|s| s.extracted_at)
        .chain(launches.iter().map(|l| l.extracted_at))
        .max();
    let data_age_hours =
        last_extraction.map(|t| (as_of - t).num_seconds() as f64 / 3600.0);

    StatusSnapshot {
        as_of,
        total_satellites: total,
        active_satellites: active,
        inactive_satellites: inactive,
        active_pct,
        first_launch_date: launch_dates().min(),
        last_launch_date: launch_dates().max(),
        avg_inclination_deg: mean(active_sats().filter_map(|s| s.inclination_deg)),
        avg_altitude_km: mean(active_sats().filter_map(|s| s.altitude_km)),
        avg_period_min: mean(active_sats().filter_map(|s| s.period_min)),
        launches_last_30d: recent.len(),
        satellites_deployed_last_30d: recent.iter().map(|l| l.estimated_satellite_count).sum(),
        data_age_hours,
        freshness: classify_freshness(data_age_hours),
    }
}

// ---------------------------------------------------------------------------
// Rate analyzer
// ---------------------------------------------------------------------------

fn months_back(as_of: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    as_of
        .checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Launch-rate statistics over the trailing 24 months of qualifying
/// launches: Starlink, successful, dated. Empty windows produce zero
/// rates, never a division by zero.
pub fn analyze_rates(launches: &[NormalizedLaunch], as_of: DateTime<Utc>) -> RateStats {
    let cutoff_24 = months_back(as_of, 24);
    let cutoff_12 = months_back(as_of, 12);
    let cutoff_6 = months_back(as_of, 6);

    let qualifying: Vec<DateTime<Utc>> = launches
        .iter()
        .filter(|l| l.is_starlink_mission && l.launch_success == Some(true))
        .filter_map(|l| l.launch_date_utc)
        .filter(|d| *d > cutoff_24 && *d <= as_of)
        .collect();

    let launches_24mo = qualifying.len();
    let trailing_6mo = qualifying.iter().filter(|d| **d > cutoff_6).count();
    let prior_6mo = qualifying
        .iter()
        .filter(|d| **d > cutoff_12 && **d <= cutoff_6)
        .count();
    let successes_12mo = qualifying.iter().filter(|d| **d > cutoff_12).count();

    let trailing_6mo_rate = trailing_6mo as f64 / 6.0;
    let prior_6mo_rate = prior_6mo as f64 / 6.0;
    let trend = match trailing_6mo_rate.partial_cmp(&prior_6mo_rate) {
        Some(std::cmp::Ordering::Greater) => RateTrend::Accelerating,
        Some(std::cmp::Ordering::Less) => RateTrend::Decelerating,
        _ => RateTrend::Stable,
    };

    // Reliability: Starlink attempts with a known outcome in the same
    // window. Upcoming launches have no outcome yet, so they stay out of
    // both sides of the ratio.
    let mut attempts = 0usize;
    let mut successes = 0usize;
    for launch in launches.iter().filter(|l| {
        l.is_starlink_mission
            && l.is_upcoming != Some(true)
            && l.launch_date_utc
                .map(|d| d > cutoff_24 && d <= as_of)
                .unwrap_or(false)
    }) {
        match launch.launch_success {
            Some(true) => {
                attempts += 1;
                successes += 1;
            }
            Some(false) => attempts += 1,
            None => {}
        }
    }
    let success_rate = (attempts > 0).then(|| successes as f64 / attempts as f64);

    RateStats {
        as_of,
        launches_24mo,
        monthly_rate: launches_24mo as f64 / 24.0,
        yearly_rate: launches_24mo as f64 / 2.0,
        trailing_6mo_rate,
        prior_6mo_rate,
        trend,
        successes_12mo,
        success_rate,
    }
}

// ---------------------------------------------------------------------------
// Projection engine
// ---------------------------------------------------------------------------

/// Satellites-per-successful-launch figures: the observed ratio when there
/// is history, and the name-pattern estimate as fallback.
pub fn per_launch_averages(
    active_satellites: usize,
    launches: &[NormalizedLaunch],
) -> PerLaunchAverages {
    let successful = launches
        .iter()
        .filter(|l| l.is_starlink_mission && l.launch_success == Some(true))
        .count();
    let actual = (successful > 0 && active_satellites > 0)
        .then(|| active_satellites as f64 / successful as f64);
    let estimated = mean(
        launches
            .iter()
            .filter(|l| l.is_starlink_mission)
            .map(|l| l.estimated_satellite_count as f64),
    );
    PerLaunchAverages { actual, estimated }
}

pub fn grade_confidence(rates: &RateStats) -> Confidence {
    if rates.launches_24mo >= 24 && rates.successes_12mo >= 6 {
        Confidence::High
    } else if rates.launches_24mo >= 12 && rates.successes_12mo >= 3 {
        Confidence::Medium
    } else if rates.launches_24mo >= 6 {
        Confidence::Low
    } else {
        Confidence::InsufficientData
    }
}

/// First matching risk wins, in this order.
pub fn assess_risk(
    snapshot: &StatusSnapshot,
    rates: &RateStats,
    satellites_still_needed: i64,
) -> RiskFactor {
    if snapshot.freshness == Freshness::Stale {
        RiskFactor::DataStaleness
    } else if rates.success_rate.map(|r| r < 0.90).unwrap_or(false) {
        RiskFactor::LaunchReliability
    } else if rates.trend == RateTrend::Decelerating {
        RiskFactor::PaceDeceleration
    } else if satellites_still_needed > snapshot.total_satellites as i64 {
        RiskFactor::ScaleChallenge
    } else {
        RiskFactor::LowRisk
    }
}

/// Apply a fractional month offset as a calendar shift: whole months first,
/// then the remainder as days. None on overflow or absurd horizons.
fn add_fractional_months(date: NaiveDate, months: f64) -> Option<NaiveDate> {
    if !months.is_finite() || !(0.0..=1.0e5).contains(&months) {
        return None;
    }
    let whole = months.trunc() as u32;
    let extra_days = (months.fract() * DAYS_PER_MONTH).round() as i64;
    date.checked_add_months(Months::new(whole))?
        .checked_add_signed(Duration::days(extra_days))
}

fn max_available(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

struct ScenarioInputs {
    scenario: Scenario,
    per_launch: Option<f64>,
    monthly_rate: f64,
}

/// Forward projection to the configured target, one result per scenario.
/// Pure: identical inputs produce identical output sequences. Undetermined
/// denominators yield null scenario fields, never an error or a made-up
/// fallback.
pub fn project(
    snapshot: &StatusSnapshot,
    rates: &RateStats,
    config: &ProjectionConfig,
    averages: &PerLaunchAverages,
    today: NaiveDate,
) -> Vec<ProjectionResult> {
    let needed = config.target_satellites - snapshot.active_satellites as i64;
    let confidence = grade_confidence(rates);
    let risk_factor = assess_risk(snapshot, rates, needed);

    let scenarios = [
        ScenarioInputs {
            scenario: Scenario::Conservative,
            per_launch: max_available(averages.actual, averages.estimated),
            monthly_rate: rates.monthly_rate,
        },
        ScenarioInputs {
            scenario: Scenario::CurrentPace,
            per_launch: Some(
                averages
                    .resolved()
                    .map_or(config.current_pace_floor, |v| v.max(config.current_pace_floor)),
            ),
            monthly_rate: rates.trailing_6mo_rate,
        },
        ScenarioInputs {
            scenario: Scenario::Optimistic,
            per_launch: Some(config.optimistic_per_launch),
            monthly_rate: rates.monthly_rate.max(rates.trailing_6mo_rate),
        },
    ];

    scenarios
        .into_iter()
        .map(|inputs| {
            if needed <= 0 {
                // Target already met: zero remaining work, not an error.
                return ProjectionResult {
                    scenario: inputs.scenario,
                    launches_needed: Some(0),
                    months_needed: Some(0.0),
                    completion_date: Some(today),
                    confidence,
                    risk_factor,
                };
            }

            let launches_needed = inputs
                .per_launch
                .filter(|rate| *rate > 0.0)
                .map(|rate| (needed as f64 / rate).ceil() as i64);
            let months_needed = launches_needed
                .filter(|_| inputs.monthly_rate > 0.0)
                .map(|launches| launches as f64 / inputs.monthly_rate);
            let completion_date =
                months_needed.and_then(|months| add_fractional_months(today, months));

            ProjectionResult {
                scenario: inputs.scenario,
                launches_needed,
                months_needed,
                completion_date,
                confidence,
                risk_factor,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Run orchestration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub satellites_normalized: usize,
    pub launches_normalized: usize,
    /// Raw records excluded for a missing external ID.
    pub structural_rejects: usize,
    pub snapshot: StatusSnapshot,
    pub rates: RateStats,
    pub averages: PerLaunchAverages,
    pub projections: Vec<ProjectionResult>,
    pub reports_dir: String,
    pub parquet_manifest: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParquetManifest {
    pub schema_version: u32,
    pub files: Vec<ParquetManifestFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParquetManifestFile {
    pub name: String,
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

pub struct Pipeline {
    config: PipelineConfig,
    store: RawRecordStore,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, clock: Arc<dyn Clock>) -> Self {
        let store = RawRecordStore::new(config.store_dir.clone());
        Self {
            config,
            store,
            clock,
        }
    }

    pub fn store(&self) -> &RawRecordStore {
        &self.store
    }

    /// One complete pipeline execution over the current raw snapshot:
    /// normalize, aggregate, analyze, project, report.
    pub async fn run_once(&self) -> Result<RunSummary> {
        let started_at = self.clock.now();
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id);
        let _guard = span.enter();

        let raw_satellites = self
            .store
            .fetch_all(EntityType::Satellites)
            .await
            .context("loading raw satellites")?;
        let raw_launches = self
            .store
            .fetch_all(EntityType::Launches)
            .await
            .context("loading raw launches")?;

        let as_of = started_at;
        let today = as_of.date_naive();

        let mut structural_rejects = 0usize;
        let satellites: Vec<NormalizedSatellite> = raw_satellites
            .iter()
            .filter(|r| {
                let ok = !r.external_id.trim().is_empty();
                if !ok {
                    structural_rejects += 1;
                }
                ok
            })
            .map(|r| normalize_satellite(r, today))
            .collect();
        let launches: Vec<NormalizedLaunch> = raw_launches
            .iter()
            .filter(|r| {
                let ok = !r.external_id.trim().is_empty();
                if !ok {
                    structural_rejects += 1;
                }
                ok
            })
            .map(normalize_launch)
            .collect();

        let snapshot = aggregate_status(&satellites, &launches, as_of);
        let rates = analyze_rates(&launches, as_of);
        let averages = per_launch_averages(snapshot.active_satellites, &launches);
        let projections = project(&snapshot, &rates, &self.config.projection, &averages, today);

        info!(
            satellites = satellites.len(),
            launches = launches.len(),
            active = snapshot.active_satellites,
            monthly_rate = rates.monthly_rate,
            "pipeline stages complete"
        );

        let reports_dir = self.config.reports_dir.join(run_id.to_string());
        write_reports(&reports_dir, &snapshot, &rates, &averages, &projections)
            .await
            .context("writing run reports")?;
        let manifest_path =
            export_parquet_snapshots(&reports_dir, &satellites, &launches, &projections)
                .await
                .context("exporting parquet snapshots")?;

        let finished_at = self.clock.now();
        Ok(RunSummary {
            run_id,
            started_at,
            finished_at,
            satellites_normalized: satellites.len(),
            launches_normalized: launches.len(),
            structural_rejects,
            snapshot,
            rates,
            averages,
            projections,
            reports_dir: reports_dir.display().to_string(),
            parquet_manifest: manifest_path.display().to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

fn fmt_opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "undetermined".to_string())
}

async fn write_reports(
    reports_dir: &PathBuf,
    snapshot: &StatusSnapshot,
    rates: &RateStats,
    averages: &PerLaunchAverages,
    projections: &[ProjectionResult],
) -> Result<()> {
    fs::create_dir_all(reports_dir)
        .await
        .with_context(|| format!("creating {}", reports_dir.display()))?;

    let mut scenario_lines = Vec::new();
    for p in projections {
        scenario_lines.push(format!(
            "- **{}**: launches needed {}, months {}, completion {}",
            p.scenario.as_str(),
            fmt_opt(&p.launches_needed),
            fmt_opt(&p.months_needed.map(round1)),
            fmt_opt(&p.completion_date),
        ));
    }
    let headline = projections.first();
    let report = format!(
        "# Constellation Status Report\n\n\
         - As of: {}\n\
         - Satellites: {} total, {} active, {} inactive (active {}%)\n\
         - Launches last 30 days: {} ({} satellites deployed)\n\
         - Monthly launch rate (24mo): {:.2}, trailing 6mo: {:.2}, trend: {:?}\n\
         - Data freshness: {:?} ({} h)\n\
         - Confidence: {:?}, risk: {:?}\n\n\
         ## Scenarios\n{}\n",
        snapshot.as_of,
        snapshot.total_satellites,
        snapshot.active_satellites,
        snapshot.inactive_satellites,
        fmt_opt(&snapshot.active_pct),
        snapshot.launches_last_30d,
        snapshot.satellites_deployed_last_30d,
        rates.monthly_rate,
        rates.trailing_6mo_rate,
        rates.trend,
        snapshot.freshness,
        fmt_opt(&snapshot.data_age_hours.map(round1)),
        headline.map(|p| p.confidence).unwrap_or(Confidence::InsufficientData),
        headline.map(|p| p.risk_factor).unwrap_or(RiskFactor::LowRisk),
        scenario_lines.join("\n"),
    );
    fs::write(reports_dir.join("status_report.md"), report)
        .await
        .context("writing status_report.md")?;

    let projection_json = serde_json::to_vec_pretty(&serde_json::json!({
        "snapshot": snapshot,
        "rates": rates,
        "averages": averages,
        "projections": projections,
    }))
    .context("serializing projection output")?;
    fs::write(reports_dir.join("projection.json"), projection_json)
        .await
        .context("writing projection.json")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet snapshot export
// ---------------------------------------------------------------------------

async fn export_parquet_snapshots(
    reports_dir: &PathBuf,
    satellites: &[NormalizedSatellite],
    launches: &[NormalizedLaunch],
    projections: &[ProjectionResult],
) -> Result<PathBuf> {
    let snapshot_dir = reports_dir.join("snapshots");
    fs::create_dir_all(&snapshot_dir)
        .await
        .with_context(|| format!("creating {}", snapshot_dir.display()))?;

    let satellites_path = snapshot_dir.join("satellites.parquet");
    let launches_path = snapshot_dir.join("launches.parquet");
    let projections_path = snapshot_dir.join("projections.parquet");

    write_satellites_parquet(&satellites_path, satellites)?;
    write_launches_parquet(&launches_path, launches)?;
    write_projections_parquet(&projections_path, projections)?;

    let manifest = ParquetManifest {
        schema_version: 1,
        files: vec![
            manifest_entry("satellites", reports_dir, &satellites_path)?,
            manifest_entry("launches", reports_dir, &launches_path)?,
            manifest_entry("projections", reports_dir, &projections_path)?,
        ],
    };
    let manifest_path = snapshot_dir.join("manifest.json");
    let bytes = serde_json::to_vec_pretty(&manifest).context("serializing parquet manifest")?;
    fs::write(&manifest_path, bytes)
        .await
        .with_context(|| format!("writing {}", manifest_path.display()))?;
    Ok(manifest_path)
}

fn write_parquet(path: &PathBuf, batch: RecordBatch) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .with_context(|| format!("opening parquet writer {}", path.display()))?;
    writer
        .write(&batch)
        .with_context(|| format!("writing record batch {}", path.display()))?;
    writer
        .close()
        .with_context(|| format!("closing parquet writer {}", path.display()))?;
    Ok(())
}

fn write_satellites_parquet(path: &PathBuf, satellites: &[NormalizedSatellite]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        ArrowField::new("satellite_id", DataType::Utf8, false),
        ArrowField::new("name", DataType::Utf8, true),
        ArrowField::new("is_active", DataType::Boolean, false),
        ArrowField::new("quality_flag", DataType::Utf8, false),
        ArrowField::new("orbital_regime", DataType::Utf8, false),
        ArrowField::new("altitude_km", DataType::Float64, true),
        ArrowField::new("launch_date", DataType::Utf8, true),
        ArrowField::new("age_days", DataType::Int64, true),
    ]));

    let ids = StringArray::from(
        satellites
            .iter()
            .map(|s| Some(s.satellite_id.as_str()))
            .collect::<Vec<_>>(),
    );
    let names = StringArray::from(satellites.iter().map(|s| s.name.as_deref()).collect::<Vec<_>>());
    let actives = BooleanArray::from(satellites.iter().map(|s| s.is_active).collect::<Vec<_>>());
    let quality = StringArray::from(
        satellites
            .iter()
            .map(|s| Some(format!("{:?}", s.quality_flag)))
            .collect::<Vec<_>>(),
    );
    let regimes = StringArray::from(
        satellites
            .iter()
            .map(|s| Some(format!("{:?}", s.orbital_regime)))
            .collect::<Vec<_>>(),
    );
    let altitudes = Float64Array::from(satellites.iter().map(|s| s.altitude_km).collect::<Vec<_>>());
    let launch_dates = StringArray::from(
        satellites
            .iter()
            .map(|s| s.launch_date.map(|d| d.to_string()))
            .collect::<Vec<_>>(),
    );
    let ages = Int64Array::from(satellites.iter().map(|s| s.age_days).collect::<Vec<_>>());

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(ids),
            Arc::new(names),
            Arc::new(actives),
            Arc::new(quality),
            Arc::new(regimes),
            Arc::new(altitudes),
            Arc::new(launch_dates),
            Arc::new(ages),
        ],
    )
    .context("building satellites record batch")?;
    write_parquet(path, batch)
}

fn write_launches_parquet(path: &PathBuf, launches: &[NormalizedLaunch]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        ArrowField::new("launch_id", DataType::Utf8, false),
        ArrowField::new("mission_name", DataType::Utf8, true),
        ArrowField::new("date_utc", DataType::Utf8, true),
        ArrowField::new("is_starlink_mission", DataType::Boolean, false),
        ArrowField::new("launch_success", DataType::Boolean, true),
        ArrowField::new("estimated_satellite_count", DataType::Int64, false),
        ArrowField::new("mission_type", DataType::Utf8, false),
        ArrowField::new("quality_flag", DataType::Utf8, false),
    ]));

    let ids = StringArray::from(
        launches
            .iter()
            .map(|l| Some(l.launch_id.as_str()))
            .collect::<Vec<_>>(),
    );
    let names = StringArray::from(
        launches
            .iter()
            .map(|l| l.mission_name.as_deref())
            .collect::<Vec<_>>(),
    );
    let dates = StringArray::from(
        launches
            .iter()
            .map(|l| l.launch_date_utc.map(|d| d.to_rfc3339()))
            .collect::<Vec<_>>(),
    );
    let starlink = BooleanArray::from(
        launches
            .iter()
            .map(|l| l.is_starlink_mission)
            .collect::<Vec<_>>(),
    );
    let success = BooleanArray::from(launches.iter().map(|l| l.launch_success).collect::<Vec<_>>());
    let estimates = Int64Array::from(
        launches
            .iter()
            .map(|l| l.estimated_satellite_count)
            .collect::<Vec<_>>(),
    );
    let mission_types = StringArray::from(
        launches
            .iter()
            .map(|l| Some(l.mission_type.as_str()))
            .collect::<Vec<_>>(),
    );
    let quality = StringArray::from(
        launches
            .iter()
            .map(|l| Some(format!("{:?}", l.quality_flag)))
            .collect::<Vec<_>>(),
    );

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(ids),
            Arc::new(names),
            Arc::new(dates),
            Arc::new(starlink),
            Arc::new(success),
            Arc::new(estimates),
            Arc::new(mission_types),
            Arc::new(quality),
        ],
    )
    .context("building launches record batch")?;
    write_parquet(path, batch)
}

fn write_projections_parquet(path: &PathBuf, projections: &[ProjectionResult]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        ArrowField::new("scenario", DataType::Utf8, false),
        ArrowField::new("launches_needed", DataType::Int64, true),
        ArrowField::new("months_needed", DataType::Float64, true),
        ArrowField::new("completion_date", DataType::Utf8, true),
        ArrowField::new("confidence", DataType::Utf8, false),
        ArrowField::new("risk_factor", DataType::Utf8, false),
    ]));

    let scenarios = StringArray::from(
        projections
            .iter()
            .map(|p| Some(p.scenario.as_str()))
            .collect::<Vec<_>>(),
    );
    let launches = Int64Array::from(
        projections
            .iter()
            .map(|p| p.launches_needed)
            .collect::<Vec<_>>(),
    );
    let months = Float64Array::from(
        projections
            .iter()
            .map(|p| p.months_needed)
            .collect::<Vec<_>>(),
    );
    let completions = StringArray::from(
        projections
            .iter()
            .map(|p| p.completion_date.map(|d| d.to_string()))
            .collect::<Vec<_>>(),
    );
    let confidence = StringArray::from(
        projections
            .iter()
            .map(|p| Some(format!("{:?}", p.confidence)))
            .collect::<Vec<_>>(),
    );
    let risks = StringArray::from(
        projections
            .iter()
            .map(|p| Some(format!("{:?}", p.risk_factor)))
            .collect::<Vec<_>>(),
    );

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(scenarios),
            Arc::new(launches),
            Arc::new(months),
            Arc::new(completions),
            Arc::new(confidence),
            Arc::new(risks),
        ],
    )
    .context("building projections record batch")?;
    write_parquet(path, batch)
}

fn manifest_entry(name: &str, reports_dir: &PathBuf, path: &PathBuf) -> Result<ParquetManifestFile> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let sha256 = hex::encode(hasher.finalize());
    let rel = path
        .strip_prefix(reports_dir)
        .unwrap_or(path)
        .display()
        .to_string();
    Ok(ParquetManifestFile {
        name: name.to_string(),
        path: rel,
        sha256,
        bytes: bytes.len() as u64,
    })
}
