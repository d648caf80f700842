use crate::application::bootstrap::bootstrap_workspace;
use crate::application::marker_ticker::{current_marker, spawn_marker_ticker};
use crate::application::planner_sync::{
    wall_clock_now_provider, NowProvider, PlannerSyncService, RetryPolicy, SourceLocations,
};
use crate::application::render_model::{day_view, marker_view, DayView, MarkerView};
use crate::application::timeline::{FeedStatus, TimelineOptions};
use crate::domain::models::{DayTypeKey, ScheduleBrick};
use crate::infrastructure::config::{load_settings, PlannerSettings};
use crate::infrastructure::error::{InfraError, SourceKind};
use crate::infrastructure::source_client::{ReqwestSourceClient, SourceClient, SourceLocation};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct AppState {
    workspace_root: PathBuf,
    config_dir: PathBuf,
    logs_dir: PathBuf,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;

        Ok(Self {
            workspace_root: bootstrap.workspace_root,
            config_dir: bootstrap.config_dir,
            logs_dir: bootstrap.logs_dir,
            log_guard: Mutex::new(()),
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_warn(&self, command: &str, message: &str) {
        self.append_log("warn", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DayPlanResponse {
    pub date: NaiveDate,
    pub day_type: DayTypeKey,
    pub bricks: Vec<ScheduleBrick>,
    pub current_time_offset: Option<u32>,
    pub feed_status: FeedStatus,
    pub warnings: Vec<String>,
    pub view: DayView,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentMarkerResponse {
    pub marker: Option<MarkerView>,
}

fn source_locations(settings: &PlannerSettings, config_dir: &Path) -> Result<SourceLocations, InfraError> {
    Ok(SourceLocations {
        schedule: SourceLocation::resolve(&settings.sources.schedule, config_dir, SourceKind::Schedule)?,
        calendar: SourceLocation::resolve(&settings.sources.calendar, config_dir, SourceKind::Calendar)?,
        feed: SourceLocation::resolve(&settings.sources.feed, config_dir, SourceKind::Feed)?,
    })
}

pub async fn build_day_impl(state: &AppState) -> Result<DayPlanResponse, InfraError> {
    let settings = load_settings(state.config_dir())?;
    let client = Arc::new(ReqwestSourceClient::new(Duration::from_secs(
        settings.sync.timeout_seconds,
    ))?);
    let now_provider = wall_clock_now_provider(settings.timezone());
    build_day_with(state, &settings, client, now_provider).await
}

pub(crate) async fn build_day_with<C>(
    state: &AppState,
    settings: &PlannerSettings,
    client: Arc<C>,
    now_provider: NowProvider,
) -> Result<DayPlanResponse, InfraError>
where
    C: SourceClient,
{
    let locations = source_locations(settings, state.config_dir())?;
    let service = PlannerSyncService::new(client)
        .with_retry_policy(RetryPolicy {
            max_attempts: settings.sync.max_attempts,
            base_delay_ms: settings.sync.base_delay_ms,
        })
        .with_now_provider(Arc::clone(&now_provider));

    let timeline = service
        .build_timeline(&locations, &TimelineOptions::from_settings(settings))
        .await?;
    let marker = current_marker(settings.display.marker_window(), &now_provider);

    for warning in &timeline.warnings {
        state.log_warn("build_day", warning);
    }
    if let Some(reason) = timeline.feed_status.degraded_reason() {
        state.log_warn("build_day", &format!("feed degraded: {reason}"));
    }
    state.log_info(
        "build_day",
        &format!(
            "built date={} day_type={} bricks={} feed={:?}",
            timeline.date,
            timeline.day_type,
            timeline.bricks.len(),
            timeline.feed_status
        ),
    );

    let view = day_view(&timeline, marker, settings.display.pixels_per_minute);
    Ok(DayPlanResponse {
        date: timeline.date,
        day_type: timeline.day_type,
        bricks: timeline.bricks,
        current_time_offset: marker,
        feed_status: timeline.feed_status,
        warnings: timeline.warnings,
        view,
    })
}

pub fn current_marker_impl(state: &AppState) -> Result<CurrentMarkerResponse, InfraError> {
    let settings = load_settings(state.config_dir())?;
    let now_provider = wall_clock_now_provider(settings.timezone());
    let minutes = current_marker(settings.display.marker_window(), &now_provider);
    Ok(CurrentMarkerResponse {
        marker: marker_view(minutes, settings.display.pixels_per_minute),
    })
}

pub fn watch_marker_impl(
    state: &AppState,
) -> Result<(watch::Receiver<Option<u32>>, JoinHandle<()>), InfraError> {
    let settings = load_settings(state.config_dir())?;
    state.log_info(
        "watch_marker",
        &format!(
            "refreshing marker every {}s",
            settings.display.marker_refresh_seconds
        ),
    );
    Ok(spawn_marker_ticker(
        settings.display.marker_window(),
        wall_clock_now_provider(settings.timezone()),
        Duration::from_secs(settings.display.marker_refresh_seconds),
    ))
}
