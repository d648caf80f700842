use crate::application::timeline::{assemble_timeline, FeedInput, Timeline, TimelineOptions};
use crate::domain::models::{validate_calendar, CalendarMap, ScheduleConfig};
use crate::infrastructure::error::{InfraError, SourceKind};
use crate::infrastructure::source_client::{SourceClient, SourceLocation};
use chrono::{Local, NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::time::{sleep, Duration as TokioDuration};

/// Local wall-clock "now".
pub type NowProvider = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub fn wall_clock_now_provider(timezone: Option<Tz>) -> NowProvider {
    match timezone {
        Some(timezone) => Arc::new(move || Utc::now().with_timezone(&timezone).naive_local()),
        None => Arc::new(|| Local::now().naive_local()),
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocations {
    pub schedule: SourceLocation,
    pub calendar: SourceLocation,
    pub feed: SourceLocation,
}

#[derive(Debug)]
pub struct FetchedSources {
    pub schedule: Result<String, InfraError>,
    pub calendar: Result<String, InfraError>,
    pub feed: Result<String, InfraError>,
}

pub struct PlannerSyncService<C>
where
    C: SourceClient,
{
    source_client: Arc<C>,
    retry_policy: RetryPolicy,
    now_provider: NowProvider,
}

impl<C> PlannerSyncService<C>
where
    C: SourceClient,
{
    pub fn new(source_client: Arc<C>) -> Self {
        Self {
            source_client,
            retry_policy: RetryPolicy::default(),
            now_provider: wall_clock_now_provider(None),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.now_provider)()
    }

    /// Fetches all three sources concurrently; each result is independent.
    pub async fn fetch_all(&self, locations: &SourceLocations) -> FetchedSources {
        let (schedule, calendar, feed) = tokio::join!(
            self.fetch_with_retry(SourceKind::Schedule, &locations.schedule),
            self.fetch_with_retry(SourceKind::Calendar, &locations.calendar),
            self.fetch_with_retry(SourceKind::Feed, &locations.feed),
        );
        FetchedSources {
            schedule,
            calendar,
            feed,
        }
    }

    /// Fetches and assembles today's timeline. Schedule and calendar
    /// failures are fatal; feed failures only change the feed status.
    pub async fn build_timeline(
        &self,
        locations: &SourceLocations,
        options: &TimelineOptions,
    ) -> Result<Timeline, InfraError> {
        let fetched = self.fetch_all(locations).await;
        let schedule = parse_schedule(&fetched.schedule?)?;
        let calendar = parse_calendar(&fetched.calendar?)?;
        let feed = match fetched.feed {
            Ok(text) => FeedInput::Text(text),
            Err(error) => FeedInput::Unavailable(error.to_string()),
        };

        let today = self.now().date();
        assemble_timeline(&schedule, &calendar, &feed, today, options)
    }

    async fn fetch_with_retry(
        &self,
        kind: SourceKind,
        location: &SourceLocation,
    ) -> Result<String, InfraError> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt: u8 = 0;

        loop {
            match self.source_client.fetch_text(kind, location).await {
                Ok(text) => return Ok(text),
                Err(error) if self.should_retry(&error) && attempt + 1 < max_attempts => {
                    let delay = self
                        .retry_policy
                        .base_delay_ms
                        .saturating_mul(2u64.saturating_pow(attempt as u32));
                    sleep(TokioDuration::from_millis(delay)).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn should_retry(&self, error: &InfraError) -> bool {
        match error {
            InfraError::SourceUnavailable { message, .. } => {
                let message = message.to_ascii_lowercase();
                message.contains("network error")
                    || message.contains("timed out")
                    || message.starts_with("http 5")
                    || message == "http 429"
            }
            _ => false,
        }
    }
}

pub fn parse_schedule(text: &str) -> Result<ScheduleConfig, InfraError> {
    let schedule: ScheduleConfig =
        serde_json::from_str(text).map_err(|error| InfraError::MalformedSource {
            kind: SourceKind::Schedule,
            message: error.to_string(),
        })?;
    schedule
        .validate()
        .map_err(|message| InfraError::MalformedSource {
            kind: SourceKind::Schedule,
            message,
        })?;
    Ok(schedule)
}

pub fn parse_calendar(text: &str) -> Result<CalendarMap, InfraError> {
    let calendar: CalendarMap =
        serde_json::from_str(text).map_err(|error| InfraError::MalformedSource {
            kind: SourceKind::Calendar,
            message: error.to_string(),
        })?;
    validate_calendar(&calendar).map_err(|message| InfraError::MalformedSource {
        kind: SourceKind::Calendar,
        message,
    })?;
    Ok(calendar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::timeline::FeedStatus;
    use crate::domain::models::BrickCategory;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::{HashMap, VecDeque};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    enum FakeResponse {
        Body(String),
        NetworkError,
        Status(u16),
    }

    #[derive(Debug, Default)]
    struct FakeSourceClient {
        responses: Mutex<HashMap<&'static str, VecDeque<FakeResponse>>>,
        calls: AtomicUsize,
        latency: Option<TokioDuration>,
    }

    impl FakeSourceClient {
        fn with(mut self, kind: SourceKind, responses: Vec<FakeResponse>) -> Self {
            self.responses
                .get_mut()
                .expect("responses lock poisoned")
                .insert(kind_key(kind), responses.into());
            self
        }

        fn with_latency(mut self, latency: TokioDuration) -> Self {
            self.latency = Some(latency);
            self
        }
    }

    fn kind_key(kind: SourceKind) -> &'static str {
        match kind {
            SourceKind::Schedule => "schedule",
            SourceKind::Calendar => "calendar",
            SourceKind::Feed => "feed",
        }
    }

    #[async_trait]
    impl SourceClient for FakeSourceClient {
        async fn fetch_text(
            &self,
            kind: SourceKind,
            _location: &SourceLocation,
        ) -> Result<String, InfraError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(latency) = self.latency {
                sleep(latency).await;
            }
            let response = self
                .responses
                .lock()
                .expect("responses lock poisoned")
                .get_mut(kind_key(kind))
                .and_then(VecDeque::pop_front)
                .unwrap_or(FakeResponse::Status(404));

            match response {
                FakeResponse::Body(body) => Ok(body),
                FakeResponse::NetworkError => Err(InfraError::SourceUnavailable {
                    kind,
                    message: "network error: connection reset".to_string(),
                }),
                FakeResponse::Status(code) => Err(InfraError::SourceUnavailable {
                    kind,
                    message: format!("http {code}"),
                }),
            }
        }
    }

    fn locations() -> SourceLocations {
        let base = PathBuf::from("config");
        SourceLocations {
            schedule: SourceLocation::Local(base.join("schedule.json")),
            calendar: SourceLocation::Local(base.join("calendar.json")),
            feed: SourceLocation::Local(base.join("feed.ics")),
        }
    }

    fn fixed_now() -> NowProvider {
        Arc::new(|| {
            NaiveDate::from_ymd_opt(2026, 1, 14)
                .and_then(|date| date.and_hms_opt(7, 0, 0))
                .expect("valid datetime")
        })
    }

    fn body(value: &str) -> FakeResponse {
        FakeResponse::Body(value.to_string())
    }

    const SCHEDULE: &str = r#"{
        "hard_stops": {"school_dropoff": {"time": "07:30", "commute_minutes": 15, "trigger_routine": "launch"}},
        "definitions": {"routines": {"launch": {"label": "Morning Launch", "duration": 20}}}
    }"#;
    const CALENDAR: &str = r#"{"2026-01-14": "A"}"#;
    const FEED: &str = "BEGIN:VCALENDAR\nBEGIN:VEVENT\nSUMMARY:Piano\nDTSTART:20260114T090000\nEND:VEVENT\nEND:VCALENDAR\n";

    fn service(client: FakeSourceClient, max_attempts: u8) -> (Arc<FakeSourceClient>, PlannerSyncService<FakeSourceClient>) {
        let client = Arc::new(client);
        let service = PlannerSyncService::new(Arc::clone(&client))
            .with_retry_policy(RetryPolicy {
                max_attempts,
                base_delay_ms: 1,
            })
            .with_now_provider(fixed_now());
        (client, service)
    }

    #[tokio::test]
    async fn builds_timeline_from_three_sources() {
        let (_, service) = service(
            FakeSourceClient::default()
                .with(SourceKind::Schedule, vec![body(SCHEDULE)])
                .with(SourceKind::Calendar, vec![body(CALENDAR)])
                .with(SourceKind::Feed, vec![body(FEED)]),
            1,
        );

        let timeline = service
            .build_timeline(&locations(), &TimelineOptions::default())
            .await
            .expect("timeline");

        assert_eq!(timeline.day_type.as_str(), "A_Day");
        assert_eq!(timeline.bricks.len(), 2);
        assert_eq!(timeline.bricks[0].category, BrickCategory::MorningRoutine);
        assert_eq!(timeline.bricks[1].category, BrickCategory::External);
        assert_eq!(timeline.feed_status, FeedStatus::Synced { events: 1 });
    }

    #[tokio::test]
    async fn feed_failure_degrades_without_failing() {
        let (_, service) = service(
            FakeSourceClient::default()
                .with(SourceKind::Schedule, vec![body(SCHEDULE)])
                .with(SourceKind::Calendar, vec![body(CALENDAR)])
                .with(SourceKind::Feed, vec![FakeResponse::Status(403)]),
            1,
        );

        let timeline = service
            .build_timeline(&locations(), &TimelineOptions::default())
            .await
            .expect("timeline without feed");

        assert_eq!(timeline.bricks.len(), 1);
        assert!(matches!(timeline.feed_status, FeedStatus::Unavailable { .. }));
    }

    #[tokio::test]
    async fn calendar_failure_is_fatal() {
        let (_, service) = service(
            FakeSourceClient::default()
                .with(SourceKind::Schedule, vec![body(SCHEDULE)])
                .with(SourceKind::Feed, vec![body(FEED)]),
            1,
        );

        let result = service
            .build_timeline(&locations(), &TimelineOptions::default())
            .await;
        assert!(matches!(
            result,
            Err(InfraError::SourceUnavailable {
                kind: SourceKind::Calendar,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn malformed_schedule_is_fatal() {
        let (_, service) = service(
            FakeSourceClient::default()
                .with(SourceKind::Schedule, vec![body("[1, 2, 3]")])
                .with(SourceKind::Calendar, vec![body(CALENDAR)])
                .with(SourceKind::Feed, vec![body(FEED)]),
            1,
        );

        let result = service
            .build_timeline(&locations(), &TimelineOptions::default())
            .await;
        assert!(matches!(
            result,
            Err(InfraError::MalformedSource {
                kind: SourceKind::Schedule,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn fetch_retries_on_network_error() {
        let (client, service) = service(
            FakeSourceClient::default()
                .with(
                    SourceKind::Schedule,
                    vec![FakeResponse::NetworkError, body(SCHEDULE)],
                )
                .with(SourceKind::Calendar, vec![body(CALENDAR)])
                .with(SourceKind::Feed, vec![body(FEED)]),
            2,
        );

        let fetched = service.fetch_all(&locations()).await;
        assert!(fetched.schedule.is_ok());
        assert!(fetched.calendar.is_ok());
        assert!(fetched.feed.is_ok());
        assert_eq!(client.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn sources_are_fetched_concurrently() {
        let (client, service) = service(
            FakeSourceClient::default()
                .with(SourceKind::Schedule, vec![body(SCHEDULE)])
                .with(SourceKind::Calendar, vec![body(CALENDAR)])
                .with(SourceKind::Feed, vec![body(FEED)])
                .with_latency(TokioDuration::from_millis(100)),
            1,
        );

        let started = tokio::time::Instant::now();
        let fetched = service.fetch_all(&locations()).await;
        let elapsed = started.elapsed();

        assert!(fetched.schedule.is_ok());
        assert!(fetched.calendar.is_ok());
        assert!(fetched.feed.is_ok());
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
        assert!(
            elapsed < TokioDuration::from_millis(200),
            "fetches ran one after another: {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (client, service) = service(
            FakeSourceClient::default()
                .with(SourceKind::Schedule, vec![body(SCHEDULE)])
                .with(SourceKind::Calendar, vec![body(CALENDAR)])
                .with(SourceKind::Feed, vec![FakeResponse::Status(404), body(FEED)]),
            3,
        );

        let fetched = service.fetch_all(&locations()).await;
        assert!(fetched.feed.is_err());
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn parse_calendar_rejects_non_map_documents() {
        assert!(parse_calendar(CALENDAR).is_ok());
        assert!(matches!(
            parse_calendar("[\"A\"]"),
            Err(InfraError::MalformedSource {
                kind: SourceKind::Calendar,
                ..
            })
        ));
    }
}
