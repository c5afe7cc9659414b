//! Google Calendar API v3 client.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tasktime_core::CalendarEvent;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::FetchOptions;

use super::config::GoogleConfig;

/// Largest page the client asks for.
const MAX_PAGE_SIZE: usize = 250;

/// Thin client for `events.list`.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    api_base: String,
    default_calendar: String,
}

impl GoogleCalendarClient {
    /// Creates a client from the Google configuration.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ProviderError::internal("failed to create HTTP client").with_source(e))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            default_calendar: config.calendar_id.clone(),
        })
    }

    /// Lists events ordered by start time, following `nextPageToken` until
    /// the listing ends or `options.max_results` events are collected.
    pub async fn list_events(
        &self,
        access_token: &str,
        options: &FetchOptions,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let calendar_id = options
            .calendar_id
            .as_deref()
            .unwrap_or(&self.default_calendar);
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        );
        let time_min = options.time_min.unwrap_or_else(Utc::now);

        if options.max_results == Some(0) {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let remaining = options.max_results.map(|max| max - events.len());
            let page_size = remaining.map_or(MAX_PAGE_SIZE, |r| r.min(MAX_PAGE_SIZE));

            let page = self
                .list_events_page(
                    access_token,
                    &url,
                    time_min,
                    options.time_max,
                    page_size,
                    page_token.as_deref(),
                )
                .await?;
            pages += 1;

            events.extend(page.items.into_iter().filter_map(decode_event));

            if let Some(max) = options.max_results {
                if events.len() >= max {
                    events.truncate(max);
                    break;
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(
            "fetched {} events from calendar {} in {} page(s)",
            events.len(),
            calendar_id,
            pages
        );
        Ok(events)
    }

    async fn list_events_page(
        &self,
        access_token: &str,
        url: &str,
        time_min: DateTime<Utc>,
        time_max: Option<DateTime<Utc>>,
        page_size: usize,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let mut query = vec![
            ("timeMin", time_min.to_rfc3339()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("maxResults", page_size.to_string()),
        ];
        if let Some(time_max) = time_max {
            query.push(("timeMax", time_max.to_rfc3339()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ProviderError::rate_limited(match retry_after {
                Some(secs) => format!("rate limit exceeded, retry after {secs} seconds"),
                None => "rate limit exceeded".to_string(),
            }));
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), "list events", &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response("failed to parse events.list response").with_source(e)
        })
    }
}

/// Reads one `items[]` entry; entries that are not event-shaped are skipped.
fn decode_event(item: serde_json::Value) -> Option<CalendarEvent> {
    match serde_json::from_value(item) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("skipping unreadable event: {}", e);
            None
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
    #[serde(default)]
    next_page_token: Option<String>,
}
