//! `tasktime summary`: monthly time per task.

use std::path::Path;

use tasktime_core::{MonthSummary, monthly_summary, monthly_summary_from_json, render_summary};
use tasktime_providers::{CalendarSource, FetchOptions, GoogleProvider, TokenStorage};
use tracing::{debug, info};

use crate::cli::SummaryArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Prints the summary for the stored account, or for an events file.
pub async fn run(args: &SummaryArgs, config: &ClientConfig) -> ClientResult<()> {
    let summaries = match args.events_file {
        Some(ref path) => summaries_from_file(path)?,
        None => summaries_from_google(config, fetch_options(args, config)).await?,
    };

    let output = render_summary(&summaries, args.output_format())
        .map_err(|e| ClientError::Input(format!("failed to render summary: {}", e)))?;
    println!("{}", output);
    Ok(())
}

/// Aggregates a JSON array of events, as exported from the Calendar API.
pub fn summaries_from_file(path: &Path) -> ClientResult<Vec<MonthSummary>> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| ClientError::Input(format!("{} is not valid JSON: {}", path.display(), e)))?;

    // Accept a raw events.list response as well as a bare array.
    let events = match value.get("items") {
        Some(items) => items,
        None => &value,
    };
    Ok(monthly_summary_from_json(events))
}

async fn summaries_from_google(
    config: &ClientConfig,
    options: FetchOptions,
) -> ClientResult<Vec<MonthSummary>> {
    let google = config.google.as_ref().ok_or_else(|| {
        ClientError::Config(
            "no [google] section in config.toml; run `tasktime auth google` first".to_string(),
        )
    })?;
    let google_config = google.to_provider_config().map_err(ClientError::Config)?;
    let storage = TokenStorage::new(&google_config.token_path);
    let provider = GoogleProvider::new(google_config)?;

    let mut tokens = storage.load()?.ok_or_else(|| {
        ClientError::AuthRequired("no stored tokens; run `tasktime auth google`".to_string())
    })?;

    let result = provider.fetch_events(&mut tokens, options).await?;
    if result.tokens_refreshed {
        debug!("saving refreshed tokens");
        storage.save(&tokens)?;
    }

    info!("fetched {} events", result.events.len());
    Ok(monthly_summary(&result.events))
}

fn fetch_options(args: &SummaryArgs, config: &ClientConfig) -> FetchOptions {
    let mut calendar = config.calendar.clone();
    if let Some(days) = args.lookback_days {
        calendar.lookback_days = days;
    }
    if let Some(max) = args.max_results {
        calendar.max_results = max;
    }
    calendar.fetch_options()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_with_bare_array() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("events.json");
        std::fs::write(
            &path,
            r#"[
                {"id": "1", "summary": "Coding",
                 "start": {"dateTime": "2024-03-14T09:00:00Z"},
                 "end": {"dateTime": "2024-03-14T10:00:00Z"}},
                {"id": "2", "summary": "Coding",
                 "start": {"dateTime": "2024-03-15T09:00:00Z"},
                 "end": {"dateTime": "2024-03-15T09:45:00Z"}}
            ]"#,
        )
        .unwrap();

        let summaries = summaries_from_file(&path).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].month, "2024-03");
        let coding = summaries[0].tasks.get("Coding").unwrap();
        assert_eq!(coding.total_time, 105.0);
        assert_eq!(coding.count, 2);
    }

    #[test]
    fn file_with_events_list_response() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("events.json");
        std::fs::write(
            &path,
            r#"{"kind": "calendar#events", "items": [
                {"summary": "Holiday", "start": {"date": "2024-05-10"}, "end": {"date": "2024-05-11"}}
            ]}"#,
        )
        .unwrap();

        let summaries = summaries_from_file(&path).unwrap();
        assert_eq!(summaries[0].month, "2024-05");
        assert_eq!(summaries[0].tasks.get("Holiday").unwrap().total_time, 1440.0);
    }

    #[test]
    fn invalid_json_is_an_input_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("events.json");
        std::fs::write(&path, "not json").unwrap();

        let err = summaries_from_file(&path).unwrap_err();
        assert!(matches!(err, ClientError::Input(_)));
    }

    #[test]
    fn flags_override_calendar_settings() {
        let config = ClientConfig::default();
        let args = SummaryArgs {
            lookback_days: Some(30),
            max_results: Some(0),
            ..Default::default()
        };

        let options = fetch_options(&args, &config);
        assert!(options.time_min.is_some());
        assert_eq!(options.max_results, None);

        let options = fetch_options(&SummaryArgs::default(), &config);
        assert!(options.time_min.is_none());
        assert_eq!(options.max_results, Some(10));
    }

    #[tokio::test]
    async fn google_without_config_asks_for_setup() {
        let err = summaries_from_google(&ClientConfig::default(), FetchOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
