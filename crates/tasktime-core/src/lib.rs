//! Core types: calendar events, time spans, monthly summaries, formatting

pub mod event;
pub mod format;
pub mod span;
pub mod summary;
pub mod tracing;

pub use event::{CalendarEvent, EventBoundary};
pub use format::{OutputFormat, format_minutes, render_summary};
pub use span::{elapsed_minutes, elapsed_minutes_in, parse_boundary, parse_boundary_in};
pub use summary::{
    MonthSummary, TaskTable, TaskTotals, monthly_summary, monthly_summary_from_json,
    monthly_summary_from_json_in, monthly_summary_in,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
