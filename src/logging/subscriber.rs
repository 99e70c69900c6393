//! Tracing subscriber: console formatter, log-file layer and initialisation.
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use tracing::field::{Field, Visit};

use super::types::Level;
use super::utils::{format_utc_datetime, format_utc_time, log_file_path, strip_ansi};

/// Environment variable holding an `EnvFilter` directive for the console,
/// e.g. `PROVISION_LOG=provision::trace=off`.
pub const FILTER_ENV: &str = "PROVISION_LOG";

/// The `message` field of an event plus any other fields as `key=value`.
#[derive(Default)]
struct EventText(String);

impl EventText {
    fn of(event: &tracing::Event<'_>) -> Self {
        let mut text = Self::default();
        event.record(&mut text);
        text
    }
}

impl Visit for EventText {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.0, "{value:?}");
        } else {
            let _ = write!(self.0, " {}={value:?}", field.name());
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0.push_str(value);
        } else {
            let _ = write!(self.0, " {}={value}", field.name());
        }
    }
}

fn level_of(event: &tracing::Event<'_>) -> Level {
    let metadata = event.metadata();
    Level::of(*metadata.level(), metadata.target())
}

/// Appends every event to `$XDG_CACHE_HOME/provision/<command>.log` as
/// plain timestamped text.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate the log file for `command` and write the run header.
    ///
    /// Returns `None` if the cache directory or the file is unavailable.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let version =
            option_env!("PROVISION_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        let rule = "=".repeat(42);
        let header = format!(
            "{rule}\nprovision {version} {command} {}\n{rule}\n",
            format_utc_datetime()
        );
        fs::write(&path, header).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let text = EventText::of(event);
        let line = level_of(event).file_line(&format_utc_time(), &strip_ansi(&text.0));
        if let Ok(mut file) = self.file.lock() {
            writeln!(file, "{line}").ok();
        }
    }
}

/// Console rendering of events through [`Level::console_line`].
struct ProvisionFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ProvisionFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let text = EventText::of(event);
        writeln!(writer, "{}", level_of(event).console_line(&text.0))
    }
}

/// Console filter: `PROVISION_LOG` when set, otherwise INFO (DEBUG when
/// verbose) for every target.
fn console_filter(verbose: bool) -> tracing_subscriber::EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::EnvFilter::try_from_env(FILTER_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default))
}

/// Install the global subscriber for `command`.
///
/// Warnings and errors go to stderr, everything else to stdout.  The log
/// file always receives DEBUG and above, trace lines included.  Call once at
/// startup, before anything logs.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let make_writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .and(std::io::stdout.with_min_level(tracing::Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ProvisionFormatter)
        .with_writer(make_writer)
        .with_filter(console_filter(verbose));

    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
