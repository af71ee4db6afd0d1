//! Log sink setup.
//!
//! `dev` logs pretty output to stderr. `prod` logs JSON lines to a rolling
//! file, or to stderr when `--log-file -` is given. stdout carries nothing but
//! IDs either way. The filter comes from `RUST_LOG` when set, otherwise from
//! `--log-level`.

use crate::config::{LogRotation, LogSink, Mode};
use anyhow::Context;
use tracing::Subscriber;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter,
    filter::LevelFilter,
    fmt::{
        self, MakeWriter,
        format::{DefaultFields, Format, Full},
        time::ChronoLocal,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// until the process exits.
pub fn init_telemetry(
    mode: Mode,
    log_level: &str,
    sink: &LogSink,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(parse_level(log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    match sink {
        LogSink::Stderr => {
            let layer = base_layer(std::io::stderr);
            match mode {
                Mode::Dev => registry.with(layer.pretty()).try_init()?,
                Mode::Prod => registry.with(layer.json()).try_init()?,
            }
            Ok(None)
        }
        LogSink::RollingFile {
            directory,
            prefix,
            suffix,
            rotation,
            max_files,
        } => {
            let mut builder = RollingFileAppender::builder()
                .rotation(rotation_of(*rotation))
                .filename_prefix(prefix);
            if let Some(suffix) = suffix {
                builder = builder.filename_suffix(suffix);
            }
            if let Some(max_files) = max_files {
                builder = builder.max_log_files(*max_files);
            }
            let appender = builder
                .build(directory)
                .with_context(|| format!("failed to open log directory {}", directory.display()))?;

            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(base_layer(writer).with_ansi(false).json())
                .try_init()?;
            Ok(Some(guard))
        }
    }
}

fn base_layer<S, W>(writer: W) -> fmt::Layer<S, DefaultFields, Format<Full, ChronoLocal>, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_target(false)
        .with_timer(ChronoLocal::rfc_3339())
        .with_file(true)
}

/// Maps a level name to a filter, case-insensitively. `dpanic`, `panic` and
/// `fatal` have no tracing counterpart and map to `error`. Anything
/// unrecognised falls back to `info`.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.trim().to_ascii_lowercase().as_str() {
        "debug" => LevelFilter::DEBUG,
        "warn" => LevelFilter::WARN,
        "error" | "dpanic" | "panic" | "fatal" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

fn default_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::default().add_directive(level.into())
}

const fn rotation_of(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Minutely => Rotation::MINUTELY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}
