use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use nest::NEST_EPOCH;

/// Selects how and where logs are written.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Human-readable, multi-line log output on stderr.
    Dev,
    /// One JSON object per log line, written to the rolling log file.
    Prod,
}

/// How often the log file is rolled over.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Minutely,
    Hourly,
    Daily,
    Never,
}

impl LogRotation {
    /// Number of rotation periods in one day, `None` if files never roll.
    const fn periods_per_day(self) -> Option<u64> {
        match self {
            Self::Minutely => Some(24 * 60),
            Self::Hourly => Some(24),
            Self::Daily => Some(1),
            Self::Never => None,
        }
    }
}

/// Where the log sink writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    /// Standard error, leaving stdout to the IDs.
    Stderr,
    /// A rolling file in `directory`, named `<prefix>.<date>[.<suffix>]`.
    RollingFile {
        directory: PathBuf,
        prefix: String,
        suffix: Option<String>,
        rotation: LogRotation,
        /// Files kept on disk, current one included. `None` keeps them all.
        max_files: Option<usize>,
    },
}

/// `--log-file` value that sends prod logs to stderr instead of a file.
pub const STDERR_LOG_FILE: &str = "-";

/// Runtime configuration for the `nest` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file in the working directory is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "nest",
    version,
    about = "Mint Snowflake-style 64-bit IDs for a fixed datacenter and worker"
)]
pub struct CliArgs {
    /// Datacenter part of the node identity, in `0..=31`.
    ///
    /// Environment variable: `NEST_DATACENTER_ID`
    #[arg(long, env = "NEST_DATACENTER_ID", default_value_t = 1, allow_negative_numbers = true)]
    pub datacenter_id: i64,

    /// Worker part of the node identity, in `0..=31`.
    ///
    /// Environment variable: `NEST_WORKER_ID`
    #[arg(long, env = "NEST_WORKER_ID", default_value_t = 1, allow_negative_numbers = true)]
    pub worker_id: i64,

    /// Zero point of the timestamp field, in milliseconds since the Unix
    /// epoch. Every node of a fleet must use the same value or their IDs do
    /// not order against each other.
    ///
    /// Environment variable: `NEST_EPOCH`
    #[arg(long, env = "NEST_EPOCH", default_value_t = NEST_EPOCH)]
    pub epoch: i64,

    /// Total number of IDs to mint.
    ///
    /// Environment variable: `NEST_COUNT`
    #[arg(short = 'n', long, env = "NEST_COUNT", default_value_t = 10)]
    pub count: u64,

    /// Number of threads minting from the shared generator.
    ///
    /// Environment variable: `NEST_THREADS`
    #[arg(long, env = "NEST_THREADS", default_value_t = 1)]
    pub threads: usize,

    /// Mint in batches of up to 1000 instead of one ID per call.
    #[arg(long, default_value_t = false)]
    pub batch: bool,

    /// `dev` logs pretty output to stderr, `prod` logs JSON to `--log-file`.
    ///
    /// Environment variable: `NEST_MODE`
    #[arg(long, env = "NEST_MODE", value_enum, default_value_t = Mode::Dev)]
    pub mode: Mode,

    /// Log level: `debug`, `info`, `warn`, `error`, `dpanic`, `panic` or
    /// `fatal` (case-insensitive). Unknown values fall back to `info`.
    /// `RUST_LOG`, when set, takes precedence.
    ///
    /// Environment variable: `NEST_LOG_LEVEL`
    #[arg(long, env = "NEST_LOG_LEVEL", default_value_t = String::from("info"))]
    pub log_level: String,

    /// Log file used in `prod` mode. The rotation date is inserted before the
    /// extension. Use `-` to keep JSON logs on stderr.
    ///
    /// Environment variable: `NEST_LOG_FILE`
    #[arg(long, env = "NEST_LOG_FILE", default_value_t = String::from("log/app.log"))]
    pub log_file: String,

    /// How often the log file rolls over.
    ///
    /// Environment variable: `NEST_LOG_ROTATION`
    #[arg(long, env = "NEST_LOG_ROTATION", value_enum, default_value_t = LogRotation::Daily)]
    pub log_rotation: LogRotation,

    /// Rolled-over log files to keep. `0` keeps all of them.
    ///
    /// Environment variable: `NEST_LOG_MAX_BACKUPS`
    #[arg(long, env = "NEST_LOG_MAX_BACKUPS", default_value_t = 15)]
    pub log_max_backups: usize,

    /// Days of rolled-over log files to keep. `0` disables the age limit.
    ///
    /// Environment variable: `NEST_LOG_MAX_AGE`
    #[arg(long, env = "NEST_LOG_MAX_AGE", default_value_t = 28)]
    pub log_max_age: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub datacenter_id: i64,
    pub worker_id: i64,
    pub epoch: i64,
    pub count: u64,
    pub threads: usize,
    pub batch: bool,
    pub mode: Mode,
    pub log_level: String,
    pub log_sink: LogSink,
}

impl AppConfig {
    /// Number of IDs the thread at `index` is responsible for. The remainder
    /// of an uneven split goes to the lowest indices.
    pub fn share_of(&self, index: usize) -> u64 {
        let threads = self.threads as u64;
        let base = self.count / threads;
        let extra = u64::from((index as u64) < self.count % threads);
        base + extra
    }
}

/// Files to keep for a rotation schedule: the current file plus as many
/// backups as both limits allow. A limit of zero is no limit.
fn max_log_files(rotation: LogRotation, max_backups: usize, max_age_days: u64) -> Option<usize> {
    let by_age = rotation
        .periods_per_day()
        .filter(|_| max_age_days > 0)
        .map(|per_day| usize::try_from(per_day.saturating_mul(max_age_days)).unwrap_or(usize::MAX));
    let by_count = (max_backups > 0).then_some(max_backups);

    let backups = match (by_count, by_age) {
        (Some(count), Some(age)) => Some(count.min(age)),
        (Some(limit), None) | (None, Some(limit)) => Some(limit),
        (None, None) => None,
    };
    backups.map(|backups| backups.saturating_add(1))
}

fn select_log_sink(args: &CliArgs) -> anyhow::Result<LogSink> {
    if args.mode == Mode::Dev || args.log_file == STDERR_LOG_FILE {
        return Ok(LogSink::Stderr);
    }

    let path = Path::new(&args.log_file);
    let prefix = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("NEST_LOG_FILE ({}) has no file name", args.log_file))?
        .to_owned();
    let suffix = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(ToOwned::to_owned);
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok(LogSink::RollingFile {
        directory,
        prefix,
        suffix,
        rotation: args.log_rotation,
        max_files: max_log_files(args.log_rotation, args.log_max_backups, args.log_max_age),
    })
}

impl TryFrom<CliArgs> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.threads == 0 {
            bail!("NEST_THREADS must be greater than 0");
        }

        let log_sink = select_log_sink(&args)?;

        // Node identity is validated by the generator itself so that the
        // error matches what any other embedder would see.
        Ok(Self {
            datacenter_id: args.datacenter_id,
            worker_id: args.worker_id,
            epoch: args.epoch,
            count: args.count,
            threads: args.threads,
            batch: args.batch,
            mode: args.mode,
            log_level: args.log_level,
            log_sink,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AppConfig {
        let args = CliArgs::try_parse_from(std::iter::once("nest").chain(args.iter().copied()))
            .expect("arguments should parse");
        AppConfig::try_from(args).expect("config should be valid")
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--datacenter-id",
            "3",
            "--worker-id",
            "30",
            "--epoch",
            "0",
            "-n",
            "7",
            "--threads",
            "2",
            "--batch",
            "--mode",
            "prod",
            "--log-level",
            "debug",
        ]);
        assert_eq!(config.datacenter_id, 3);
        assert_eq!(config.worker_id, 30);
        assert_eq!(config.epoch, 0);
        assert_eq!(config.count, 7);
        assert_eq!(config.threads, 2);
        assert!(config.batch);
        assert_eq!(config.mode, Mode::Prod);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn negative_ids_reach_the_generator() {
        let config = parse(&["--worker-id", "-1"]);
        assert_eq!(config.worker_id, -1);
        assert!(
            nest::SnowflakeGenerator::new(config.datacenter_id, config.worker_id, config.epoch)
                .is_err()
        );
    }

    #[test]
    fn zero_threads_is_rejected() {
        let args = CliArgs::try_parse_from(["nest", "--threads", "0"]).unwrap();
        let err = AppConfig::try_from(args).unwrap_err();
        assert!(err.to_string().contains("NEST_THREADS"));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(CliArgs::try_parse_from(["nest", "--mode", "staging"]).is_err());
    }

    #[test]
    fn shares_cover_the_whole_count() {
        let config = parse(&["-n", "10", "--threads", "4"]);
        let shares: Vec<u64> = (0..4).map(|i| config.share_of(i)).collect();
        assert_eq!(shares, [3, 3, 2, 2]);
        assert_eq!(shares.iter().sum::<u64>(), 10);
    }

    #[test]
    fn dev_mode_logs_to_stderr() {
        let config = parse(&["--mode", "dev", "--log-file", "log/app.log"]);
        assert_eq!(config.log_sink, LogSink::Stderr);
    }

    #[test]
    fn prod_mode_logs_to_rolling_file() {
        let config = parse(&[
            "--mode",
            "prod",
            "--log-file",
            "log/app.log",
            "--log-rotation",
            "daily",
            "--log-max-backups",
            "15",
            "--log-max-age",
            "28",
        ]);
        assert_eq!(
            config.log_sink,
            LogSink::RollingFile {
                directory: PathBuf::from("log"),
                prefix: String::from("app"),
                suffix: Some(String::from("log")),
                rotation: LogRotation::Daily,
                max_files: Some(16),
            }
        );
    }

    #[test]
    fn prod_mode_can_keep_logs_on_stderr() {
        let config = parse(&["--mode", "prod", "--log-file", STDERR_LOG_FILE]);
        assert_eq!(config.log_sink, LogSink::Stderr);
    }

    #[test]
    fn bare_file_name_lands_in_working_directory() {
        let config = parse(&["--mode", "prod", "--log-file", "nest"]);
        let LogSink::RollingFile {
            directory,
            prefix,
            suffix,
            ..
        } = config.log_sink
        else {
            panic!("expected a rolling file sink");
        };
        assert_eq!(directory, PathBuf::from("."));
        assert_eq!(prefix, "nest");
        assert_eq!(suffix, None);
    }

    #[test]
    fn log_file_without_name_is_rejected() {
        let args = CliArgs::try_parse_from(["nest", "--mode", "prod", "--log-file", "/"]).unwrap();
        let err = AppConfig::try_from(args).unwrap_err();
        assert!(err.to_string().contains("NEST_LOG_FILE"));
    }

    #[test]
    fn retention_takes_the_tighter_limit() {
        // Daily files: 15 backups is tighter than 28 days.
        assert_eq!(max_log_files(LogRotation::Daily, 15, 28), Some(16));
        // Daily files: 3 days is tighter than 15 backups.
        assert_eq!(max_log_files(LogRotation::Daily, 15, 3), Some(4));
        // Hourly files: 1 day allows 24 backups, capped at 15.
        assert_eq!(max_log_files(LogRotation::Hourly, 15, 1), Some(16));
        // Zero disables a limit.
        assert_eq!(max_log_files(LogRotation::Daily, 0, 28), Some(29));
        assert_eq!(max_log_files(LogRotation::Daily, 15, 0), Some(16));
        assert_eq!(max_log_files(LogRotation::Daily, 0, 0), None);
        // A file that never rolls has no age-based limit.
        assert_eq!(max_log_files(LogRotation::Never, 0, 28), None);
    }
}
