//! Logging bootstrap with a colorized stdout sink.
//!
//! # Responsibility
//! - Start the process logger from explicit settings and hand back a
//!   `LoggingContext` owning it.
//! - Color stdout lines by severity when stdout is a terminal.
//! - Optionally mirror everything into size-rotated files.
//!
//! # Invariants
//! - At most one logger is started per process; later attempts are rejected.
//! - Logging initialization must not panic.
//! - Emitted events are metadata-only `key=value` messages.

use flexi_logger::{
    style, AdaptiveFormat, Cleanup, Criterion, DeferredNow, Duplicate, FileSpec, Logger,
    LoggerHandle, Naming, WriteMode, TS_DASHES_BLANK_COLONS_DOT_BLANK,
};
use log::{error, info, Record};
use once_cell::sync::OnceCell;
use std::io::Write;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "scaffold";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;
// error;warn;info;debug;trace as ANSI 256 colors:
// red, yellow, green, dark blue, light gray.
const LEVEL_PALETTE: &str = "9;11;2;4;7";

static LOGGER_STARTED: OnceCell<()> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

/// Handle on the running logger.
///
/// Keep it alive for as long as the process should log; call
/// [`LoggingContext::shutdown`] to flush and stop at exit.
pub struct LoggingContext {
    level: &'static str,
    log_dir: Option<PathBuf>,
    handle: LoggerHandle,
}

impl std::fmt::Debug for LoggingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingContext")
            .field("level", &self.level)
            .field("log_dir", &self.log_dir)
            .finish_non_exhaustive()
    }
}

impl LoggingContext {
    pub fn level(&self) -> &'static str {
        self.level
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    pub fn flush(&self) {
        self.handle.flush();
    }

    /// Flushes buffered output and stops the logger.
    pub fn shutdown(self) {
        info!("event=app_stop module=core status=ok");
        self.handle.shutdown();
    }
}

/// Starts process logging at `level`, writing to stdout and, when
/// `log_dir` is given, to rolling files in that directory.
///
/// # Errors
/// - Returns an error when `level` is unsupported.
/// - Returns an error when `log_dir` is not absolute or cannot be created.
/// - Returns an error when a logger was already started in this process.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<LoggingContext, String> {
    let level = normalize_level(level)?;
    let log_dir = log_dir.map(normalize_log_dir).transpose()?;

    let mut started = None;
    LOGGER_STARTED.get_or_try_init(|| -> Result<(), String> {
        started = Some(start_logger(level, log_dir.as_deref())?);
        Ok(())
    })?;
    let handle =
        started.ok_or_else(|| "logging already initialized for this process".to_string())?;

    install_panic_hook_once();

    info!(
        "event=app_start module=core status=ok platform={} build_mode={} version={}",
        std::env::consts::OS,
        build_mode(),
        env!("CARGO_PKG_VERSION")
    );
    info!(
        "event=core_init module=core status=ok level={} log_dir={}",
        level,
        log_dir
            .as_deref()
            .map_or_else(|| "-".to_string(), |dir| dir.display().to_string())
    );

    Ok(LoggingContext {
        level,
        log_dir,
        handle,
    })
}

fn start_logger(level: &str, log_dir: Option<&Path>) -> Result<LoggerHandle, String> {
    let mut logger = Logger::try_with_str(level)
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?;

    logger = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                format!("failed to create log directory `{}`: {err}", dir.display())
            })?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .append()
                .format_for_files(plain_format)
                .duplicate_to_stdout(Duplicate::All)
                .write_mode(WriteMode::BufferAndFlush)
        }
        None => logger.log_to_stdout().write_mode(WriteMode::Direct),
    };

    logger
        .adaptive_format_for_stdout(AdaptiveFormat::Custom(plain_format, colored_format))
        .set_palette(LEVEL_PALETTE.to_string())
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))
}

/// Returns the default log level for current build mode.
///
/// - `debug` builds -> `debug`
/// - `release` builds -> `info`
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

pub(crate) fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" | "notice" => Ok("warn"),
        "error" | "critical" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn normalize_log_dir(log_dir: &Path) -> Result<PathBuf, String> {
    if log_dir.as_os_str().is_empty() {
        return Err("log_dir cannot be empty".to_string());
    }
    if !log_dir.is_absolute() {
        return Err(format!(
            "log_dir must be an absolute path, got `{}`",
            log_dir.display()
        ));
    }
    Ok(log_dir.to_path_buf())
}

/// `[time][LEVEL] module: message`
fn plain_format(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "[{}][{}] {}: {}",
        now.format(TS_DASHES_BLANK_COLONS_DOT_BLANK),
        record.level(),
        record.module_path().unwrap_or("<unnamed>"),
        record.args()
    )
}

fn colored_format(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let level = record.level();
    let line = format!(
        "[{}][{}] {}: {}",
        now.format(TS_DASHES_BLANK_COLONS_DOT_BLANK),
        level,
        record.module_path().unwrap_or("<unnamed>"),
        record.args()
    );
    write!(w, "{}", style(level).paint(line))
}

fn build_mode() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.get().is_some() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_summary(panic_info);
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location, payload
        );
        previous_hook(panic_info);
    }));

    let _ = PANIC_HOOK_INSTALLED.set(());
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

// Panic text can carry user input; keep it on one line and bounded.
fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}

#[cfg(test)]
mod tests {
    use super::{init_logging, normalize_level, normalize_log_dir, sanitize_message};
    use std::path::Path;

    #[test]
    fn normalize_level_accepts_known_values() {
        assert_eq!(
            normalize_level("INFO").expect("INFO should normalize"),
            "info"
        );
        assert_eq!(
            normalize_level(" warning ").expect("warning should normalize"),
            "warn"
        );
        assert_eq!(
            normalize_level("NOTICE").expect("notice should normalize"),
            "warn"
        );
    }

    #[test]
    fn normalize_level_rejects_unknown_values() {
        let error = normalize_level("verbose").expect_err("unknown level must fail");
        assert!(error.contains("unsupported"));
    }

    #[test]
    fn normalize_log_dir_rejects_relative_path() {
        let error =
            normalize_log_dir(Path::new("logs/dev")).expect_err("relative paths must be rejected");
        assert!(error.contains("absolute"));
    }

    #[test]
    fn sanitize_message_removes_newlines_and_truncates() {
        let sanitized = sanitize_message("line1\nline2\rline3", 8);
        assert!(!sanitized.contains('\n'));
        assert!(!sanitized.contains('\r'));
        assert!(sanitized.ends_with("..."));
    }

    #[test]
    fn init_logging_starts_once_and_rejects_second_start() {
        let log_dir = tempfile::tempdir().expect("temp dir should be created");

        let context =
            init_logging("info", Some(log_dir.path())).expect("first init should succeed");
        assert_eq!(context.level(), "info");
        assert_eq!(context.log_dir(), Some(log_dir.path()));

        let second = init_logging("info", None).expect_err("second init should fail");
        assert!(second.contains("already initialized"));

        let same_args =
            init_logging("info", Some(log_dir.path())).expect_err("repeated init should fail");
        assert!(same_args.contains("already initialized"));

        context.flush();
    }
}
