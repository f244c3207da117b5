use core::{
    fmt::{self, Arguments, Display},
    str::FromStr,
    sync::atomic::{self, AtomicU8},
    time::Duration,
};
use std::{
    fmt::Write as _,
    io::{self, Write as _},
    time::Instant,
};

use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};

/// Environment variable read by [`Logger::configure_from_env`].
pub const LOG_LEVEL_ENV: &str = "DYNARR_LOG";

static PROCESS_START: Lazy<Instant> = Lazy::new(Instant::now);

// Never dropped, so it flushes after every write
static DEFAULT_LOGGER: Logger = Logger::with_always_flush(true);

static LOGGER: RwLock<Option<&'static Logger>> = parking_lot::const_rwlock(None);

/// Replace the logger used by the logging macros.
pub fn set_logger(logger: &'static Logger) {
    // Flush whatever the previous logger still holds, so messages keep their order
    get_logger().flush();
    *LOGGER.write() = Some(logger);
}

/// Get the active logger, falling back to the built-in logger when none was set.
pub fn get_logger() -> &'static Logger {
    match *LOGGER.read() {
        Some(logger) => logger,
        None => &DEFAULT_LOGGER,
    }
}

/// Get the time elapsed since the first log-related call in the process
pub fn get_timestamp() -> Duration {
    PROCESS_START.elapsed()
}

/// Logging level
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum LogLevel {
    /// Severe error: the program cannot reasonably continue
    Severe,
    /// Error: an operation failed and reported it to its caller
    Error,
    /// Warning: a request was rejected or degraded, but nothing broke
    Warning,
    /// General info
    Info,
    /// Verbose info
    Verbose,
    /// Debug info (includes verbose info)
    Debug,
}

impl LogLevel {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Severe,
            1 => LogLevel::Error,
            2 => LogLevel::Warning,
            3 => LogLevel::Info,
            4 => LogLevel::Verbose,
            _ => LogLevel::Debug,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Severe  => f.write_str("\x1B[1m\x1B[41m\x1B[30m[SEVERE ]\x1B[0m"),
            LogLevel::Error   => f.write_str(               "\x1B[91m[ERROR  ]\x1B[0m"),
            LogLevel::Warning => f.write_str(               "\x1B[93m[WARNING]\x1B[0m"),
            LogLevel::Info    => f.write_str(               "\x1B[37m[INFO   ]\x1B[0m"),
            LogLevel::Verbose => f.write_str(               "\x1B[90m[VERBOSE]\x1B[0m"),
            LogLevel::Debug   => f.write_str(               "\x1B[94m[DEBUG  ]\x1B[0m"),
        }
    }
}

/// Error returned when a string does not name a [`LogLevel`]
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParseLogLevelError(String);

impl Display for ParseLogLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level `{}`", self.0)
    }
}

impl std::error::Error for ParseLogLevelError {}

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "severe"            => Ok(LogLevel::Severe),
            "error"             => Ok(LogLevel::Error),
            "warning" | "warn"  => Ok(LogLevel::Warning),
            "info"              => Ok(LogLevel::Info),
            "verbose"           => Ok(LogLevel::Verbose),
            "debug"             => Ok(LogLevel::Debug),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

/// Log category
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LogCategory {
    category     : &'static str,
    sub_category : Option<&'static str>
}

impl LogCategory {
    pub const fn new(name: &'static str) -> Self {
        Self { category: name, sub_category: None }
    }

    pub const fn new_with_sub(name: &'static str, sub_name: &'static str) -> Self {
        Self { category: name, sub_category: Some(sub_name) }
    }
}

impl Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_category {
            Some(sub) => f.write_fmt(format_args!("{}({sub})", self.category)),
            None => f.write_str(self.category),
        }
    }
}

/// Additional info about where the log occured
#[derive(Clone, Copy, Debug)]
pub struct LogLocation {
    file : &'static str,
    line : u32,
    func : &'static str,
    time : Duration,
}

impl LogLocation {
    /// Creates a new log location
    pub const fn new(file: &'static str, line: u32, func: &'static str, time: Duration) -> Self {
        Self { file, line, func, time }
    }

    /// Get the file name where the log occured
    pub const fn file(&self) -> &str {
        self.file
    }

    /// Get the line where the log occurred
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Get the function where the log occurred
    pub const fn function(&self) -> &str {
        self.func
    }

    /// Get the time since process start when the log occurred
    pub const fn timestamp(&self) -> Duration {
        self.time
    }
}

struct LogLocationFormatter<'a> {
    loc   : &'a LogLocation,
    level : LogLevel
}

impl<'a> LogLocationFormatter<'a> {
    fn new(loc: &'a LogLocation, level: LogLevel) -> Self {
        Self { loc, level }
    }
}

impl Display for LogLocationFormatter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            LogLevel::Severe |
            LogLevel::Error |
            LogLevel::Debug => f.write_fmt(format_args!("({}:{}: {})", self.loc.file(), self.loc.line(), self.loc.function())),
            LogLevel::Warning |
            LogLevel::Info |
            LogLevel::Verbose => Ok(()),
        }
    }
}

struct TimestampFormatter(Duration);

impl Display for TimestampFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5}.{:03}", self.0.as_secs(), self.0.subsec_millis())
    }
}

pub fn get_func_name<F>(_: F) -> &'static str {
    core::any::type_name::<F>()
}

#[macro_export]
macro_rules! log_location {
    () => {
        $crate::LogLocation::new(file!(), line!(), "", $crate::get_timestamp())
    };
    ($func: expr) => {
        $crate::LogLocation::new(file!(), line!(), $crate::get_func_name($func), $crate::get_timestamp())
    };
}

type LogWriter = Box<dyn io::Write + Send>;

pub struct LoggerState {
    writers:        [Option<LogWriter>; Self::MAX_WRITERS],
    cache:          String,
    always_flush:   bool,
    log_to_console: bool,
}

impl LoggerState {
    const MAX_WRITERS: usize = 8;
    const CACHE_FLUSH_LIMIT: usize = 4 * 1024;

    const fn new(always_flush: bool) -> Self {
        Self {
            writers: [None, None, None, None, None, None, None, None],
            cache: String::new(),
            always_flush,
            log_to_console: true,
        }
    }

    fn write_message(&mut self, message: &str) {
        self.cache.push_str(message);
        self.flush_when_needed();
    }

    fn format_message(&mut self, fmt_args: Arguments) {
        _ = self.cache.write_fmt(fmt_args);
        self.flush_when_needed();
    }

    fn flush_when_needed(&mut self) {
        if self.always_flush || self.cache.len() > Self::CACHE_FLUSH_LIMIT {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.cache.is_empty() {
            return;
        }

        if self.log_to_console {
            _ = io::stderr().lock().write_all(self.cache.as_bytes());
        }

        for writer in self.writers.iter_mut().flatten() {
            _ = writer.write_all(self.cache.as_bytes());
            _ = writer.flush();
        }
        self.cache.clear();
    }
}

/// Logger
///
/// Supports up to 8 writers next to the console, e.g. a file, an in-memory buffer for tests, an external tool, etc
pub struct Logger {
    state: Mutex<LoggerState>,
    max_log_level: AtomicU8,
}

impl Logger {
    /// Create a logger that writes warnings and worse to the console.
    pub const fn new() -> Self {
        Self::with_always_flush(false)
    }

    /// Create a logger that writes warnings and worse to the console, flushing after each write when `always_flush` is set.
    pub const fn with_always_flush(always_flush: bool) -> Self {
        Self {
            state: parking_lot::const_mutex(LoggerState::new(always_flush)),
            max_log_level: AtomicU8::new(LogLevel::Warning as u8),
        }
    }

    /// Set the maximum log level (severe == lowest, debug == highest)
    pub fn set_max_level(&self, level: LogLevel) {
        self.max_log_level.store(level as u8, atomic::Ordering::Relaxed)
    }

    /// Get the maximum log level
    pub fn max_level(&self) -> LogLevel {
        LogLevel::from_u8(self.max_log_level.load(atomic::Ordering::Relaxed))
    }

    /// Check if a message at `level` would be written
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level as u8 <= self.max_log_level.load(atomic::Ordering::Relaxed)
    }

    /// Read the maximum log level from the `DYNARR_LOG` environment variable.
    ///
    /// Returns the level that was applied, or `None` when the variable is unset or does not name a level.
    pub fn configure_from_env(&self) -> Option<LogLevel> {
        let level = std::env::var(LOG_LEVEL_ENV).ok()?.parse::<LogLevel>().ok()?;
        self.set_max_level(level);
        Some(level)
    }

    /// Set whether the logger should flush after each write
    pub fn set_always_flush(&self, always_flush: bool) {
        self.state.lock().always_flush = always_flush;
    }

    /// Set whether the logger should log it's output to console
    pub fn set_log_to_console(&self, log_to_console: bool) {
        let mut state = self.state.lock();

        // Make sure to flush first, cause all messages before wanted/didn't want to be log to be written to console
        state.flush();
        state.log_to_console = log_to_console;
    }

    /// Add a writer.
    ///
    /// Returns `Ok(index)` if space was available. This index can be used to remove the writer later on.
    ///
    /// Otherwise returns an `Err` with the provided writer
    pub fn add_writer(&self, writer: LogWriter) -> Result<usize, LogWriter> {
        let mut state = self.state.lock();

        let empty = state.writers.iter_mut().enumerate().find(|(_, slot)| slot.is_none());
        match empty {
            Some((id, slot)) => {
                *slot = Some(writer);
                Ok(id)
            },
            None => Err(writer),
        }
    }

    /// Remove a writer from the logger
    pub fn remove_writer(&self, index: usize) -> Option<LogWriter> {
        let mut state = self.state.lock();
        state.flush();
        state.writers.get_mut(index)?.take()
    }

    /// Log a message
    pub fn log(&self, category: LogCategory, level: LogLevel, loc: LogLocation, text: &str) {
        self.log_fmt(category, level, loc, format_args!("{text}"));
    }

    pub fn log_fmt(&self, category: LogCategory, level: LogLevel, loc: LogLocation, format: Arguments) {
        if self.is_enabled(level) {
            let loc_formatter = LogLocationFormatter::new(&loc, level);
            let timestamp = TimestampFormatter(loc.timestamp());
            let mut state = self.state.lock();
            state.format_message(format_args!("\x1B[38m{timestamp}\x1B[0m {level} [{category}] {loc_formatter}: "));
            state.format_message(format);
            state.write_message("\n");
        }
    }

    pub fn flush(&self) {
        self.state.lock().flush()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.flush();
    }
}

#[macro_export]
macro_rules! log {
    ($category:expr, $level:expr, $func:expr, $($arg:tt)+) => {
        $crate::get_logger().log_fmt($category, $level, $crate::log_location!($func), format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_severe {
    ($category:expr, $func:expr, $($arg:tt)+) => {
        $crate::get_logger().log_fmt($category, $crate::LogLevel::Severe, $crate::log_location!($func), format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_error {
    ($category:expr, $func:expr, $($arg:tt)+) => {
        $crate::get_logger().log_fmt($category, $crate::LogLevel::Error, $crate::log_location!($func), format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($category:expr, $($arg:tt)+) => {
        $crate::get_logger().log_fmt($category, $crate::LogLevel::Warning, $crate::log_location!(), format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_info {
    ($category:expr, $($arg:tt)+) => {
        $crate::get_logger().log_fmt($category, $crate::LogLevel::Info, $crate::log_location!(), format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_verbose {
    ($category:expr, $($arg:tt)+) => {
        $crate::get_logger().log_fmt($category, $crate::LogLevel::Verbose, $crate::log_location!(), format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($category:expr, $func:expr, $($arg:tt)+) => {
        $crate::get_logger().log_fmt($category, $crate::LogLevel::Debug, $crate::log_location!($func), format_args!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const CAT: LogCategory = LogCategory::new_with_sub("Tests", "Logger");

    /// Writer sharing its buffer, so the test can inspect what the logger wrote
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    fn quiet_logger() -> (Logger, SharedBuffer) {
        let logger = Logger::new();
        logger.set_log_to_console(false);
        logger.set_always_flush(true);
        let buffer = SharedBuffer::default();
        assert!(logger.add_writer(Box::new(buffer.clone())).is_ok());
        (logger, buffer)
    }

    #[test]
    fn category_display() {
        assert_eq!(LogCategory::new("Main").to_string(), "Main");
        assert_eq!(LogCategory::new_with_sub("Collections", "DynArray").to_string(), "Collections(DynArray)");
    }

    #[test]
    fn level_parsing() {
        assert_eq!("verbose".parse::<LogLevel>(), Ok(LogLevel::Verbose));
        assert_eq!(" WARN ".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn filters_by_level() {
        let (logger, buffer) = quiet_logger();
        logger.set_max_level(LogLevel::Warning);

        logger.log(CAT, LogLevel::Verbose, log_location!(), "hidden");
        logger.log(CAT, LogLevel::Error, log_location!(), "shown");

        let contents = buffer.contents();
        assert!(!contents.contains("hidden"));
        assert!(contents.contains("shown"));
        assert!(contents.contains("[Tests(Logger)]"));
    }

    #[test]
    fn formats_arguments() {
        let (logger, buffer) = quiet_logger();
        logger.set_max_level(LogLevel::Debug);

        let cap = 16;
        logger.log_fmt(CAT, LogLevel::Verbose, log_location!(), format_args!("grew to {cap}"));
        assert!(buffer.contents().contains("grew to 16\n"));
    }

    #[test]
    fn default_logger_writes_through() {
        let logger = get_logger();
        logger.set_log_to_console(false);
        let buffer = SharedBuffer::default();
        let index = logger.add_writer(Box::new(buffer.clone())).ok().unwrap();

        log_warning!(LogCategory::new("Default"), "length error happened");
        assert!(buffer.contents().contains("length error happened\n"));
        assert!(logger.state.lock().cache.is_empty());

        logger.remove_writer(index);
        logger.set_log_to_console(true);
    }

    #[test]
    fn writer_slots_are_limited() {
        let logger = Logger::new();
        for i in 0..LoggerState::MAX_WRITERS {
            assert_eq!(logger.add_writer(Box::new(io::sink())).ok(), Some(i));
        }
        assert!(logger.add_writer(Box::new(io::sink())).is_err());
        assert!(logger.remove_writer(3).is_some());
        assert_eq!(logger.add_writer(Box::new(io::sink())).ok(), Some(3));
    }
}
