//! # Logging Setup
//!
//! Two layers: a file layer (always attached, fixed filename `log.txt`) for
//! post-mortem debugging, and a colorized stdout layer attached only when
//! verbose output was requested. Level is derived from `-v` occurrence
//! count: none → `warn`, one → `info`, two or more → `debug`.

use std::fmt;

use colored::*;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// A custom tracing event formatter that colorizes the whole log line by
/// severity level, without timestamps or level prefixes cluttering
/// user-facing success/warning/summary lines.
pub struct ColorizedFormatter;

impl<S, N> FormatEvent<S, N> for ColorizedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut buffer = String::new();
        let mut buf_writer = Writer::new(&mut buffer);
        ctx.format_fields(buf_writer.by_ref(), event)?;

        let colored_output = match *event.metadata().level() {
            Level::INFO => buffer.white(),
            Level::WARN => buffer.yellow(),
            Level::ERROR => buffer.red(),
            Level::DEBUG => buffer.blue(),
            Level::TRACE => buffer.purple(),
        };

        writeln!(writer, "{}", colored_output)
    }
}

/// Maps `-v` occurrence count to a tracing level, per the CLI convention:
/// no flag → warn, one → info, two or more → debug.
pub fn level_for_verbosity(verbose_count: u8) -> Level {
    match verbose_count {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

/// Installs the process-wide tracing subscriber: a daily-rotating file
/// layer writing to `log.txt` in the current directory (always attached),
/// plus a colorized stdout layer attached only when `verbose` is true.
///
/// Returns the file-appender guard, which must be kept alive for the
/// lifetime of the process so buffered log lines are flushed on exit.
pub fn init_logging(level: Level, verbose: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(".", "log.txt");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(tracing_subscriber::filter::LevelFilter::from_level(level));

    let registry = tracing_subscriber::registry().with(file_layer);

    if verbose {
        let stdout_layer = tracing_subscriber::fmt::layer()
            .event_format(ColorizedFormatter)
            .with_filter(tracing_subscriber::filter::LevelFilter::from_level(level));
        registry.with(stdout_layer).init();
    } else {
        registry.init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_expected_levels() {
        assert_eq!(level_for_verbosity(0), Level::WARN);
        assert_eq!(level_for_verbosity(1), Level::INFO);
        assert_eq!(level_for_verbosity(2), Level::DEBUG);
        assert_eq!(level_for_verbosity(9), Level::DEBUG);
    }
}
