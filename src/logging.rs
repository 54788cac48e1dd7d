//! # Structured Logging
//!
//! Initializes `tracing` the way the reference codebase's `logging` module
//! and `main.rs` do: an `EnvFilter`-driven level plus a colorized formatter
//! for interactive use. Unlike the reference codebase this crate does not
//! depend on `colored` or `tracing-appender` — there is no file-logging
//! surface here, so coloring is done with raw ANSI escapes and output always
//! goes to stderr, leaving stdout free for any caller that wants to parse
//! RPC results from a driving process.
//!
//! Verbosity is governed by a single environment variable, `RUST_LOG`
//! (standard `tracing-subscriber` `EnvFilter` syntax), falling back to `warn`
//! when unset — the spec's diagnostic-by-default posture. No other
//! environment variable affects logging.

use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

/// A `tracing` event formatter that colors the whole line by level, with no
/// timestamp or target noise, matching the reference codebase's
/// `ColorizedFormatter` but without the `colored` dependency.
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
        let buf_writer = Writer::new(&mut buffer);
        ctx.format_fields(buf_writer, event)?;

        let code = match *event.metadata().level() {
            Level::ERROR => "31",
            Level::WARN => "33",
            Level::INFO => "37",
            Level::DEBUG => "34",
            Level::TRACE => "35",
        };

        writeln!(writer, "\x1b[{code}m{buffer}\x1b[0m")
    }
}

/// Initialize the global `tracing` subscriber for interactive (terminal)
/// use: colorized formatting on stderr, filtered by `RUST_LOG` with a
/// `warn` default. Intended for `src/bin/cleanup_ipc.rs` and any other
/// binary entry point; library code should never call this, only emit
/// `tracing` events.
pub fn init_interactive() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .event_format(ColorizedFormatter)
        .init();
}

/// Initialize the global `tracing` subscriber with plain (non-colorized)
/// formatting, for non-interactive contexts such as CI logs or piped output.
pub fn init_plain() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .init();
}
