use colored::{Color, ColoredString, Colorize};
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Colors used by the summary printer.
pub struct Colors;

impl Colors {
    pub const HITS: Color = Color::Green;
    pub const FOLLOWED: Color = Color::Cyan;
    pub const SKIPPED: Color = Color::Yellow;

    pub fn colorize(color: Color, text: &str) -> ColoredString {
        text.color(color)
    }
}

pub fn setup_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // try_init: a second call (tests, embedding) keeps the first logger
    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn) // dependencies: warnings only
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error => format!(
                    "[{} {} {}] {}",
                    name.cyan(),
                    "ERROR".red(),
                    record.target().white(),
                    record.args()
                ),
                Level::Warn => format!(
                    "[{} {} {}] {}",
                    name.cyan(),
                    "WARN".yellow(),
                    record.target().white(),
                    record.args()
                ),
                Level::Debug | Level::Trace => {
                    let thread = std::thread::current();
                    let thread = thread.name().unwrap_or("main");
                    format!("[{} {}] {}", name.cyan(), thread.dimmed(), record.args())
                }
                Level::Info => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
}
