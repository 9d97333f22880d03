// Copyright 2026 The MYR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Logging
//!
//! Libraries only use the `log` macros.  Binaries call `init_logging` once, early in `main`.

use std::io::Write;
use std::sync::Once;

use log::Level;

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// `env_logger` filter syntax, e.g. `"info"` or `"myr=debug,pompeii=trace"`.  Falls back to
    /// `RUST_LOG`, then `info`.
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Install the global logger.  Later calls do nothing.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.write_style(config.write_style);
        builder.format(|buf, record| {
            writeln!(
                buf,
                "{} {} {}",
                prefix(record.level()),
                buf.timestamp(),
                record.args()
            )
        });

        // Someone else may have installed a logger already.
        if builder.try_init().is_err() {
            log::debug!("logger already installed");
        }
    });
}

/// Info lines carry no level.
fn prefix(level: Level) -> String {
    match level {
        Level::Info => "[MYR]".to_string(),
        level => format!("[MYR {level}]"),
    }
}
