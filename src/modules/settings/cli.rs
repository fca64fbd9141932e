// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use clap::Parser;
use std::{path::PathBuf, sync::LazyLock};

#[cfg(not(test))]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::parse);

#[cfg(test)]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new_for_test);

#[derive(Debug, Parser)]
#[clap(
    name = "mailpool",
    about = "A pooled mailbox engine: concurrent proxied inbox polling with per-account
    backoff, plus paced outbound campaigns through rotating accounts and proxies.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Settings {
    /// mailpool log level (default: "info")
    #[clap(
        long,
        default_value = "info",
        env,
        help = "Set the log level for mailpool"
    )]
    pub mailpool_log_level: String,

    #[clap(
        long,
        default_value = "true",
        env,
        help = "Enable ANSI colors in log output"
    )]
    pub mailpool_ansi_logs: bool,

    #[clap(
        long,
        default_value = "false",
        env,
        help = "Write logs to daily-rolling files instead of stdout"
    )]
    pub mailpool_log_to_file: bool,

    #[clap(
        long,
        default_value = "logs",
        env,
        help = "Directory for rolling log files when file logging is enabled"
    )]
    pub mailpool_log_dir: PathBuf,

    #[clap(
        long,
        default_value = "7",
        env,
        help = "Maximum number of rolled log files to keep"
    )]
    pub mailpool_max_log_files: usize,

    /// Seconds between poll ticks of a user's inbox loop.
    #[clap(
        long,
        default_value = "3",
        env,
        help = "Set the interval between inbox poll ticks, in seconds"
    )]
    pub mailpool_poll_interval_secs: u64,

    /// Connect/IO timeout for mailbox connections.
    #[clap(
        long,
        default_value = "20",
        env,
        help = "Set the IMAP connect and read/write timeout, in seconds"
    )]
    pub mailpool_imap_timeout_secs: u64,

    /// Ceiling on simultaneous mailbox connections within one poll tick.
    #[clap(
        long,
        default_value = "5",
        env,
        help = "Set the maximum number of concurrent mailbox fetches per tick"
    )]
    pub mailpool_fetch_concurrency: usize,

    /// Proxied connection attempts before falling back to direct.
    #[clap(
        long,
        default_value = "3",
        env,
        help = "Set the number of rotated proxy attempts per mailbox connection"
    )]
    pub mailpool_connect_attempts: usize,

    #[clap(
        long,
        default_value = "6",
        env,
        help = "Set the proxy health-probe timeout, in seconds"
    )]
    pub mailpool_probe_timeout_secs: u64,

    /// Default lower bound of the randomized pause between campaign sends,
    /// used when a user has no configured range.
    #[clap(
        long,
        default_value = "3",
        env,
        help = "Set the default minimum delay between campaign sends, in seconds"
    )]
    pub mailpool_send_delay_min: u64,

    #[clap(
        long,
        default_value = "6",
        env,
        help = "Set the default maximum delay between campaign sends, in seconds"
    )]
    pub mailpool_send_delay_max: u64,

    /// When set, proxy exhaustion is a hard failure instead of falling back
    /// to a direct connection. Per-user repository settings override this.
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Never fall back to direct mailbox connections when proxies fail"
    )]
    pub mailpool_strict_verify: bool,

    /// JSON state file with accounts/proxies/pools for the standalone binary.
    #[clap(long, env, help = "Path to the JSON state file loaded at startup")]
    pub mailpool_state_file: Option<PathBuf>,
}

impl Settings {
    #[cfg(test)]
    pub fn new_for_test() -> Self {
        Self {
            mailpool_log_level: "info".into(),
            mailpool_ansi_logs: false,
            mailpool_log_to_file: false,
            mailpool_log_dir: PathBuf::from("logs"),
            mailpool_max_log_files: 7,
            mailpool_poll_interval_secs: 3,
            mailpool_imap_timeout_secs: 20,
            mailpool_fetch_concurrency: 5,
            mailpool_connect_attempts: 3,
            mailpool_probe_timeout_secs: 6,
            mailpool_send_delay_min: 3,
            mailpool_send_delay_max: 6,
            mailpool_strict_verify: false,
            mailpool_state_file: None,
        }
    }
}
