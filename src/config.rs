//! 起動時設定: コマンドライン引数（clap）と環境変数。
//!
//! ```text
//! mysh [BATCH_FILE] [--norc] [--log <FILTER>]
//! ```
//!
//! ログフィルタは `--log` > `MYSH_LOG` > `warn` の優先順。

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// ログフィルタを読む環境変数。
pub const LOG_ENV: &str = "MYSH_LOG";

/// 起動ファイル名（`$HOME` 直下）。
pub const RC_FILE: &str = ".myshrc";

/// A line-oriented command interpreter with pipes, redirection and wildcards.
#[derive(Parser, Debug)]
#[command(name = "mysh", version)]
pub struct Config {
    /// Read commands from this file instead of the terminal
    #[arg(value_name = "BATCH_FILE")]
    pub batch_file: Option<PathBuf>,

    /// Do not run ~/.myshrc at startup
    #[arg(long)]
    pub norc: bool,

    /// tracing filter directive, e.g. `debug` or `mysh=trace` (overrides MYSH_LOG)
    #[arg(long, value_name = "FILTER")]
    pub log: Option<String>,
}

impl Config {
    /// 起動ファイルのパス。`--norc` 指定時や `$HOME` 未設定なら `None`。
    pub fn rc_path(&self) -> Option<PathBuf> {
        if self.norc {
            return None;
        }
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(RC_FILE))
    }

    /// tracing-subscriber 用のフィルタを構築する。不正な指定は `warn` にフォールバック。
    pub fn log_filter(&self) -> EnvFilter {
        let directive = self
            .log
            .clone()
            .or_else(|| std::env::var(LOG_ENV).ok())
            .unwrap_or_else(|| "warn".to_string());
        EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"))
    }

    /// 端末からの対話モードか。バッチファイル指定時は常に非対話。
    pub fn is_interactive(&self) -> bool {
        self.batch_file.is_none() && unsafe { libc::isatty(libc::STDIN_FILENO) } == 1
    }
}
