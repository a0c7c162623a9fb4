//! インタプリタのプロセスコンテキスト。
//!
//! カレントディレクトリはプロセス全体で共有され、以降に spawn される子へそのまま継承される。
//! 変更は [`Shell::change_dir`]（`cd` ビルトイン）経由に限定する。

use std::env;
use std::path::{Path, PathBuf};

use crate::error::ShellError;

/// `which` が検索する固定ディレクトリ。先に見つかったものが優先。
pub const DEFAULT_SEARCH_DIRS: [&str; 3] = ["/usr/local/bin", "/usr/bin", "/bin"];

/// 1 行の実行後に読み取りループが取るべき動作。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// 次の行を読む。
    Continue,
    /// `exit` が要求された。
    Exit,
}

/// シェルの実行状態。REPL ループ全体で共有される。
pub struct Shell {
    /// 直前の行の終了ステータス。
    pub last_status: i32,
    /// `which` の検索ディレクトリ。
    pub search_dirs: Vec<PathBuf>,
}

impl Shell {
    pub fn new() -> Self {
        Self {
            last_status: 0,
            search_dirs: DEFAULT_SEARCH_DIRS.iter().map(PathBuf::from).collect(),
        }
    }

    /// 現在の作業ディレクトリ（絶対パス）。
    pub fn current_dir(&self) -> Result<PathBuf, ShellError> {
        env::current_dir().map_err(|e| ShellError::os("getcwd", e))
    }

    /// 作業ディレクトリを変更する。失敗時は変更されない。
    pub fn change_dir(&mut self, target: &Path) -> Result<(), ShellError> {
        env::set_current_dir(target)
            .map_err(|e| ShellError::os(format!("cd: {}", target.display()), e))?;
        tracing::debug!(dir = %target.display(), "changed directory");
        Ok(())
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}
