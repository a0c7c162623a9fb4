//! コマンド 1 行の実行中に発生しうるエラー。
//!
//! いずれのエラーも「その行の実行を中断して診断を 1 行出力し、次の行へ進む」扱い。
//! インタプリタ自体を終了させるものはない。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 1 行分の処理を中断させるエラー。`Display` はそのまま `mysh: ` の後に出力される。
#[derive(Debug, Error)]
pub enum ShellError {
    /// リダイレクト・パイプの構文エラー（ファイル名なし、空ステージなど）。
    #[error("syntax error: {0}")]
    Syntax(String),

    /// リダイレクト先ファイルを開けなかった。
    #[error("{}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// プロセス生成に失敗した（ENOENT 以外の errno）。
    #[error("{command}: {}", io::Error::from_raw_os_error(*errno))]
    Spawn { command: String, errno: i32 },

    /// 検索パスに実行可能ファイルが見つからなかった。
    #[error("{0}: command not found")]
    ProgramNotFound(String),

    /// その他の OS 呼び出しの失敗（`cd` の chdir、pipe、waitpid など）。
    #[error("{op}: {source}")]
    Os {
        op: String,
        #[source]
        source: io::Error,
    },

    /// ビルトインの引数不足。
    #[error("{0}")]
    Argument(String),
}

impl ShellError {
    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::Syntax(msg.into())
    }

    pub fn os(op: impl Into<String>, source: io::Error) -> Self {
        Self::Os {
            op: op.into(),
            source,
        }
    }

    /// エラーに対応する終了ステータスを返す。
    /// 2 = 構文エラー, 127 = command not found, 126 = permission denied, 1 = その他。
    pub fn exit_status(&self) -> i32 {
        match self {
            Self::Syntax(_) => 2,
            Self::ProgramNotFound(_) => 127,
            Self::Spawn { errno, .. } if *errno == libc::EACCES => 126,
            _ => 1,
        }
    }
}
