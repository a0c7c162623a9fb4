//! ビルトインコマンドの実装。
//!
//! ビルトインは fork/exec を経由せずインタプリタのプロセス内で直接実行される。
//! ディレクトリ変更やプロセス終了は子プロセスでは意味を持たないため。
//! [`Builtin::from_name`] が `None` を返した名前は外部コマンドとして executor に委ねる。

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::ShellError;
use crate::shell::{Flow, Shell};

/// ビルトインの閉じた集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Pwd,
    Which,
    Exit,
}

impl Builtin {
    /// コマンド名がビルトインならその種別を返す。
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cd" => Some(Self::Cd),
            "pwd" => Some(Self::Pwd),
            "which" => Some(Self::Which),
            "exit" => Some(Self::Exit),
            _ => None,
        }
    }

    /// ビルトインを実行する。`args[0]` はコマンド名。出力は `out` に書く。
    pub fn run(self, shell: &mut Shell, args: &[String], out: &mut dyn Write) -> Result<Flow, ShellError> {
        match self {
            Self::Cd => builtin_cd(shell, args),
            Self::Pwd => builtin_pwd(shell, out),
            Self::Which => builtin_which(shell, args, out),
            Self::Exit => builtin_exit(args, out),
        }
    }
}

/// `cd <dir>` — カレントディレクトリを変更する。引数なしはエラー。
fn builtin_cd(shell: &mut Shell, args: &[String]) -> Result<Flow, ShellError> {
    let target = args
        .get(1)
        .ok_or_else(|| ShellError::Argument("cd: missing argument".into()))?;
    shell.change_dir(Path::new(target))?;
    Ok(Flow::Continue)
}

/// `pwd` — カレントディレクトリの絶対パスを出力する。
fn builtin_pwd(shell: &Shell, out: &mut dyn Write) -> Result<Flow, ShellError> {
    let cwd = shell.current_dir()?;
    writeln!(out, "{}", cwd.display()).map_err(|e| ShellError::os("pwd", e))?;
    Ok(Flow::Continue)
}

/// `which <name>` — 固定の検索ディレクトリから最初の実行可能ファイルを探して出力する。
fn builtin_which(shell: &Shell, args: &[String], out: &mut dyn Write) -> Result<Flow, ShellError> {
    let name = args
        .get(1)
        .ok_or_else(|| ShellError::Argument("which: missing argument".into()))?;
    match find_executable(&shell.search_dirs, name) {
        Some(path) => {
            writeln!(out, "{}", path.display()).map_err(|e| ShellError::os("which", e))?;
            Ok(Flow::Continue)
        }
        None => Err(ShellError::ProgramNotFound(name.clone())),
    }
}

/// `exit [message]` — メッセージがあれば出力し、終了を要求する。
fn builtin_exit(args: &[String], out: &mut dyn Write) -> Result<Flow, ShellError> {
    if args.len() > 1 {
        writeln!(out, "Exiting with message: {}", args[1..].join(" "))
            .map_err(|e| ShellError::os("exit", e))?;
    }
    Ok(Flow::Exit)
}

/// `dirs` を順に探し、最初に見つかった実行可能な通常ファイルを返す。
pub fn find_executable(dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    if name.contains('/') {
        return None;
    }
    dirs.iter()
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
