//! リダイレクト解決: ステージの引数ベクタから `<`, `>`, `>>` とそのファイル名を取り除き、
//! 対応するファイルを開く。
//!
//! 開いたファイルは [`File`] として所有するため、同じ方向の再指定で上書きされたもの、
//! エラーで中断したときに開いていたもの、spawn 後に親側で不要になったものは
//! すべて drop 時にちょうど 1 回 close される。

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use crate::error::ShellError;
use crate::parser::Word;

/// リダイレクト演算子の種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `<` — stdin をファイルから読み取り
    Input,
    /// `>` — stdout を上書き
    Output,
    /// `>>` — stdout を追記
    Append,
}

impl RedirectKind {
    /// 行に直接書かれた演算子ならその種別を返す。glob 展開で得た単語は常に `None`。
    pub fn from_word(word: &Word) -> Option<Self> {
        match word {
            Word::Literal(s) => match s.as_str() {
                "<" => Some(Self::Input),
                ">" => Some(Self::Output),
                ">>" => Some(Self::Append),
                _ => None,
            },
            Word::Expanded(_) => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Input => "<",
            Self::Output => ">",
            Self::Append => ">>",
        }
    }

    fn open(self, path: &Path) -> std::io::Result<File> {
        match self {
            Self::Input => File::open(path),
            Self::Output => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o644)
                .open(path),
            Self::Append => OpenOptions::new()
                .append(true)
                .create(true)
                .mode(0o644)
                .open(path),
        }
    }
}

/// ステージの stdin / stdout に明示的に束縛されたファイル。`None` はパイプ or 継承。
#[derive(Debug, Default)]
pub struct Redirections {
    pub stdin: Option<File>,
    pub stdout: Option<File>,
}

/// [`resolve`] の結果: 演算子を除いた引数ベクタと開いたファイル。
#[derive(Debug)]
pub struct Resolved {
    pub argv: Vec<String>,
    pub redirections: Redirections,
}

/// ステージの単語列を左から走査してリダイレクトを解決する。
///
/// - 演算子の次の単語がなければ構文エラー
/// - ファイルを開けなければ [`ShellError::Open`]
/// - 同じ方向の複数指定は最後が有効（前のファイルは close される）
/// - 演算子を除いた結果コマンド名が残らなければ構文エラー
pub fn resolve(words: Vec<Word>) -> Result<Resolved, ShellError> {
    let mut redirections = Redirections::default();
    let mut argv = Vec::with_capacity(words.len());
    let mut words = words.into_iter();

    while let Some(word) = words.next() {
        let Some(kind) = RedirectKind::from_word(&word) else {
            argv.push(word.into_string());
            continue;
        };
        let target = words.next().map(Word::into_string).ok_or_else(|| {
            ShellError::syntax(format!("missing filename for `{}`", kind.as_str()))
        })?;

        let file = kind.open(Path::new(&target)).map_err(|source| ShellError::Open {
            path: target.clone().into(),
            source,
        })?;
        tracing::debug!(op = kind.as_str(), path = %target, "redirect opened");

        // 古いファイルは代入時に drop → close
        match kind {
            RedirectKind::Input => redirections.stdin = Some(file),
            RedirectKind::Output | RedirectKind::Append => redirections.stdout = Some(file),
        }
    }

    if argv.is_empty() {
        return Err(ShellError::syntax("missing command before redirection"));
    }

    Ok(Resolved { argv, redirections })
}
