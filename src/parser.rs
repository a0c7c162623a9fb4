//! トークナイザ + パイプライン構築。
//!
//! 入力行を空白で単語に分割し（[`tokenize`]）、glob 展開後のトークン列を
//! `|` でステージごとの引数ベクタに分割する（[`build_pipeline`]）。
//!
//! ## 対応構文
//!
//! - 空白区切りの単語（スペース・タブ）。クォート・エスケープは扱わない
//! - パイプライン: `cmd1 | cmd2 | cmd3`（`|` は独立したトークンであること）
//!
//! リダイレクト演算子はここでは解釈せず、ステージごとに
//! [`redirect::resolve`](crate::redirect::resolve) が処理する。
//!
//! 演算子（`|`, `<`, `>`, `>>`）として扱うのは行に直接書かれた単語（[`Word::Literal`]）だけ。
//! glob 展開で得たパス名（[`Word::Expanded`]）は同じ綴りでも常に引数。

use crate::error::ShellError;

// ── AST ─────────────────────────────────────────────────────────────

/// glob 展開後の 1 単語。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word {
    /// 入力行に書かれたままの単語（マッチなしで残ったパターンを含む）。
    Literal(String),
    /// glob 展開で得たパス名。
    Expanded(String),
}

impl Word {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) | Self::Expanded(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Literal(s) | Self::Expanded(s) => s,
        }
    }

    /// 行に直接書かれた演算子 `op` か。
    pub fn is_operator(&self, op: &str) -> bool {
        matches!(self, Self::Literal(s) if s == op)
    }
}

/// パイプラインで接続されたステージ列。`cmd1 | cmd2 | cmd3` → 3 要素。
///
/// 各ステージの単語列は空でないことが保証される。`|` を含まない行は 1 ステージ。
#[derive(Debug, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Vec<Word>>,
}

// ── Tokenizer ───────────────────────────────────────────────────────

/// 入力行をトークン列に分割する。
///
/// 連続する空白（スペース・タブ・改行）を 1 つの区切りとみなす。
/// 空行・空白のみの行は空ベクタを返す。
pub fn tokenize(line: &str) -> Vec<String> {
    line.split(is_separator)
        .filter(|w| !w.is_empty())
        .map(str::to_owned)
        .collect()
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

// ── Pipeline builder ────────────────────────────────────────────────

/// 単語列を `|` で分割して [`Pipeline`] を構築する。
///
/// - `|` 自体はどのステージにも渡さない
/// - 先頭・末尾・連続する `|`（空ステージ）は構文エラー
/// - glob 展開後の単語列を受け取るが、再トークン化はしない
pub fn build_pipeline(words: Vec<Word>) -> Result<Pipeline, ShellError> {
    let mut stages = Vec::new();
    let mut current = Vec::new();

    for word in words {
        if word.is_operator("|") {
            if current.is_empty() {
                return Err(ShellError::syntax("empty pipeline stage near `|`"));
            }
            stages.push(std::mem::take(&mut current));
        } else {
            current.push(word);
        }
    }

    if current.is_empty() {
        // 末尾 `|`、または入力自体が空
        return Err(ShellError::syntax("empty pipeline stage near `|`"));
    }
    stages.push(current);

    tracing::trace!(stages = stages.len(), "pipeline built");
    Ok(Pipeline { stages })
}

/// 単語列に演算子 `|` が含まれるか判定する。ビルトインの高速パス判定に使う。
pub fn has_pipe(words: &[Word]) -> bool {
    words.iter().any(|w| w.is_operator("|"))
}

// ── Tests ───────────────────────────────────────────────────────────
