//! ワイルドカード展開: `*`, `?`, `[...]` を含むトークンを既存のパス名に置き換える。
//!
//! | 記法 | 意味 |
//! |------|------|
//! | `*` | 0 文字以上 |
//! | `?` | ちょうど 1 文字 |
//! | `[abc]`, `[a-z]` | 列挙・範囲のいずれか 1 文字 |
//! | `[!..]`, `[^..]` | 列挙・範囲以外の 1 文字 |
//!
//! パターンは `/` で成分に分け、成分ごとにディレクトリを辿る（ディレクトリ成分にも
//! ワイルドカード可）。結果は辞書順。ドットファイルは成分が `.` で始まるときだけ対象。
//! 1 件もマッチしないトークンはそのまま残し、[`Expansion::unmatched`] に積む。

use std::fs;
use std::path::Path;

use crate::parser::Word;

/// [`expand_wildcards`] の結果。
#[derive(Debug, Default, PartialEq)]
pub struct Expansion {
    /// 展開後の単語列。展開で得たパス名は [`Word::Expanded`]。
    pub words: Vec<Word>,
    /// マッチが 0 件だったパターン（呼び出し側が診断を出す）。
    pub unmatched: Vec<String>,
}

/// ワイルドカード文字を含むか。
pub fn has_glob_chars(token: &str) -> bool {
    token.chars().any(|c| matches!(c, '*' | '?' | '['))
}

/// トークン列の各要素を展開する。`base` は相対パターンの起点（通常は `.`）。
pub fn expand_wildcards(tokens: Vec<String>, base: &Path) -> Expansion {
    let mut out = Expansion::default();
    for token in tokens {
        if !has_glob_chars(&token) {
            out.words.push(Word::Literal(token));
            continue;
        }
        let paths = expand(&token, base);
        tracing::trace!(pattern = %token, matches = paths.len(), "glob");
        if paths.is_empty() {
            out.unmatched.push(token.clone());
            out.words.push(Word::Literal(token));
        } else {
            out.words.extend(paths.into_iter().map(Word::Expanded));
        }
    }
    out
}

/// 1 つのパターンを展開する。マッチなしなら空。
///
/// 返すパスはパターンと同じ書き方（相対なら `base` からの相対、絶対なら絶対）。
pub fn expand(pattern: &str, base: &Path) -> Vec<String> {
    let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
    let Some(last) = components.len().checked_sub(1) else {
        return Vec::new();
    };

    let root = if pattern.starts_with('/') { "/" } else { "" };
    let mut candidates = vec![root.to_string()];
    for (i, component) in components.iter().enumerate() {
        let need_dir = i < last;
        let mut next = Vec::new();
        for prefix in &candidates {
            if has_glob_chars(component) {
                next.extend(read_matching(base, prefix, component, need_dir));
            } else {
                next.push(join(prefix, component));
            }
        }
        candidates = next;
        if candidates.is_empty() {
            break;
        }
    }

    // リテラル成分は存在確認がまだなので最後にまとめて確かめる
    let want_dir = pattern.ends_with('/');
    let mut found: Vec<String> = candidates
        .into_iter()
        .filter(|p| match fs::metadata(base.join(p)) {
            Ok(meta) => !want_dir || meta.is_dir(),
            Err(_) => false,
        })
        .map(|p| if want_dir { p + "/" } else { p })
        .collect();
    found.sort();
    found
}

/// `base/prefix` の直下で `component` にマッチする名前を `prefix` 付きで返す。
fn read_matching(base: &Path, prefix: &str, component: &str, need_dir: bool) -> Vec<String> {
    let dir = if prefix.is_empty() { base.to_path_buf() } else { base.join(prefix) };
    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };

    let allow_hidden = component.starts_with('.');
    entries
        .flatten()
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| allow_hidden || !name.starts_with('.'))
        .filter(|name| matches_pattern(component, name))
        .filter(|name| !need_dir || dir.join(name).is_dir())
        .map(|name| join(prefix, &name))
        .collect()
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else if prefix.ends_with('/') {
        format!("{}{}", prefix, name)
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// 1 つのパス成分 `name` がパターンにマッチするか。
///
/// `*` は直近の位置だけ覚えておき、失敗したらそこから 1 文字ずらして再試行する。
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = name.chars().collect();
    let (mut p, mut t) = (0, 0);
    // (`*` の直後の p, その `*` が吸収し始めた t)
    let mut retry: Option<(usize, usize)> = None;

    while t < text.len() {
        let advanced = match pat.get(p) {
            Some('*') => {
                retry = Some((p + 1, t));
                p += 1;
                continue;
            }
            Some('?') => Some(p + 1),
            Some('[') => match CharClass::parse(&pat[p + 1..]) {
                Some((class, used)) => class.contains(text[t]).then_some(p + 1 + used),
                // 閉じ `]` がない `[` は普通の文字
                None => (text[t] == '[').then_some(p + 1),
            },
            Some(&c) => (c == text[t]).then_some(p + 1),
            None => None,
        };

        match (advanced, retry) {
            (Some(next), _) => {
                p = next;
                t += 1;
            }
            (None, Some((star_p, star_t))) => {
                retry = Some((star_p, star_t + 1));
                p = star_p;
                t = star_t + 1;
            }
            (None, None) => return false,
        }
    }

    pat[p..].iter().all(|&c| c == '*')
}

/// `[...]` の中身。
#[derive(Debug)]
struct CharClass {
    negated: bool,
    ranges: Vec<(char, char)>,
}

impl CharClass {
    /// `[` の直後から読み、クラスと `]` までの消費文字数を返す。`]` がなければ `None`。
    /// 先頭の `]` はメンバーとして扱う。
    fn parse(rest: &[char]) -> Option<(Self, usize)> {
        let negated = matches!(rest.first(), Some('!' | '^'));
        let start = usize::from(negated);
        let mut i = start;
        let mut ranges = Vec::new();
        loop {
            let c = *rest.get(i)?;
            if c == ']' && i > start {
                return Some((Self { negated, ranges }, i + 1));
            }
            match (rest.get(i + 1), rest.get(i + 2)) {
                (Some('-'), Some(&hi)) if hi != ']' => {
                    ranges.push((c, hi));
                    i += 3;
                }
                _ => {
                    ranges.push((c, c));
                    i += 1;
                }
            }
        }
    }

    fn contains(&self, c: char) -> bool {
        self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi) != self.negated
    }
}
