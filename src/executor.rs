//! コマンド 1 行の実行: トークン化 → glob 展開 → ビルトイン判定 → パイプライン構築 →
//! ステージごとのリダイレクト解決 → spawn / 待機 → ステータス報告。
//!
//! - [`execute`]: 読み取りループから呼ばれる入口。エラーは診断 1 行にして継続
//! - [`run_line`]: 同じ処理を `Result` で返す（テスト・ベンチ用）
//! - [`run_line_with`]: 診断の出力先を指定できる版
//! - 単一ステージのビルトイン: fork なしでプロセス内実行（`>`/`>>` は尊重）
//! - それ以外: [`supervisor::run_stages`] で全ステージを spawn して待機
//!
//! 複数ステージのパイプライン中のビルトイン名は外部コマンドとして扱う。

use std::io::{self, Write};
use std::path::Path;

use crate::builtins::Builtin;
use crate::error::ShellError;
use crate::glob;
use crate::parser;
use crate::redirect::{self, Redirections};
use crate::shell::{Flow, Shell};
use crate::supervisor::{self, StageStatus};

/// 1 行の実行結果。
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// 空行。
    Empty,
    /// ビルトインを実行した。
    Builtin(Flow),
    /// 外部コマンドを実行した。ステージ名と終了状態の組。
    Stages(Vec<(String, StageStatus)>),
}

/// 1 行を実行し、読み取りループが次に取るべき動作を返す。
///
/// エラーは `mysh: ...` の 1 行診断として stderr に出し、`last_status` に反映する。
pub fn execute(shell: &mut Shell, line: &str) -> Flow {
    match run_line(shell, line) {
        Ok(Outcome::Empty) => Flow::Continue,
        Ok(Outcome::Builtin(flow)) => {
            shell.last_status = 0;
            flow
        }
        Ok(Outcome::Stages(stages)) => {
            report_statuses(&stages);
            shell.last_status = stages.last().map_or(0, |(_, s)| s.code());
            Flow::Continue
        }
        Err(e) => {
            eprintln!("mysh: {}", e);
            shell.last_status = e.exit_status();
            Flow::Continue
        }
    }
}

/// 1 行を実行して結果を返す。glob のマッチなし警告は stderr に出す。
pub fn run_line(shell: &mut Shell, line: &str) -> Result<Outcome, ShellError> {
    run_line_with(shell, line, &mut io::stderr())
}

/// [`run_line`] と同じ。glob のマッチなし警告を `diag` に書く。
pub fn run_line_with(
    shell: &mut Shell,
    line: &str,
    diag: &mut dyn Write,
) -> Result<Outcome, ShellError> {
    let tokens = parser::tokenize(line);
    if tokens.is_empty() {
        return Ok(Outcome::Empty);
    }
    tracing::debug!(?tokens, "tokenized");

    let expansion = glob::expand_wildcards(tokens, Path::new("."));
    for pattern in &expansion.unmatched {
        // 診断が書けなくても行の実行は続ける
        let _ = writeln!(diag, "mysh: no matches for wildcard: {}", pattern);
    }
    let words = expansion.words;

    // 単一ステージ → リダイレクトを解決してからビルトイン判定
    if !parser::has_pipe(&words) {
        let resolved = redirect::resolve(words)?;
        if let Some(builtin) = Builtin::from_name(&resolved.argv[0]) {
            let flow = run_builtin(shell, builtin, &resolved.argv, resolved.redirections)?;
            return Ok(Outcome::Builtin(flow));
        }
        return run_external(vec![(resolved.argv, resolved.redirections)]);
    }

    let pipeline = parser::build_pipeline(words)?;
    // 全ステージのリダイレクトを先に解決する（失敗時は 1 つも spawn しない）
    let stages = pipeline
        .stages
        .into_iter()
        .map(|stage| redirect::resolve(stage).map(|r| (r.argv, r.redirections)))
        .collect::<Result<Vec<_>, ShellError>>()?;
    run_external(stages)
}

fn run_external(stages: Vec<(Vec<String>, Redirections)>) -> Result<Outcome, ShellError> {
    let names: Vec<String> = stages.iter().map(|(argv, _)| argv[0].clone()).collect();
    let statuses = supervisor::run_stages(stages)?;
    Ok(Outcome::Stages(names.into_iter().zip(statuses).collect()))
}

/// ビルトインをプロセス内で実行する。`>`/`>>` があればその出力先に書く。
fn run_builtin(
    shell: &mut Shell,
    builtin: Builtin,
    argv: &[String],
    redirections: Redirections,
) -> Result<Flow, ShellError> {
    tracing::debug!(?builtin, "builtin");
    match redirections.stdout {
        Some(mut file) => builtin.run(shell, argv, &mut file),
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let flow = builtin.run(shell, argv, &mut out)?;
            out.flush().map_err(|e| ShellError::os("flush", e))?;
            Ok(flow)
        }
    }
}

/// 非ゼロ終了・シグナル終了したステージを stderr に報告する。
fn report_statuses(stages: &[(String, StageStatus)]) {
    for (name, status) in stages {
        match status {
            StageStatus::Exited(0) => {}
            StageStatus::Exited(code) => eprintln!("mysh: {}: exited with status {}", name, code),
            StageStatus::Signaled(sig) => eprintln!("mysh: {}: terminated by signal {}", name, sig),
        }
    }
}
