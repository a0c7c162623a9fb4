//! mysh ベンチマーク: トークナイザ、パイプライン構築、glob、spawn、1 行実行の計測。
//!
//! `std::time::Instant` による手動計測（外部クレート不要）。
//!
//! 実行: `cargo bench`

use std::path::Path;
use std::time::{Duration, Instant};

use mysh::parser::Word;

// ── 計測 ──────────────────────────────────────────────────────────

/// 1 セクション分の計測結果をまとめて表示する。
struct Section {
    title: &'static str,
    rows: Vec<(&'static str, Duration, u64)>,
}

impl Section {
    fn new(title: &'static str) -> Self {
        Self { title, rows: Vec::new() }
    }

    /// `f` を `iters` 回実行して平均時間を記録する（先に最大 100 回空回し）。
    fn run<F: FnMut()>(&mut self, name: &'static str, iters: u64, mut f: F) {
        for _ in 0..iters.min(100) {
            f();
        }
        let start = Instant::now();
        for _ in 0..iters {
            f();
        }
        self.rows.push((name, start.elapsed() / iters as u32, iters));
    }

    fn report(self) {
        println!("\n--- {} ---", self.title);
        for (name, avg, iters) in self.rows {
            let avg_us = avg.as_nanos() as f64 / 1000.0;
            println!("{:<44}: avg {:>10.2}µs  ({} iters)", name, avg_us, iters);
        }
    }
}

fn literals(tokens: Vec<String>) -> Vec<Word> {
    tokens.into_iter().map(Word::Literal).collect()
}

// ── メイン ────────────────────────────────────────────────────────

fn main() {
    println!("mysh benchmark suite");
    println!("{}", "=".repeat(80));

    let mut parser = Section::new("Parser");
    parser.run("tokenize echo hello", 10_000, || {
        let _ = mysh::parser::tokenize("echo hello");
    });
    parser.run("tokenize ls | grep Cargo | head -1", 10_000, || {
        let _ = mysh::parser::tokenize("ls | grep Cargo | head -1");
    });
    parser.run("build_pipeline (3 stages)", 10_000, || {
        let words = literals(mysh::parser::tokenize("cat < in | sort | uniq -c > out"));
        let _ = mysh::parser::build_pipeline(words);
    });
    parser.run("redirect::resolve < /dev/null > /dev/null", 10_000, || {
        let words = literals(mysh::parser::tokenize("cat < /dev/null > /dev/null"));
        let _ = mysh::redirect::resolve(words);
    });
    parser.report();

    let mut glob = Section::new("Glob");
    glob.run("expand src/*.rs", 1_000, || {
        let _ = mysh::glob::expand("src/*.rs", Path::new("."));
    });
    glob.run("matches_pattern [a-z]*.rs", 10_000, || {
        let _ = mysh::glob::matches_pattern("[a-z]*.rs", "supervisor.rs");
    });
    glob.report();

    let mut spawn = Section::new("Spawn (posix_spawnp)");
    let argv = vec!["/bin/true".to_string()];
    spawn.run("/bin/true", 1_000, || {
        if let Ok(pid) = mysh::spawn::spawn(&argv, None, None, &[]) {
            let mut status = 0i32;
            unsafe {
                libc::waitpid(pid, &mut status, 0);
            }
        }
    });
    spawn.report();

    let mut shell = mysh::shell::Shell::new();
    let mut full = Section::new("Full line (tokenize + spawn + wait)");
    full.run("/bin/echo hello > /dev/null", 1_000, || {
        let _ = mysh::executor::run_line(&mut shell, "/bin/echo hello > /dev/null");
    });
    full.run("/bin/echo hello | cat > /dev/null", 1_000, || {
        let _ = mysh::executor::run_line(&mut shell, "/bin/echo hello | cat > /dev/null");
    });
    full.run("pwd > /dev/null (builtin)", 10_000, || {
        let _ = mysh::executor::run_line(&mut shell, "pwd > /dev/null");
    });
    full.report();

    println!("\n{}", "=".repeat(80));
    println!("done.");
}
