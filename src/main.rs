//! mysh — 行指向のコマンドインタプリタ
//!
//! 起動: 引数解析 → ログ初期化 → `~/.myshrc` → 端末 or バッチファイルの読み取りループ

use std::fs::File;
use std::io::{self, BufReader};

use clap::Parser;

use mysh::config::Config;
use mysh::repl;
use mysh::shell::{Flow, Shell};

fn main() {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter())
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let mut shell = Shell::new();

    if let Some(rc) = config.rc_path() {
        if repl::load_rc(&mut shell, &rc) == Flow::Exit {
            std::process::exit(0);
        }
    }

    let result = match &config.batch_file {
        Some(path) => match File::open(path) {
            Ok(file) => repl::run(&mut shell, BufReader::new(file), false),
            Err(e) => {
                eprintln!("mysh: {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let interactive = config.is_interactive();
            repl::run(&mut shell, io::stdin().lock(), interactive)
        }
    };

    if let Err(e) = result {
        eprintln!("mysh: {}", e);
        std::process::exit(1);
    }
    std::process::exit(0);
}
