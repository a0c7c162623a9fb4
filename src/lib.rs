//! mysh ライブラリ — バイナリ・テスト・ベンチマークからモジュールを公開する。
//!
//! バイナリ本体は `main.rs`（設定読み込み → ログ初期化 → 読み取りループ）。
//!
//! ## モジュール構成
//!
//! | モジュール | 役割 |
//! |-----------|------|
//! | [`parser`] | トークナイザ（空白区切り）とパイプライン構築（`|` で分割） |
//! | [`glob`] | パス名展開（`*`, `?`, `[...]`、ソート済み、マッチなしはリテラル保持） |
//! | [`redirect`] | リダイレクト解決（`<`, `>`, `>>`、最後の指定が有効） |
//! | [`spawn`] | `posix_spawnp` ラッパー（fd の付け替え + プログラムのロード） |
//! | [`supervisor`] | パイプ作成、ステージの spawn、全ステージの待機 |
//! | [`builtins`] | ビルトイン（`cd`, `pwd`, `which`, `exit`） |
//! | [`executor`] | 1 行の実行フロー全体とステータス報告 |
//! | [`shell`] | プロセスコンテキスト（終了ステータス、`which` の検索ディレクトリ、cwd） |
//! | [`repl`] | 読み取りループと起動ファイル `~/.myshrc` |
//! | [`config`] | コマンドライン引数とログフィルタ |
//! | [`error`] | 行単位で処理を中断するエラー型 |

pub mod builtins;
pub mod config;
pub mod error;
pub mod executor;
pub mod glob;
pub mod parser;
pub mod redirect;
pub mod repl;
pub mod shell;
pub mod spawn;
pub mod supervisor;
