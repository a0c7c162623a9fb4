//! 読み取りループ: 端末またはバッチファイルから 1 行ずつ読み、[`executor::execute`] に渡す。
//!
//! 対話モードではウェルカムメッセージ、プロンプト `mysh> `、終了メッセージを表示する。

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::executor;
use crate::shell::{Flow, Shell};

pub const PROMPT: &str = "mysh> ";

/// `reader` が EOF になるか `exit` が実行されるまで 1 行ずつ実行する。
///
/// UTF-8 として不正なバイトは U+FFFD に置き換えてその行を実行する。
pub fn run<R: BufRead>(shell: &mut Shell, mut reader: R, interactive: bool) -> io::Result<()> {
    let mut stdout = io::stdout();
    if interactive {
        writeln!(stdout, "Welcome to my shell!")?;
    }

    let mut buf = Vec::new();
    loop {
        if interactive {
            write!(stdout, "{}", PROMPT)?;
            stdout.flush()?;
        }

        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break; // EOF
        }

        let line = String::from_utf8_lossy(&buf);
        if executor::execute(shell, &line) == Flow::Exit {
            return Ok(());
        }
    }

    if interactive {
        writeln!(stdout)?;
        writeln!(stdout, "Exiting my shell.")?;
    }
    Ok(())
}

/// 起動ファイルを読み込んで各行を実行する。ファイルが存在しなければサイレントスキップ。
///
/// 空行と `#` で始まる行は無視する。`exit` が実行されたら `Flow::Exit` を返す。
pub fn load_rc(shell: &mut Shell, path: &Path) -> Flow {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(_) => return Flow::Continue,
    };
    tracing::debug!(path = %path.display(), "loading rc file");
    let content = String::from_utf8_lossy(&bytes);
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if executor::execute(shell, trimmed) == Flow::Exit {
            return Flow::Exit;
        }
    }
    Flow::Continue
}
