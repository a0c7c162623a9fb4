//! `posix_spawnp()` の安全な Rust ラッパー。
//!
//! fork 後に子プロセス側でインタプリタのコードを走らせないよう、fd の付け替えと
//! プログラムのロードを `posix_spawnp` 1 回で行う。ロード失敗は errno として親に返り、
//! 子がインタプリタのループに戻ることはない。
//!
//! ## 構成
//!
//! | 型 | 役割 |
//! |-----|------|
//! | [`FileActions`] | 子プロセスで行う dup2 / close の登録（Drop で破棄） |
//! | [`CStringVec`] | argv 用の NULL 終端ポインタ配列 |
//! | [`spawn`] | 1 ステージ分の起動。PID を返す（待機は呼び出し側） |

use std::ffi::CString;
use std::os::unix::io::RawFd;

use crate::error::ShellError;

// ── FileActions ───────────────────────────────────────────────────

/// `posix_spawn_file_actions_t` の RAII ラッパー。Drop で destroy。
struct FileActions {
    inner: libc::posix_spawn_file_actions_t,
}

/// posix_spawn 系関数の戻り値（0 または errno）を `Result` にする。
fn check(op: &str, ret: libc::c_int) -> Result<(), ShellError> {
    if ret == 0 {
        Ok(())
    } else {
        Err(ShellError::os(op, std::io::Error::from_raw_os_error(ret)))
    }
}

impl FileActions {
    fn new() -> Result<Self, ShellError> {
        let mut inner: libc::posix_spawn_file_actions_t = unsafe { std::mem::zeroed() };
        check("posix_spawn_file_actions_init", unsafe {
            libc::posix_spawn_file_actions_init(&mut inner)
        })?;
        Ok(Self { inner })
    }

    /// 子で `dup2(fd, target)` を行う。
    fn redirect(&mut self, fd: RawFd, target: RawFd) -> Result<(), ShellError> {
        check("posix_spawn_file_actions_adddup2", unsafe {
            libc::posix_spawn_file_actions_adddup2(&mut self.inner, fd, target)
        })
    }

    /// 子で `close(fd)` を行う。
    fn close(&mut self, fd: RawFd) -> Result<(), ShellError> {
        check("posix_spawn_file_actions_addclose", unsafe {
            libc::posix_spawn_file_actions_addclose(&mut self.inner, fd)
        })
    }

    fn as_ptr(&self) -> *const libc::posix_spawn_file_actions_t {
        &self.inner
    }
}

impl Drop for FileActions {
    fn drop(&mut self) {
        unsafe {
            libc::posix_spawn_file_actions_destroy(&mut self.inner);
        }
    }
}

// ── CStringVec ────────────────────────────────────────────────────

/// `CString` の所有と、それを指す NULL 終端ポインタ配列。
struct CStringVec {
    strings: Vec<CString>,
    ptrs: Vec<*mut libc::c_char>,
}

impl CStringVec {
    /// 引数に NUL バイトが含まれていれば `None`。
    fn from_args(args: &[String]) -> Option<Self> {
        let strings = args
            .iter()
            .map(|s| CString::new(s.as_str()).ok())
            .collect::<Option<Vec<CString>>>()?;
        let mut ptrs: Vec<*mut libc::c_char> = strings
            .iter()
            .map(|s| s.as_ptr() as *mut libc::c_char)
            .collect();
        ptrs.push(std::ptr::null_mut());
        Some(Self { strings, ptrs })
    }

    fn program(&self) -> *const libc::c_char {
        self.strings[0].as_ptr()
    }

    fn as_ptr(&self) -> *const *mut libc::c_char {
        self.ptrs.as_ptr()
    }
}

// ── spawn 関数 ────────────────────────────────────────────────────

/// `args` を `PATH` 検索付きで起動し、子の PID を返す。
///
/// - `stdin_fd`: stdin に接続する fd（`None` なら継承）
/// - `stdout_fd`: stdout に接続する fd（`None` なら継承）
/// - `fds_to_close`: 子プロセスで閉じる fd のリスト（他ステージのパイプ端など）
///
/// ENOENT は [`ShellError::ProgramNotFound`]、それ以外の失敗は [`ShellError::Spawn`]。
pub fn spawn(
    args: &[String],
    stdin_fd: Option<RawFd>,
    stdout_fd: Option<RawFd>,
    fds_to_close: &[RawFd],
) -> Result<libc::pid_t, ShellError> {
    let command = args.first().cloned().unwrap_or_default();
    if command.is_empty() {
        return Err(ShellError::syntax("missing command"));
    }
    let argv = CStringVec::from_args(args).ok_or_else(|| ShellError::Spawn {
        command: command.clone(),
        errno: libc::EINVAL,
    })?;

    let mut actions = FileActions::new()?;
    if let Some(fd) = stdin_fd {
        actions.redirect(fd, libc::STDIN_FILENO)?;
    }
    if let Some(fd) = stdout_fd {
        actions.redirect(fd, libc::STDOUT_FILENO)?;
    }
    // 付け替え元と他ステージの fd を閉じる。同じ fd は 1 回だけ。
    let mut to_close: Vec<RawFd> = stdin_fd
        .into_iter()
        .chain(stdout_fd)
        .chain(fds_to_close.iter().copied())
        .filter(|&fd| fd > libc::STDERR_FILENO)
        .collect();
    to_close.sort_unstable();
    to_close.dedup();
    for fd in to_close {
        actions.close(fd)?;
    }

    extern "C" {
        static environ: *const *mut libc::c_char;
    }

    let mut pid: libc::pid_t = 0;
    let ret = unsafe {
        libc::posix_spawnp(
            &mut pid,
            argv.program(),
            actions.as_ptr(),
            std::ptr::null(),
            argv.as_ptr(),
            environ,
        )
    };

    if ret != 0 {
        tracing::debug!(command = %command, errno = ret, "posix_spawnp failed");
        return Err(if ret == libc::ENOENT {
            ShellError::ProgramNotFound(command)
        } else {
            ShellError::Spawn { command, errno: ret }
        });
    }

    tracing::debug!(command = %command, pid, "spawned");
    Ok(pid)
}
