//! プロセス監督: パイプ作成、ステージごとの spawn、全ステージの待機。
//!
//! 生成（[`spawn_stage`]）と同期（[`StageHandle::wait`]）を分けている。
//! パイプ端は [`OwnedFd`] として 1 つのステージの [`StageIo`] にムーブされ、
//! spawn 直後に親側のコピーが drop される。親が保持する fd は `run_stages` の終了時点で
//! 1 つも残らない。

use std::io;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use crate::error::ShellError;
use crate::redirect::Redirections;
use crate::spawn;

// ── ステータス ──────────────────────────────────────────────────────

/// 1 ステージの終了状態。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// 正常終了。終了コード付き。
    Exited(i32),
    /// シグナルで終了。シグナル番号付き。
    Signaled(i32),
}

impl StageStatus {
    fn from_raw(raw: i32) -> Self {
        if libc::WIFSIGNALED(raw) {
            Self::Signaled(libc::WTERMSIG(raw))
        } else {
            Self::Exited(libc::WEXITSTATUS(raw))
        }
    }

    /// シェル慣習の終了コード（シグナル終了は 128 + シグナル番号）。
    pub fn code(self) -> i32 {
        match self {
            Self::Exited(code) => code,
            Self::Signaled(sig) => 128 + sig,
        }
    }

    pub fn success(self) -> bool {
        self == Self::Exited(0)
    }
}

// ── パイプ ──────────────────────────────────────────────────────────

/// 隣接ステージ間のパイプ。両端とも close-on-exec で作成する。
pub struct Pipe {
    pub read: OwnedFd,
    pub write: OwnedFd,
}

impl Pipe {
    pub fn new() -> Result<Self, ShellError> {
        let fds = raw_pipe_cloexec().map_err(|e| ShellError::os("pipe", e))?;
        // 返された fd の所有権はここで OwnedFd に移る
        let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        Ok(Self { read, write })
    }
}

#[cfg(target_os = "linux")]
fn raw_pipe_cloexec() -> io::Result<[RawFd; 2]> {
    let mut fds = [-1 as RawFd; 2];
    if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(fds)
}

#[cfg(not(target_os = "linux"))]
fn raw_pipe_cloexec() -> io::Result<[RawFd; 2]> {
    let mut fds = [-1 as RawFd; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    for &fd in &fds {
        if unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) } == -1 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(fds[0]);
                libc::close(fds[1]);
            }
            return Err(err);
        }
    }
    Ok(fds)
}

// ── ステージの I/O 束縛 ─────────────────────────────────────────────

/// 1 ステージの stdin / stdout 束縛。`None` はインタプリタから継承。
///
/// 親プロセス側ではこの値を drop することで、束縛に使った fd がちょうど 1 回 close される。
#[derive(Debug, Default)]
pub struct StageIo {
    pub stdin: Option<OwnedFd>,
    pub stdout: Option<OwnedFd>,
}

impl StageIo {
    fn stdin_raw(&self) -> Option<RawFd> {
        self.stdin.as_ref().map(AsRawFd::as_raw_fd)
    }

    fn stdout_raw(&self) -> Option<RawFd> {
        self.stdout.as_ref().map(AsRawFd::as_raw_fd)
    }

    /// 明示的リダイレクトでパイプ由来の束縛を上書きする。上書きされたパイプ端はここで close。
    pub fn override_with(&mut self, redirections: Redirections) {
        if let Some(file) = redirections.stdin {
            self.stdin = Some(OwnedFd::from(file));
        }
        if let Some(file) = redirections.stdout {
            self.stdout = Some(OwnedFd::from(file));
        }
    }
}

/// `n` ステージ分のパイプを先にすべて作成し、各ステージの [`StageIo`] に振り分ける。
///
/// ステージ i は pipe[i-1] の読み端を stdin に、pipe[i] の書き端を stdout に持つ。
pub fn wire_stages(n: usize) -> Result<Vec<StageIo>, ShellError> {
    let pipes = (0..n.saturating_sub(1))
        .map(|_| Pipe::new())
        .collect::<Result<Vec<Pipe>, ShellError>>()?;
    tracing::trace!(pipes = pipes.len(), "pipes created");

    let mut io: Vec<StageIo> = (0..n).map(|_| StageIo::default()).collect();
    for (i, pipe) in pipes.into_iter().enumerate() {
        io[i].stdout = Some(pipe.write);
        io[i + 1].stdin = Some(pipe.read);
    }
    Ok(io)
}

// ── spawn / wait ────────────────────────────────────────────────────

/// spawn 済みステージのハンドル。[`wait`](Self::wait) でちょうど 1 回 reap される。
#[derive(Debug)]
pub struct StageHandle {
    pub pid: libc::pid_t,
    pub name: String,
}

impl StageHandle {
    /// 子プロセスの終了を待つ。EINTR は再試行する。
    pub fn wait(self) -> Result<StageStatus, ShellError> {
        loop {
            let mut raw: i32 = 0;
            let ret = unsafe { libc::waitpid(self.pid, &mut raw, 0) };
            if ret == self.pid {
                let status = StageStatus::from_raw(raw);
                tracing::debug!(pid = self.pid, name = %self.name, ?status, "reaped");
                return Ok(status);
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(ShellError::os(format!("wait for {}", self.name), err));
            }
        }
    }
}

/// 1 ステージを spawn する。
///
/// `io` の fd を子の stdin/stdout に dup2 し、`close_in_child` の fd は子で閉じる。
/// 戻った時点で `io` は drop され、親側のコピーは close 済み。
pub fn spawn_stage(
    argv: &[String],
    io: StageIo,
    close_in_child: &[RawFd],
) -> Result<StageHandle, ShellError> {
    let pid = spawn::spawn(argv, io.stdin_raw(), io.stdout_raw(), close_in_child)?;
    drop(io);
    Ok(StageHandle {
        pid,
        name: argv[0].clone(),
    })
}

/// 解決済みステージ列を spawn して全ステージの終了を待つ。
///
/// 各要素は (引数ベクタ, 明示的リダイレクト)。明示的リダイレクトはパイプ接続より優先する。
/// 途中のステージで spawn に失敗した場合も、既に起動したステージは全て待機してから
/// エラーを返す。
pub fn run_stages(
    stages: Vec<(Vec<String>, Redirections)>,
) -> Result<Vec<StageStatus>, ShellError> {
    let (argvs, redirections): (Vec<Vec<String>>, Vec<Redirections>) = stages.into_iter().unzip();
    let mut wiring = wire_stages(argvs.len())?;
    for (io, explicit) in wiring.iter_mut().zip(redirections) {
        io.override_with(explicit);
    }

    let mut handles: Vec<StageHandle> = Vec::with_capacity(argvs.len());
    let mut spawn_error = None;

    // まだ親が保持している fd（後続ステージ用）。子では全て閉じる。
    let mut pending: Vec<Option<StageIo>> = wiring.into_iter().map(Some).collect();
    for (i, argv) in argvs.iter().enumerate() {
        let Some(io) = pending[i].take() else { continue };
        let close_in_child: Vec<RawFd> = pending
            .iter()
            .flatten()
            .flat_map(|other| other.stdin_raw().into_iter().chain(other.stdout_raw()))
            .collect();

        match spawn_stage(argv, io, &close_in_child) {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                spawn_error = Some(e);
                break;
            }
        }
    }
    // 未使用のパイプ端を close（前段の読み手・後段の書き手に EOF/EPIPE を届ける）
    drop(pending);

    let mut statuses = Vec::with_capacity(handles.len());
    let mut wait_error = None;
    for handle in handles {
        match handle.wait() {
            Ok(status) => statuses.push(status),
            Err(e) => wait_error = wait_error.or(Some(e)),
        }
    }

    match spawn_error.or(wait_error) {
        Some(e) => Err(e),
        None => Ok(statuses),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Read;

    fn words(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn to_file(path: &std::path::Path) -> Redirections {
        Redirections {
            stdin: None,
            stdout: Some(File::create(path).unwrap()),
        }
    }

    #[test]
    fn wire_stages_pipe_count() {
        let io = wire_stages(3).unwrap();
        assert_eq!(io.len(), 3);
        assert!(io[0].stdin.is_none() && io[0].stdout.is_some());
        assert!(io[1].stdin.is_some() && io[1].stdout.is_some());
        assert!(io[2].stdin.is_some() && io[2].stdout.is_none());

        let single = wire_stages(1).unwrap();
        assert!(single[0].stdin.is_none() && single[0].stdout.is_none());
    }

    #[test]
    fn pipe_ends_are_close_on_exec() {
        let pipe = Pipe::new().unwrap();
        for fd in [pipe.read.as_raw_fd(), pipe.write.as_raw_fd()] {
            let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
            assert!(flags >= 0);
            assert_ne!(flags & libc::FD_CLOEXEC, 0);
        }
    }

    #[test]
    fn dropping_write_end_gives_reader_eof() {
        let pipe = Pipe::new().unwrap();
        drop(pipe.write);
        let mut reader = File::from(pipe.read);
        let mut buf = Vec::new();
        assert_eq!(reader.read_to_end(&mut buf).unwrap(), 0);
    }

    #[test]
    fn spawn_then_wait_separately() {
        let handle = spawn_stage(&words(&["sh", "-c", "exit 3"]), StageIo::default(), &[]).unwrap();
        assert_eq!(handle.name, "sh");
        assert_eq!(handle.wait().unwrap(), StageStatus::Exited(3));
    }

    #[test]
    fn signaled_status_is_reported() {
        let handle =
            spawn_stage(&words(&["sh", "-c", "kill -TERM $$"]), StageIo::default(), &[]).unwrap();
        let status = handle.wait().unwrap();
        assert_eq!(status, StageStatus::Signaled(libc::SIGTERM));
        assert_eq!(status.code(), 128 + libc::SIGTERM);
    }

    #[test]
    fn two_stage_pipeline_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        let statuses = run_stages(vec![
            (words(&["echo", "hello"]), Redirections::default()),
            (words(&["wc", "-l"]), to_file(&out)),
        ])
        .unwrap();

        assert_eq!(statuses, vec![StageStatus::Exited(0), StageStatus::Exited(0)]);
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "1");
    }

    #[test]
    fn reader_sees_eof_through_three_stages() {
        // 親や他ステージに書き端が残っていると cat がブロックし続ける
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        let statuses = run_stages(vec![
            (words(&["printf", "b\\na\\n"]), Redirections::default()),
            (words(&["cat"]), Redirections::default()),
            (words(&["sort"]), to_file(&out)),
        ])
        .unwrap();

        assert!(statuses.iter().all(|s| s.success()));
        assert_eq!(fs::read_to_string(&out).unwrap(), "a\nb\n");
    }

    #[test]
    fn explicit_input_overrides_pipe() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let out = dir.path().join("out");
        fs::write(&input, "from file\n").unwrap();

        let statuses = run_stages(vec![
            (words(&["echo", "from pipe"]), Redirections::default()),
            (
                words(&["cat"]),
                Redirections {
                    stdin: Some(File::open(&input).unwrap()),
                    stdout: Some(File::create(&out).unwrap()),
                },
            ),
        ])
        .unwrap();

        assert_eq!(statuses.len(), 2);
        assert_eq!(fs::read_to_string(&out).unwrap(), "from file\n");
    }

    #[test]
    fn explicit_output_overrides_pipe() {
        // `echo hi > f | cat > g`: f に出力され、cat は即 EOF を受け取る
        let dir = tempfile::tempdir().unwrap();
        let f = dir.path().join("f");
        let g = dir.path().join("g");

        let statuses = run_stages(vec![
            (words(&["echo", "hi"]), to_file(&f)),
            (words(&["cat"]), to_file(&g)),
        ])
        .unwrap();

        assert_eq!(statuses, vec![StageStatus::Exited(0), StageStatus::Exited(0)]);
        assert_eq!(fs::read_to_string(&f).unwrap(), "hi\n");
        assert_eq!(fs::read_to_string(&g).unwrap(), "");
    }

    #[test]
    fn spawn_failure_mid_pipeline_waits_for_earlier_stages() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let script = format!("sleep 0.2; echo done > {}", marker.display());

        let err = run_stages(vec![
            (words(&["sh", "-c", &script]), Redirections::default()),
            (words(&["mysh-no-such-program-xyz"]), Redirections::default()),
        ])
        .unwrap_err();
        assert!(matches!(err, ShellError::ProgramNotFound(_)));
        // 戻った時点で stage 0 は終了・回収済み
        assert_eq!(fs::read_to_string(&marker).unwrap(), "done\n");
    }

    #[test]
    fn failing_stage_status_is_kept() {
        let statuses = run_stages(vec![
            (words(&["false"]), Redirections::default()),
            (words(&["true"]), Redirections::default()),
        ])
        .unwrap();
        assert!(!statuses[0].success());
        assert!(statuses[1].success());
    }
}
