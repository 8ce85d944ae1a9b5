//! Command executor - 세션 작업 디렉토리 위에서 셸 명령 실행
//!
//! ## 흐름
//!
//! ```text
//! command line ──► shlex argv ──► denylist(argv[0]) ──► `cd`? ──► spawn (cwd) ──► bounded capture
//!                    │                 │                 │                         │
//!             InvalidCommand       Forbidden       DirectoryError      ProcessError / output
//! ```
//!
//! 모든 `execute` 호출은 내부 뮤텍스로 직렬화된다. `cd`가 다음 호출이 읽는
//! 커서를 바꾸기 때문이다. 커서 읽기(`working_directory`)는 실행 중에도 막히지 않는다.
//! 실행 자체에는 타임아웃이 없다.

mod capture;
mod error;

pub use capture::{
    drain, strip_ansi, truncate_middle, BoundedCapture, DEFAULT_CAPTURE_BYTES, ELISION_MARKER,
};
pub use error::{CommandOutput, ExecError};

use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Denylisted command names (compared lowercase)
    pub denylist: Vec<String>,

    /// Bytes kept at each end of stdout/stderr
    pub capture_bytes: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            denylist: Vec::new(),
            capture_bytes: DEFAULT_CAPTURE_BYTES,
        }
    }
}

/// Shell command executor with a working-directory cursor
pub struct CommandExecutor {
    denylist: HashSet<String>,

    capture_bytes: usize,

    /// Current working directory cursor
    cwd: RwLock<PathBuf>,

    /// Serializes execute calls
    serial: Mutex<()>,
}

impl CommandExecutor {
    /// Create an executor starting at `working_dir`
    pub fn new(config: ExecutorConfig, working_dir: PathBuf) -> Self {
        Self {
            denylist: config
                .denylist
                .iter()
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
            capture_bytes: config.capture_bytes.max(1),
            cwd: RwLock::new(working_dir),
            serial: Mutex::new(()),
        }
    }

    /// Create an executor starting at the process directory
    pub fn from_current_dir(config: ExecutorConfig) -> Result<Self, ExecError> {
        let cwd = std::env::current_dir().map_err(|e| {
            ExecError::DirectoryError(format!("Failed to get working directory: {}", e))
        })?;
        Ok(Self::new(config, cwd))
    }

    /// Current cursor (non-blocking snapshot)
    pub fn working_directory(&self) -> PathBuf {
        self.cwd.read().clone()
    }

    /// Whether a program token is denylisted (lowercase, bare or by basename)
    pub fn is_forbidden(&self, program: &str) -> Option<String> {
        let first = program.to_lowercase();
        let base = Path::new(&first)
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| first.clone());

        if self.denylist.contains(&first) || self.denylist.contains(&base) {
            Some(first)
        } else {
            None
        }
    }

    /// Execute a command line
    pub async fn execute(&self, command_line: &str) -> Result<CommandOutput, ExecError> {
        let command_line = command_line.trim();
        if command_line.is_empty() {
            return Err(ExecError::EmptyCommand);
        }

        // 1. Tokenize (denylist는 실제로 실행될 argv[0] 기준)
        let argv = shlex::split(command_line)
            .ok_or_else(|| ExecError::InvalidCommand("unbalanced quotes".to_string()))?;
        let Some(program) = argv.first() else {
            return Err(ExecError::EmptyCommand);
        };

        // 2. Denylist (프로세스 생성 전)
        if let Some(cmd) = self.is_forbidden(program) {
            warn!("Blocked denylisted command: {}", cmd);
            return Err(ExecError::Forbidden(cmd));
        }

        let _serial = self.serial.lock().await;

        // 3. `cd` pseudo-command
        if program == "cd" {
            return self.change_directory(command_line, &argv[1..]).await;
        }

        // 4. Spawn
        let cwd = self.working_directory();
        self.spawn(command_line, &argv, &cwd).await
    }

    async fn spawn(
        &self,
        command_line: &str,
        argv: &[String],
        cwd: &Path,
    ) -> Result<CommandOutput, ExecError> {
        let program = &argv[0];
        if which::which_in(program, std::env::var_os("PATH"), cwd).is_err() {
            return Err(ExecError::ProcessError(format!(
                "command not found: {}",
                program
            )));
        }

        debug!("Spawning {:?} in {}", argv, cwd.display());
        let start = Instant::now();

        let mut child = Command::new(program)
            .args(&argv[1..])
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::ProcessError(format!("failed to start {}: {}", program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecError::ProcessError("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExecError::ProcessError("stderr not captured".to_string()))?;

        let (out, err, status) = tokio::try_join!(
            drain(stdout, self.capture_bytes),
            drain(stderr, self.capture_bytes),
            child.wait(),
        )
        .map_err(|e| ExecError::ProcessError(format!("failed to wait for {}: {}", program, e)))?;

        let (stdout, out_truncated) = out.finish();
        let (stderr, err_truncated) = err.finish();
        let output = CommandOutput {
            command: command_line.to_string(),
            exit_code: status.code(),
            stdout: strip_ansi(&stdout),
            stderr: strip_ansi(&stderr),
            duration_ms: start.elapsed().as_millis() as u64,
            truncated: out_truncated || err_truncated,
        };

        if status.success() {
            info!(
                "Command completed in {}ms: {}",
                output.duration_ms, command_line
            );
            return Ok(output);
        }

        let message = if !output.stderr.trim().is_empty() {
            output.stderr.trim_end().to_string()
        } else if !output.stdout.trim().is_empty() {
            output.stdout.trim_end().to_string()
        } else {
            match status.code() {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by signal".to_string(),
            }
        };
        warn!("Command failed ({:?}): {}", status.code(), command_line);
        Err(ExecError::ProcessError(message))
    }

    /// Resolve `target` against the cursor and move it on success
    async fn change_directory(
        &self,
        command_line: &str,
        args: &[String],
    ) -> Result<CommandOutput, ExecError> {
        let current = self.working_directory();
        let resolved = resolve_target(&current, args)?;

        let canonical = tokio::fs::canonicalize(&resolved)
            .await
            .map_err(|e| ExecError::DirectoryError(format!("{}: {}", resolved.display(), e)))?;
        let metadata = tokio::fs::metadata(&canonical)
            .await
            .map_err(|e| ExecError::DirectoryError(format!("{}: {}", canonical.display(), e)))?;
        if !metadata.is_dir() {
            return Err(ExecError::DirectoryError(format!(
                "{}: not a directory",
                canonical.display()
            )));
        }
        // 접근 권한 확인 (실행 권한 없는 디렉토리)
        let _entries = tokio::fs::read_dir(&canonical)
            .await
            .map_err(|e| ExecError::DirectoryError(format!("{}: {}", canonical.display(), e)))?;

        *self.cwd.write() = canonical.clone();
        info!("Working directory changed to {}", canonical.display());

        Ok(CommandOutput {
            command: command_line.to_string(),
            exit_code: None,
            stdout: canonical.display().to_string(),
            stderr: String::new(),
            duration_ms: 0,
            truncated: false,
        })
    }
}

/// `cd` 대상 해석: 빈 값/`~`는 홈, 상대 경로는 커서 기준
fn resolve_target(current: &Path, args: &[String]) -> Result<PathBuf, ExecError> {
    let target = match args {
        [] => "~".to_string(),
        [single] => single.clone(),
        _ => return Err(ExecError::DirectoryError("too many arguments".to_string())),
    };

    let home = || {
        dirs::home_dir()
            .ok_or_else(|| ExecError::DirectoryError("home directory not found".to_string()))
    };

    if target == "~" {
        return home();
    }
    if let Some(rest) = target.strip_prefix("~/") {
        return Ok(home()?.join(rest));
    }
    Ok(current.join(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor_in(dir: &Path) -> CommandExecutor {
        CommandExecutor::new(
            ExecutorConfig {
                denylist: vec!["htop".into(), "Shutdown".into()],
                ..Default::default()
            },
            dir.to_path_buf(),
        )
    }

    #[tokio::test]
    async fn test_forbidden_is_not_spawned() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor_in(dir.path());

        let result = executor.execute("shutdown -h now").await;
        assert_eq!(result, Err(ExecError::Forbidden("shutdown".into())));

        let result = executor.execute("SHUTDOWN now").await;
        assert!(matches!(result, Err(ExecError::Forbidden(_))));

        let result = executor.execute("/sbin/shutdown now").await;
        assert!(matches!(result, Err(ExecError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_quoted_program_name_is_still_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor_in(dir.path());

        let result = executor.execute("'shutdown' -h now").await;
        assert_eq!(result, Err(ExecError::Forbidden("shutdown".into())));

        let result = executor.execute("shut\\down now").await;
        assert_eq!(result, Err(ExecError::Forbidden("shutdown".into())));

        let result = executor.execute("\"/sbin/SHUTDOWN\" now").await;
        assert!(matches!(result, Err(ExecError::Forbidden(_))));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_quoted_denylisted_echo_is_not_spawned() {
        let dir = tempfile::tempdir().unwrap();
        let executor = CommandExecutor::new(
            ExecutorConfig {
                denylist: vec!["echo".into()],
                ..Default::default()
            },
            dir.path().to_path_buf(),
        );

        for line in ["echo hi", "'echo' hi", "ec\\ho hi", "\"ec\"ho hi"] {
            assert_eq!(
                executor.execute(line).await,
                Err(ExecError::Forbidden("echo".into())),
                "{}",
                line
            );
        }
    }

    #[tokio::test]
    async fn test_empty_command() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor_in(dir.path());
        assert_eq!(executor.execute("   ").await, Err(ExecError::EmptyCommand));
    }

    #[tokio::test]
    async fn test_unbalanced_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor_in(dir.path());
        assert!(matches!(
            executor.execute("echo 'oops").await,
            Err(ExecError::InvalidCommand(_))
        ));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_echo_preserves_quoted_argument() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor_in(dir.path());

        let output = executor.execute("echo 'hello   world'").await.unwrap();
        assert_eq!(output.stdout, "hello   world\n");
        assert_eq!(output.exit_code, Some(0));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_empty_output_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor_in(dir.path());

        let output = executor.execute("true").await.unwrap();
        assert!(output.is_empty());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_nonzero_exit_is_process_error() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor_in(dir.path());

        match executor.execute("ls does-not-exist").await {
            Err(ExecError::ProcessError(msg)) => assert!(!msg.is_empty()),
            other => panic!("unexpected: {:?}", other),
        }
        match executor.execute("false").await {
            Err(ExecError::ProcessError(msg)) => assert!(msg.contains("status 1")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_command_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor_in(dir.path());

        match executor.execute("definitely-not-a-real-binary-xyz --flag").await {
            Err(ExecError::ProcessError(msg)) => assert!(msg.contains("command not found")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_cd_moves_cursor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub dir")).unwrap();
        std::fs::write(dir.path().join("sub dir").join("marker.txt"), "x").unwrap();
        let executor = executor_in(dir.path());

        let output = executor.execute("cd 'sub dir'").await.unwrap();
        let expected = std::fs::canonicalize(dir.path().join("sub dir")).unwrap();
        assert_eq!(output.stdout, expected.display().to_string());
        assert_eq!(executor.working_directory(), expected);

        let listing = executor.execute("ls").await.unwrap();
        assert!(listing.stdout.contains("marker.txt"));

        executor.execute("cd ..").await.unwrap();
        assert_eq!(
            executor.working_directory(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_cd_nonexistent_keeps_cursor() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let executor = executor_in(dir.path());
        let before = executor.working_directory();

        let result = executor.execute("cd /definitely/not/here").await;
        assert!(matches!(result, Err(ExecError::DirectoryError(_))));
        assert_eq!(executor.working_directory(), before);

        let result = executor.execute("cd marker.txt").await;
        assert!(matches!(result, Err(ExecError::DirectoryError(_))));

        // 이후 명령은 이전 디렉토리에서 실행
        let listing = executor.execute("ls").await.unwrap();
        assert!(listing.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_cd_too_many_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let executor = executor_in(dir.path());
        assert!(matches!(
            executor.execute("cd a b").await,
            Err(ExecError::DirectoryError(_))
        ));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_output_capped_at_source() {
        let dir = tempfile::tempdir().unwrap();
        let executor = CommandExecutor::new(
            ExecutorConfig {
                denylist: vec![],
                capture_bytes: 16,
            },
            dir.path().to_path_buf(),
        );

        let output = executor.execute("seq 1 10000").await.unwrap();
        assert!(output.truncated);
        assert!(output.stdout.starts_with("1\n2\n3\n"));
        assert!(output.stdout.ends_with("10000\n"));
        assert!(output.stdout.len() < 200);
    }

    #[test]
    fn test_resolve_target() {
        let base = Path::new("/srv/app");
        let args = |s: &str| shlex::split(s).unwrap();
        assert_eq!(
            resolve_target(base, &args("logs")).unwrap(),
            PathBuf::from("/srv/app/logs")
        );
        assert_eq!(
            resolve_target(base, &args("/etc")).unwrap(),
            PathBuf::from("/etc")
        );
        if let Some(home) = dirs::home_dir() {
            assert_eq!(resolve_target(base, &[]).unwrap(), home);
            assert_eq!(resolve_target(base, &args("~/x")).unwrap(), home.join("x"));
        }
    }
}
