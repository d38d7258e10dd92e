//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations.

use std::fs::File;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Output, Stdio};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path is a file.
    fn is_file(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Copy file from source to destination.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// External command runner abstraction.
pub trait CommandRunner: Send + Sync {
    /// Run a command with arguments, capturing stdout and stderr.
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output>;

    /// Run a command with stdout written to `stdout_path`; stderr is captured
    /// and returned alongside the exit status.
    fn run_to_file(
        &self,
        cmd: &str,
        args: &[&str],
        stdout_path: &Path,
    ) -> io::Result<(ExitStatus, String)>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        std::fs::copy(from, to)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Real command runner implementation.
#[derive(Debug, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        std::process::Command::new(cmd).args(args).output()
    }

    fn run_to_file(
        &self,
        cmd: &str,
        args: &[&str],
        stdout_path: &Path,
    ) -> io::Result<(ExitStatus, String)> {
        let out = File::create(stdout_path)?;
        let output = std::process::Command::new(cmd)
            .args(args)
            .stdout(Stdio::from(out))
            .stderr(Stdio::piped())
            .output()?;
        Ok((
            output.status,
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ))
    }
}
