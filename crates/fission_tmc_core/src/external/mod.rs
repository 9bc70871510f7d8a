//! External collaborators: the fission event generator and the evaporation
//! code
//!
//! Both are opaque executables. The core writes their inputs into a
//! trial-owned directory, runs them synchronously through
//! [`ExternalProgram`], and parses their outputs into flat reports.

pub mod evaporation;
pub mod generator;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::ExternalToolError;

/// Where the program's standard input comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdinSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// One synchronous run of an external program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub working_dir: PathBuf,
    pub stdin: StdinSource,
    /// Standard output is discarded when `None`
    pub stdout: Option<PathBuf>,
}

/// An external code that can be run in a working directory.
///
/// Implementations must be callable from many worker threads at once; each
/// call gets its own working directory.
pub trait ExternalProgram: Send + Sync {
    /// Short name for logs and errors
    fn name(&self) -> &str;

    /// Run to completion, blocking the calling thread
    fn run(&self, invocation: &Invocation) -> Result<(), ExternalToolError>;
}

/// An executable on disk or on `PATH`
#[derive(Debug, Clone)]
pub struct Executable {
    program: PathBuf,
    name: String,
}

impl Executable {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        Self { program, name }
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl ExternalProgram for Executable {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, invocation: &Invocation) -> Result<(), ExternalToolError> {
        let dir = &invocation.working_dir;
        let mut command = Command::new(&self.program);
        command.current_dir(dir).stderr(Stdio::piped());

        match &invocation.stdin {
            StdinSource::Bytes(_) => {
                command.stdin(Stdio::piped());
            }
            StdinSource::File(path) => {
                let file = File::open(path).map_err(|e| ExternalToolError::io(path, e))?;
                command.stdin(Stdio::from(file));
            }
        }
        match &invocation.stdout {
            Some(path) => {
                let file = File::create(path).map_err(|e| ExternalToolError::io(path, e))?;
                command.stdout(Stdio::from(file));
            }
            None => {
                command.stdout(Stdio::null());
            }
        }

        debug!(program = %self.name, dir = %dir.display(), "Starting external program");
        let mut child = command.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ExternalToolError::NotFound {
                program: self.program.clone(),
            },
            _ => ExternalToolError::io(dir, e),
        })?;

        if let (StdinSource::Bytes(bytes), Some(mut stdin)) =
            (&invocation.stdin, child.stdin.take())
        {
            // The program may exit without reading its acknowledgement byte
            match stdin.write_all(bytes) {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                    return Err(ExternalToolError::io(dir, e));
                }
                _ => {}
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| ExternalToolError::io(dir, e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                program = %self.name,
                code = ?output.status.code(),
                stderr = %stderr.trim(),
                "External program failed"
            );
            return Err(ExternalToolError::NonZeroExit {
                program: self.name.clone(),
                code: output.status.code(),
                dir: dir.clone(),
            });
        }
        Ok(())
    }
}

/// Remove a directory tree if present
pub(crate) fn remove_dir_if_exists(path: &Path) -> Result<(), ExternalToolError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ExternalToolError::io(path, e)),
    }
}

/// Create a directory (and parents) if missing
pub(crate) fn ensure_dir(path: &Path) -> Result<(), ExternalToolError> {
    fs::create_dir_all(path).map_err(|e| ExternalToolError::io(path, e))
}

pub(crate) fn write_file(path: &Path, contents: &str) -> Result<(), ExternalToolError> {
    fs::write(path, contents).map_err(|e| ExternalToolError::io(path, e))
}

/// Whitespace token `token` of line `line` (both 0-based). A trailing
/// comma on the token is ignored.
pub(crate) fn token_at(lines: &[&str], line: usize, token: usize) -> Option<f64> {
    lines
        .get(line)?
        .split_whitespace()
        .nth(token)?
        .trim_end_matches(',')
        .parse()
        .ok()
}

/// Index of the first line equal to `anchor`, ignoring surrounding
/// whitespace
pub(crate) fn find_anchor(lines: &[&str], anchor: &str) -> Option<usize> {
    lines.iter().position(|line| line.trim() == anchor)
}

/// How the values of one table row are separated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Separator {
    Whitespace,
    Comma,
}

/// Parse every value of `line`, or `None` if any is not a number
pub(crate) fn numeric_row(line: &str, separator: Separator) -> Option<Vec<f64>> {
    let values: Result<Vec<f64>, _> = match separator {
        Separator::Whitespace => line.split_whitespace().map(str::parse).collect(),
        Separator::Comma => line
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::parse)
            .collect(),
    };
    values.ok().filter(|row| !row.is_empty())
}

/// Numeric rows of `lines`. Blank and non-numeric lines are
/// dropped; the count of dropped non-blank lines comes back alongside.
pub(crate) fn numeric_rows(lines: &[&str], separator: Separator) -> (Vec<Vec<f64>>, usize) {
    let mut rows = Vec::with_capacity(lines.len());
    let mut skipped = 0;
    for line in lines.iter().filter(|l| !l.trim().is_empty()) {
        match numeric_row(line, separator) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }
    (rows, skipped)
}
