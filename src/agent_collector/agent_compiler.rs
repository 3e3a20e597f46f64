use std::path::{Path, PathBuf};

use tracing::{debug, error, instrument};

use crate::outcome::SolveError;

/// Compiles a C `source` into `binary` with `compiler`.
///
/// On failure the error holds the first line of the compiler diagnostic; the full output is
/// logged.
#[instrument(parent = None, skip(compiler))]
pub fn compile_native(source: &Path, binary: &Path, compiler: &str) -> Result<PathBuf, SolveError> {
    if !source.is_file() {
        return Err(SolveError::Compile(format!(
            "source not found: {}",
            source.display()
        )));
    }
    if let Some(dir) = binary.parent() {
        std::fs::create_dir_all(dir).map_err(|e| {
            SolveError::Compile(format!("could not create {}: {e}", dir.display()))
        })?;
    }

    let output = std::process::Command::new(compiler)
        .arg("-O2")
        .arg("-o")
        .arg(binary)
        .arg(source)
        .arg("-lm")
        .output()
        .map_err(|e| SolveError::Compile(format!("could not launch '{compiler}': {e}")))?;

    let diagnostic = String::from_utf8_lossy(&output.stderr);
    if output.status.success() {
        if !diagnostic.trim().is_empty() {
            debug!("compiler warnings: {}", diagnostic.trim());
        }
        Ok(binary.to_path_buf())
    } else {
        let diagnostic = diagnostic.trim();
        error!("compilation error: {diagnostic}");
        let first_line = diagnostic.lines().next().unwrap_or_default();
        let message = if first_line.is_empty() {
            format!("{compiler} exited with {}", output.status)
        } else {
            first_line.to_string()
        };
        Err(SolveError::Compile(message))
    }
}
