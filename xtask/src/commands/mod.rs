//! Task implementations.

use std::fs;
use std::path::{Path, PathBuf};

pub mod completions;
pub mod man;
pub mod presets;

/// Binary name used for generated files.
pub const BIN_NAME: &str = "branchver";

/// Resolve `dir` against the workspace root and make sure it exists.
fn output_dir(dir: &Path) -> Result<PathBuf, String> {
    let out_dir = crate::workspace_root().join(dir);
    fs::create_dir_all(&out_dir).map_err(|e| format!("{}: {e}", out_dir.display()))?;
    Ok(out_dir)
}

fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), String> {
    fs::write(path, contents).map_err(|e| format!("{}: {e}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}
