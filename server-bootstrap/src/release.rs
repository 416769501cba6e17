use cmd_lib::*;
use std::path::{Path, PathBuf};

use crate::config::LayoutConfig;
use crate::error::SetupError;
use crate::tools::{Checksum, Toolbox};

/// Shell-style match supporting `*` and `?`.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((sp, sn)) = star {
            pi = sp + 1;
            ni = sn + 1;
            star = Some((sp, sn + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}

pub fn locate_archive(dir: &Path, pattern: &str) -> Result<PathBuf, SetupError> {
    let not_found = || SetupError::ArchiveNotFound {
        pattern: pattern.to_string(),
        dir: dir.to_path_buf(),
    };
    let entries = std::fs::read_dir(dir).map_err(|_| not_found())?;
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| glob_match(pattern, name))
        .collect();
    names.sort();
    if names.len() > 1 {
        warn!("Several archives match `{pattern}`: {names:?}, using the first one");
    }
    names
        .into_iter()
        .next()
        .map(|name| dir.join(name))
        .ok_or_else(not_found)
}

/// Locates, fingerprints and unpacks the release into the install dir.
pub fn install_release(tools: &dyn Toolbox, workdir: &Path, layout: &LayoutConfig) -> CmdResult {
    let archive = locate_archive(workdir, &layout.archive_pattern)?;
    info!("Using release archive {}", archive.display());

    for kind in [Checksum::Md5, Checksum::Sha256] {
        let sum = tools.checksum(kind, &archive)?;
        info!("{kind}: {sum}");
    }

    let scratch = workdir.join(&layout.scratch_dir);
    if scratch.exists() {
        info!("Removing leftover {}", scratch.display());
        std::fs::remove_dir_all(&scratch)?;
    }
    tools
        .extract_archive(&archive, &scratch)
        .map_err(|e| SetupError::Extraction(format!("unzip {}: {e}", archive.display())))?;

    let extracted = scratch.join(&layout.release_subdir);
    if !extracted.is_dir() {
        return Err(SetupError::Extraction(format!(
            "archive has no `{}` directory",
            layout.release_subdir
        ))
        .into());
    }

    let install_dir = workdir.join(&layout.install_dir);
    if let Some(parent) = install_dir.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tools.move_dir(&extracted, &install_dir).map_err(|e| {
        SetupError::Extraction(format!(
            "move {} to {}: {e}",
            extracted.display(),
            install_dir.display()
        ))
    })?;
    info!("Release installed into {}", install_dir.display());
    Ok(())
}
