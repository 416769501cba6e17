use cmd_lib::*;
use std::path::Path;

use crate::error::SetupError;
use crate::operator::Operator;
use crate::tools::Toolbox;

pub fn remove_previous_install(
    tools: &dyn Toolbox,
    operator: &mut dyn Operator,
    install_dir: &Path,
    scratch_dir: &Path,
    volume: &str,
) -> CmdResult {
    if !install_dir.exists() {
        info!("No previous install at {}", install_dir.display());
        return Ok(());
    }

    warn!("Found previous install at {}", install_dir.display());
    let question = format!(
        "Remove {} and docker volume `{volume}`? All data will be lost",
        install_dir.display()
    );
    if !operator.confirm(&question, false)? {
        return Err(SetupError::CleanupDeclined(install_dir.to_path_buf()).into());
    }

    info!("Removing {}", install_dir.display());
    std::fs::remove_dir_all(install_dir)?;
    if scratch_dir.exists() {
        info!("Removing {}", scratch_dir.display());
        std::fs::remove_dir_all(scratch_dir)?;
    }

    info!("Removing docker volume {volume}");
    if let Err(e) = tools.remove_volume(volume) {
        warn!("Could not remove docker volume {volume}: {e}");
    }
    Ok(())
}
