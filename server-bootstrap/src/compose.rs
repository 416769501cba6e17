use cmd_lib::*;
use std::path::{Path, PathBuf};

use crate::config::ComposeConfig;
use crate::error::SetupError;
use crate::tools::Toolbox;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    pub compose_file: PathBuf,
    pub env_file: PathBuf,
}

pub fn is_arm64(arch: &str) -> bool {
    matches!(arch.trim(), "arm64" | "aarch64")
}

/// Picks the compose variant for this host; only arm64 is told apart.
pub fn select_stack(
    tools: &dyn Toolbox,
    workdir: &Path,
    compose: &ComposeConfig,
    env_file: &Path,
) -> Result<Stack, SetupError> {
    let arch = tools
        .host_arch()
        .map_err(|e| SetupError::ComposeLaunch(format!("cannot detect host arch: {e}")))?;
    let file = if is_arm64(&arch) {
        &compose.arm64_file
    } else {
        &compose.file
    };
    let compose_file = workdir.join(file);
    info!("Host arch {}, using {}", arch.trim(), compose_file.display());
    if !compose_file.is_file() {
        return Err(SetupError::ComposeLaunch(format!(
            "{} not found",
            compose_file.display()
        )));
    }
    Ok(Stack {
        compose_file,
        env_file: workdir.join(env_file),
    })
}

pub fn launch(tools: &dyn Toolbox, stack: &Stack) -> CmdResult {
    tools
        .compose_up(&stack.compose_file, &stack.env_file)
        .map_err(|e| SetupError::ComposeLaunch(e.to_string()))?;
    Ok(())
}

pub fn restart(tools: &dyn Toolbox, stack: &Stack) -> CmdResult {
    info!("Restarting stack");
    tools
        .compose_down(&stack.compose_file, &stack.env_file)
        .map_err(|e| SetupError::ComposeLaunch(e.to_string()))?;
    launch(tools, stack)
}
