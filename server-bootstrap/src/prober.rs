use cmd_lib::*;

use crate::config::PrerequisitesConfig;
use crate::error::SetupError;
use crate::tools::Toolbox;

/// Read-only host checks. Reports every problem before failing.
pub fn check_prerequisites(tools: &dyn Toolbox, prereq: &PrerequisitesConfig) -> CmdResult {
    info!("Checking required commands: {:?}", prereq.commands);
    let mut missing: Vec<String> = prereq
        .commands
        .iter()
        .filter(|cmd| !tools.command_exists(cmd))
        .cloned()
        .collect();
    for cmd in &missing {
        error!("Required command `{cmd}` not found in PATH");
    }

    let has_docker = prereq.commands.iter().any(|c| c == "docker");
    if has_docker && !missing.iter().any(|c| c == "docker") && !tools.compose_available() {
        error!("`docker compose` plugin is not available");
        missing.push("docker compose".to_string());
    }

    info!("Checking required ports: {:?}", prereq.ports);
    let busy: Vec<u16> = prereq
        .ports
        .iter()
        .copied()
        .filter(|port| tools.port_in_use(*port))
        .collect();
    for port in &busy {
        error!("Port {port} already has a listener");
    }

    if !missing.is_empty() {
        return Err(SetupError::MissingCommand(missing).into());
    }
    if !busy.is_empty() {
        return Err(SetupError::PortInUse(busy).into());
    }
    info!("Host prerequisites are satisfied");
    Ok(())
}
