use cmd_lib::*;
use std::io::Error;
use std::path::Path;
use strum::{AsRefStr, Display};

use crate::compose::{self, Stack};
use crate::config::{CertificatesConfig, KeystorePatch};
use crate::error::SetupError;
use crate::operator::Operator;
use crate::retry::Exhausted;
use crate::tools::{ContainerExec, Toolbox};

const ROOT_CA_SCRIPT: &str = "./makeRootCa.sh";
const CERT_SCRIPT: &str = "./makeCert.sh";

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CertStep {
    RootCa,
    ServerCert,
    ClientCert,
    Ownership,
    StopService,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaChoice {
    Reuse,
    Generate,
}

impl CaChoice {
    /// Steps of one attempt, in order.
    pub fn steps(self) -> &'static [CertStep] {
        match self {
            CaChoice::Reuse => &[
                CertStep::ServerCert,
                CertStep::ClientCert,
                CertStep::Ownership,
                CertStep::StopService,
            ],
            CaChoice::Generate => &[
                CertStep::RootCa,
                CertStep::ServerCert,
                CertStep::ClientCert,
                CertStep::Ownership,
                CertStep::StopService,
            ],
        }
    }
}

/// Made once, before the retry loop. Declining reuse deletes the CA file.
pub fn decide_ca(operator: &mut dyn Operator, ca_file: &Path) -> std::io::Result<CaChoice> {
    if !ca_file.exists() {
        info!("No root CA at {}, a new one will be generated", ca_file.display());
        return Ok(CaChoice::Generate);
    }
    let question = format!("Reuse existing root CA {}?", ca_file.display());
    if operator.confirm(&question, true)? {
        info!("Reusing root CA {}", ca_file.display());
        Ok(CaChoice::Reuse)
    } else {
        info!("Removing root CA {}", ca_file.display());
        std::fs::remove_file(ca_file)?;
        Ok(CaChoice::Generate)
    }
}

struct Provisioner<'a> {
    tools: &'a dyn Toolbox,
    config: &'a CertificatesConfig,
    server_ip: &'a str,
    host_user: String,
}

impl Provisioner<'_> {
    fn run_step(&self, step: CertStep) -> CmdResult {
        let container = &self.config.container;
        let cert_dir = &self.config.cert_dir;
        match step {
            CertStep::RootCa => self
                .tools
                .exec_in_container(&ContainerExec::new(container, [ROOT_CA_SCRIPT]).workdir(cert_dir)),
            CertStep::ServerCert => self.tools.exec_in_container(
                &ContainerExec::new(container, [CERT_SCRIPT, "server", self.server_ip])
                    .workdir(cert_dir),
            ),
            CertStep::ClientCert => self.tools.exec_in_container(
                &ContainerExec::new(
                    container,
                    [CERT_SCRIPT, "client", self.config.client_identity.as_str()],
                )
                .workdir(cert_dir),
            ),
            CertStep::Ownership => self.tools.exec_in_container(
                &ContainerExec::new(
                    container,
                    ["chown", "-R", self.host_user.as_str(), cert_dir.as_str()],
                )
                .user("root"),
            ),
            CertStep::StopService => self.tools.stop_container(container),
        }
    }

    fn run_attempt(&self, steps: &[CertStep]) -> CmdResult {
        for step in steps {
            log::debug!("Running certificate step {step}");
            self.run_step(*step)
                .map_err(|e| Error::other(format!("{step}: {e}")))?;
        }
        Ok(())
    }
}

/// Generates CA (unless reused), server and client certificates inside the
/// running service container, retrying whole attempts.
pub fn provision(
    tools: &dyn Toolbox,
    operator: &mut dyn Operator,
    workdir: &Path,
    config: &CertificatesConfig,
    server_ip: &str,
) -> CmdResult {
    let ca = decide_ca(operator, &workdir.join(&config.ca_file))?;
    let provisioner = Provisioner {
        tools,
        config,
        server_ip,
        host_user: tools.host_user()?,
    };

    let policy = config.retry_policy();
    match policy.run(
        "Certificate generation",
        |delay| tools.sleep(delay),
        |_| provisioner.run_attempt(ca.steps()),
    ) {
        Ok(attempt) => {
            info!("Certificates generated (attempt {attempt})");
            Ok(())
        }
        Err(Exhausted { attempts }) => Err(SetupError::CertificatesExhausted { attempts }.into()),
    }
}

/// Returns the number of replaced occurrences.
pub fn patch_keystore(file: &Path, patch: &KeystorePatch) -> Result<usize, SetupError> {
    let patch_err = |reason: String| SetupError::ConfigPatch {
        file: file.to_path_buf(),
        reason,
    };
    let content = std::fs::read_to_string(file).map_err(|e| patch_err(e.to_string()))?;
    let count = content.matches(patch.from.as_str()).count();
    if count == 0 {
        warn!(
            "`{}` not found in {}, leaving it unchanged",
            patch.from,
            file.display()
        );
        return Ok(0);
    }
    std::fs::write(file, content.replace(&patch.from, &patch.to))
        .map_err(|e| patch_err(e.to_string()))?;
    info!(
        "Replaced {count} occurrence(s) of `{}` with `{}` in {}",
        patch.from,
        patch.to,
        file.display()
    );
    Ok(count)
}

/// Single-attempt steps after the loop: keystore patch, stack restart,
/// client registration.
pub fn finalize(
    tools: &dyn Toolbox,
    workdir: &Path,
    config: &CertificatesConfig,
    stack: &Stack,
) -> CmdResult {
    if let Some(patch) = &config.keystore_patch {
        patch_keystore(&workdir.join(&patch.file), patch)?;
    }

    compose::restart(tools, stack)?;

    if let Some(registration) = &config.registration {
        tools.sleep(config.retry_policy().delay);
        let mut exec = ContainerExec::new(&config.container, registration.command.iter().cloned());
        if let Some(dir) = &registration.workdir {
            exec = exec.workdir(dir);
        }
        info!(
            "Registering client certificate for {}: {}",
            config.client_identity,
            exec.command_line()
        );
        tools
            .exec_in_container(&exec)
            .map_err(|e| SetupError::Registration(e.to_string()))?;
    }
    Ok(())
}
