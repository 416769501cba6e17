use cmd_lib::*;
use std::path::Path;

use crate::config::BootstrapConfig;
use crate::operator::Operator;
use crate::site::{SiteInfo, SiteOverrides};
use crate::tools::Toolbox;
use crate::{certs, cleanup, compose, env_file, prober, release};

pub struct Installer<'a> {
    pub config: &'a BootstrapConfig,
    pub workdir: &'a Path,
    pub tools: &'a dyn Toolbox,
    pub operator: &'a mut dyn Operator,
    pub overrides: SiteOverrides,
}

impl Installer<'_> {
    pub fn run(&mut self) -> CmdResult {
        let layout = &self.config.layout;
        let install_dir = self.workdir.join(&layout.install_dir);
        let scratch_dir = self.workdir.join(&layout.scratch_dir);

        prober::check_prerequisites(self.tools, &self.config.prerequisites)?;

        cleanup::remove_previous_install(
            self.tools,
            self.operator,
            &install_dir,
            &scratch_dir,
            &layout.volume,
        )?;

        release::install_release(self.tools, self.workdir, layout)?;

        let site = SiteInfo::resolve(&self.overrides, &self.config.site, self.operator)?;
        let server_ip = self.tools.primary_ip()?;
        env_file::write(&self.workdir.join(&layout.env_file), &site, &server_ip)?;

        let stack = compose::select_stack(
            self.tools,
            self.workdir,
            &self.config.compose,
            &layout.env_file,
        )?;
        compose::launch(self.tools, &stack)?;

        let certificates = &self.config.certificates;
        certs::provision(
            self.tools,
            self.operator,
            self.workdir,
            certificates,
            &server_ip,
        )?;
        certs::finalize(self.tools, self.workdir, certificates, &stack)?;

        info!(
            "Setup finished: {} is running at {server_ip}",
            install_dir.display()
        );
        Ok(())
    }
}
