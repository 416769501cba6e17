use cmd_lib::*;
use std::path::Path;
use strum::IntoEnumIterator;

use crate::site::{SiteField, SiteInfo};

pub const SERVER_IP_KEY: &str = "SERVER_IP";

pub fn render(site: &SiteInfo, server_ip: &str) -> String {
    let mut content = String::new();
    for field in SiteField::iter() {
        content.push_str(&format!("{}={}\n", field.as_ref(), site.get(field)));
    }
    content.push_str(&format!("{SERVER_IP_KEY}={server_ip}\n"));
    content
}

/// Overwrites `path`; never appends.
pub fn write(path: &Path, site: &SiteInfo, server_ip: &str) -> CmdResult {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render(site, server_ip))?;
    info!("Wrote {} (server ip {server_ip})", path.display());
    Ok(())
}
