use cmd_lib::*;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::path::Path;
use std::time::Duration;
use strum::{AsRefStr, Display};

const PORT_PROBE_TIMEOUT: Duration = Duration::from_millis(300);
// Never receives traffic: connecting a UDP socket only selects a route.
const ROUTE_PROBE_ADDR: &str = "8.8.8.8:80";

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Checksum {
    Md5,
    Sha256,
}

impl Checksum {
    fn command(self) -> &'static str {
        match self {
            Checksum::Md5 => "md5sum",
            Checksum::Sha256 => "sha256sum",
        }
    }
}

/// One `docker exec` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerExec {
    pub container: String,
    pub workdir: Option<String>,
    pub user: Option<String>,
    pub args: Vec<String>,
}

impl ContainerExec {
    pub fn new<I, S>(container: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            container: container.to_string(),
            workdir: None,
            user: None,
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn workdir(mut self, dir: &str) -> Self {
        self.workdir = Some(dir.to_string());
        self
    }

    pub fn user(mut self, user: &str) -> Self {
        self.user = Some(user.to_string());
        self
    }

    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }
}

/// Every call that leaves this process goes through here.
pub trait Toolbox {
    fn command_exists(&self, name: &str) -> bool;
    fn compose_available(&self) -> bool;
    fn port_in_use(&self, port: u16) -> bool;
    fn remove_volume(&self, volume: &str) -> CmdResult;
    fn checksum(&self, kind: Checksum, file: &Path) -> FunResult;
    fn extract_archive(&self, archive: &Path, dest: &Path) -> CmdResult;
    fn move_dir(&self, from: &Path, to: &Path) -> CmdResult;
    fn host_arch(&self) -> FunResult;
    fn primary_ip(&self) -> FunResult;
    /// `uid:gid` of the invoking user.
    fn host_user(&self) -> FunResult;
    fn compose_up(&self, compose_file: &Path, env_file: &Path) -> CmdResult;
    fn compose_down(&self, compose_file: &Path, env_file: &Path) -> CmdResult;
    fn exec_in_container(&self, exec: &ContainerExec) -> CmdResult;
    fn stop_container(&self, container: &str) -> CmdResult;
    fn sleep(&self, duration: Duration);
}

pub struct HostToolbox;

impl Toolbox for HostToolbox {
    fn command_exists(&self, name: &str) -> bool {
        run_cmd!(bash -c "command -v $name" &>/dev/null).is_ok()
    }

    fn compose_available(&self) -> bool {
        run_cmd!(docker compose version &>/dev/null).is_ok()
    }

    fn port_in_use(&self, port: u16) -> bool {
        [
            (IpAddr::V4(Ipv4Addr::UNSPECIFIED), IpAddr::V4(Ipv4Addr::LOCALHOST)),
            (IpAddr::V6(Ipv6Addr::UNSPECIFIED), IpAddr::V6(Ipv6Addr::LOCALHOST)),
        ]
        .into_iter()
        .any(|(wildcard, loopback)| wildcard_port_taken(wildcard, loopback, port))
    }

    fn remove_volume(&self, volume: &str) -> CmdResult {
        run_cmd!(docker volume rm $volume)
    }

    fn checksum(&self, kind: Checksum, file: &Path) -> FunResult {
        let cmd = kind.command();
        let file = file.display().to_string();
        let out = run_fun!($cmd $file)?;
        Ok(out.split_whitespace().next().unwrap_or_default().to_string())
    }

    fn extract_archive(&self, archive: &Path, dest: &Path) -> CmdResult {
        let archive = archive.display().to_string();
        let dest = dest.display().to_string();
        run_cmd! {
            info "Extracting $archive to $dest";
            unzip -q -o $archive -d $dest;
        }
    }

    fn move_dir(&self, from: &Path, to: &Path) -> CmdResult {
        // Scratch lives under /tmp, so a plain rename may cross filesystems.
        let from = from.display().to_string();
        let to = to.display().to_string();
        run_cmd!(mv $from $to)
    }

    fn host_arch(&self) -> FunResult {
        run_fun!(uname -m)
    }

    fn primary_ip(&self) -> FunResult {
        if let Some(ip) = route_probe_ip() {
            return Ok(ip);
        }
        let addrs = run_fun!(hostname -I)?;
        addrs
            .split_whitespace()
            .next()
            .map(str::to_string)
            .ok_or_else(|| std::io::Error::other("hostname -I returned no address"))
    }

    fn host_user(&self) -> FunResult {
        let uid = run_fun!(id -u)?;
        let gid = run_fun!(id -g)?;
        Ok(format!("{uid}:{gid}"))
    }

    fn compose_up(&self, compose_file: &Path, env_file: &Path) -> CmdResult {
        let compose_file = compose_file.display().to_string();
        let env_file = env_file.display().to_string();
        run_cmd! {
            info "Starting stack from $compose_file";
            docker compose -f $compose_file --env-file $env_file up -d;
        }
    }

    fn compose_down(&self, compose_file: &Path, env_file: &Path) -> CmdResult {
        let compose_file = compose_file.display().to_string();
        let env_file = env_file.display().to_string();
        run_cmd! {
            info "Stopping stack from $compose_file";
            docker compose -f $compose_file --env-file $env_file down;
        }
    }

    fn exec_in_container(&self, exec: &ContainerExec) -> CmdResult {
        let mut opts = vec![];
        if let Some(dir) = &exec.workdir {
            opts.push("-w".to_string());
            opts.push(dir.clone());
        }
        if let Some(user) = &exec.user {
            opts.push("-u".to_string());
            opts.push(user.clone());
        }
        let container = exec.container.clone();
        let args = exec.args.clone();
        run_cmd!(docker exec $[opts] $container $[args])
    }

    fn stop_container(&self, container: &str) -> CmdResult {
        run_cmd!(docker stop $container)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

fn route_probe_ip() -> Option<String> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect(ROUTE_PROBE_ADDR).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    if ip.is_unspecified() || ip.is_loopback() {
        None
    } else {
        Some(ip.to_string())
    }
}

/// A wildcard bind collides with a listener on any address of that family.
/// Privileged ports we may not bind fall back to a loopback connect.
fn wildcard_port_taken(wildcard: IpAddr, loopback: IpAddr, port: u16) -> bool {
    match TcpListener::bind((wildcard, port)) {
        Ok(_) => false,
        Err(e) if e.kind() == ErrorKind::AddrInUse => true,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            let addr = SocketAddr::new(loopback, port);
            TcpStream::connect_timeout(&addr, PORT_PROBE_TIMEOUT).is_ok()
        }
        // No such address family on this host.
        Err(e) => {
            log::debug!("Cannot probe port {port} on {wildcard}: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_exec_builder() {
        let exec = ContainerExec::new("server", ["./makeCert.sh", "server", "10.0.0.5"])
            .workdir("/opt/server/certs")
            .user("root");
        assert_eq!(exec.container, "server");
        assert_eq!(exec.workdir.as_deref(), Some("/opt/server/certs"));
        assert_eq!(exec.user.as_deref(), Some("root"));
        assert_eq!(exec.command_line(), "./makeCert.sh server 10.0.0.5");
    }

    fn assert_listener_detected(listener: TcpListener) {
        let port = listener.local_addr().unwrap().port();
        assert!(HostToolbox.port_in_use(port), "port {port} reported free");
        drop(listener);
        assert!(!HostToolbox.port_in_use(port), "port {port} still reported busy");
    }

    #[test]
    fn test_port_in_use_detects_ipv4_loopback_listener() {
        assert_listener_detected(TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap());
    }

    #[test]
    fn test_port_in_use_detects_ipv6_loopback_listener() {
        // Hosts without IPv6 cannot hold such a listener.
        let Ok(listener) = TcpListener::bind((Ipv6Addr::LOCALHOST, 0)) else {
            return;
        };
        assert_listener_detected(listener);
    }

    #[test]
    fn test_port_in_use_detects_listener_on_host_address() {
        let Some(ip) = route_probe_ip() else {
            return;
        };
        let ip: IpAddr = ip.parse().unwrap();
        assert_listener_detected(TcpListener::bind((ip, 0)).unwrap());
    }

    #[test]
    fn test_route_probe_ip_is_routable() {
        if let Some(ip) = route_probe_ip() {
            let ip: IpAddr = ip.parse().unwrap();
            assert!(!ip.is_loopback(), "{ip}");
            assert!(!ip.is_unspecified(), "{ip}");
        }
    }

    #[test]
    fn test_primary_ip_is_an_address() {
        // Offline sandboxes may have neither a route nor `hostname -I`.
        if let Ok(ip) = HostToolbox.primary_ip() {
            assert!(ip.parse::<IpAddr>().is_ok(), "{ip}");
        }
    }

    #[test]
    fn test_command_exists() {
        assert!(HostToolbox.command_exists("sh"));
        assert!(!HostToolbox.command_exists("no-such-tool-for-server-bootstrap"));
    }

    #[test]
    fn test_checksum_names() {
        assert_eq!(Checksum::Md5.as_ref(), "md5");
        assert_eq!(Checksum::Sha256.to_string(), "sha256");
    }
}
