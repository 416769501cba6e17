//! Recording fakes for the process and operator boundaries.

use cmd_lib::{CmdResult, FunResult};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::operator::Operator;
use crate::tools::{Checksum, ContainerExec, Toolbox};

pub const ALWAYS: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RemoveVolume(String),
    Checksum(Checksum, PathBuf),
    Extract { archive: PathBuf, dest: PathBuf },
    MoveDir { from: PathBuf, to: PathBuf },
    ComposeUp { file: PathBuf, env_file: PathBuf },
    ComposeDown { file: PathBuf, env_file: PathBuf },
    Exec(ContainerExec),
    Stop(String),
    Sleep(Duration),
}

impl Call {
    /// Key that failure rules are matched against (prefix match).
    fn key(&self) -> String {
        match self {
            Call::RemoveVolume(v) => format!("volume rm {v}"),
            Call::Checksum(kind, _) => format!("checksum {kind}"),
            Call::Extract { .. } => "extract".to_string(),
            Call::MoveDir { .. } => "mv".to_string(),
            Call::ComposeUp { .. } => "compose up".to_string(),
            Call::ComposeDown { .. } => "compose down".to_string(),
            Call::Exec(exec) => exec.command_line(),
            Call::Stop(c) => format!("stop {c}"),
            Call::Sleep(_) => "sleep".to_string(),
        }
    }

    fn is_mutating(&self) -> bool {
        !matches!(self, Call::Checksum(..) | Call::Sleep(_))
    }
}

pub struct FakeToolbox {
    missing_commands: HashSet<String>,
    compose_available: bool,
    busy_ports: HashSet<u16>,
    arch: String,
    ip: String,
    user: String,
    archive_tree: Vec<String>,
    failures: RefCell<HashMap<String, u32>>,
    calls: RefCell<Vec<Call>>,
}

impl FakeToolbox {
    pub fn new() -> Self {
        Self {
            missing_commands: HashSet::new(),
            compose_available: true,
            busy_ports: HashSet::new(),
            arch: "x86_64".to_string(),
            ip: "192.168.1.20".to_string(),
            user: "1000:1000".to_string(),
            archive_tree: vec![],
            failures: RefCell::new(HashMap::new()),
            calls: RefCell::new(vec![]),
        }
    }

    pub fn without_command(mut self, name: &str) -> Self {
        self.missing_commands.insert(name.to_string());
        self
    }

    pub fn without_compose(mut self) -> Self {
        self.compose_available = false;
        self
    }

    pub fn with_busy_port(mut self, port: u16) -> Self {
        self.busy_ports.insert(port);
        self
    }

    pub fn with_arch(mut self, arch: &str) -> Self {
        self.arch = arch.to_string();
        self
    }

    /// Directories (relative to the extraction target) a fake unzip creates.
    pub fn with_archive_tree(mut self, dirs: &[&str]) -> Self {
        self.archive_tree = dirs.iter().map(|d| d.to_string()).collect();
        self
    }

    /// Next `times` calls whose key starts with `key` fail.
    pub fn fail(self, key: &str, times: u32) -> Self {
        self.failures.borrow_mut().insert(key.to_string(), times);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(Call::is_mutating)
            .collect()
    }

    pub fn exec_lines(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                Call::Exec(exec) => Some(exec.command_line()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> CmdResult {
        let key = call.key();
        self.calls.borrow_mut().push(call);
        let mut failures = self.failures.borrow_mut();
        for (prefix, remaining) in failures.iter_mut() {
            if *remaining > 0 && key.starts_with(prefix.as_str()) {
                if *remaining != ALWAYS {
                    *remaining -= 1;
                }
                return Err(io::Error::other(format!("injected failure: {key}")));
            }
        }
        Ok(())
    }
}

impl Toolbox for FakeToolbox {
    fn command_exists(&self, name: &str) -> bool {
        !self.missing_commands.contains(name)
    }

    fn compose_available(&self) -> bool {
        self.compose_available
    }

    fn port_in_use(&self, port: u16) -> bool {
        self.busy_ports.contains(&port)
    }

    fn remove_volume(&self, volume: &str) -> CmdResult {
        self.record(Call::RemoveVolume(volume.to_string()))
    }

    fn checksum(&self, kind: Checksum, file: &Path) -> FunResult {
        self.record(Call::Checksum(kind, file.to_path_buf()))?;
        Ok(format!("{kind}-of-{}", file.display()))
    }

    fn extract_archive(&self, archive: &Path, dest: &Path) -> CmdResult {
        self.record(Call::Extract {
            archive: archive.to_path_buf(),
            dest: dest.to_path_buf(),
        })?;
        for dir in &self.archive_tree {
            std::fs::create_dir_all(dest.join(dir))?;
        }
        Ok(())
    }

    fn move_dir(&self, from: &Path, to: &Path) -> CmdResult {
        self.record(Call::MoveDir {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        })?;
        std::fs::rename(from, to)
    }

    fn host_arch(&self) -> FunResult {
        Ok(self.arch.clone())
    }

    fn primary_ip(&self) -> FunResult {
        Ok(self.ip.clone())
    }

    fn host_user(&self) -> FunResult {
        Ok(self.user.clone())
    }

    fn compose_up(&self, compose_file: &Path, env_file: &Path) -> CmdResult {
        self.record(Call::ComposeUp {
            file: compose_file.to_path_buf(),
            env_file: env_file.to_path_buf(),
        })
    }

    fn compose_down(&self, compose_file: &Path, env_file: &Path) -> CmdResult {
        self.record(Call::ComposeDown {
            file: compose_file.to_path_buf(),
            env_file: env_file.to_path_buf(),
        })
    }

    fn exec_in_container(&self, exec: &ContainerExec) -> CmdResult {
        self.record(Call::Exec(exec.clone()))
    }

    fn stop_container(&self, container: &str) -> CmdResult {
        self.record(Call::Stop(container.to_string()))
    }

    fn sleep(&self, duration: Duration) {
        self.calls.borrow_mut().push(Call::Sleep(duration));
    }
}

#[derive(Default)]
pub struct ScriptedOperator {
    confirms: VecDeque<bool>,
    answers: VecDeque<String>,
    pub questions: Vec<String>,
}

impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirm_with(mut self, answer: bool) -> Self {
        self.confirms.push_back(answer);
        self
    }

    pub fn answer_with(mut self, answer: &str) -> Self {
        self.answers.push_back(answer.to_string());
        self
    }
}

impl Operator for ScriptedOperator {
    fn confirm(&mut self, question: &str, _default: bool) -> io::Result<bool> {
        self.questions.push(question.to_string());
        self.confirms
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer"))
    }

    fn ask(&mut self, question: &str, _default: &str) -> io::Result<String> {
        self.questions.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer"))
    }
}
