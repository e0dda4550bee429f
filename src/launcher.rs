use crate::{
    error::LaunchError,
    library::{now_unix, ModPath, ModRecord, STATUS_RUNNING},
    store::ModStore,
};
use std::{
    ffi::{OsStr, OsString},
    io,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    thread,
};

/// A process invocation, kept as data so it can be inspected before spawning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
}

impl LaunchCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn in_dir(mut self, dir: Option<&Path>) -> Self {
        self.current_dir = dir
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf);
        self
    }
}

pub trait ProcessSpawner {
    /// Starts the process and returns without waiting for it.
    fn spawn(&mut self, command: &LaunchCommand) -> io::Result<()>;

    /// Runs the process to completion; a non-zero exit is an error.
    fn run(&mut self, command: &LaunchCommand) -> io::Result<()>;
}

impl<S: ProcessSpawner + ?Sized> ProcessSpawner for Box<S> {
    fn spawn(&mut self, command: &LaunchCommand) -> io::Result<()> {
        (**self).spawn(command)
    }

    fn run(&mut self, command: &LaunchCommand) -> io::Result<()> {
        (**self).run(command)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpawner;

impl SystemSpawner {
    fn command(command: &LaunchCommand) -> Command {
        let mut process = Command::new(&command.program);
        process
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &command.current_dir {
            process.current_dir(dir);
        }
        process
    }
}

impl ProcessSpawner for SystemSpawner {
    fn spawn(&mut self, command: &LaunchCommand) -> io::Result<()> {
        let mut child = Self::command(command).spawn()?;
        // Reaped off-thread so long-running scripts never block the caller.
        thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }

    fn run(&mut self, command: &LaunchCommand) -> io::Result<()> {
        let status = Self::command(command).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "{} exited {status}",
                command.program.to_string_lossy()
            )))
        }
    }
}

/// Runs the mod's script, then records it as running.
///
/// The store is only written after the spawn succeeded; every earlier
/// failure leaves the record untouched.
pub fn run_mod(
    store: &ModStore,
    spawner: &mut impl ProcessSpawner,
    record: &ModRecord,
) -> Result<i64, LaunchError> {
    let script = resolve_existing(record.path(ModPath::Script), ModPath::Script.label())?;
    spawner
        .spawn(&script_command(&script))
        .map_err(|source| LaunchError::Spawn {
            path: script.clone(),
            source,
        })?;
    let started_at = now_unix();
    store.set_run_status(record.id, STATUS_RUNNING, started_at)?;
    Ok(started_at)
}

/// Hands one of the mod's paths to the desktop's default handler.
pub fn open_mod_path(
    spawner: &mut impl ProcessSpawner,
    record: &ModRecord,
    which: ModPath,
) -> Result<PathBuf, LaunchError> {
    open_existing(spawner, record.path(which), which.label())
}

pub fn open_existing(
    spawner: &mut impl ProcessSpawner,
    raw: &str,
    label: &'static str,
) -> Result<PathBuf, LaunchError> {
    let path = resolve_existing(raw, label)?;
    open_path(spawner, &path)?;
    Ok(path)
}

/// Tries each platform opener in turn until one exits successfully.
pub fn open_path(spawner: &mut impl ProcessSpawner, path: &Path) -> Result<(), LaunchError> {
    let mut last_error = None;
    for command in open_commands(path) {
        match spawner.run(&command) {
            Ok(()) => return Ok(()),
            Err(err) => last_error = Some(err),
        }
    }
    Err(LaunchError::Spawn {
        path: path.to_path_buf(),
        source: last_error
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no opener available")),
    })
}

pub fn resolve_existing(raw: &str, label: &'static str) -> Result<PathBuf, LaunchError> {
    if raw.trim().is_empty() {
        return Err(LaunchError::PathNotSet { label });
    }
    let path = expand_path(raw);
    if !path.exists() {
        return Err(LaunchError::PathMissing { label, path });
    }
    Ok(path)
}

/// Accepts quoted paths, `file://` URIs and a leading `~`.
pub fn expand_path(input: &str) -> PathBuf {
    let mut value = input.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            value = &value[1..value.len() - 1];
        }
    }
    if let Some(rest) = value.strip_prefix("file://") {
        value = rest.trim_start_matches("localhost");
    }
    if let Some(stripped) = value.strip_prefix('~') {
        if stripped.is_empty() || stripped.starts_with('/') {
            if let Some(home) = std::env::var_os("HOME") {
                return PathBuf::from(home).join(stripped.trim_start_matches('/'));
            }
        }
    }
    PathBuf::from(value)
}

#[cfg(windows)]
pub fn script_command(script: &Path) -> LaunchCommand {
    LaunchCommand::new("cmd")
        .arg("/C")
        .arg(script)
        .in_dir(script.parent())
}

#[cfg(not(windows))]
pub fn script_command(script: &Path) -> LaunchCommand {
    let is_shell = script
        .extension()
        .and_then(OsStr::to_str)
        .map(|ext| ext.eq_ignore_ascii_case("sh"))
        .unwrap_or(false);
    let command = if is_shell {
        LaunchCommand::new("sh").arg(script)
    } else {
        LaunchCommand::new(script.as_os_str())
    };
    command.in_dir(script.parent())
}

#[cfg(windows)]
pub fn open_commands(path: &Path) -> Vec<LaunchCommand> {
    vec![LaunchCommand::new("cmd")
        .arg("/C")
        .arg("start")
        .arg("")
        .arg(path)]
}

#[cfg(target_os = "macos")]
pub fn open_commands(path: &Path) -> Vec<LaunchCommand> {
    vec![LaunchCommand::new("open").arg(path)]
}

#[cfg(not(any(windows, target_os = "macos")))]
pub fn open_commands(path: &Path) -> Vec<LaunchCommand> {
    vec![
        LaunchCommand::new("xdg-open").arg(path),
        LaunchCommand::new("gio").arg("open").arg(path),
        LaunchCommand::new("kde-open5").arg(path),
    ]
}

/// Records commands instead of starting them; the first `failures` spawns fail.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FakeSpawner {
    pub calls: Vec<LaunchCommand>,
    pub failures: usize,
}

#[cfg(test)]
impl FakeSpawner {
    pub fn failing(failures: usize) -> Self {
        Self {
            calls: Vec::new(),
            failures,
        }
    }
}

#[cfg(test)]
impl ProcessSpawner for FakeSpawner {
    fn spawn(&mut self, command: &LaunchCommand) -> io::Result<()> {
        self.calls.push(command.clone());
        if self.failures > 0 {
            self.failures -= 1;
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        }
        Ok(())
    }

    fn run(&mut self, command: &LaunchCommand) -> io::Result<()> {
        self.spawn(command)
    }
}
