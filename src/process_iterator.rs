use std::path::Path;

use crate::sampler::Pid;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum EnumerationError {
    #[error("unable to list local processes: {0}")]
    ListFailed(#[source] BoxError),
    #[error("unable to inspect process {pid}: {source}")]
    InspectFailed {
        pid: Pid,
        #[source]
        source: BoxError,
    },
    #[error("process {0} does not report a main class")]
    NoMainClass(Pid),
    #[error("process enumeration is not supported on this platform")]
    Unsupported,
}

/// The locally visible JVMs, as seen by the host's monitoring namespace.
pub trait ProcessSource {
    /// Pids of the JVMs running on this host. Order is whatever the host reports.
    fn active_vms(&self) -> Result<Vec<Pid>, EnumerationError>;

    /// The short main class name the JVM reports, the way `jps` prints it.
    fn main_class(&self, pid: Pid) -> Result<String, EnumerationError>;
}

/// Enumerates the java processes found under `/proc`.
#[derive(Debug, Default)]
pub struct JvmProcesses;

#[cfg(target_os = "linux")]
impl ProcessSource for JvmProcesses {
    fn active_vms(&self) -> Result<Vec<Pid>, EnumerationError> {
        Ok(ProcessIterator::snapshot()?
            .filter(|(exe_name, _)| exe_name == "java")
            .map(|(_, pid)| pid)
            .collect())
    }

    fn main_class(&self, pid: Pid) -> Result<String, EnumerationError> {
        let inspect_failed = |e: procfs::ProcError| EnumerationError::InspectFailed {
            pid,
            source: Box::new(e),
        };
        let process = procfs::process::Process::new(pid as i32).map_err(inspect_failed)?;
        let cmdline = process.cmdline().map_err(inspect_failed)?;

        main_class_from_cmdline(&cmdline).ok_or(EnumerationError::NoMainClass(pid))
    }
}

#[cfg(not(target_os = "linux"))]
impl ProcessSource for JvmProcesses {
    fn active_vms(&self) -> Result<Vec<Pid>, EnumerationError> {
        Err(EnumerationError::Unsupported)
    }

    fn main_class(&self, _pid: Pid) -> Result<String, EnumerationError> {
        Err(EnumerationError::Unsupported)
    }
}

/// Walks `/proc`, yielding the executable file name and pid of every process
/// that can be read. Processes that vanish or deny access are skipped.
#[cfg(target_os = "linux")]
pub struct ProcessIterator {
    snapshot: procfs::process::ProcessesIter,
}

#[cfg(target_os = "linux")]
impl ProcessIterator {
    pub fn snapshot() -> Result<Self, EnumerationError> {
        let snapshot = procfs::process::all_processes()
            .map_err(|e| EnumerationError::ListFailed(Box::new(e)))?;
        Ok(Self { snapshot })
    }
}

#[cfg(target_os = "linux")]
impl Iterator for ProcessIterator {
    type Item = (String, Pid);

    fn next(&mut self) -> Option<Self::Item> {
        for process in self.snapshot.by_ref() {
            let Ok(process) = process else {
                continue;
            };
            let Ok(exe) = process.exe() else {
                continue;
            };
            let exe_name = exe
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_string();

            return Some((exe_name, process.pid() as Pid));
        }
        None
    }
}

/// Launcher options that consume the following argument.
const OPTIONS_WITH_VALUE: &[&str] = &[
    "-cp",
    "-classpath",
    "--class-path",
    "-p",
    "--module-path",
    "--upgrade-module-path",
    "--add-modules",
    "--limit-modules",
    "--add-opens",
    "--add-exports",
    "--add-reads",
    "--patch-module",
];

/// Finds the main class (or jar) in a java command line and shortens it.
/// `argv[0]` is the launcher itself and is ignored.
pub fn main_class_from_cmdline(cmdline: &[String]) -> Option<String> {
    let mut args = cmdline.iter().skip(1).map(String::as_str);

    while let Some(arg) = args.next() {
        if let Some(module) = arg.strip_prefix("--module=") {
            return Some(module_main_class(module));
        }
        match arg {
            "-jar" => return Some(short_name(args.next()?)),
            "-m" | "--module" => return Some(module_main_class(args.next()?)),
            _ if OPTIONS_WITH_VALUE.contains(&arg) => {
                args.next();
            }
            _ if arg.starts_with('-') => {}
            _ => return Some(short_name(arg)),
        }
    }

    None
}

/// `module/class` yields the short class name, a bare module name is kept as is.
fn module_main_class(module: &str) -> String {
    match module.split_once('/') {
        Some((_, main_class)) => short_name(main_class),
        None => module.to_string(),
    }
}

fn short_name(main_class: &str) -> String {
    let file_name = Path::new(main_class)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(main_class);

    if file_name.ends_with(".jar") {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((package, class)) if !package.is_empty() => class.to_string(),
        _ => file_name.to_string(),
    }
}
