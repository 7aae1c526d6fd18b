use std::path::PathBuf;
use std::process::Command;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpOptions {
    /// Include monitor and ownable synchronizer ownership.
    pub locks: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self { locks: true }
    }
}

/// Something that can take the raw text of a thread dump from a live JVM.
/// `Ok(None)` means the target produced no dump, which is not an error.
pub trait DumpSource {
    fn acquire(&mut self, pid: Pid, options: &DumpOptions) -> Result<Option<String>, AcquireError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DumpTool {
    #[default]
    Jcmd,
    Jstack,
}

impl DumpTool {
    fn binary_name(&self) -> &'static str {
        match self {
            Self::Jcmd => "jcmd",
            Self::Jstack => "jstack",
        }
    }
}

/// Takes dumps by running a JDK diagnostic tool against the target process.
#[derive(Debug, Default)]
pub struct JdkDumpSource {
    tool: DumpTool,
    java_home: Option<PathBuf>,
}

impl JdkDumpSource {
    pub fn new(tool: DumpTool, java_home: Option<PathBuf>) -> Self {
        Self { tool, java_home }
    }

    fn program(&self) -> PathBuf {
        match &self.java_home {
            Some(java_home) => java_home.join("bin").join(self.tool.binary_name()),
            None => PathBuf::from(self.tool.binary_name()),
        }
    }

    fn command(&self, pid: Pid, options: &DumpOptions) -> Command {
        let mut command = Command::new(self.program());
        match self.tool {
            DumpTool::Jcmd => {
                command.arg(pid.to_string()).arg("Thread.print");
                if options.locks {
                    command.arg("-l");
                }
            }
            DumpTool::Jstack => {
                if options.locks {
                    command.arg("-l");
                }
                command.arg(pid.to_string());
            }
        }
        command
    }
}

impl DumpSource for JdkDumpSource {
    fn acquire(&mut self, pid: Pid, options: &DumpOptions) -> Result<Option<String>, AcquireError> {
        let mut command = self.command(pid, options);
        let tool = self.program().display().to_string();
        log::debug!("running {:?}", command);

        let output = command
            .output()
            .map_err(|source| AcquireError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let diagnostic = if stderr.trim().is_empty() {
                String::from_utf8_lossy(&output.stdout)
            } else {
                stderr
            };
            return Err(AcquireError::ExitStatus {
                tool,
                status: output.status,
                output: diagnostic.trim().to_string(),
            });
        }

        Ok(dump_text(pid, &output.stdout))
    }
}

/// Decodes tool output, dropping the `<pid>:` line `jcmd` starts with.
fn dump_text(pid: Pid, stdout: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(stdout);
    let prefix = format!("{}:", pid);
    let text = match text.split_once('\n') {
        Some((first_line, rest)) if first_line.trim_end() == prefix => rest,
        _ => &text[..],
    };

    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
