use std::process::ExitStatus;

use super::Pid;

/// Why a single thread dump could not be taken.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("unable to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} failed ({status}): {output}")]
    ExitStatus {
        tool: String,
        status: ExitStatus,
        output: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("executing thread dump for process {pid} failed: {source}")]
    Acquisition {
        pid: Pid,
        #[source]
        source: AcquireError,
    },
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("all {0} samples have already been taken")]
    Exhausted(u32),
    #[error("sampling of process {0} was aborted by an earlier failure")]
    Aborted(Pid),
}
