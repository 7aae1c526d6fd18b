use crate::process_iterator::{EnumerationError, ProcessSource};
use crate::sampler::Pid;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("process id for main class '{token}' could not be resolved: no matching process")]
    NoMatchingProcess { token: String },
    #[error("process id for main class '{token}' could not be resolved: {source}")]
    Enumeration {
        token: String,
        #[source]
        source: EnumerationError,
    },
}

/// Turns a pid or a main class name into a pid.
///
/// A decimal token is returned as is, without checking that the process exists.
/// Anything else is looked up among the active JVMs and the first one whose main
/// class equals the token exactly wins. When several JVMs share a main class the
/// result depends on the host's enumeration order.
pub fn resolve(token: &str, processes: &impl ProcessSource) -> Result<Pid, ResolveError> {
    if let Ok(pid) = token.parse::<Pid>() {
        return Ok(pid);
    }

    let candidates = processes
        .active_vms()
        .map_err(|source| ResolveError::Enumeration {
            token: token.to_string(),
            source,
        })?;

    for pid in candidates {
        match processes.main_class(pid) {
            Ok(main_class) if main_class == token => {
                log::debug!("resolved '{}' to pid {}", token, pid);
                return Ok(pid);
            }
            Ok(_) => {}
            Err(error) => log::debug!("skipping pid {}: {}", pid, error),
        }
    }

    Err(ResolveError::NoMatchingProcess {
        token: token.to_string(),
    })
}
