use super::*;

/// A parsed thread dump, as printed by `jstack` or `jcmd <pid> Thread.print`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ThreadDump {
    raw: String,
    timestamp: Option<String>,
    header: Option<String>,
    threads: Vec<ThreadInfo>,
    jni_global_refs: Option<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Stack,
    Synchronizers,
}

impl ThreadDump {
    /// Lines that don't fit the layout are ignored, so this never fails.
    pub fn parse(raw: &str) -> Self {
        let mut dump = Self {
            raw: raw.to_string(),
            ..Default::default()
        };
        let mut current: Option<ThreadInfo> = None;
        let mut section = Section::Stack;

        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if trimmed.starts_with('"') {
                dump.threads.extend(current.take());
                current = Some(ThreadInfo::from_header(trimmed));
                section = Section::Stack;
                continue;
            }
            if trimmed.starts_with("JNI global ref") {
                dump.threads.extend(current.take());
                dump.jni_global_refs = Some(trimmed.to_string());
                continue;
            }

            let Some(thread) = current.as_mut() else {
                if trimmed.starts_with("Full thread dump") {
                    dump.header = Some(trimmed.to_string());
                } else if dump.header.is_none()
                    && dump.timestamp.is_none()
                    && trimmed.starts_with(|c: char| c.is_ascii_digit())
                {
                    dump.timestamp = Some(trimmed.to_string());
                }
                continue;
            };

            if let Some(state) = trimmed.strip_prefix("java.lang.Thread.State:") {
                thread.set_state(state.trim());
            } else if trimmed == "Locked ownable synchronizers:" {
                section = Section::Synchronizers;
            } else if section == Section::Synchronizers {
                if let Some(synchronizer) = trimmed.strip_prefix("- ") {
                    if synchronizer != "None" {
                        thread.add_locked_synchronizer(synchronizer);
                    }
                }
            } else if trimmed.starts_with("at ") || trimmed.starts_with("- ") {
                thread.add_frame(trimmed);
            }
        }

        dump.threads.extend(current);
        dump
    }

    /// The tool output this dump was parsed from.
    pub fn get_raw(&self) -> &str {
        &self.raw
    }

    pub fn get_timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    pub fn get_header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn get_threads(&self) -> &[ThreadInfo] {
        &self.threads
    }

    pub fn get_jni_global_refs(&self) -> Option<&str> {
        self.jni_global_refs.as_deref()
    }
}

impl std::fmt::Display for ThreadDump {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.header.as_deref().unwrap_or("Thread dump"))?;
        if let Some(timestamp) = &self.timestamp {
            write!(f, " at {}", timestamp)?;
        }
        writeln!(f, " - {} threads", self.threads.len())?;
        for thread in &self.threads {
            writeln!(f, "{}", thread)?;
        }
        Ok(())
    }
}
