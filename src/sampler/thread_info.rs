/// One thread of a thread dump.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ThreadInfo {
    name: String,
    number: Option<u64>,
    daemon: bool,
    priority: Option<i32>,
    tid: Option<String>,
    nid: Option<String>,
    status: String,
    state: Option<String>,
    frames: Vec<String>,
    locked_synchronizers: Vec<String>,
}

impl ThreadInfo {
    /// Parse the line a thread block starts with, e.g.
    /// `"main" #1 prio=5 os_prio=0 tid=0x00007f nid=0x1a03 waiting on condition  [0x7f00]`.
    pub fn from_header(line: &str) -> Self {
        let line = line.trim();
        let (name, rest) = match line.strip_prefix('"').and_then(|l| l.rsplit_once('"')) {
            Some((name, rest)) => (name.to_string(), rest),
            None => (String::new(), line),
        };

        let mut thread = Self {
            name,
            ..Default::default()
        };
        let mut status = Vec::new();

        for word in rest.split_whitespace() {
            if let Some(bracketed) = word.strip_prefix('[') {
                // JDK 19+ prints the OS thread id as `[29507]` right after `#N`.
                let os_thread_id = bracketed.strip_suffix(']').unwrap_or_default();
                if status.is_empty() && os_thread_id.bytes().all(|b| b.is_ascii_digit()) {
                    continue;
                }
                break;
            }
            if let Some(number) = word.strip_prefix('#') {
                thread.number = number.parse().ok();
            } else if word == "daemon" {
                thread.daemon = true;
            } else if let Some(priority) = word.strip_prefix("prio=") {
                thread.priority = priority.parse().ok();
            } else if let Some(tid) = word.strip_prefix("tid=") {
                thread.tid = Some(tid.to_string());
            } else if let Some(nid) = word.strip_prefix("nid=") {
                thread.nid = Some(nid.to_string());
            } else if !word.contains('=') {
                status.push(word);
            }
        }

        thread.status = status.join(" ");
        thread
    }

    pub fn set_state(&mut self, state: &str) {
        self.state = Some(state.to_string());
    }

    pub fn add_frame(&mut self, frame: &str) {
        self.frames.push(frame.to_string());
    }

    pub fn add_locked_synchronizer(&mut self, synchronizer: &str) {
        self.locked_synchronizers.push(synchronizer.to_string());
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_number(&self) -> Option<u64> {
        self.number
    }

    pub fn is_daemon(&self) -> bool {
        self.daemon
    }

    pub fn get_priority(&self) -> Option<i32> {
        self.priority
    }

    pub fn get_tid(&self) -> Option<&str> {
        self.tid.as_deref()
    }

    pub fn get_nid(&self) -> Option<&str> {
        self.nid.as_deref()
    }

    /// The `java.lang.Thread.State` line, or the status from the header
    /// for threads that have none (VM and GC threads).
    pub fn get_state(&self) -> &str {
        self.state.as_deref().unwrap_or(&self.status)
    }

    /// Stack lines, innermost first, including lock annotations.
    pub fn get_frames(&self) -> &[String] {
        &self.frames
    }

    pub fn get_locked_synchronizers(&self) -> &[String] {
        &self.locked_synchronizers
    }

    pub fn stack_depth(&self) -> usize {
        self.frames.iter().filter(|f| f.starts_with("at ")).count()
    }
}

impl std::fmt::Display for ThreadInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "\"{}\"{} {}  ({} frames)",
            self.name,
            if self.daemon { " daemon" } else { "" },
            self.get_state(),
            self.stack_depth()
        )?;
        if let Some(top) = self.frames.iter().find(|f| f.starts_with("at ")) {
            write!(f, "\n    {}", top)?;
        }
        Ok(())
    }
}
