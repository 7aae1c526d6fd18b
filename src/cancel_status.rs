use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set once the user asks to stop sampling. Checked between samples only,
/// an acquisition that is already running is left to finish.
#[derive(Clone, Default)]
pub struct CancelStatus {
    should_cancel: Arc<AtomicBool>,
}

impl CancelStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate_ctrl_c_handler(&self) {
        let should_cancel = self.should_cancel.clone();
        if let Err(error) = ctrlc::set_handler(move || {
            should_cancel.store(true, Ordering::SeqCst);
        }) {
            log::warn!("unable to install the ctrl-c handler: {}", error);
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.should_cancel.load(Ordering::SeqCst)
    }
}
