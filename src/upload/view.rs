//! Presentation capability for the upload form.

/// The parts of the upload form the flow drives.
pub trait SubmitView {
    fn set_submit_enabled(&self, enabled: bool);
    fn set_submit_label(&self, label: &str);
    /// Show or hide the spinner and progress bar together.
    fn set_progress_visible(&self, visible: bool);
    /// Go to `location`, a path on the backend's origin.
    fn navigate(&self, location: &str);
}

/// Terminal rendering of the upload form.
///
/// Label changes go to stderr. The navigation target is printed to stdout
/// as an absolute URL so it can be piped.
pub struct TerminalView {
    origin: String,
}

impl TerminalView {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, location: &str) -> String {
        format!("{}{}", self.origin, location)
    }
}

impl SubmitView for TerminalView {
    fn set_submit_enabled(&self, enabled: bool) {
        log::debug!("Submit control {}", if enabled { "enabled" } else { "disabled" });
    }

    fn set_submit_label(&self, label: &str) {
        eprintln!("{}", label);
    }

    fn set_progress_visible(&self, visible: bool) {
        log::debug!("Progress indicator {}", if visible { "shown" } else { "hidden" });
    }

    fn navigate(&self, location: &str) {
        println!("{}", self.url_for(location));
    }
}
