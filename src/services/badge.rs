//! Toolbar badge used as the progress counter.

use parking_lot::Mutex;

/// Background color of the progress badge.
pub const BADGE_COLOR: &str = "#2366d1";

/// A short-text indicator on the extension's toolbar button.
pub trait BadgeSink: Send + Sync + 'static {
    fn set_text(&self, text: &str);
    fn set_background_color(&self, color: &str);

    /// Show `count`, or clear the badge when it is zero.
    fn publish_count(&self, count: usize) {
        let text = if count > 0 { count.to_string() } else { String::new() };
        self.set_text(&text);
        self.set_background_color(BADGE_COLOR);
    }
}

/// Badge that only logs. Used when there is no toolbar to draw on.
#[derive(Debug, Default)]
pub struct LogBadge;

impl BadgeSink for LogBadge {
    fn set_text(&self, text: &str) {
        log::debug!("badge text: {:?}", text);
    }

    fn set_background_color(&self, _color: &str) {}
}

/// Badge that remembers every text it was given.
#[derive(Debug, Default)]
pub struct RecordingBadge {
    texts: Mutex<Vec<String>>,
    color: Mutex<Option<String>>,
}

impl RecordingBadge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every text published so far, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.texts.lock().clone()
    }

    /// The text currently shown; empty when cleared or never set.
    pub fn current(&self) -> String {
        self.texts.lock().last().cloned().unwrap_or_default()
    }

    pub fn color(&self) -> Option<String> {
        self.color.lock().clone()
    }
}

impl BadgeSink for RecordingBadge {
    fn set_text(&self, text: &str) {
        self.texts.lock().push(text.to_string());
    }

    fn set_background_color(&self, color: &str) {
        *self.color.lock() = Some(color.to_string());
    }
}
