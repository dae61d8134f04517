// Tue Jan 13 2026 - Alex

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const FRAME_TEMPLATE: &str =
    "{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) {msg}";

/// Frame counter whose length grows as renders are enqueued.
pub struct RenderProgress {
    bar: ProgressBar,
}

impl RenderProgress {
    pub fn new(initial_frames: usize, enabled: bool) -> Self {
        if !enabled {
            return Self::hidden_with_length(initial_frames);
        }

        let bar = ProgressBar::new(initial_frames as u64);
        let style = ProgressStyle::default_bar()
            .template(FRAME_TEMPLATE)
            .map(|s| s.progress_chars("█▓▒░ "))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    pub fn hidden() -> Self {
        Self::hidden_with_length(0)
    }

    fn hidden_with_length(frames: usize) -> Self {
        Self {
            bar: ProgressBar::with_draw_target(Some(frames as u64), ProgressDrawTarget::hidden()),
        }
    }

    pub fn add_frames(&self, n: usize) {
        if n > 0 {
            self.bar.inc_length(n as u64);
        }
    }

    pub fn frame_done(&self) {
        self.bar.inc(1);
    }

    pub fn set_message(&self, message: String) {
        self.bar.set_message(message);
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

impl Default for RenderProgress {
    fn default() -> Self {
        Self::hidden()
    }
}
