//! Spinners for long-running tool phases (init, apply, destroy).
//!
//! Shown only when stderr is an interactive terminal, so piped output and
//! test runs stay clean.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{IsTerminal, stderr};
use std::time::Duration;

/// Check if we should show progress indicators.
#[must_use]
pub fn should_show_progress() -> bool {
    stderr().is_terminal()
}

/// Create a spinner for an indeterminate operation.
#[must_use]
pub fn create_spinner(message: &str, show: bool) -> ProgressBar {
    let pb = ProgressBar::new_spinner();

    if show {
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
    } else {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    pb
}

/// Spinner bound to one tool phase; clears itself when dropped.
pub struct PhaseSpinner {
    bar: ProgressBar,
}

impl PhaseSpinner {
    /// Start a spinner such as `Applying modules/aws/vpc`.
    #[must_use]
    pub fn start(phase: &str, target: &str) -> Self {
        Self {
            bar: create_spinner(&format!("{phase} {target}"), should_show_progress()),
        }
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    pub fn finish_with_message(self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }
}

impl Drop for PhaseSpinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
