//! Progress indicators for the pgconverge CLI.

use colored::Colorize;
use declarative::{ApplyResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A spinner for a single blocking step (e.g., connecting)
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Progress bar over a batch of databases being converged
pub struct ApplyProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
}

impl ApplyProgress {
    pub fn new(quiet: bool) -> Self {
        Self { bar: None, quiet }
    }
}

impl ProgressCallback for ApplyProgress {
    fn on_batch_start(&mut self, count: usize) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new(count as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb.set_message("Applying");
        self.bar = Some(pb);
    }

    fn on_resource_complete(&mut self, id: &str, result: &ApplyResult) {
        let Some(pb) = &self.bar else {
            return;
        };
        let symbol = match result {
            ApplyResult::Failed { .. } => result.symbol().red(),
            ApplyResult::Skipped { .. } | ApplyResult::NoChange => result.symbol().dimmed(),
            _ => result.symbol().green(),
        };
        pb.println(format!("  {symbol} {id}"));
        pb.inc(1);
    }

    fn on_batch_complete(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}
