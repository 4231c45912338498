use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use paceline_fetch::{FetchPhase, Progress};

const PB_STYLE: &str = "{spinner:.blue} {prefix:>15.cyan.bold} [{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}";

const SPINNER_STYLE: &str = "{spinner:.blue} {prefix:>15.cyan.bold} [{elapsed_precise}] {bytes} {msg}";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    ProgressStyle::with_template(PB_STYLE)
        .ok()
        .map(|style| style.tick_chars(TICK).progress_chars(PB_CHARS))
});

static SPINNER_TEMPLATE: Lazy<Option<ProgressStyle>> =
    Lazy::new(|| ProgressStyle::with_template(SPINNER_STYLE).ok().map(|style| style.tick_chars(TICK)));

/// Progress bar fed from transfer snapshots.
///
/// Starts as a spinner; switches to a bar once the body length is known.
#[derive(Clone)]
pub struct ProgressTracker {
    pb: ProgressBar,
}

impl Default for ProgressTracker {
    fn default() -> Self { Self::new() }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let pb = ProgressBar::new_spinner();
        if let Some(style) = SPINNER_TEMPLATE.as_ref() {
            pb.set_style(style.clone());
        }
        pb.set_prefix(FetchPhase::Connecting.as_str());
        Self { pb }
    }

    pub fn update(&self, progress: &Progress) {
        self.pb.set_prefix(progress.phase.as_str());
        match progress.phase {
            FetchPhase::Connecting | FetchPhase::HeaderReceived => self.pb.tick(),
            FetchPhase::Redirecting => {
                if let Some(ref target) = progress.redirect_target {
                    self.pb.set_message(target.to_string());
                }
            }
            FetchPhase::Downloading | FetchPhase::Finished => {
                if let Some(length) = progress.content_length
                    && self.pb.length() != Some(length)
                {
                    self.pb.set_length(length);
                    if let Some(style) = PB_TEMPLATE.as_ref() {
                        self.pb.set_style(style.clone());
                    }
                }
                self.pb.set_position(progress.bytes_transferred);
                self.pb.set_message(format!(
                    "{} {}",
                    progress.percent_string(),
                    progress.speed_string()
                ));
            }
        }
    }

    pub fn finish(&self) { self.pb.finish(); }

    pub fn abandon(&self, reason: &str) { self.pb.abandon_with_message(reason.to_string()); }
}
