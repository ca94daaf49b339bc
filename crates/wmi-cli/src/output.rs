//! Terminal output: page snapshots, banner messages, push state

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use licorn_wmi_client::{MutationReply, Notice, PushState};
use std::time::Duration;

/// Writes what a watched page shows
#[derive(Debug)]
pub struct Printer {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl Printer {
    /// Create a printer writing to stdout
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Show a spinner with the push state on stderr
    pub fn start_spinner(&mut self) {
        if self.quiet || !Term::stderr().is_term() {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner.set_message(PushState::SettingUp.to_string());
        self.spinner = Some(spinner);
    }

    /// Stop the spinner
    pub fn finish(&self) {
        if let Some(ref spinner) = self.spinner {
            spinner.finish_and_clear();
        }
    }

    fn line(&self, text: &str) {
        match self.spinner {
            Some(ref spinner) => spinner.suspend(|| {
                let _ = self.term.write_line(text);
            }),
            None => {
                let _ = self.term.write_line(text);
            }
        }
    }

    /// Push state changed
    pub fn state(&self, state: PushState) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(state.to_string());
        }
    }

    /// A banner message appeared
    pub fn notice(&self, notice: &Notice) {
        if self.quiet {
            return;
        }
        self.line(&format_notice(notice, self.use_color));
    }

    /// Banner messages with a class were withdrawn
    pub fn withdrawn(&self, css_class: &str) {
        if self.quiet {
            return;
        }
        self.line(&format!("-- {css_class}"));
    }

    /// Print the page projection
    pub fn snapshot(&self, text: &str) {
        if self.quiet {
            return;
        }
        let header = if self.use_color {
            style("── page ──").cyan().bold().to_string()
        } else {
            "-- page --".to_string()
        };
        self.line(&header);
        self.line(text.trim_end());
    }

    /// Print the reply to a mutation. Fragments and JSON documents are
    /// printed as-is, the banner text is printed decoded.
    pub fn reply(&self, reply: &MutationReply) {
        match reply {
            MutationReply::Empty => {}
            MutationReply::Notification(text) => self.line(text),
            MutationReply::Fragment(html) => self.line(html.trim_end()),
            MutationReply::Json { value, notif } => {
                if let Some(text) = notif {
                    self.line(&format_notice(&Notice::new(text.clone()), self.use_color));
                }
                self.line(&value.to_string());
            }
        }
    }
}

/// One banner message as a terminal line
#[must_use]
pub fn format_notice(notice: &Notice, use_color: bool) -> String {
    let prefix = if use_color {
        style("●").yellow().bold().to_string()
    } else {
        "NOTICE".to_string()
    };
    format!("{prefix} {}", notice.message)
}
