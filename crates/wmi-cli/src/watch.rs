//! `watch` and `mutate` commands
//!
//! The watch loop is the page's event loop: it owns the [`PageContext`],
//! runs the call batches the push task hands over, and fires page timers
//! in between.

use crate::commands::{MutateArgs, WatchArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Printer;
use licorn_wmi_client::{
    default_registry, CallRegistry, HttpTransport, MutationReply, PageContext, PushClient,
    PendingCall, PushEvent, PushState, PushSwitch, Transport,
};
use std::time::Instant;
use tokio::sync::mpsc;

/// What the watch loop saw before stopping
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchSummary {
    /// Call batches run
    pub batches: usize,
    /// Calls that failed
    pub failed_calls: usize,
}

/// Page and registry driven by the watch loop
pub struct Watcher {
    page: PageContext,
    registry: CallRegistry<PageContext>,
    switch: PushSwitch,
    search: Option<String>,
    followed: Option<String>,
    navigating: bool,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("collection", &self.page.collection())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Page for `args`, controlling the push channel through `switch`
    pub fn new(config: &CliConfig, args: &WatchArgs, switch: PushSwitch) -> CliResult<Self> {
        let columns: Vec<&str> = args.search_columns.iter().map(String::as_str).collect();
        let sort_column = args
            .sort_column
            .as_deref()
            .or_else(|| columns.first().copied())
            .unwrap_or("login");
        let page = PageContext::new(config.wmi.clone(), &args.collection, Instant::now())
            .with_main_list(&columns, Some((sort_column, args.sort_direction)));
        Ok(Self {
            page,
            registry: default_registry()?,
            switch,
            search: args.search.clone(),
            followed: None,
            navigating: false,
        })
    }

    /// The watched page
    #[must_use]
    pub const fn page(&self) -> &PageContext {
        &self.page
    }

    /// Run one batch of calls and return how many failed
    pub fn run_batch(&mut self, calls: &[PendingCall]) -> usize {
        let report = self
            .registry
            .dispatch(&mut self.page, calls, self.switch.is_active());
        if let Some(location) = self.page.location().map(String::from) {
            if self.followed.as_deref() != Some(location.as_str()) {
                self.switch.navigate(&location);
                self.navigating = true;
                self.followed = Some(location);
            }
        }
        if let Some(term) = self.search.clone() {
            let collection = self.page.collection().to_string();
            if let Err(err) = self.page.search_now(&collection, &term) {
                tracing::warn!(error = %err, "search failed");
            }
        }
        report.failed.len()
    }

    /// The push channel changed state. The page comes back to life once the
    /// channel polls again for the new location.
    pub fn on_state(&mut self, state: PushState) {
        if self.navigating && state == PushState::Polling {
            self.navigating = false;
            self.switch.activate();
        }
    }

    /// Fire timers due at `now`
    pub fn tick(&mut self, now: Instant) -> usize {
        let fired = self.page.advance_to(now);
        for request in self.page.take_outbox() {
            tracing::debug!(path = %request.path(), "page request not sent while watching");
        }
        fired
    }
}

/// Follow the push channel until interrupted or `--max-batches` is reached
pub async fn run_watch(config: &CliConfig, args: &WatchArgs, printer: &mut Printer) -> CliResult<WatchSummary> {
    let transport = HttpTransport::new(config.wmi.base_url.clone())?;
    let client = PushClient::new(transport, &config.wmi, &args.location());
    let mut watcher = Watcher::new(config, args, client.switch())?;
    let (tx, mut rx) = mpsc::channel(32);
    let push = tokio::spawn(client.run(tx));

    tracing::info!(base_url = %config.wmi.base_url, location = %args.location(), "watching");
    printer.start_spinner();
    let mut summary = WatchSummary::default();

    loop {
        if args.max_batches.is_some_and(|max| summary.batches >= max) {
            break;
        }
        let deadline = watcher.page().next_deadline();
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    PushEvent::Calls { calls, done } => {
                        summary.failed_calls += watcher.run_batch(&calls);
                        summary.batches += 1;
                        let _ = done.send(());
                        printer.snapshot(&watcher.page().dom().render_text());
                    }
                    PushEvent::Notice(notice) => printer.notice(&notice),
                    PushEvent::Withdraw(class) => printer.withdrawn(&class),
                    PushEvent::State(state) => {
                        tracing::info!(%state, "push channel");
                        watcher.on_state(state);
                        printer.state(state);
                    }
                }
            }
            () = sleep_until(deadline) => {
                if watcher.tick(Instant::now()) > 0 {
                    printer.snapshot(&watcher.page().dom().render_text());
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    printer.finish();
    push.abort();
    Ok(summary)
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Send one mutation request and print the decoded reply
pub async fn run_mutate(config: &CliConfig, args: &MutateArgs, printer: &Printer) -> CliResult<MutationReply> {
    if !args.path.starts_with('/') {
        return Err(CliError::invalid_argument("path must start with /"));
    }
    let transport = HttpTransport::new(config.wmi.base_url.clone())?;
    let reply = transport.get(&args.path).await?.error_for_status(&args.path)?;
    let reply = MutationReply::parse(&reply.body);
    printer.reply(&reply);
    Ok(reply)
}
