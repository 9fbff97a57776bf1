use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use converter_core::{update, AppState, AppViewModel, ClientId, JobState, Msg, Notice};
use converter_engine::{ConverterApi, HostBridge};
use converter_logging::{conv_debug, conv_info};
use tokio::sync::mpsc;

use crate::effects::{EffectRunner, Inbound};
use crate::render;

/// How a session loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// No job is running and no effect is outstanding.
    Settled,
    /// The user quit; pollers were cancelled.
    Interrupted,
}

/// Drives the job store: applies messages, runs effects, prints changes.
pub struct Session {
    state: AppState,
    bridge: Arc<HostBridge>,
    runner: EffectRunner,
    inbox: mpsc::UnboundedReceiver<Inbound>,
    pending_effects: usize,
    live: bool,
    printed: HashMap<ClientId, (JobState, u8)>,
    last_notice: Option<Notice>,
}

impl Session {
    /// With `live` set, row changes are printed as they happen.
    pub fn new(bridge: Arc<HostBridge>, live: bool) -> Self {
        let (tx, inbox) = mpsc::unbounded_channel();
        let api: Arc<dyn ConverterApi> = bridge.clone();
        Self {
            state: AppState::new(),
            runner: EffectRunner::new(api, tx),
            bridge,
            inbox,
            pending_effects: 0,
            live,
            printed: HashMap::new(),
            last_notice: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        if self.state.consume_dirty() {
            self.report_changes();
        }
        self.pending_effects += self.runner.enqueue(effects);
    }

    fn is_settled(&self) -> bool {
        self.pending_effects == 0 && !self.state.has_active_jobs()
    }

    /// Processes messages until the session settles or `quit` resolves.
    pub async fn run_until_settled<Q>(&mut self, quit: Q) -> SessionEnd
    where
        Q: Future<Output = ()>,
    {
        tokio::pin!(quit);
        while !self.is_settled() {
            tokio::select! {
                inbound = self.inbox.recv() => match inbound {
                    Some(inbound) => self.receive(inbound),
                    None => break,
                },
                _ = &mut quit => {
                    let cancelled = self.bridge.shutdown();
                    conv_info!("Quit requested; cancelled {} poller(s)", cancelled);
                    return SessionEnd::Interrupted;
                }
            }
        }
        conv_debug!("Session settled with {} job(s)", self.view().job_count);
        SessionEnd::Settled
    }

    fn receive(&mut self, inbound: Inbound) {
        let msg = match inbound {
            Inbound::EffectFinished(msg) => {
                self.pending_effects = self.pending_effects.saturating_sub(1);
                msg
            }
            Inbound::HostEvent(msg) => msg,
        };
        self.dispatch(msg);
    }

    fn report_changes(&mut self) {
        let view = self.state.view();
        if view.notice != self.last_notice {
            if let Some(notice) = &view.notice {
                println!("{}", render::notice_line(notice));
            }
            self.last_notice = view.notice.clone();
        }
        if !self.live {
            return;
        }
        // Rows that were already terminal when first seen (the snapshot) stay quiet.
        for row in &view.jobs {
            let current = (row.state, row.progress);
            let previous = self.printed.get(&row.client_id);
            if previous.is_none() && row.state.is_terminal() {
                continue;
            }
            if previous != Some(&current) {
                self.printed.insert(row.client_id, current);
                println!("{}", render::row_line(row));
            }
        }
    }
}
