//! In-process hardware link
//!
//! Stands in for the relay when exercising the engine: whatever is injected
//! is delivered to the currently open session, exactly as if it had arrived
//! over the wire.

use anyhow::{bail, Result};
use cst_core::ingress::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
struct OpenSession {
    scope: IngressScope,
    tx: mpsc::UnboundedSender<IngressEvent>,
}

pub struct LoopbackLink {
    session: watch::Sender<Option<OpenSession>>,
    opened: AtomicUsize,
    available: AtomicBool,
}

impl LoopbackLink {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            session,
            opened: AtomicUsize::new(0),
            available: AtomicBool::new(true),
        }
    }

    /// Deliver an event to the open session. False if nothing is listening.
    pub fn inject(&self, event: IngressEvent) -> bool {
        match self.session.borrow().as_ref() {
            Some(session) => session.tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Scope of the session that is currently open and still held
    pub fn open_scope(&self) -> Option<IngressScope> {
        self.session
            .borrow()
            .as_ref()
            .filter(|s| !s.tx.is_closed())
            .map(|s| s.scope)
    }

    /// How many sessions have been opened so far
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// When unavailable, `open` fails as a missing serial port would
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl Default for LoopbackLink {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareLink for LoopbackLink {
    fn name(&self) -> &str {
        "loopback"
    }

    fn open(&self, scope: IngressScope) -> Result<IngressSubscription> {
        if !self.available.load(Ordering::SeqCst) {
            bail!("loopback link is unavailable");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.session.send_replace(Some(OpenSession { scope, tx }));
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(IngressSubscription::new(rx, CancellationToken::new()))
    }
}
