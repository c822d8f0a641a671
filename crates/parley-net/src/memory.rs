//! In-process transport that records what the connection manager asks of
//! it. Used by tests and by embedders that drive the protocol themselves.

use std::sync::{Arc, Mutex, MutexGuard};

use parley_shared::OutboundEnvelope;

use crate::transport::{ConnectRequest, Transport, TransportError};

#[derive(Debug, Default)]
struct MemoryState {
    opened: Vec<ConnectRequest>,
    sent: Vec<String>,
    closes: usize,
    is_open: bool,
    fail_sends: bool,
}

/// Recording transport. Clones share state, so a caller can keep a handle
/// after moving one clone into a [`ConnectionManager`](crate::ConnectionManager).
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connect request seen, oldest first.
    pub fn opened(&self) -> Vec<ConnectRequest> {
        self.lock().opened.clone()
    }

    pub fn last_request(&self) -> Option<ConnectRequest> {
        self.lock().opened.last().cloned()
    }

    /// Raw frames passed to `send`.
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Sent frames decoded as envelopes; undecodable frames are skipped.
    pub fn sent_envelopes(&self) -> Vec<OutboundEnvelope> {
        self.lock()
            .sent
            .iter()
            .filter_map(|frame| OutboundEnvelope::from_frame(frame).ok())
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_open
    }

    /// Make every following `send` fail as if the socket broke.
    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self, request: ConnectRequest) {
        let mut state = self.lock();
        state.opened.push(request);
        state.is_open = true;
    }

    fn send(&mut self, frame: String) -> Result<(), TransportError> {
        let mut state = self.lock();
        if !state.is_open {
            return Err(TransportError::Closed);
        }
        if state.fail_sends {
            return Err(TransportError::Send("broken pipe".into()));
        }
        state.sent.push(frame);
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.lock();
        state.is_open = false;
        state.closes += 1;
    }
}
