// link.rs

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU8, Ordering},
        Mutex,
    },
    time::{Duration, Instant},
};

use anyhow::bail;
use log::*;

use crate::Inbound;

pub const INBOX_DEPTH: usize = 8;
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

const CONNECTING: u8 = 0;
const CONNECTED: u8 = 1;
const DISCONNECTED: u8 = 2;

/// Client events as delivered by the MQTT stack's own task.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
    Received(Inbound),
    Error(String),
}

/// Session status and received messages, written from the client callback
/// and read by the collector loops.
pub struct Link {
    status: AtomicU8,
    since: Instant,
    inbox: Mutex<VecDeque<Inbound>>,
}

impl Link {
    pub fn idle() -> Self {
        Link {
            status: AtomicU8::new(DISCONNECTED),
            since: Instant::now(),
            inbox: Mutex::new(VecDeque::new()),
        }
    }

    pub fn connecting(since: Instant) -> Self {
        Link {
            status: AtomicU8::new(CONNECTING),
            since,
            inbox: Mutex::new(VecDeque::new()),
        }
    }

    pub fn on_event(&self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => {
                info!("MQTT session established.");
                self.status.store(CONNECTED, Ordering::Relaxed);
            }
            LinkEvent::Disconnected => {
                error!("MQTT connection closed.");
                self.status.store(DISCONNECTED, Ordering::Relaxed);
            }
            LinkEvent::Received(msg) => {
                let Ok(mut inbox) = self.inbox.lock() else {
                    return;
                };
                if inbox.len() >= INBOX_DEPTH {
                    warn!("MQTT inbox full, dropping oldest message");
                    inbox.pop_front();
                }
                inbox.push_back(msg);
            }
            LinkEvent::Error(e) => error!("MQTT error: {e}"),
        }
    }

    /// Ok while connected, or while still connecting within the timeout.
    pub fn check(&self, now: Instant) -> anyhow::Result<()> {
        match self.status.load(Ordering::Relaxed) {
            DISCONNECTED => bail!("MQTT not connected"),
            CONNECTING if now.duration_since(self.since) > CONNECT_TIMEOUT => {
                bail!("MQTT connect timed out")
            }
            _ => Ok(()),
        }
    }

    pub fn next_message(&self, now: Instant) -> anyhow::Result<Option<Inbound>> {
        self.check(now)?;
        match self.inbox.lock() {
            Ok(mut inbox) => Ok(inbox.pop_front()),
            Err(_) => bail!("MQTT inbox poisoned"),
        }
    }
}


// EOF
