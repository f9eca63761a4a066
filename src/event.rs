use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, MouseEvent};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::service::{DirectoryListing, ServiceError};
use crate::tree::NodeId;

/// Outcome of a document service call, delivered back to the UI task.
#[derive(Debug)]
pub enum ServiceEvent {
    Listed {
        node: NodeId,
        result: std::result::Result<DirectoryListing, ServiceError>,
    },
    Deleted {
        stager: NodeId,
        target: NodeId,
        result: std::result::Result<(), ServiceError>,
    },
    UploadProgress {
        node: NodeId,
        loaded: u64,
        total: u64,
    },
    Uploaded {
        node: NodeId,
        result: std::result::Result<(), ServiceError>,
    },
    FolderCreated {
        node: NodeId,
        name: String,
        result: std::result::Result<(), ServiceError>,
    },
}

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// A key press event.
    Key(KeyEvent),
    /// A mouse event.
    Mouse(MouseEvent),
    /// A periodic tick for rendering.
    Tick,
    /// Terminal resize event.
    Resize(u16, u16),
    /// A document service call finished or reported progress.
    Service(ServiceEvent),
}

/// Async event handler that polls crossterm events and forwards them via a channel.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new EventHandler with the given tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::spawn(async move {
            loop {
                if event::poll(tick_rate).unwrap_or(false) {
                    let forwarded = match event::read() {
                        Ok(CrosstermEvent::Key(key)) => event_tx.send(Event::Key(key)),
                        Ok(CrosstermEvent::Mouse(mouse)) => event_tx.send(Event::Mouse(mouse)),
                        Ok(CrosstermEvent::Resize(w, h)) => event_tx.send(Event::Resize(w, h)),
                        _ => Ok(()),
                    };
                    if forwarded.is_err() {
                        break;
                    }
                } else if event_tx.send(Event::Tick).is_err() {
                    break;
                }
            }
        });

        Self { rx, tx }
    }

    /// Get a sender clone for service tasks to report back on.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Receive the next event (blocks until available).
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| crate::error::AppError::Terminal("Event channel closed".into()))
    }
}
