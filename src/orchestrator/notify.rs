// Sun Feb 22 2026 - Alex

use crate::mapper::MapperMetadata;
use crate::property::PropertySnapshot;
use anyhow::Result;
use log::{info, warn};
use std::sync::mpsc::Sender;

/// Observer of an instance. Calls are best effort: a failing sink is logged and
/// never interrupts polling.
pub trait NotificationSink: Send + Sync {
    fn on_properties_changed(&self, changed: &[PropertySnapshot]) -> Result<()>;

    fn on_session_reset(&self) -> Result<()>;

    fn on_mapper_loaded(&self, metadata: &MapperMetadata) -> Result<()>;

    fn on_error(&self, problem: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

impl NotificationSink for LoggingSink {
    fn on_properties_changed(&self, changed: &[PropertySnapshot]) -> Result<()> {
        for snapshot in changed {
            info!("{} = {} [{}]", snapshot.path, snapshot.value, snapshot.changed.join(","));
        }
        Ok(())
    }

    fn on_session_reset(&self) -> Result<()> {
        info!("Session reset");
        Ok(())
    }

    fn on_mapper_loaded(&self, metadata: &MapperMetadata) -> Result<()> {
        info!("Mapper loaded: {} ({})", metadata.game_name, metadata.game_platform);
        Ok(())
    }

    fn on_error(&self, problem: &str) -> Result<()> {
        warn!("{}", problem);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    PropertiesChanged(Vec<PropertySnapshot>),
    SessionReset,
    MapperLoaded(MapperMetadata),
    Error(String),
}

/// Forwards notifications over a channel, for consumers living on another thread.
pub struct ChannelSink {
    sender: Sender<Notification>,
}

impl ChannelSink {
    pub fn new(sender: Sender<Notification>) -> Self {
        Self { sender }
    }

    fn send(&self, notification: Notification) -> Result<()> {
        self.sender
            .send(notification)
            .map_err(|_| anyhow::anyhow!("notification receiver dropped"))
    }
}

impl NotificationSink for ChannelSink {
    fn on_properties_changed(&self, changed: &[PropertySnapshot]) -> Result<()> {
        self.send(Notification::PropertiesChanged(changed.to_vec()))
    }

    fn on_session_reset(&self) -> Result<()> {
        self.send(Notification::SessionReset)
    }

    fn on_mapper_loaded(&self, metadata: &MapperMetadata) -> Result<()> {
        self.send(Notification::MapperLoaded(metadata.clone()))
    }

    fn on_error(&self, problem: &str) -> Result<()> {
        self.send(Notification::Error(problem.to_string()))
    }
}
