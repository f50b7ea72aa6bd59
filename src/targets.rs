//! Publish target registry
//!
//! Holds the known topics (filtered to recognized schemas) and the currently
//! selected target. The publisher only reads the active target.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::publish::{is_recognized_schema, PublishSink};

/// Topic the velocity command is published to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishTarget {
    pub name: String,
    pub schema_name: String,
}

impl PublishTarget {
    pub fn new(name: impl Into<String>, schema_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_name: schema_name.into(),
        }
    }
}

/// Read access to the currently selected target
pub trait TargetRegistry: Send + Sync {
    fn active_target(&self) -> Option<PublishTarget>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("topic '{0}' does not exist")]
    UnknownTopic(String),
}

/// In-memory registry of known topics and the active target
///
/// Selecting a different target unadvertises the previous one on the sink
/// and advertises the new one.
pub struct TopicRegistry {
    topics: RwLock<Vec<PublishTarget>>,
    active: RwLock<Option<PublishTarget>>,
    sink: Option<Arc<dyn PublishSink>>,
}

impl TopicRegistry {
    pub fn new(sink: Option<Arc<dyn PublishSink>>) -> Self {
        Self {
            topics: RwLock::new(Vec::new()),
            active: RwLock::new(None),
            sink,
        }
    }

    /// Replace the known topic list, keeping only recognized schemas
    pub fn set_topics(&self, topics: Vec<PublishTarget>) {
        let total = topics.len();
        let usable: Vec<PublishTarget> = topics
            .into_iter()
            .filter(|t| is_recognized_schema(&t.schema_name))
            .collect();

        debug!("Topic list updated: {} of {} usable", usable.len(), total);
        *self.topics.write() = usable;
    }

    pub fn topics(&self) -> Vec<PublishTarget> {
        self.topics.read().clone()
    }

    /// Select a known topic by name; its schema becomes the target schema
    pub fn select(&self, name: &str) -> Result<PublishTarget, TargetError> {
        let target = self
            .topics
            .read()
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| TargetError::UnknownTopic(name.to_string()))?;

        self.set_active(Some(target.clone()));
        Ok(target)
    }

    /// Set the active target directly (e.g. restored from saved config)
    ///
    /// The target does not need to be in the known topic list.
    pub fn set_active(&self, target: Option<PublishTarget>) {
        let mut active = self.active.write();
        if *active == target {
            return;
        }

        if let Some(sink) = &self.sink {
            if let Some(previous) = active.as_ref() {
                sink.unadvertise(&previous.name);
            }
            if let Some(next) = target.as_ref() {
                sink.advertise(&next.name, &next.schema_name);
            }
        }

        match &target {
            Some(t) => info!("Publish target: {} ({})", t.name, t.schema_name),
            None => info!("Publish target cleared"),
        }
        *active = target;
    }

    /// Withdraw the active target, unadvertising it
    pub fn clear(&self) {
        self.set_active(None);
    }
}

impl TargetRegistry for TopicRegistry {
    fn active_target(&self) -> Option<PublishTarget> {
        self.active.read().clone()
    }
}
