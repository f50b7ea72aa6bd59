//! Publishing side of the control loop
//!
//! The adapter builds one payload per tick and hands it to a [`PublishSink`].
//! Sinks are fire-and-forget: no acknowledgment, no retries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod adapter;
pub mod broadcast;
pub mod console;
pub mod envelope;

pub use adapter::{
    is_recognized_schema, Delivery, PublishError, PublisherAdapter, RECOGNIZED_SCHEMAS,
    VEL_CMD_SCHEMA_ROS_1, VEL_CMD_SCHEMA_ROS_2,
};
pub use broadcast::{BroadcastSink, PublishedMessage};
pub use console::ConsoleSink;
pub use envelope::{Float64MultiArray, MultiArrayDimension, MultiArrayLayout, VelocityEnvelope};

/// Which channel(s) of the envelope go out on each tick
///
/// `Linear` sends only the linear channel. `Combined` packs
/// `[linear, angular]` into one payload. Both make exactly one publish call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    #[default]
    Linear,
    Combined,
}

/// Destination for published payloads
///
/// Note: all methods take &self so sinks can be shared as `Arc<dyn PublishSink>`.
/// Implementations use interior mutability for their own state.
pub trait PublishSink: Send + Sync {
    /// Sink name for logs
    fn name(&self) -> &str;

    /// Deliver one payload to `topic`
    fn publish(&self, topic: &str, payload: &Float64MultiArray);

    /// Announce that `topic` will be published with `schema_name`
    ///
    /// Default implementation: no-op (sink has no advertisement concept)
    fn advertise(&self, _topic: &str, _schema_name: &str) {}

    /// Withdraw a previous advertisement
    fn unadvertise(&self, _topic: &str) {}
}

/// Forwards every call to each inner sink in order
pub struct FanoutSink {
    sinks: Vec<Arc<dyn PublishSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn PublishSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl PublishSink for FanoutSink {
    fn name(&self) -> &str {
        "fanout"
    }

    fn publish(&self, topic: &str, payload: &Float64MultiArray) {
        for sink in &self.sinks {
            sink.publish(topic, payload);
        }
    }

    fn advertise(&self, topic: &str, schema_name: &str) {
        for sink in &self.sinks {
            sink.advertise(topic, schema_name);
        }
    }

    fn unadvertise(&self, topic: &str) {
        for sink in &self.sinks {
            sink.unadvertise(topic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_mode_serde() {
        let mode: ChannelMode = serde_yaml::from_str("combined").unwrap();
        assert_eq!(mode, ChannelMode::Combined);
        assert_eq!(serde_yaml::to_string(&ChannelMode::Linear).unwrap().trim(), "linear");
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let first = Arc::new(BroadcastSink::new(8));
        let second = Arc::new(BroadcastSink::new(8));
        let mut rx1 = first.subscribe();
        let mut rx2 = second.subscribe();

        let fanout = FanoutSink::new(vec![first.clone(), second.clone()]);
        assert_eq!(fanout.len(), 2);

        fanout.publish("/cmd_vel", &Float64MultiArray::scalar(0.4));

        assert_eq!(rx1.try_recv().unwrap().payload.data, vec![0.4]);
        assert_eq!(rx2.try_recv().unwrap().topic, "/cmd_vel");
    }
}
