//! Publisher adapter
//!
//! Turns a velocity command into one outbound payload and hands it to the
//! publish sink, gated on the active target's schema.

use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use super::envelope::VelocityEnvelope;
use super::{ChannelMode, PublishSink};
use crate::control::VelocityCommand;
use crate::targets::TargetRegistry;

/// ROS 1 spelling of the accepted message type
pub const VEL_CMD_SCHEMA_ROS_1: &str = "std_msgs/Float64MultiArray";

/// ROS 2 spelling of the accepted message type
pub const VEL_CMD_SCHEMA_ROS_2: &str = "std_msgs/msg/Float64MultiArray";

/// Schema names the adapter can publish to (exact match only)
pub const RECOGNIZED_SCHEMAS: [&str; 2] = [VEL_CMD_SCHEMA_ROS_1, VEL_CMD_SCHEMA_ROS_2];

/// Whether a schema name is one of the recognized spellings
pub fn is_recognized_schema(schema_name: &str) -> bool {
    RECOGNIZED_SCHEMAS.contains(&schema_name)
}

/// Reasons a tick's publish was skipped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("unknown message schema '{0}'")]
    UnrecognizedSchema(String),
    #[error("no active publish target")]
    NoActiveTarget,
}

/// What happened to a successful publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the sink
    Sent,
    /// No sink attached, dropped silently
    NoSink,
}

/// Builds envelopes and forwards them to the sink
#[derive(Clone)]
pub struct PublisherAdapter {
    registry: Arc<dyn TargetRegistry>,
    sink: Option<Arc<dyn PublishSink>>,
    mode: ChannelMode,
}

impl PublisherAdapter {
    pub fn new(
        registry: Arc<dyn TargetRegistry>,
        sink: Option<Arc<dyn PublishSink>>,
        mode: ChannelMode,
    ) -> Self {
        Self {
            registry,
            sink,
            mode,
        }
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ChannelMode) {
        self.mode = mode;
    }

    /// Publish one command to the active target
    ///
    /// Exactly one sink call on success, none on error.
    pub fn publish(&self, command: VelocityCommand) -> Result<Delivery, PublishError> {
        let target = self
            .registry
            .active_target()
            .ok_or(PublishError::NoActiveTarget)?;

        if !is_recognized_schema(&target.schema_name) {
            return Err(PublishError::UnrecognizedSchema(target.schema_name));
        }

        let payload = VelocityEnvelope::new(command).into_payload(self.mode);

        match &self.sink {
            Some(sink) => {
                trace!(topic = %target.name, ?payload.data, "Publishing velocity command");
                sink.publish(&target.name, &payload);
                Ok(Delivery::Sent)
            }
            None => Ok(Delivery::NoSink),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::envelope::Float64MultiArray;
    use crate::targets::{PublishTarget, TopicRegistry};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        published: Mutex<Vec<(String, Float64MultiArray)>>,
    }

    impl PublishSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn publish(&self, topic: &str, payload: &Float64MultiArray) {
            self.published.lock().push((topic.to_string(), payload.clone()));
        }
    }

    fn adapter_with(
        target: Option<PublishTarget>,
        mode: ChannelMode,
    ) -> (PublisherAdapter, Arc<RecordingSink>) {
        let registry = Arc::new(TopicRegistry::new(None));
        registry.set_active(target);
        let sink = Arc::new(RecordingSink::default());
        let adapter = PublisherAdapter::new(registry, Some(sink.clone()), mode);
        (adapter, sink)
    }

    fn command() -> VelocityCommand {
        VelocityCommand {
            linear_speed: 1.0,
            angular_speed: 0.3,
        }
    }

    #[test]
    fn test_recognized_schemas() {
        assert!(is_recognized_schema("std_msgs/Float64MultiArray"));
        assert!(is_recognized_schema("std_msgs/msg/Float64MultiArray"));
        assert!(!is_recognized_schema("geometry_msgs/Twist"));
        assert!(!is_recognized_schema("std_msgs/Float64MultiArray2"));
        assert!(!is_recognized_schema(""));
    }

    #[test]
    fn test_publishes_linear_channel_to_target() {
        let target = PublishTarget::new("/cmd_vel", VEL_CMD_SCHEMA_ROS_2);
        let (adapter, sink) = adapter_with(Some(target), ChannelMode::Linear);

        assert_eq!(adapter.publish(command()), Ok(Delivery::Sent));

        let published = sink.published.lock();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "/cmd_vel");
        assert_eq!(published[0].1.data, vec![1.0]);
    }

    #[test]
    fn test_ros1_schema_accepted() {
        let target = PublishTarget::new("/cmd_vel", VEL_CMD_SCHEMA_ROS_1);
        let (adapter, sink) = adapter_with(Some(target), ChannelMode::Linear);

        assert!(adapter.publish(command()).is_ok());
        assert_eq!(sink.published.lock().len(), 1);
    }

    #[test]
    fn test_unrecognized_schema_skips_publish() {
        let target = PublishTarget::new("/cmd_vel", "geometry_msgs/Twist");
        let (adapter, sink) = adapter_with(Some(target), ChannelMode::Linear);

        assert_eq!(
            adapter.publish(command()),
            Err(PublishError::UnrecognizedSchema("geometry_msgs/Twist".to_string()))
        );
        assert!(sink.published.lock().is_empty());
    }

    #[test]
    fn test_no_target_skips_publish() {
        let (adapter, sink) = adapter_with(None, ChannelMode::Linear);

        assert_eq!(adapter.publish(command()), Err(PublishError::NoActiveTarget));
        assert!(sink.published.lock().is_empty());
    }

    #[test]
    fn test_missing_sink_is_silent() {
        let registry = Arc::new(TopicRegistry::new(None));
        registry.set_active(Some(PublishTarget::new("/cmd_vel", VEL_CMD_SCHEMA_ROS_1)));
        let adapter = PublisherAdapter::new(registry, None, ChannelMode::Linear);

        assert_eq!(adapter.publish(command()), Ok(Delivery::NoSink));
    }

    #[test]
    fn test_combined_mode_single_publish() {
        let target = PublishTarget::new("/cmd_vel", VEL_CMD_SCHEMA_ROS_1);
        let (adapter, sink) = adapter_with(Some(target), ChannelMode::Combined);

        adapter.publish(command()).unwrap();

        let published = sink.published.lock();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1.data, vec![1.0, 0.3]);
    }
}
