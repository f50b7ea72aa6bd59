//! Console sink - logs every publish for testing and debugging

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use super::envelope::Float64MultiArray;
use super::PublishSink;

/// ConsoleSink logs all publishes to console/logs
///
/// This is useful for:
/// - Driving the joystick without a robot attached
/// - Checking the published rate and decay curve
/// - Debugging topic selection
pub struct ConsoleSink {
    name: String,
    /// Publish counter for debugging
    publish_count: AtomicU64,
    /// Currently advertised topic
    advertised: RwLock<Option<String>>,
}

impl ConsoleSink {
    /// Create a new ConsoleSink with a given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            publish_count: AtomicU64::new(0),
            advertised: RwLock::new(None),
        }
    }

    pub fn publish_count(&self) -> u64 {
        self.publish_count.load(Ordering::Relaxed)
    }

    pub fn advertised(&self) -> Option<String> {
        self.advertised.read().clone()
    }
}

impl PublishSink for ConsoleSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&self, topic: &str, payload: &Float64MultiArray) {
        let count = self.publish_count.fetch_add(1, Ordering::Relaxed) + 1;

        let values = payload
            .data
            .iter()
            .map(|v| format!("{:+.4}", v))
            .collect::<Vec<_>>()
            .join(", ");

        info!(
            "🕹️  [{}] {} → {} [{}] [pub #{}]",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            self.name,
            topic,
            values,
            count
        );
    }

    fn advertise(&self, topic: &str, schema_name: &str) {
        info!("📣 {} advertising {} ({})", self.name, topic, schema_name);
        *self.advertised.write() = Some(topic.to_string());
    }

    fn unadvertise(&self, topic: &str) {
        debug!("{} unadvertising {}", self.name, topic);
        let mut advertised = self.advertised.write();
        if advertised.as_deref() == Some(topic) {
            *advertised = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_sink_counts_publishes() {
        let sink = ConsoleSink::new("test");
        assert_eq!(sink.name(), "test");
        assert_eq!(sink.publish_count(), 0);

        for i in 0..5 {
            sink.publish("/cmd_vel", &Float64MultiArray::scalar(i as f64 * 0.1));
        }

        assert_eq!(sink.publish_count(), 5);
    }

    #[test]
    fn test_console_sink_tracks_advertisement() {
        let sink = ConsoleSink::new("test");

        sink.advertise("/a", "std_msgs/Float64MultiArray");
        assert_eq!(sink.advertised().as_deref(), Some("/a"));

        // Unadvertising another topic leaves the current one alone
        sink.unadvertise("/b");
        assert_eq!(sink.advertised().as_deref(), Some("/a"));

        sink.unadvertise("/a");
        assert!(sink.advertised().is_none());
    }
}
