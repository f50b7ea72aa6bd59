//! Outbound message envelope
//!
//! Mirrors the `std_msgs/Float64MultiArray` layout: an (empty) dimension
//! list, a data offset and a flat data vector.

use serde::{Deserialize, Serialize};

use super::ChannelMode;
use crate::control::VelocityCommand;

/// One dimension of a multi-array layout
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MultiArrayDimension {
    pub label: String,
    pub size: u32,
    pub stride: u32,
}

/// Layout header of a multi-array message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MultiArrayLayout {
    pub dim: Vec<MultiArrayDimension>,
    pub data_offset: u32,
}

/// Generic float64 multi-dimensional array payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Float64MultiArray {
    pub layout: MultiArrayLayout,
    pub data: Vec<f64>,
}

impl Float64MultiArray {
    /// Single-value payload with an empty layout
    pub fn scalar(value: f64) -> Self {
        Self {
            layout: MultiArrayLayout::default(),
            data: vec![value],
        }
    }

    /// One-dimensional labelled vector
    pub fn vector(label: impl Into<String>, data: Vec<f64>) -> Self {
        let size = data.len() as u32;
        Self {
            layout: MultiArrayLayout {
                dim: vec![MultiArrayDimension {
                    label: label.into(),
                    size,
                    stride: size,
                }],
                data_offset: 0,
            },
            data,
        }
    }
}

/// Linear and angular channels built for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityEnvelope {
    pub linear: Float64MultiArray,
    pub angular: Float64MultiArray,
}

impl VelocityEnvelope {
    pub fn new(command: VelocityCommand) -> Self {
        Self {
            linear: Float64MultiArray::scalar(command.linear_speed),
            angular: Float64MultiArray::scalar(command.angular_speed),
        }
    }

    /// The single payload handed to the sink for this tick
    pub fn into_payload(self, mode: ChannelMode) -> Float64MultiArray {
        match mode {
            ChannelMode::Linear => self.linear,
            ChannelMode::Combined => {
                let mut data = self.linear.data;
                data.extend(self.angular.data);
                Float64MultiArray::vector(COMBINED_LABEL, data)
            }
        }
    }
}

/// Dimension label used for the combined `[linear, angular]` payload
pub const COMBINED_LABEL: &str = "linear_angular";
