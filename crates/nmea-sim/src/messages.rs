//! NMEA 2000 message batches

use nmea_protocol::{
    EncodePgn, HeadingReference, Message, Position, SpeedData, SpeedReference, VesselHeading,
    WaterDepth, WindData, WindReference,
};

/// Supplies the batch of messages the simulator pushes on every tick
pub trait MessageSource: Send + Sync {
    /// Build the next batch, in send order
    fn next_batch(&self) -> Vec<Message>;
}

/// Fixed representative values: heading, speed, depth, position, wind
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedMessages;

impl CannedMessages {
    pub fn heading() -> VesselHeading {
        VesselHeading {
            heading: 0.5,
            reference: HeadingReference::True,
            ..Default::default()
        }
    }

    pub fn speed() -> SpeedData {
        SpeedData {
            speed_water: 2.5,
            speed_ground: 2.7,
            reference: SpeedReference::PaddleWheel,
        }
    }

    pub fn depth() -> WaterDepth {
        WaterDepth {
            depth: 10.5,
            offset: -1.5,
            max_range: 100.0,
        }
    }

    pub fn position() -> Position {
        Position {
            latitude: 48.1964,
            longitude: 16.3637,
        }
    }

    pub fn wind() -> WindData {
        WindData {
            speed: 5.5,
            angle: 2.0,
            reference: WindReference::Apparent,
        }
    }
}

impl MessageSource for CannedMessages {
    fn next_batch(&self) -> Vec<Message> {
        vec![
            Self::heading().to_message(),
            Self::speed().to_message(),
            Self::depth().to_message(),
            Self::position().to_message(),
            Self::wind().to_message(),
        ]
    }
}

impl<F> MessageSource for F
where
    F: Fn() -> Vec<Message> + Send + Sync,
{
    fn next_batch(&self) -> Vec<Message> {
        self()
    }
}
