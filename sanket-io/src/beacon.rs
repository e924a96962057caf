//! Beacon reading types shared by the scanner, the broker and the fusion side.

use serde::{Deserialize, Serialize};

/// Single iBeacon advertisement as reported by the scan driver.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BeaconReading {
    /// Proximity UUID (upper-case, hyphenated)
    pub uuid: String,
    pub major: u16,
    pub minor: u16,
    /// Received signal strength (dBm)
    pub rssi: i16,
    /// Distance estimate from the driver (meters), if it reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f32>,
}

impl BeaconReading {
    /// Create a reading without a distance estimate.
    pub fn new(uuid: impl Into<String>, major: u16, minor: u16, rssi: i16) -> Self {
        Self {
            uuid: uuid.into(),
            major,
            minor,
            rssi,
            accuracy: None,
        }
    }
}

/// One scanner callback worth of readings.
///
/// Batches are forwarded untouched: the fusion pipeline on the web side owns
/// all filtering and weighting.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct BeaconBatch {
    /// Milliseconds since the UNIX epoch when the batch was collected
    pub timestamp: u64,
    pub beacons: Vec<BeaconReading>,
}

impl BeaconBatch {
    pub fn new(timestamp: u64, beacons: Vec<BeaconReading>) -> Self {
        Self { timestamp, beacons }
    }

    pub fn len(&self) -> usize {
        self.beacons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beacons.is_empty()
    }

    /// Reading with the highest RSSI.
    pub fn strongest(&self) -> Option<&BeaconReading> {
        self.beacons.iter().max_by_key(|b| b.rssi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strongest_reading() {
        let batch = BeaconBatch::new(
            1,
            vec![
                BeaconReading::new("A", 1, 1, -80),
                BeaconReading::new("A", 1, 2, -62),
                BeaconReading::new("A", 1, 3, -71),
            ],
        );
        assert_eq!(batch.strongest().map(|b| b.minor), Some(2));
        assert!(BeaconBatch::default().strongest().is_none());
    }

    #[test]
    fn test_accuracy_omitted_when_absent() {
        let json = serde_json::to_string(&BeaconReading::new("A", 1, 2, -60)).unwrap();
        assert!(!json.contains("accuracy"));
    }
}
