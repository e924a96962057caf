//! Wire framing for beacon batches on the broker
//!
//! Every batch travels as one length-prefixed JSON frame:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4 bytes) │ JSON BeaconBatch         │
//! │ Big-endian u32   │ (variable)               │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! - **Maximum payload**: 1MB (1,048,576 bytes)
//! - **Malformed frame**: reported as an error; callers log and drop it,
//!   the channel stays open

use crate::beacon::BeaconBatch;
use crate::error::{Error, Result};

/// Maximum payload size accepted on either side
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

const LENGTH_PREFIX: usize = 4;

/// Encode a batch into a length-prefixed frame.
pub fn encode_batch(batch: &BeaconBatch) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(batch)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(LENGTH_PREFIX + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode a frame produced by [`encode_batch`].
pub fn decode_batch(frame: &[u8]) -> Result<BeaconBatch> {
    if frame.len() < LENGTH_PREFIX {
        return Err(Error::InvalidFrame(format!(
            "{} bytes is shorter than the length prefix",
            frame.len()
        )));
    }

    let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLarge {
            len,
            max: MAX_FRAME_SIZE,
        });
    }

    let payload = &frame[LENGTH_PREFIX..];
    if payload.len() < len {
        return Err(Error::InvalidFrame(format!(
            "expected {} payload bytes, got {}",
            len,
            payload.len()
        )));
    }

    Ok(serde_json::from_slice(&payload[..len])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::BeaconReading;

    #[test]
    fn test_frame_layout() {
        let batch = BeaconBatch::new(42, vec![BeaconReading::new("U", 10, 3, -70)]);
        let frame = encode_batch(&batch).unwrap();

        let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(len, frame.len() - 4);
        assert_eq!(decode_batch(&frame).unwrap(), batch);
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let batch = BeaconBatch::new(42, vec![BeaconReading::new("U", 10, 3, -70)]);
        let frame = encode_batch(&batch).unwrap();

        assert!(matches!(decode_batch(&frame[..2]), Err(Error::InvalidFrame(_))));
        assert!(matches!(
            decode_batch(&frame[..frame.len() - 1]),
            Err(Error::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_oversized_prefix_rejected() {
        let mut frame = ((MAX_FRAME_SIZE + 1) as u32).to_be_bytes().to_vec();
        frame.extend_from_slice(b"{}");
        assert!(matches!(decode_batch(&frame), Err(Error::FrameTooLarge { .. })));
    }

    #[test]
    fn test_garbage_payload_is_serialization_error() {
        let mut frame = 3u32.to_be_bytes().to_vec();
        frame.extend_from_slice(b"nop");
        assert!(matches!(decode_batch(&frame), Err(Error::Serialization(_))));
    }
}
