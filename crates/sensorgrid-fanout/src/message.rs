use anyhow::{anyhow, Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use std::io::{Read, Write};
use tracing::debug;

/// Serialized frames above this size are gzip-compressed before they
/// leave the process.
pub const COMPRESSION_THRESHOLD_BYTES: usize = 1024 * 1024;

// Guard against decompression bombs from a misbehaving peer.
const MAX_DECOMPRESSED_SIZE: usize = 64 * 1024 * 1024;

/// Wire discriminator so the receiver knows whether to decompress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEncoding {
    Plain,
    Gzip,
}

impl FrameEncoding {
    pub fn wire_byte(&self) -> u8 {
        match self {
            FrameEncoding::Plain => 0x00,
            FrameEncoding::Gzip => 0x01,
        }
    }

    pub fn from_wire_byte(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(FrameEncoding::Plain),
            0x01 => Ok(FrameEncoding::Gzip),
            other => Err(anyhow!("unknown frame encoding discriminator: {other:#04x}")),
        }
    }
}

/// One outbound live message addressed to a tenant group.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundFrame {
    pub group: String,
    pub encoding: FrameEncoding,
    pub payload: Vec<u8>,
}

impl OutboundFrame {
    /// Serialize a decoded reading for transmission, compressing when the
    /// serialized form exceeds [`COMPRESSION_THRESHOLD_BYTES`].
    pub fn encode(group: &str, value: &Value) -> Result<Self> {
        let serialized = serde_json::to_vec(value).context("failed to serialize frame payload")?;

        if serialized.len() <= COMPRESSION_THRESHOLD_BYTES {
            return Ok(Self {
                group: group.to_string(),
                encoding: FrameEncoding::Plain,
                payload: serialized,
            });
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&serialized)
            .context("failed to compress frame payload")?;
        let compressed = encoder.finish().context("failed to finish compression")?;

        debug!(
            group = %group,
            raw_bytes = serialized.len(),
            compressed_bytes = compressed.len(),
            "compressed oversized frame"
        );

        Ok(Self {
            group: group.to_string(),
            encoding: FrameEncoding::Gzip,
            payload: compressed,
        })
    }

    /// Recover the JSON payload, decompressing when flagged.
    pub fn payload_json(&self) -> Result<Value> {
        let bytes = match self.encoding {
            FrameEncoding::Plain => self.payload.clone(),
            FrameEncoding::Gzip => {
                let mut decoder = GzDecoder::new(&self.payload[..]).take(MAX_DECOMPRESSED_SIZE as u64);
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .context("failed to decompress frame payload")?;
                out
            }
        };
        serde_json::from_slice(&bytes).context("frame payload is not valid JSON")
    }

    /// Flat wire form: one discriminator byte followed by the payload.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut wire = Vec::with_capacity(1 + self.payload.len());
        wire.push(self.encoding.wire_byte());
        wire.extend_from_slice(&self.payload);
        wire
    }

    pub fn from_wire(group: &str, wire: &[u8]) -> Result<Self> {
        let (&discriminator, payload) = wire
            .split_first()
            .ok_or_else(|| anyhow!("empty wire frame"))?;
        Ok(Self {
            group: group.to_string(),
            encoding: FrameEncoding::from_wire_byte(discriminator)?,
            payload: payload.to_vec(),
        })
    }
}
