use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::record_store::FieldValue;
use crate::traits::{DecodeError, FrameDecoder, FrameError, FrameStream, RawFrame};

/// Decoder for JSON-lines telemetry exports.
///
/// Accepts the shape produced by pymavlink-style log dumps: one JSON object
/// per line, the message tag under `mavpackettype`, an optional numeric
/// `timestamp`, and the remaining scalar entries as frame fields.
///
/// Binary dataflash/MAVLink logs are handled by wrapping a dedicated
/// decoding library in another [`FrameDecoder`]; this crate does not carry
/// its own binary codec.
pub struct JsonLinesDecoder;

impl JsonLinesDecoder {
    pub fn new() -> Self {
        Self
    }

    fn decode_line(line: &str) -> Result<RawFrame, FrameError> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| FrameError(format!("invalid JSON frame: {}", e)))?;

        let obj = value
            .as_object()
            .ok_or_else(|| FrameError("frame is not a JSON object".to_string()))?;

        let msg_type = obj
            .get("mavpackettype")
            .and_then(Value::as_str)
            .ok_or_else(|| FrameError("frame is missing mavpackettype".to_string()))?
            .to_string();

        let timestamp = obj.get("timestamp").and_then(Value::as_f64);

        let mut fields = FxHashMap::default();
        for (name, value) in obj {
            if name.as_str() == "mavpackettype" || name.as_str() == "timestamp" {
                continue;
            }
            // Non-scalar values (arrays, nested objects) are dropped; the
            // record model only carries scalars.
            match value {
                Value::Number(n) => {
                    if let Some(v) = n.as_f64() {
                        fields.insert(name.clone(), FieldValue::Number(v));
                    }
                }
                Value::String(s) => {
                    fields.insert(name.clone(), FieldValue::Text(s.clone()));
                }
                Value::Bool(b) => {
                    fields.insert(
                        name.clone(),
                        FieldValue::Number(if *b { 1.0 } else { 0.0 }),
                    );
                }
                _ => {}
            }
        }

        Ok(RawFrame {
            msg_type,
            timestamp,
            fields,
        })
    }
}

impl Default for JsonLinesDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder for JsonLinesDecoder {
    fn decode(&self, raw: &[u8]) -> Result<FrameStream, DecodeError> {
        if raw.is_empty() {
            return Err(DecodeError::EmptyInput);
        }

        let text = std::str::from_utf8(raw)
            .map_err(|e| DecodeError::Malformed(format!("not valid UTF-8: {}", e)))?;

        let lines: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        if lines.is_empty() {
            return Err(DecodeError::EmptyInput);
        }

        Ok(Box::new(lines.into_iter().map(|l| Self::decode_line(&l))))
    }

    fn name(&self) -> &str {
        "json-lines"
    }
}

/// In-memory decoder for testing: replays canned frames regardless of input,
/// or fails the decode outright.
pub struct StaticFrameDecoder {
    frames: Vec<Result<RawFrame, FrameError>>,
    fail_decode: bool,
}

impl StaticFrameDecoder {
    pub fn new(frames: Vec<Result<RawFrame, FrameError>>) -> Self {
        Self {
            frames,
            fail_decode: false,
        }
    }

    /// Decoder whose `decode` always fails with a bad-header error.
    pub fn failing() -> Self {
        Self {
            frames: Vec::new(),
            fail_decode: true,
        }
    }
}

impl FrameDecoder for StaticFrameDecoder {
    fn decode(&self, raw: &[u8]) -> Result<FrameStream, DecodeError> {
        if self.fail_decode {
            return Err(DecodeError::BadHeader);
        }
        if raw.is_empty() {
            return Err(DecodeError::EmptyInput);
        }
        Ok(Box::new(self.frames.clone().into_iter()))
    }

    fn name(&self) -> &str {
        "static"
    }
}
