/// Dependency injection traits for the two external collaborators
///
/// This module provides trait-based abstractions for:
/// - Frame decoding (the binary telemetry codec lives behind this seam)
/// - Chat completion (LLM providers)
///
/// This allows you to easily swap implementations for testing or for using
/// different decoder libraries and LLM providers.
use anyhow::Result;
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::record_store::FieldValue;
use crate::session::ChatTurn;

// ============================================================================
// Frame Decoding Trait
// ============================================================================

/// Stream-level decode failure: the decoder could not construct a frame
/// stream from the input at all.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("log input is empty")]
    EmptyInput,
    #[error("unrecognized log header")]
    BadHeader,
    #[error("malformed log stream: {0}")]
    Malformed(String),
}

/// Failure decoding or classifying one frame. The ingestion pipeline counts
/// these and moves on; they never abort the stream.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct FrameError(pub String);

/// One decoded unit from the raw telemetry stream, before classification.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Message type tag as reported by the decoder, e.g. "GPS".
    pub msg_type: String,
    /// Decoder-side timestamp in seconds, when the decoder has one.
    pub timestamp: Option<f64>,
    pub fields: FxHashMap<String, FieldValue>,
}

/// Finite, consumed-once sequence of decoded frames.
pub type FrameStream = Box<dyn Iterator<Item = Result<RawFrame, FrameError>> + Send>;

/// Trait for turning raw log bytes into a stream of typed frames
///
/// Implementations can wrap:
/// - A binary MAVLink/dataflash decoding library
/// - Self-describing text exports (JSON lines)
/// - Canned in-memory frames for tests
pub trait FrameDecoder: Send + Sync {
    /// Decode raw log bytes into a frame stream.
    ///
    /// Fails when no stream can be constructed at all (empty input, corrupt
    /// header). Per-frame problems are reported through the stream items
    /// instead.
    fn decode(&self, raw: &[u8]) -> Result<FrameStream, DecodeError>;

    /// Get the name/identifier of this decoder (for reporting)
    fn name(&self) -> &str;
}

// ============================================================================
// Chat Completion Trait
// ============================================================================

/// Trait for LLM-backed chat completion
///
/// Implementations can use:
/// - LLM APIs (OpenAI, Anthropic, Ollama, etc.)
/// - Mock/test responders
///
/// A completion call may fail (timeout, quota, network); callers are
/// expected to degrade gracefully rather than propagate the failure.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Request a completion for the accumulated conversation.
    ///
    /// # Arguments
    /// * `system_instruction` - system prompt sent ahead of the turns
    /// * `turns` - full ordered conversation history
    async fn complete(&self, system_instruction: &str, turns: &[ChatTurn]) -> Result<String>;

    /// Get the name/identifier of this service (for reporting)
    fn name(&self) -> &str;
}
