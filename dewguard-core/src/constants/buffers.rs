//! History and Streaming Sizes
//!
//! The history is the largest allocation on the device, so its size is
//! chosen against the free heap on an ESP32-S2/S3 with WiFi running.

/// Default history capacity (entries).
///
/// With 6 channels an entry is 40 bytes, so 300 entries stay around 12KB.
pub const DEFAULT_HISTORY_SIZE: usize = 300;

/// Upper bound on the serialized size of one history entry (bytes).
///
/// Used only to estimate the document size for transports that want a
/// length hint up front.
pub const HISTORY_ENTRY_JSON_SIZE: usize = 256;

/// Initial capacity reserved for the overflow region of a streaming sink.
///
/// One entry rarely exceeds this, so a typical export never reallocates.
pub const OVERFLOW_INITIAL_CAPACITY: usize = 512;
