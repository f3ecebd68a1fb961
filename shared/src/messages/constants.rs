// Packet size thresholds

/// Unreliable packets larger than this risk IP fragmentation on common paths;
/// anything bigger should travel on a reliable channel.
pub const UNRELIABLE_PACKET_LIMIT_BYTES: usize = 400;

/// Largest opaque payload a single per-id record may carry (u16 length prefix)
pub const RECORD_PAYLOAD_LIMIT_BYTES: usize = u16::MAX as usize;
