//! Constants shared by the client and server CoAP transports. Message
//! framing itself is `coap-lite`'s job; this module only holds the pieces
//! that are Outpost-specific rather than CoAP-generic.

use std::time::Duration;

/// The only resource this protocol exposes.
pub const POSITION_PATH: &str = "position";

/// CoAP's own default `ACK_TIMEOUT`, reused as the client's first retry
/// delay (RFC 7252 §4.8).
pub const ACK_TIMEOUT: Duration = Duration::from_secs(2);

/// `ACK_RANDOM_FACTOR` upper bound from the same section; the client jitters
/// each retry delay by a random amount up to this factor.
pub const ACK_RANDOM_FACTOR: f64 = 1.5;

/// `MAX_RETRANSMIT` from the same section: a CONFIRMABLE request is retried
/// this many times before the exchange is abandoned.
pub const MAX_RETRANSMIT: u32 = 4;
