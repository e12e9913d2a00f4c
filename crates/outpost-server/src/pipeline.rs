//! Decrypt → decode → reconstruct → hand-to-sink, the core of what happens
//! once a POST to `/position` has already been confirmed well-formed CoAP.
//! Method/path routing lives in [`crate::transport`]; this module only
//! covers the part that's specific to the Outpost payload itself.

use outpost_core::{cipher, codec, Key};

use crate::fix_sink::FixSink;

/// Processes one decrypted-and-decoded-or-not request payload, returning the
/// CoAP response code that should be sent back. Decode failures are
/// deliberately reported the same as authentication failures: a client
/// with the wrong key and a client sending malformed batches look identical
/// to an observer, and neither should learn anything more specific from the
/// wire.
pub async fn handle_request<S: FixSink>(payload: &[u8], key: &Key, sink: &S) -> &'static str {
    let plaintext = match cipher::open(key, payload) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "envelope open failed");
            return "4.01";
        }
    };

    let fixes = match codec::decode(&plaintext) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(error = %e, "decode failed, reporting as unauthorized");
            return "4.01";
        }
    };

    match sink.append(fixes).await {
        Ok(()) => "2.04",
        Err(e) => {
            tracing::warn!(error = %e, "sink append failed");
            "5.00"
        }
    }
}
