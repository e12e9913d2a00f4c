//! End-to-end scenarios for the Outpost wire protocol: codec/cipher
//! properties exercised together, a full client/server round trip over a
//! real loopback UDP socket, and the client pipeline's duplicate-filter and
//! drop-on-failure behaviour.
//!
//! All scenarios that need a key use the all-zero 32-byte PSK for
//! determinism, since nonces are otherwise random.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use outpost_client::fix_source::{FixSource, FixSourceError};
use outpost_client::transport::{BatchSender, SendOutcome};
use outpost_client::{ClientTransport, Pipeline};
use outpost_core::{cipher, codec, Fix, Key, MAX_BATCH_SAMPLES};
use outpost_server::{InMemorySink, ServerTransport};

const ZERO_KEY: [u8; cipher::KEY_LEN] = [0u8; cipher::KEY_LEN];

fn zero_key() -> Key {
    Key::from_bytes(ZERO_KEY)
}

// ── Scenario 1: single-sample batch ─────────────────────────────────────────

#[test]
fn single_sample_batch_is_16_bytes_plaintext_and_44_byte_envelope() {
    let fix = Fix::new(1_700_000_000, 45.0, -120.0, 500.0, 0.0);
    let plaintext = codec::encode(std::slice::from_ref(&fix)).unwrap();
    assert_eq!(plaintext.len(), 16);

    let envelope = cipher::seal(&zero_key(), &plaintext);
    assert_eq!(envelope.len(), 44);

    let opened = cipher::open(&zero_key(), &envelope).unwrap();
    let decoded = codec::decode(&opened).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0], fix);
}

// ── Scenario 2: two-sample delta ────────────────────────────────────────────

#[test]
fn two_sample_batch_decodes_exact_deltas() {
    let reference = Fix::new(1_700_000_000, 45.0, -120.0, 500.0, 0.0);
    let second = Fix::new(1_700_000_002, 45.0001, -119.9999, 501.0, 12.3);

    let plaintext = codec::encode(&[reference, second]).unwrap();
    assert_eq!(plaintext.len(), 25);

    let decoded = codec::decode(&plaintext).unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[0], reference);

    let got = &decoded[1];
    assert_eq!(got.timestamp, 1_700_000_002);
    assert!((got.latitude - 45.0001).abs() < 1e-9);
    assert!((got.longitude - (-119.9999)).abs() < 1e-9);
    assert_eq!(got.altitude_m, 501.0);
    assert!((got.speed_kmh - 12.3).abs() < 1e-9);
}

// ── Scenario 3: full 40-sample batch ────────────────────────────────────────

#[test]
fn full_batch_round_trips_modulo_quantization() {
    let fixes: Vec<Fix> = (0..MAX_BATCH_SAMPLES as u32)
        .map(|i| Fix::new(1_700_000_000 + i, 45.0 + i as f64 * 0.0001, -120.0 - i as f64 * 0.0001, 500.0, 10.0))
        .collect();

    let plaintext = codec::encode(&fixes).unwrap();
    assert_eq!(plaintext.len(), 16 + 9 * (MAX_BATCH_SAMPLES - 1));

    let envelope = cipher::seal(&zero_key(), &plaintext);
    assert_eq!(envelope.len(), 16 + 9 * (MAX_BATCH_SAMPLES - 1) + cipher::ENVELOPE_OVERHEAD);
    assert_eq!(envelope.len(), 395);

    let opened = cipher::open(&zero_key(), &envelope).unwrap();
    let decoded = codec::decode(&opened).unwrap();
    assert_eq!(decoded.len(), MAX_BATCH_SAMPLES);
    for (original, round_tripped) in fixes.iter().zip(decoded.iter()) {
        assert_eq!(original.timestamp, round_tripped.timestamp);
        assert!((original.latitude - round_tripped.latitude).abs() < 1e-4);
        assert!((original.longitude - round_tripped.longitude).abs() < 1e-4);
        assert_eq!(original.altitude_m, round_tripped.altitude_m);
        assert!((original.speed_kmh - round_tripped.speed_kmh).abs() < 1e-6);
    }
}

// ── Scenario 5: auth failure never reaches the sink ─────────────────────────

#[tokio::test]
async fn tampered_envelope_is_rejected_before_the_sink_sees_it() {
    let sink = InMemorySink::new();
    let plaintext = codec::encode(&[Fix::new(1, 1.0, 2.0, 3.0, 4.0)]).unwrap();
    let mut envelope = cipher::seal(&zero_key(), &plaintext);
    let last = envelope.len() - 1;
    envelope[last] ^= 1;

    let code = outpost_server::handle_request(&envelope, &zero_key(), &sink).await;

    assert_eq!(code, "4.01");
    assert!(sink.batches().await.is_empty());
}

// ── Full wire round trip over real loopback UDP ─────────────────────────────

#[tokio::test]
async fn client_and_server_round_trip_a_batch_over_udp() {
    let sink = Arc::new(InMemorySink::new());
    let (_shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let bind_addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    let server = ServerTransport::bind(&bind_addr.to_string(), zero_key(), sink.clone(), shutdown_rx)
        .await
        .unwrap();
    let server_addr = server.local_addr().unwrap();
    tokio::spawn(server.run());

    let client = ClientTransport::connect(server_addr, zero_key()).await.unwrap();
    let batch = vec![Fix::new(1_700_000_000, 10.0, 20.0, 30.0, 40.0), Fix::new(1_700_000_005, 10.0001, 20.0001, 31.0, 41.0)];

    let outcome = client.send_batch(batch.clone()).await;
    assert_eq!(outcome, SendOutcome::Accepted);

    let batches = sink.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[0][0].timestamp, batch[0].timestamp);
}

#[tokio::test]
async fn server_rejects_wrong_key_over_udp() {
    let sink = Arc::new(InMemorySink::new());
    let (_shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let bind_addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    let server = ServerTransport::bind(&bind_addr.to_string(), zero_key(), sink.clone(), shutdown_rx)
        .await
        .unwrap();
    let server_addr = server.local_addr().unwrap();
    tokio::spawn(server.run());

    let other_key = Key::from_bytes([9u8; cipher::KEY_LEN]);
    let client = ClientTransport::connect(server_addr, other_key).await.unwrap();
    let outcome = client.send_batch(vec![Fix::new(1, 0.0, 0.0, 0.0, 0.0)]).await;

    assert_eq!(outcome, SendOutcome::Unauthorized);
    assert!(sink.batches().await.is_empty());
}

// ── Scenario 4: duplicate filtering ─────────────────────────────────────────

#[derive(Clone, Default)]
struct RecordingSender {
    sent: Arc<Mutex<Vec<usize>>>,
}

impl BatchSender for RecordingSender {
    async fn send_batch(&self, batch: Vec<Fix>) -> SendOutcome {
        self.sent.lock().unwrap().push(batch.len());
        SendOutcome::Accepted
    }
}

struct VecSource(std::collections::VecDeque<Fix>);

impl FixSource for VecSource {
    async fn next_fix(&mut self) -> Result<Option<Fix>, FixSourceError> {
        match self.0.pop_front() {
            Some(fix) => Ok(Some(fix)),
            None => Err(FixSourceError::Exhausted),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn three_identical_fixes_collapse_to_one_accepted_sample() {
    let sender = RecordingSender::default();
    let fixes = vec![
        Fix::new(0, 10.0, 20.0, 0.0, 0.0),
        Fix::new(1, 10.0, 20.0, 0.0, 0.0),
        Fix::new(2, 10.0, 20.0, 0.0, 0.0),
    ];
    let source = VecSource(fixes.into_iter().collect());
    let pipeline = Pipeline::new(source, sender.clone(), 0.0001, Duration::from_millis(50));

    tokio::time::timeout(Duration::from_secs(1), pipeline.run()).await.ok();

    let sent = sender.sent.lock().unwrap();
    assert_eq!(*sent, vec![1]);
}

// ── Scenario 6: send failure drops the buffer, next fix starts fresh ───────

#[derive(Clone, Default)]
struct FailingSender {
    sent: Arc<Mutex<Vec<usize>>>,
}

impl BatchSender for FailingSender {
    async fn send_batch(&self, batch: Vec<Fix>) -> SendOutcome {
        self.sent.lock().unwrap().push(batch.len());
        SendOutcome::Failed
    }
}

struct ChannelSource(tokio::sync::mpsc::UnboundedReceiver<Fix>);

impl FixSource for ChannelSource {
    async fn next_fix(&mut self) -> Result<Option<Fix>, FixSourceError> {
        match self.0.recv().await {
            Some(fix) => Ok(Some(fix)),
            None => Err(FixSourceError::Exhausted),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn transport_failure_drops_buffer_and_next_fix_starts_a_fresh_one() {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let sender = FailingSender::default();
    let source = ChannelSource(rx);
    let pipeline = Pipeline::new(source, sender.clone(), 0.0, Duration::from_millis(100));

    let handle = tokio::spawn(pipeline.run());

    for i in 0..5u32 {
        tx.send(Fix::new(i, i as f64, 0.0, 0.0, 0.0)).unwrap();
        tokio::task::yield_now().await;
    }

    tokio::time::sleep(Duration::from_millis(150)).await;
    tokio::task::yield_now().await;

    tx.send(Fix::new(100, 100.0, 0.0, 0.0, 0.0)).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    drop(tx);

    tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();

    let sent = sender.sent.lock().unwrap();
    assert_eq!(*sent, vec![5, 1]);
}
