//! The client side of the CoAP-style exchange: builds a CONFIRMABLE POST to
//! `/position`, sends it over a UDP socket, and retries with exponential
//! backoff until a response arrives or the retry budget is exhausted.
//!
//! Message *framing* comes from `coap-lite`; the retry/backoff state
//! machine itself is hand-written.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use coap_lite::{CoapRequest, MessageType, RequestType as Method};
use outpost_core::coap::{ACK_RANDOM_FACTOR, ACK_TIMEOUT, MAX_RETRANSMIT, POSITION_PATH};
use outpost_core::{cipher, codec, Fix, Key};
use rand::Rng;
use tokio::net::UdpSocket;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Accepted,
    Unauthorized,
    Failed,
}

/// Anything the pipeline can hand a batch to for delivery. Generalizing
/// over this trait (rather than calling [`ClientTransport`] directly) lets
/// the pipeline's own tests substitute a canned responder.
pub trait BatchSender: Clone + Send + 'static {
    async fn send_batch(&self, batch: Vec<Fix>) -> SendOutcome;
}

#[derive(Clone)]
pub struct ClientTransport {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
    key: Key,
}

impl ClientTransport {
    pub async fn connect(target: SocketAddr, key: Key) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self { socket: Arc::new(socket), target, key })
    }

    async fn confirmable_post(&self, payload: &[u8]) -> SendOutcome {
        let mut rng = rand::thread_rng();
        let message_id: u16 = rng.gen();
        let mut token = vec![0u8; 4];
        rng.fill(token.as_mut_slice());

        let mut request: CoapRequest<SocketAddr> = CoapRequest::new();
        request.set_method(Method::Post);
        request.set_path(POSITION_PATH);
        request.message.header.set_type(MessageType::Confirmable);
        request.message.header.message_id = message_id;
        request.message.set_token(token);
        request.message.payload = payload.to_vec();

        let bytes = match request.message.to_bytes() {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = ?e, "failed to encode CoAP request");
                return SendOutcome::Failed;
            }
        };

        let mut delay = ACK_TIMEOUT;
        let mut recv_buf = vec![0u8; 2048];

        for attempt in 0..=MAX_RETRANSMIT {
            if let Err(e) = self.socket.send_to(&bytes, self.target).await {
                tracing::warn!(error = %e, attempt, "send_to failed");
                return SendOutcome::Failed;
            }

            match tokio::time::timeout(delay, self.socket.recv_from(&mut recv_buf)).await {
                Ok(Ok((n, _src))) => match coap_lite::Packet::from_bytes(&recv_buf[..n]) {
                    Ok(packet) if packet.header.message_id == message_id => {
                        return outcome_for_code(&packet.header.get_code());
                    }
                    _ => continue,
                },
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "recv_from failed");
                    return SendOutcome::Failed;
                }
                Err(_elapsed) => {
                    let jitter = 1.0 + rng.gen::<f64>() * (ACK_RANDOM_FACTOR - 1.0);
                    delay = Duration::from_secs_f64((delay.as_secs_f64() * 2.0 * jitter).min(60.0));
                    continue;
                }
            }
        }

        tracing::warn!("exhausted retransmits without a response, treating as transport timeout");
        SendOutcome::Failed
    }
}

impl BatchSender for ClientTransport {
    async fn send_batch(&self, batch: Vec<Fix>) -> SendOutcome {
        let plaintext = match codec::encode(&batch) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode batch, dropping");
                return SendOutcome::Failed;
            }
        };
        let envelope = cipher::seal(&self.key, &plaintext);
        self.confirmable_post(&envelope).await
    }
}

fn outcome_for_code(code: &str) -> SendOutcome {
    match code {
        "2.04" => SendOutcome::Accepted,
        "4.01" => SendOutcome::Unauthorized,
        _ => SendOutcome::Failed,
    }
}
