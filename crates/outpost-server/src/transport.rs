//! Server side of the CoAP-style exchange: a UDP receive loop that parses
//! each datagram as a CoAP request, routes `POST /position` into the
//! payload pipeline, and frames the piggybacked response.

use std::net::SocketAddr;
use std::sync::Arc;

use coap_lite::{CoapRequest, Packet, RequestType as Method, ResponseType};
use outpost_core::coap::POSITION_PATH;
use outpost_core::Key;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;

use crate::fix_sink::FixSink;
use crate::pipeline::handle_request;

pub struct ServerTransport<S> {
    socket: Arc<UdpSocket>,
    key: Key,
    sink: Arc<S>,
    shutdown: broadcast::Receiver<()>,
}

impl<S: FixSink + 'static> ServerTransport<S> {
    pub async fn bind(
        addr: &str,
        key: Key,
        sink: Arc<S>,
        shutdown: broadcast::Receiver<()>,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self { socket: Arc::new(socket), key, sink, shutdown })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub async fn run(mut self) {
        let mut buf = vec![0u8; 2048];
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("server transport shutting down");
                    return;
                }
                result = self.socket.recv_from(&mut buf) => {
                    let (len, peer) = match result {
                        Ok(r) => r,
                        Err(e) => {
                            tracing::warn!(error = %e, "recv_from failed");
                            continue;
                        }
                    };
                    self.handle_datagram(&buf[..len], peer).await;
                }
            }
        }
    }

    async fn handle_datagram(&self, data: &[u8], peer: SocketAddr) {
        let packet = match Packet::from_bytes(data) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = ?e, %peer, "failed to parse CoAP packet, ignoring");
                return;
            }
        };
        let mut request: CoapRequest<SocketAddr> = CoapRequest::from_packet(packet, peer);

        let status = if request.get_method() != &Method::Post || request.get_path() != POSITION_PATH {
            ResponseType::MethodNotAllowed
        } else {
            let code = handle_request(&request.message.payload, &self.key, self.sink.as_ref()).await;
            code_to_status(code)
        };

        let Some(mut response) = request.response.take() else {
            tracing::trace!(%peer, "non-confirmable request, no response expected");
            return;
        };
        response.set_status(status);

        match response.message.to_bytes() {
            Ok(bytes) => {
                if let Err(e) = self.socket.send_to(&bytes, peer).await {
                    tracing::warn!(error = %e, %peer, "failed to send response");
                }
            }
            Err(e) => tracing::warn!(error = ?e, %peer, "failed to encode response"),
        }
    }
}

fn code_to_status(code: &str) -> ResponseType {
    match code {
        "2.04" => ResponseType::Changed,
        "4.01" => ResponseType::Unauthorized,
        "5.00" => ResponseType::InternalServerError,
        _ => ResponseType::InternalServerError,
    }
}
