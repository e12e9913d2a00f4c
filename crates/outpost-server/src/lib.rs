pub mod config;
pub mod fix_sink;
pub mod pipeline;
pub mod transport;

pub use config::ServerConfig;
pub use fix_sink::{FixSink, InMemorySink, LoggingSink, SinkError};
pub use pipeline::handle_request;
pub use transport::ServerTransport;
