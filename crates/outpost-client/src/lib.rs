pub mod config;
pub mod fix_source;
pub mod pipeline;
pub mod transport;

pub use config::ClientConfig;
pub use fix_source::{FixSource, FixSourceError, SerialNmeaSource};
pub use pipeline::Pipeline;
pub use transport::{ClientTransport, SendOutcome};
