pub mod cipher;
pub mod coap;
pub mod codec;
pub mod config;
pub mod fix;

pub use cipher::{Key, CipherError, KeyError};
pub use codec::CodecError;
pub use fix::{Fix, MAX_BATCH_SAMPLES};
