//! Transport layer for the accident-severity prediction service: typed HTTP
//! calls, bearer-token session, and (with `stream`) the live event channel.

mod client;
pub mod config;
mod error;
pub mod session;

#[cfg(feature = "stream")]
mod stream;

pub use client::{DEFAULT_TREND_PERIOD, PredictionClient};
pub use config::ClientConfig;
pub use error::{ClientError, ConfigError, CredentialError, TransportError};
pub use session::{
    CredentialStore, FileCredentials, MemoryCredentials, Session, SessionEvent, TOKEN_KEY,
};

#[cfg(feature = "stream")]
pub use error::StreamError;
#[cfg(feature = "stream")]
pub use stream::PredictionStream;
