pub mod backend;
pub mod config;
pub mod conversation;
pub mod error;
pub mod geolocation;
pub mod language;
pub mod session;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use backend::{Backend, BackendReply, HttpBackend};
pub use config::{Config, LocationMode};
pub use conversation::{Conversation, DisplayLine, LogEntry, Message, ReportLink, Segment, Sender};
pub use error::{ClientError, ClientResult, GeolocationError};
pub use geolocation::{Coordinates, Geolocator, PositionOptions};
pub use language::{Language, LanguageSelector};
pub use session::{ChatSession, Completion, Effect, LocationFlow, Services};

pub use reqwest::Url;
