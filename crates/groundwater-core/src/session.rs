//! Client session state
//!
//! `ChatSession` owns everything the chat client remembers while it runs: the
//! conversation log, the active language, and the location flow. Front ends
//! feed it user actions and effect completions; it answers with the next
//! `Effect` to run. It never performs I/O itself, which `Services` does.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::{Backend, BackendReply};
use crate::conversation::{Conversation, Sender};
use crate::error::{ClientResult, GeolocationError};
use crate::geolocation::{Coordinates, Geolocator, PositionOptions};
use crate::language::{Language, LanguageSelector};

pub const WELCOME_TEXT: &str = "Hello! Ask me about groundwater level, quality (pH/TDS/COD/BOD), \
or irrigation status, e.g. 'groundwater level in Salem'.";
pub const ERROR_PREFIX: &str = "Error: could not reach the groundwater service. ";
pub const FETCHING_TEXT: &str = "Fetching groundwater data for your location…";

const CONFIRM_PROMPT: &str = "I detected your current location. \
Would you like groundwater information for it? Reply **Yes** or **No**.";
const LOCATION_FAILED: &str = "Unable to retrieve your location";
const LOCATION_DENIED: &str = "Unable to retrieve your location because location access was denied.";
const MANUAL_ENTRY: &str = "Please type a location name instead, e.g. 'groundwater level in Salem'.";
const GEOLOCATION_UNAVAILABLE: &str = "Location detection is not available. \
Please type a location name manually, e.g. 'groundwater level in Salem'.";
const LOCATION_CANCELLED: &str = "Sorry, I won't use your location then. \
Please type the name of the place you are interested in.";

const CONFIRM_WORDS: [&str; 3] = ["yes", "y", "proceed"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationFlow {
    Idle,
    AwaitingGeolocation,
    /// Position found; the next user message answers the confirmation prompt.
    AwaitingConfirmation(Coordinates),
    Resolved,
}

/// Work the front end must run on the session's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    RequestGeolocation(PositionOptions),
    QueryText {
        message: String,
        language: Language,
    },
    QueryLocation {
        coordinates: Coordinates,
        language: Language,
    },
    DownloadReport {
        location: String,
        dir: PathBuf,
    },
}

/// Outcome of a finished `Effect`.
#[derive(Debug)]
pub enum Completion {
    Geolocation(Result<Coordinates, GeolocationError>),
    Reply(ClientResult<BackendReply>),
    ReportSaved {
        location: String,
        result: ClientResult<PathBuf>,
    },
}

pub struct ChatSession {
    conversation: Conversation,
    languages: LanguageSelector,
    location: LocationFlow,
    geolocation_available: bool,
    pending_replies: usize,
}

impl ChatSession {
    pub fn new(language: Language, geolocation_available: bool) -> Self {
        Self {
            conversation: Conversation::new(WELCOME_TEXT),
            languages: LanguageSelector::new(language),
            location: LocationFlow::Idle,
            geolocation_available,
            pending_replies: 0,
        }
    }

    /// Kick off the automatic location flow. Does nothing after the first call.
    pub fn start(&mut self) -> Option<Effect> {
        if self.location != LocationFlow::Idle {
            return None;
        }

        if self.geolocation_available {
            info!("requesting geolocation");
            self.location = LocationFlow::AwaitingGeolocation;
            Some(Effect::RequestGeolocation(PositionOptions::default()))
        } else {
            info!("geolocation unavailable, waiting for manual entry");
            self.location = LocationFlow::Resolved;
            self.conversation.remove_welcome();
            self.conversation.add_bot_message(GEOLOCATION_UNAVAILABLE);
            None
        }
    }

    /// Handle a message typed by the user.
    pub fn submit(&mut self, input: &str) -> Option<Effect> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }

        self.conversation.add_user_message(text);

        if let LocationFlow::AwaitingConfirmation(coordinates) = self.location {
            self.location = LocationFlow::Resolved;

            if is_confirmation(text) {
                info!("location confirmed");
                self.conversation.add_bot_message(FETCHING_TEXT);
                self.pending_replies += 1;
                return Some(Effect::QueryLocation {
                    coordinates,
                    language: self.language(),
                });
            }

            info!("location declined");
            self.conversation.add_bot_message(LOCATION_CANCELLED);
            return None;
        }

        self.pending_replies += 1;
        Some(Effect::QueryText {
            message: text.to_string(),
            language: self.language(),
        })
    }

    /// Ask for the report of `location` to be saved into `dir`.
    pub fn save_report(&self, location: &str, dir: PathBuf) -> Effect {
        Effect::DownloadReport {
            location: location.to_string(),
            dir,
        }
    }

    pub fn complete(&mut self, completion: Completion) {
        match completion {
            Completion::Geolocation(result) => self.on_geolocation(result),
            Completion::Reply(result) => self.on_reply(result),
            Completion::ReportSaved { location, result } => match result {
                Ok(path) => {
                    info!(%location, path = %path.display(), "report saved");
                    self.conversation.add_bot_message(format!(
                        "Report for {} saved to {}",
                        location,
                        path.display()
                    ));
                }
                Err(err) => {
                    warn!(%location, error = %err, "report download failed");
                    self.conversation
                        .add_bot_message(format!("{}{}", ERROR_PREFIX, err));
                }
            },
        }
    }

    fn on_geolocation(&mut self, result: Result<Coordinates, GeolocationError>) {
        if self.location != LocationFlow::AwaitingGeolocation {
            warn!("ignoring geolocation result outside of the location flow");
            return;
        }

        match result {
            Ok(coordinates) => {
                info!(
                    latitude = coordinates.latitude,
                    longitude = coordinates.longitude,
                    "awaiting location confirmation"
                );
                self.location = LocationFlow::AwaitingConfirmation(coordinates);
                self.conversation.remove_welcome();
                self.conversation
                    .add_message(CONFIRM_PROMPT, Sender::Bot, true);
            }
            Err(err) => {
                warn!(error = %err, "geolocation failed");
                self.location = LocationFlow::Resolved;
                let notice = match err {
                    GeolocationError::PermissionDenied => LOCATION_DENIED.to_string(),
                    other => format!("{}: {}.", LOCATION_FAILED, other),
                };
                self.conversation.add_bot_message(notice);
                self.conversation.add_bot_message(MANUAL_ENTRY);
            }
        }
    }

    fn on_reply(&mut self, result: ClientResult<BackendReply>) {
        self.pending_replies = self.pending_replies.saturating_sub(1);

        match result {
            Ok(reply) => {
                self.conversation.add_bot_message(reply.reply_text);
                if let Some(location) = reply.location {
                    self.conversation.add_report_link(location);
                }
            }
            Err(err) => {
                warn!(error = %err, "query failed");
                self.conversation
                    .add_bot_message(format!("{}{}", ERROR_PREFIX, err));
            }
        }
    }

    /// Add a local notice from the front end
    pub fn notify(&mut self, text: impl Into<String>) {
        self.conversation.add_bot_message(text);
    }

    pub fn select_language(&mut self, language: Language) {
        self.languages.select(language);
    }

    pub fn language(&self) -> Language {
        self.languages.current()
    }

    pub fn languages(&self) -> &LanguageSelector {
        &self.languages
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    pub fn location_flow(&self) -> LocationFlow {
        self.location
    }

    pub fn awaiting_location_confirmation(&self) -> bool {
        matches!(self.location, LocationFlow::AwaitingConfirmation(_))
    }

    pub fn detecting_location(&self) -> bool {
        self.location == LocationFlow::AwaitingGeolocation
    }

    /// Queries sent but not yet answered
    pub fn pending_replies(&self) -> usize {
        self.pending_replies
    }
}

fn is_confirmation(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    CONFIRM_WORDS.contains(&answer.as_str())
}

/// Runs effects against the backend and the position source.
#[derive(Clone)]
pub struct Services {
    backend: Arc<dyn Backend>,
    geolocator: Option<Arc<dyn Geolocator>>,
}

impl Services {
    pub fn new(backend: Arc<dyn Backend>, geolocator: Option<Arc<dyn Geolocator>>) -> Self {
        Self { backend, geolocator }
    }

    pub fn has_geolocation(&self) -> bool {
        self.geolocator.is_some()
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub async fn perform(&self, effect: Effect) -> Completion {
        match effect {
            Effect::RequestGeolocation(options) => {
                let result = match &self.geolocator {
                    Some(locator) => locator.current_position(options).await,
                    None => Err(GeolocationError::PositionUnavailable(
                        "no position source configured".to_string(),
                    )),
                };
                Completion::Geolocation(result)
            }
            Effect::QueryText { message, language } => {
                Completion::Reply(self.backend.query(&message, language).await)
            }
            Effect::QueryLocation {
                coordinates,
                language,
            } => Completion::Reply(
                self.backend
                    .query_by_location(coordinates.latitude, coordinates.longitude, language)
                    .await,
            ),
            Effect::DownloadReport { location, dir } => {
                let result = self.backend.download_report(&location, &dir).await;
                Completion::ReportSaved { location, result }
            }
        }
    }
}
