use serde::{Deserialize, Serialize};

/// Languages the groundwater service can answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ta,
    Te,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ta => "ta",
            Language::Te => "te",
        }
    }

    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" => Some(Language::En),
            "ta" => Some(Language::Ta),
            "te" => Some(Language::Te),
            _ => None,
        }
    }

    pub fn all() -> Vec<Language> {
        vec![Language::En, Language::Ta, Language::Te]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ta => "தமிழ்",
            Language::Te => "తెలుగు",
        }
    }
}

/// Mutually exclusive language toggles. Exactly one is active at a time.
#[derive(Debug, Clone, Default)]
pub struct LanguageSelector {
    active: Language,
}

impl LanguageSelector {
    pub fn new(initial: Language) -> Self {
        Self { active: initial }
    }

    /// Activate `language`, deactivating every other toggle.
    pub fn select(&mut self, language: Language) {
        if self.active != language {
            tracing::info!(from = self.active.code(), to = language.code(), "language changed");
        }
        self.active = language;
    }

    pub fn current(&self) -> Language {
        self.active
    }

    pub fn is_active(&self, language: Language) -> bool {
        self.active == language
    }

    /// Toggle states in display order.
    pub fn toggles(&self) -> Vec<(Language, bool)> {
        Language::all()
            .into_iter()
            .map(|lang| (lang, self.is_active(lang)))
            .collect()
    }
}
