//! Localized message bundles for API error texts.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::language::{DEFAULT_LANGUAGE, Language, SUPPORTED_LANGUAGES};

pub const APOD_TITLE: &str = "apod_title";
pub const APOD_NOT_FOUND: &str = "apod_not_found";
pub const SEARCH_NO_RESULTS: &str = "search_no_results";

const BUILTIN: &[(&str, &[(&str, &str)])] = &[
    (
        "en",
        &[
            (APOD_TITLE, "Astronomy Picture of the Day"),
            (
                APOD_NOT_FOUND,
                "Document not found! Please check the date format (YYYY-MM-DD).",
            ),
            (
                SEARCH_NO_RESULTS,
                "No documents found matching the search criteria",
            ),
        ],
    ),
    (
        "pt-BR",
        &[
            (APOD_TITLE, "Imagem Astronômica do Dia"),
            (
                APOD_NOT_FOUND,
                "Documento não encontrado! Por favor verifique o formato da data (AAAA-MM-DD).",
            ),
            (
                SEARCH_NO_RESULTS,
                "Nenhum documento encontrado para os critérios de busca",
            ),
        ],
    ),
    (
        "es",
        &[
            (APOD_TITLE, "Imagen Astronómica del Día"),
            (
                APOD_NOT_FOUND,
                "¡Documento no encontrado! Por favor verifique el formato de la fecha (AAAA-MM-DD).",
            ),
            (
                SEARCH_NO_RESULTS,
                "No se encontraron documentos que coincidan con los criterios de búsqueda",
            ),
        ],
    ),
    (
        "fr",
        &[
            (APOD_TITLE, "Image Astronomique du Jour"),
            (
                APOD_NOT_FOUND,
                "Document non trouvé! Veuillez vérifier le format de la date (AAAA-MM-JJ).",
            ),
            (
                SEARCH_NO_RESULTS,
                "Aucun document trouvé correspondant aux critères de recherche",
            ),
        ],
    ),
];

/// A message file entry, either `"id": "text"` or `"id": {"other": "text"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageEntry {
    Plain(String),
    Plural { other: String },
}

impl MessageEntry {
    fn into_text(self) -> String {
        match self {
            Self::Plain(text) | Self::Plural { other: text } => text,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LocaleError {
    #[error("Failed to read locale file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid locale file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Message bundles keyed by language code, then message id.
#[derive(Debug, Clone)]
pub struct Locales {
    bundles: HashMap<String, HashMap<String, String>>,
}

impl Default for Locales {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Locales {
    pub fn builtin() -> Self {
        let bundles = BUILTIN
            .iter()
            .map(|(lang, messages)| {
                let messages = messages
                    .iter()
                    .map(|(id, text)| ((*id).to_string(), (*text).to_string()))
                    .collect();
                ((*lang).to_string(), messages)
            })
            .collect();
        Self { bundles }
    }

    /// Built-in bundles overlaid with any `<lang>.json` found in `dir` for a
    /// supported language. Missing files are skipped.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, LocaleError> {
        let mut locales = Self::builtin();
        for (lang, _, _) in SUPPORTED_LANGUAGES {
            let path = dir.as_ref().join(format!("{lang}.json"));
            let raw = match std::fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(LocaleError::Io {
                        path: path.display().to_string(),
                        source,
                    });
                }
            };
            let entries: HashMap<String, MessageEntry> =
                serde_json::from_str(&raw).map_err(|source| LocaleError::Parse {
                    path: path.display().to_string(),
                    source,
                })?;
            tracing::debug!(lang = %lang, messages = entries.len(), "Loaded locale file");
            locales.bundles.entry((*lang).to_string()).or_default().extend(
                entries
                    .into_iter()
                    .map(|(id, entry)| (id, entry.into_text())),
            );
        }
        Ok(locales)
    }

    /// The message `id` in `lang`, falling back to English and then to the
    /// id itself.
    pub fn message(&self, lang: Language, id: &str) -> String {
        self.bundles
            .get(lang.code())
            .and_then(|messages| messages.get(id))
            .or_else(|| {
                self.bundles
                    .get(DEFAULT_LANGUAGE)
                    .and_then(|messages| messages.get(id))
            })
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}
