// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

pub const SUPPORTED_LANGUAGES: [&str; 3] = ["en", "es", "pt"];
const DEFAULT_LANG: &str = "es";

/// Idioma do cliente, extraído do `Accept-Language`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Locale {
    /// Primeiro idioma aceito que temos catalogado ("es-CR" -> "es").
    pub fn from_header(header_str: &str) -> Self {
        let lang = accept_language::parse(header_str)
            .iter()
            .filter_map(|tag| tag.split('-').next())
            .map(|primary| primary.to_ascii_lowercase())
            .find(|primary| SUPPORTED_LANGUAGES.contains(&primary.as_str()))
            .unwrap_or_else(|| DEFAULT_LANG.to_string());

        Locale(lang)
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default();

        Ok(locale)
    }
}
