//! crates/trustme_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These types are independent of any transport or storage format beyond the
//! JSON shape the analysis service expects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Validation
//=========================================================================================

/// Raised when user input cannot be turned into an `AnalysisRequest`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("The subject is required")]
    MissingSubject,
    #[error("Unsupported language '{0}'")]
    UnsupportedLanguage(String),
    #[error("Unsupported subject type '{0}'")]
    UnsupportedSubjectKind(String),
}

//=========================================================================================
// Request Types
//=========================================================================================

/// The language the verdict should be written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "it-IT")]
    Italian,
    #[default]
    #[serde(rename = "en-US")]
    English,
    #[serde(rename = "fr-FR")]
    French,
    #[serde(rename = "de-DE")]
    German,
    #[serde(rename = "es-ES")]
    Spanish,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Italian,
        Language::English,
        Language::French,
        Language::German,
        Language::Spanish,
    ];

    /// The BCP-47 tag sent over the wire.
    pub fn tag(self) -> &'static str {
        match self {
            Language::Italian => "it-IT",
            Language::English => "en-US",
            Language::French => "fr-FR",
            Language::German => "de-DE",
            Language::Spanish => "es-ES",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Language::ALL
            .into_iter()
            .find(|lang| lang.tag().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ValidationError::UnsupportedLanguage(wanted.to_string()))
    }
}

/// Legacy subject classification. The service accepts it but ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Person,
    Company,
}

impl FromStr for SubjectKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "person" => Ok(SubjectKind::Person),
            "company" => Ok(SubjectKind::Company),
            other => Err(ValidationError::UnsupportedSubjectKind(other.to_string())),
        }
    }
}

/// One immutable analysis submission.
///
/// Serializes to the exact body `POST /analyze` expects. The `type` field is
/// only emitted when a kind was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    subject: String,
    context: String,
    language: Language,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<SubjectKind>,
}

impl AnalysisRequest {
    /// Starts building a request for `subject`.
    pub fn builder(subject: impl Into<String>) -> AnalysisRequestBuilder {
        AnalysisRequestBuilder {
            subject: subject.into(),
            context: String::new(),
            language: Language::default(),
            kind: None,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn kind(&self) -> Option<SubjectKind> {
        self.kind
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisRequestBuilder {
    subject: String,
    context: String,
    language: Language,
    kind: Option<SubjectKind>,
}

impl AnalysisRequestBuilder {
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn kind(mut self, kind: SubjectKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Validates the collected fields. The subject must be non-blank.
    pub fn build(self) -> Result<AnalysisRequest, ValidationError> {
        let subject = self.subject.trim();
        if subject.is_empty() {
            return Err(ValidationError::MissingSubject);
        }
        Ok(AnalysisRequest {
            subject: subject.to_string(),
            context: self.context,
            language: self.language,
            kind: self.kind,
        })
    }
}

/// Raw, unvalidated field values as typed by the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisForm {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl AnalysisForm {
    /// Converts the form into a request, using `fallback_language` when the
    /// user left the language unset.
    pub fn into_request(self, fallback_language: Language) -> Result<AnalysisRequest, ValidationError> {
        let language = match self.language.as_deref().map(str::trim) {
            Some(tag) if !tag.is_empty() => tag.parse()?,
            _ => fallback_language,
        };

        let mut builder = AnalysisRequest::builder(self.subject)
            .context(self.context)
            .language(language);
        if let Some(kind) = self.kind.as_deref().filter(|k| !k.trim().is_empty()) {
            builder = builder.kind(kind.parse()?);
        }
        builder.build()
    }
}

//=========================================================================================
// Credentials and Identity
//=========================================================================================

/// An opaque bearer credential. Its value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// A long-lived token that lets a provider mint new bearer tokens without
/// asking the user again.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken(***)")
    }
}

/// The result of any login capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub display_name: String,
    /// `None` for providers that only establish a local identity.
    pub token: Option<BearerToken>,
}

/// Who the user is after a login attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub display_name: Option<String>,
    pub is_authenticated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_rejects_blank_subject() {
        let err = AnalysisRequest::builder("   ").build().unwrap_err();
        assert_eq!(err, ValidationError::MissingSubject);
    }

    #[test]
    fn request_serializes_without_type_by_default() {
        let request = AnalysisRequest::builder(" ACME Corp ")
            .context("supplier check")
            .language(Language::Italian)
            .build()
            .unwrap();

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"subject": "ACME Corp", "context": "supplier check", "language": "it-IT"})
        );
    }

    #[test]
    fn request_serializes_legacy_type_when_set() {
        let request = AnalysisRequest::builder("Jane Doe")
            .kind(SubjectKind::Person)
            .build()
            .unwrap();

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["type"], "person");
        assert_eq!(body["context"], "");
        assert_eq!(body["language"], "en-US");
    }

    #[test]
    fn language_parses_tags_case_insensitively() {
        assert_eq!("de-de".parse::<Language>().unwrap(), Language::German);
        assert_eq!(" es-ES ".parse::<Language>().unwrap(), Language::Spanish);
        assert!(matches!(
            "pt-BR".parse::<Language>(),
            Err(ValidationError::UnsupportedLanguage(tag)) if tag == "pt-BR"
        ));
    }

    #[test]
    fn form_falls_back_to_default_language() {
        let form = AnalysisForm {
            subject: "Globex".to_string(),
            language: Some(String::new()),
            ..Default::default()
        };

        let request = form.into_request(Language::French).unwrap();
        assert_eq!(request.language(), Language::French);
        assert_eq!(request.kind(), None);
    }

    #[test]
    fn form_rejects_unknown_kind() {
        let form = AnalysisForm {
            subject: "Globex".to_string(),
            kind: Some("robot".to_string()),
            ..Default::default()
        };

        assert!(matches!(
            form.into_request(Language::English),
            Err(ValidationError::UnsupportedSubjectKind(_))
        ));
    }

    #[test]
    fn bearer_token_debug_is_redacted() {
        let token = BearerToken::new("secret-value");
        assert_eq!(format!("{:?}", token), "BearerToken(***)");
        assert_eq!(
            format!("{:?}", RefreshToken::new("secret-value")),
            "RefreshToken(***)"
        );
    }
}
