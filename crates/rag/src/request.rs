use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RagError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    #[default]
    Extractive,
    Abstractive,
}

impl AnswerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerMode::Extractive => "extractive",
            AnswerMode::Abstractive => "abstractive",
        }
    }
}

impl fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerMode {
    type Err = RagError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "extractive" => Ok(AnswerMode::Extractive),
            "abstractive" => Ok(AnswerMode::Abstractive),
            other => Err(RagError::InvalidRequest(format!(
                "unknown mode {other:?}, expected \"extractive\" or \"abstractive\""
            ))),
        }
    }
}

/// Request as it arrives on the wire, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAskRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub top_k: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AskRequest {
    query: String,
    mode: AnswerMode,
    top_k: usize,
}

impl AskRequest {
    pub fn new(query: &str, mode: AnswerMode, top_k: usize) -> Result<Self, RagError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::InvalidRequest("query must not be empty".into()));
        }
        if top_k == 0 {
            return Err(RagError::InvalidRequest("top_k must be at least 1".into()));
        }
        Ok(Self {
            query: query.to_string(),
            mode,
            top_k,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn mode(&self) -> AnswerMode {
        self.mode
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

impl RawAskRequest {
    /// A missing mode means extractive; a missing `top_k` takes
    /// `default_top_k`.
    pub fn validate(self, default_top_k: usize) -> Result<AskRequest, RagError> {
        let mode = match self.mode.as_deref() {
            None => AnswerMode::default(),
            Some(raw) => raw.parse()?,
        };
        let top_k = match self.top_k {
            None => default_top_k,
            Some(value) if value < 1 => {
                return Err(RagError::InvalidRequest(format!(
                    "top_k must be at least 1, got {value}"
                )))
            }
            Some(value) => usize::try_from(value)
                .map_err(|_| RagError::InvalidRequest(format!("top_k {value} is too large")))?,
        };
        AskRequest::new(&self.query, mode, top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(query: &str, mode: Option<&str>, top_k: Option<i64>) -> RawAskRequest {
        RawAskRequest {
            query: query.to_string(),
            mode: mode.map(str::to_string),
            top_k,
        }
    }

    #[test]
    fn defaults_apply_when_fields_missing() {
        let request = raw("bid security?", None, None).validate(6).unwrap();
        assert_eq!(request.mode(), AnswerMode::Extractive);
        assert_eq!(request.top_k(), 6);
        assert_eq!(request.query(), "bid security?");
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = raw("q", Some("summary"), None).validate(6).unwrap_err();
        assert_eq!(err.code(), "invalid_request");
        assert!(raw("q", Some("Extractive"), None).validate(6).is_err());
    }

    #[test]
    fn blank_query_and_bad_top_k_are_rejected() {
        assert!(raw("   ", None, None).validate(6).is_err());
        assert!(raw("q", None, Some(0)).validate(6).is_err());
        assert!(raw("q", None, Some(-3)).validate(6).is_err());
        assert_eq!(
            raw("q", Some("abstractive"), Some(2))
                .validate(6)
                .unwrap()
                .top_k(),
            2
        );
    }

    #[test]
    fn wire_form_deserializes() {
        let parsed: RawAskRequest =
            serde_json::from_str(r#"{"query":"bid security","mode":"abstractive"}"#).unwrap();
        let request = parsed.validate(6).unwrap();
        assert_eq!(request.mode(), AnswerMode::Abstractive);
    }
}
