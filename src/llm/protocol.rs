//! Wire protocol variants spoken by local LLM runtimes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Port used by a default Ollama install.
const OLLAMA_PORT_MARKER: &str = "11434";

/// Which HTTP dialect an endpoint speaks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVariant {
    /// Ollama native API (`/api/chat`, `/api/tags`).
    Ollama,
    /// OpenAI-compatible API (`/v1/chat/completions`, `/v1/models`).
    #[serde(alias = "openai_compatible")]
    OpenAi,
}

impl ProtocolVariant {
    /// Guess the variant from an endpoint URL.
    ///
    /// Anything mentioning the Ollama port or the word `ollama` is treated as Ollama,
    /// everything else as OpenAI-compatible (LM Studio, llama.cpp server, vLLM, ...).
    #[must_use]
    pub fn infer(endpoint: &str) -> Self {
        if endpoint.contains(OLLAMA_PORT_MARKER) || endpoint.to_lowercase().contains("ollama") {
            Self::Ollama
        } else {
            Self::OpenAi
        }
    }

    /// Use the explicit variant when given, otherwise infer it from the endpoint.
    #[must_use]
    pub fn resolve(explicit: Option<Self>, endpoint: &str) -> Self {
        explicit.unwrap_or_else(|| Self::infer(endpoint))
    }

    /// Path of the chat endpoint, relative to the base URL.
    #[must_use]
    pub const fn chat_path(self) -> &'static str {
        match self {
            Self::Ollama => "/api/chat",
            Self::OpenAi => "/v1/chat/completions",
        }
    }

    /// Path of the model listing endpoint, relative to the base URL.
    #[must_use]
    pub const fn models_path(self) -> &'static str {
        match self {
            Self::Ollama => "/api/tags",
            Self::OpenAi => "/v1/models",
        }
    }

    /// Stable string form used in config and query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
        }
    }
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProtocolVariant {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" | "openai_compatible" | "openai-compatible" => Ok(Self::OpenAi),
            _ => Err(format!("unknown protocol: {value}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_ollama_from_port() {
        assert_eq!(
            ProtocolVariant::infer("http://localhost:11434"),
            ProtocolVariant::Ollama
        );
        assert_eq!(
            ProtocolVariant::infer("http://10.0.0.5:11434/"),
            ProtocolVariant::Ollama
        );
    }

    #[test]
    fn test_infer_ollama_from_name_case_insensitive() {
        assert_eq!(
            ProtocolVariant::infer("http://my-OLLAMA-box:8080"),
            ProtocolVariant::Ollama
        );
    }

    #[test]
    fn test_infer_openai_otherwise() {
        let variant = ProtocolVariant::infer("http://localhost:1234");
        assert_eq!(variant, ProtocolVariant::OpenAi);
        assert_eq!(variant.chat_path(), "/v1/chat/completions");
        assert_eq!(variant.models_path(), "/v1/models");
    }

    #[test]
    fn test_ollama_paths() {
        let variant = ProtocolVariant::infer("http://127.0.0.1:11434");
        assert_eq!(variant.chat_path(), "/api/chat");
        assert_eq!(variant.models_path(), "/api/tags");
    }

    #[test]
    fn test_explicit_variant_wins() {
        assert_eq!(
            ProtocolVariant::resolve(Some(ProtocolVariant::OpenAi), "http://localhost:11434"),
            ProtocolVariant::OpenAi
        );
        assert_eq!(
            ProtocolVariant::resolve(None, "http://localhost:11434"),
            ProtocolVariant::Ollama
        );
    }

    #[test]
    fn test_from_str() {
        assert_eq!("Ollama".parse::<ProtocolVariant>(), Ok(ProtocolVariant::Ollama));
        assert_eq!("openai".parse::<ProtocolVariant>(), Ok(ProtocolVariant::OpenAi));
        assert!("grpc".parse::<ProtocolVariant>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ProtocolVariant::OpenAi).unwrap();
        assert_eq!(json, "\"openai\"");
    }
}
