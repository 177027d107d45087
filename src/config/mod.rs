// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration
//!
//! Read once from the environment (after `.env` is loaded) and then
//! overridden by command-line flags.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::api::websocket::SessionConfig;
use crate::inference::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::inference::GeneratorConfig;
use crate::rag::DEFAULT_TOP_K;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address the HTTP/websocket server binds to
    pub listen_addr: String,
    /// Length of every stored and queried vector
    pub embedding_dimension: usize,
    /// Chunks retrieved per question
    pub top_k: usize,
    /// Sentence encoder settings; without model files the hashing encoder is used
    pub encoder: EncoderConfig,
    /// OpenAI-compatible generation backend
    pub generator: GeneratorSettings,
    /// Chat session limits
    pub chat: ChatSettings,
    /// Load the demo menu at startup when the catalog is empty
    pub seed_demo_menu: bool,
    /// Period of the background index consistency pass (0 disables it)
    pub reconcile_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub model_name: String,
    pub model_path: Option<PathBuf>,
    pub tokenizer_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub max_pending_questions: usize,
    pub retrieval_timeout_ms: Option<u64>,
    pub fragment_timeout_ms: Option<u64>,
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
}

impl NodeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: env::var("MENU_LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            embedding_dimension: env_parse("EMBEDDING_DIMENSION")
                .unwrap_or(defaults.embedding_dimension),
            top_k: env_parse("RAG_TOP_K").unwrap_or(defaults.top_k),
            encoder: EncoderConfig {
                model_name: env::var("EMBEDDING_MODEL_NAME")
                    .unwrap_or(defaults.encoder.model_name),
                model_path: env::var("MENU_ONNX_MODEL_PATH").ok().map(PathBuf::from),
                tokenizer_path: env::var("MENU_ONNX_TOKENIZER_PATH").ok().map(PathBuf::from),
            },
            generator: GeneratorSettings {
                base_url: env::var("LM_STUDIO_URL").unwrap_or(defaults.generator.base_url),
                model: env::var("LLM_MODEL").unwrap_or(defaults.generator.model),
                api_key: env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty()),
                temperature: env_parse("LLM_TEMPERATURE").unwrap_or(defaults.generator.temperature),
                max_tokens: env_parse("LLM_MAX_TOKENS"),
            },
            chat: ChatSettings {
                max_pending_questions: env_parse("CHAT_MAX_PENDING_QUESTIONS")
                    .unwrap_or(defaults.chat.max_pending_questions),
                retrieval_timeout_ms: env_parse("CHAT_RETRIEVAL_TIMEOUT_MS"),
                fragment_timeout_ms: env_parse("CHAT_FRAGMENT_TIMEOUT_MS"),
            },
            seed_demo_menu: env_flag("MENU_SEED").unwrap_or(defaults.seed_demo_menu),
            reconcile_interval_secs: env_parse("INDEX_RECONCILE_INTERVAL_SECS")
                .unwrap_or(defaults.reconcile_interval_secs),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        SocketAddr::from_str(&self.listen_addr)
            .map_err(|e| format!("Invalid listen address '{}': {}", self.listen_addr, e))?;
        if self.embedding_dimension == 0 {
            return Err("Embedding dimension must be greater than 0".to_string());
        }
        if self.top_k == 0 {
            return Err("top_k must be greater than 0".to_string());
        }
        if self.encoder.model_path.is_some() != self.encoder.tokenizer_path.is_some() {
            return Err(
                "MENU_ONNX_MODEL_PATH and MENU_ONNX_TOKENIZER_PATH must be set together"
                    .to_string(),
            );
        }
        if !self.generator.base_url.starts_with("http://")
            && !self.generator.base_url.starts_with("https://")
        {
            return Err(format!(
                "Generator URL must be http(s): {}",
                self.generator.base_url
            ));
        }
        if !(0.0..=2.0).contains(&self.generator.temperature) {
            return Err("Temperature must be between 0.0 and 2.0".to_string());
        }
        if self.chat.retrieval_timeout_ms == Some(0) || self.chat.fragment_timeout_ms == Some(0) {
            return Err("Chat timeouts must be greater than 0 when set".to_string());
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        SocketAddr::from_str(&self.listen_addr).map_err(|e| e.to_string())
    }

    /// Whether ONNX model files are configured
    pub fn uses_onnx_encoder(&self) -> bool {
        self.encoder.model_path.is_some() && self.encoder.tokenizer_path.is_some()
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_pending_questions: self.chat.max_pending_questions,
            retrieval_timeout: self.chat.retrieval_timeout_ms.map(Duration::from_millis),
            fragment_timeout: self.chat.fragment_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            base_url: self.generator.base_url.clone(),
            model: self.generator.model.clone(),
            api_key: self.generator.api_key.clone(),
            temperature: self.generator.temperature,
            max_tokens: self.generator.max_tokens,
            ..GeneratorConfig::default()
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            top_k: DEFAULT_TOP_K,
            encoder: EncoderConfig {
                model_name: DEFAULT_EMBEDDING_MODEL.to_string(),
                model_path: None,
                tokenizer_path: None,
            },
            generator: GeneratorSettings {
                base_url: DEFAULT_BASE_URL.to_string(),
                model: DEFAULT_MODEL.to_string(),
                api_key: None,
                temperature: 0.7,
                max_tokens: None,
            },
            chat: ChatSettings {
                max_pending_questions: session.max_pending_questions,
                retrieval_timeout_ms: None,
                fragment_timeout_ms: None,
            },
            seed_demo_menu: false,
            reconcile_interval_secs: 300,
        }
    }
}
