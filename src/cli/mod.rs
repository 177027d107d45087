// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use clap::Parser;
use std::path::PathBuf;

use crate::config::NodeConfig;

/// Smart Menu node: menu API plus retrieval-augmented chat
#[derive(Parser, Debug, Default)]
#[command(name = "smart-menu-node")]
#[command(version)]
#[command(about = "Menu catalog with retrieval-augmented streaming chat", long_about = None)]
pub struct Cli {
    /// Extra .env file loaded before the environment is read
    #[arg(long, env = "MENU_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Address to bind, e.g. 0.0.0.0:8000
    #[arg(long)]
    pub listen_addr: Option<String>,

    /// Load the demo menu when the catalog is empty
    #[arg(long)]
    pub seed: bool,

    /// Chunks retrieved per question
    #[arg(long)]
    pub top_k: Option<usize>,

    /// OpenAI-compatible base URL, e.g. http://localhost:1234/v1
    #[arg(long)]
    pub lm_studio_url: Option<String>,

    /// Model name sent to the generation backend
    #[arg(long)]
    pub model: Option<String>,

    /// ONNX sentence encoder model file
    #[arg(long, requires = "onnx_tokenizer")]
    pub onnx_model: Option<PathBuf>,

    /// Tokenizer for the ONNX encoder
    #[arg(long, requires = "onnx_model")]
    pub onnx_tokenizer: Option<PathBuf>,
}

impl Cli {
    /// Apply command-line overrides on top of the environment configuration
    pub fn apply(&self, config: &mut NodeConfig) {
        if let Some(addr) = &self.listen_addr {
            config.listen_addr = addr.clone();
        }
        if self.seed {
            config.seed_demo_menu = true;
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        if let Some(url) = &self.lm_studio_url {
            config.generator.base_url = url.clone();
        }
        if let Some(model) = &self.model {
            config.generator.model = model.clone();
        }
        if let (Some(model), Some(tokenizer)) = (&self.onnx_model, &self.onnx_tokenizer) {
            config.encoder.model_path = Some(model.clone());
            config.encoder.tokenizer_path = Some(tokenizer.clone());
        }
    }
}
