use std::path::PathBuf;

use hf_hub::api::tokio::{self, ApiRepo};

/// Download one file of a model repository, naming the model and file on failure
async fn download_file(repo: &ApiRepo, model_name: &str, file_name: &str) -> anyhow::Result<PathBuf> {
    repo.get(file_name).await.map_err(|e| {
        anyhow!(
            "Failed to download: {} file with name: {} from HuggingFace Hub: {}",
            model_name,
            file_name,
            e
        )
    })
}

/// Download a model's `tokenizer.json` from Hugging Face Hub
/// If file exists in cache, it will not be downloaded again
pub async fn download_tokenizer(model_name: &str) -> anyhow::Result<PathBuf> {
    let api = tokio::Api::new()?;
    let repo = api.model(model_name.to_string());

    download_file(&repo, model_name, "tokenizer.json").await
}

/// Download model config and weights from Hugging Face Hub
/// If file exists in cache, it will not be downloaded again
pub async fn download_hf_model(model_name: &str) -> anyhow::Result<(PathBuf, PathBuf)> {
    let api = tokio::Api::new()?;
    let repo = api.model(model_name.to_string());

    let config_file = download_file(&repo, model_name, "config.json").await?;
    let weights_file = download_file(&repo, model_name, "model.safetensors").await?;

    Ok((config_file, weights_file))
}
