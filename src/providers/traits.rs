use async_trait::async_trait;

use super::types::ProviderError;

/// A language model that turns one prompt into one reply.
#[async_trait]
pub trait ModelClient: Send + Sync {
    fn model_name(&self) -> &str;

    async fn infer(&self, prompt: &str) -> Result<String, ProviderError>;
}
