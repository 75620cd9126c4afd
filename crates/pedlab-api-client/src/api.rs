//! Store operations for the article, material and message functions.
//!
//! Response envelopes come from `pedlab_core::models`; each method unwraps
//! the envelope and returns the record(s).

use crate::ApiClient;
use anyhow::{Context, Result};
use pedlab_core::models::{
    Article, ArticleListResponse, ArticleResponse, CreateArticleRequest, CreateMaterialRequest,
    CreateMessageRequest, DeleteResponse, Material, MaterialListResponse, MaterialResponse,
    Message, MessageListResponse, MessageResponse,
};
use validator::Validate;

/// Category value the article store treats as "no filter"
const ALL_CATEGORIES: &str = "all";

impl ApiClient {
    /// List articles, newest first, optionally filtered by category.
    pub async fn list_articles(&self, category: Option<&str>) -> Result<Vec<Article>> {
        let mut query = Vec::new();
        if let Some(category) = category.filter(|c| *c != ALL_CATEGORIES) {
            query.push(("category", category.to_string()));
        }
        let response: ArticleListResponse = self.get(&self.endpoints().articles, &query).await?;
        Ok(response.articles)
    }

    pub async fn get_article(&self, id: i64) -> Result<Article> {
        let response: ArticleResponse = self
            .get(&self.endpoints().articles, &[("id", id.to_string())])
            .await
            .with_context(|| format!("Failed to fetch article {}", id))?;
        Ok(response.article)
    }

    pub async fn create_article(&self, request: &CreateArticleRequest) -> Result<Article> {
        request.validate().context("Invalid article")?;
        let response: ArticleResponse = self
            .post_json(&self.endpoints().articles, request)
            .await
            .context("Failed to create article")?;

        tracing::info!(
            article_id = response.article.id,
            has_file = request.file_url.is_some(),
            "Article created"
        );
        Ok(response.article)
    }

    pub async fn delete_article(&self, id: i64) -> Result<DeleteResponse> {
        self.delete(&self.endpoints().articles, &[("id", id.to_string())])
            .await
            .with_context(|| format!("Failed to delete article {}", id))
    }

    pub async fn list_materials(&self) -> Result<Vec<Material>> {
        let response: MaterialListResponse = self.get(&self.endpoints().materials, &[]).await?;
        Ok(response.materials)
    }

    pub async fn create_material(&self, request: &CreateMaterialRequest) -> Result<Material> {
        request.validate().context("Invalid material")?;
        let response: MaterialResponse = self
            .post_json(&self.endpoints().materials, request)
            .await
            .context("Failed to create material")?;
        Ok(response.material)
    }

    pub async fn delete_material(&self, id: i64) -> Result<DeleteResponse> {
        self.delete(&self.endpoints().materials, &[("id", id.to_string())])
            .await
            .with_context(|| format!("Failed to delete material {}", id))
    }

    pub async fn list_messages(&self) -> Result<Vec<Message>> {
        let response: MessageListResponse = self.get(&self.endpoints().messages, &[]).await?;
        Ok(response.messages)
    }

    pub async fn send_message(&self, request: &CreateMessageRequest) -> Result<Message> {
        request.validate().context("Invalid message")?;
        let response: MessageResponse = self
            .post_json(&self.endpoints().messages, request)
            .await
            .context("Failed to send message")?;
        Ok(response.message)
    }
}
