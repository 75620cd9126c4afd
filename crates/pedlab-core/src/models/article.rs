use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::constants::{DEFAULT_AUTHOR, DEFAULT_CATEGORY, DEFAULT_MATERIAL_FILE_TYPE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

/// Payload accepted by the article store's create operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    pub excerpt: String,
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
    pub author: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleListResponse {
    pub articles: Vec<Article>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleResponse {
    pub article: Article,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(rename = "type", alias = "file_type", default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub downloads: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateMaterialRequest {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    pub description: String,
    pub author: String,
    pub category: String,
    pub file_type: String,
}

impl CreateMaterialRequest {
    /// Request with the store's defaults for the optional fields.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            author: DEFAULT_AUTHOR.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            file_type: DEFAULT_MATERIAL_FILE_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MaterialListResponse {
    pub materials: Vec<Material>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MaterialResponse {
    pub material: Material,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateMessageRequest {
    pub author: String,
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
}

impl CreateMessageRequest {
    pub fn new(author: Option<String>, text: impl Into<String>) -> Self {
        Self {
            author: author
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            text: text.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageListResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: Message,
}

/// Acknowledgement returned by delete operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    #[serde(default)]
    pub id: Option<i64>,
}
