//! `/recipes/{id}/comments` routes.

use serde::Serialize;

use super::client::ApiClient;
use super::error::ApiError;
use super::transport::{path_segment, ApiRequest};
use crate::models::{Comment, ListEnvelope, PageQuery};

#[derive(Serialize)]
struct NewComment<'a> {
    content: &'a str,
}

pub struct CommentsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> CommentsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, recipe_id: &str, page: &PageQuery) -> Result<Vec<Comment>, ApiError> {
        let path = format!("/recipes/{}/comments", path_segment(recipe_id));
        let request = ApiRequest::get(path).with_query(page.to_query());
        let comments: ListEnvelope<Comment> = self.client.fetch(request).await?;
        Ok(comments.into_vec())
    }

    /// Content is trimmed; a blank comment is rejected without a request.
    pub async fn create(&self, recipe_id: &str, content: &str) -> Result<Comment, ApiError> {
        let content = content.trim();
        if content.is_empty() {
            let mut errors = super::error::FieldErrors::new();
            errors.insert("content".to_string(), "Comment cannot be empty".to_string());
            return Err(ApiError::validation(errors));
        }
        let path = format!("/recipes/{}/comments", path_segment(recipe_id));
        let request = ApiRequest::post(path).json(&NewComment { content })?;
        self.client.fetch(request).await
    }

    pub async fn delete(&self, recipe_id: &str, comment_id: &str) -> Result<(), ApiError> {
        self.client
            .execute(ApiRequest::delete(format!(
                "/recipes/{}/comments/{}",
                path_segment(recipe_id),
                path_segment(comment_id)
            )))
            .await
    }
}
