//! `/users` routes: profiles, follows, and per-user recipe lists.

use super::client::ApiClient;
use super::error::ApiError;
use super::transport::{path_segment, ApiRequest};
use crate::models::{ListEnvelope, PageQuery, ProfileUpdate, Recipe, User};

pub struct UsersApi<'a> {
    client: &'a ApiClient,
}

impl<'a> UsersApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &str) -> Result<User, ApiError> {
        self.client.fetch(ApiRequest::get(format!("/users/{}", path_segment(id)))).await
    }

    pub async fn recipes(&self, id: &str, page: &PageQuery) -> Result<Vec<Recipe>, ApiError> {
        self.list(format!("/users/{}/recipes", path_segment(id)), page).await
    }

    pub async fn saved(&self, id: &str, page: &PageQuery) -> Result<Vec<Recipe>, ApiError> {
        self.list(format!("/users/{}/saved", path_segment(id)), page).await
    }

    pub async fn follow(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .execute(ApiRequest::post(format!("/users/{}/follow", path_segment(id))))
            .await
    }

    pub async fn unfollow(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .execute(ApiRequest::delete(format!("/users/{}/follow", path_segment(id))))
            .await
    }

    /// Server-side update only; callers that edit their own profile should
    /// hand the result to `SessionStore::update_profile`.
    pub async fn update(&self, id: &str, update: &ProfileUpdate) -> Result<User, ApiError> {
        let request = ApiRequest::put(format!("/users/{}", path_segment(id))).json(update)?;
        self.client.fetch(request).await
    }

    async fn list(&self, path: String, page: &PageQuery) -> Result<Vec<Recipe>, ApiError> {
        let request = ApiRequest::get(path).with_query(page.to_query());
        let recipes: ListEnvelope<Recipe> = self.client.fetch(request).await?;
        Ok(recipes.into_vec())
    }
}
