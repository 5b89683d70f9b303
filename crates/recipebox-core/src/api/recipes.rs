//! `/recipes` routes: CRUD, reactions and saving.

use chrono::Utc;
use serde::Serialize;

use super::client::ApiClient;
use super::error::ApiError;
use super::transport::{path_segment, ApiRequest};
use crate::models::{
    ListEnvelope, NewRecipe, Reaction, Recipe, RecipePage, RecipeQuery, RecipeUpdate,
};

#[derive(Serialize)]
struct ReactionBody {
    #[serde(rename = "type")]
    reaction: Option<Reaction>,
}

pub struct RecipesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> RecipesApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &RecipeQuery) -> Result<RecipePage, ApiError> {
        let request = ApiRequest::get("/recipes").with_query(query.to_query());
        let recipes: ListEnvelope<Recipe> = self.client.fetch(request).await?;
        Ok(RecipePage {
            recipes: recipes.into_vec(),
            page: query.page,
            limit: query.limit,
        })
    }

    pub async fn get(&self, id: &str) -> Result<Recipe, ApiError> {
        self.client
            .fetch(ApiRequest::get(format!("/recipes/{}", path_segment(id))))
            .await
    }

    /// Validates locally, then uploads fields and images as multipart.
    pub async fn create(&self, recipe: &NewRecipe) -> Result<Recipe, ApiError> {
        recipe.validate()?;
        let form = recipe.to_multipart(Utc::now().timestamp_millis())?;
        self.client
            .fetch(ApiRequest::post("/recipes").multipart(form))
            .await
    }

    pub async fn update(&self, id: &str, update: &RecipeUpdate) -> Result<Recipe, ApiError> {
        let request = ApiRequest::put(format!("/recipes/{}", path_segment(id))).json(update)?;
        self.client.fetch(request).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .execute(ApiRequest::delete(format!("/recipes/{}", path_segment(id))))
            .await
    }

    /// `None` clears the caller's reaction.
    pub async fn react(&self, id: &str, reaction: Option<Reaction>) -> Result<(), ApiError> {
        let path = format!("/recipes/{}/react", path_segment(id));
        let request = ApiRequest::post(path).json(&ReactionBody { reaction })?;
        self.client.execute(request).await
    }

    pub async fn save(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .execute(ApiRequest::post(format!("/recipes/{}/save", path_segment(id))))
            .await
    }

    pub async fn unsave(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .execute(ApiRequest::delete(format!("/recipes/{}/save", path_segment(id))))
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{sample_session, MockTransport};
    use crate::api::{ApiClient, ErrorKind, HttpMethod, RequestBody};
    use crate::models::{
        Category, Ingredient, NewRecipe, Reaction, RecipeQuery, RecipeUpdate, Step,
    };

    fn client(mock: &MockTransport) -> ApiClient {
        ApiClient::with_transport(mock.clone(), sample_session("t1"))
    }

    #[tokio::test]
    async fn test_list_sends_query_and_accepts_wrapped_body() {
        let mock = MockTransport::new();
        mock.respond(200, r#"{"recipes":[{"_id":"r1","title":"Soup"}],"total":1}"#);

        let query = RecipeQuery {
            category: Some(Category::Dessert),
            ..Default::default()
        };
        let page = client(&mock).recipes().list(&query).await.unwrap();
        assert_eq!(page.recipes.len(), 1);
        assert_eq!(page.recipes[0].id, "r1");
        assert!(!page.has_more());

        let sent = mock.last_request();
        assert_eq!(sent.path, "/recipes");
        assert!(sent
            .query
            .contains(&("category".to_string(), "Dessert".to_string())));
    }

    #[tokio::test]
    async fn test_list_accepts_bare_array() {
        let mock = MockTransport::new();
        mock.respond(200, r#"[{"id":"r1","title":"A"},{"id":"r2","title":"B"}]"#);

        let page = client(&mock)
            .recipes()
            .list(&RecipeQuery::default())
            .await
            .unwrap();
        assert_eq!(page.recipes.len(), 2);
    }

    #[tokio::test]
    async fn test_ids_are_encoded_as_one_path_segment() {
        let mock = MockTransport::new();
        mock.respond(200, r#"{"id":"a/b","title":"Soup"}"#);
        mock.respond(200, "{}");
        let client = client(&mock);

        client.recipes().get("a/b").await.unwrap();
        client.recipes().save("x?admin=1").await.unwrap();

        let sent = mock.requests();
        assert_eq!(sent[0].path, "/recipes/a%2Fb");
        assert_eq!(sent[1].path, "/recipes/x%3Fadmin%3D1/save");
    }

    #[tokio::test]
    async fn test_react_body() {
        let mock = MockTransport::new();
        mock.respond(200, "{}");
        mock.respond(200, "{}");
        let client = client(&mock);

        client.recipes().react("r1", Some(Reaction::Love)).await.unwrap();
        client.recipes().react("r1", None).await.unwrap();

        let sent = mock.requests();
        assert_eq!(sent[0].path, "/recipes/r1/react");
        assert_eq!(
            sent[0].body,
            RequestBody::Json(serde_json::json!({ "type": "love" }))
        );
        assert_eq!(
            sent[1].body,
            RequestBody::Json(serde_json::json!({ "type": null }))
        );
    }

    #[tokio::test]
    async fn test_save_unsave_delete_routes() {
        let mock = MockTransport::new();
        for _ in 0..3 {
            mock.respond(204, "");
        }
        let client = client(&mock);

        client.recipes().save("r1").await.unwrap();
        client.recipes().unsave("r1").await.unwrap();
        client.recipes().delete("r1").await.unwrap();

        let sent: Vec<(HttpMethod, String)> = mock
            .requests()
            .into_iter()
            .map(|r| (r.method, r.path))
            .collect();
        assert_eq!(
            sent,
            vec![
                (HttpMethod::Post, "/recipes/r1/save".to_string()),
                (HttpMethod::Delete, "/recipes/r1/save".to_string()),
                (HttpMethod::Delete, "/recipes/r1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_sends_partial_json() {
        let mock = MockTransport::new();
        mock.respond(200, r#"{"id":"r1","title":"New title"}"#);

        let update = RecipeUpdate {
            title: Some("New title".to_string()),
            ..Default::default()
        };
        let recipe = client(&mock).recipes().update("r1", &update).await.unwrap();
        assert_eq!(recipe.title, "New title");

        let sent = mock.last_request();
        assert_eq!(sent.method, HttpMethod::Put);
        assert_eq!(
            sent.body,
            RequestBody::Json(serde_json::json!({ "title": "New title" }))
        );
    }

    #[tokio::test]
    async fn test_create_uses_multipart_with_bearer() {
        let mock = MockTransport::new();
        mock.respond(201, r#"{"_id":"r9","title":"Soup"}"#);

        let mut recipe = NewRecipe::new("Soup", "Hot");
        recipe.cooking_time = 15;
        recipe.portions = 2;
        recipe.ingredients = vec![Ingredient {
            name: "Water".to_string(),
            quantity: "1".to_string(),
            unit: "l".to_string(),
        }];
        recipe.steps = vec![Step {
            description: "Boil".to_string(),
        }];

        let created = client(&mock).recipes().create(&recipe).await.unwrap();
        assert_eq!(created.id, "r9");

        let sent = mock.last_request();
        assert_eq!(sent.header("Authorization"), Some("Bearer t1"));
        match sent.body {
            RequestBody::Multipart(form) => {
                assert_eq!(form.field("title"), Some("Soup"));
                assert_eq!(form.field("portions"), Some("2"));
            }
            other => panic!("expected multipart body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_recipe_without_network() {
        let mock = MockTransport::new();

        let err = client(&mock)
            .recipes()
            .create(&NewRecipe::new("", ""))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.status_code, 0);
        assert!(mock.requests().is_empty());
    }
}
