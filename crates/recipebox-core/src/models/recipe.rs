use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::User;
use super::validation::Validator;
use crate::api::transport::{FilePart, MultipartForm};
use crate::api::ApiError;

/// Recipes per page when the caller does not say otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Category {
    Appetizer,
    #[serde(rename = "Main Course")]
    MainCourse,
    Dessert,
    Snack,
    Beverage,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Appetizer,
        Category::MainCourse,
        Category::Dessert,
        Category::Snack,
        Category::Beverage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Appetizer => "Appetizer",
            Category::MainCourse => "Main Course",
            Category::Dessert => "Dessert",
            Category::Snack => "Snack",
            Category::Beverage => "Beverage",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', '_'], " ");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum RecipeStatus {
    Draft,
    #[default]
    Published,
}

impl RecipeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeStatus::Draft => "draft",
            RecipeStatus::Published => "published",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Reaction {
    Like,
    Love,
    Wow,
}

impl Reaction {
    pub const ALL: [Reaction; 3] = [Reaction::Like, Reaction::Love, Reaction::Wow];

    pub fn as_str(&self) -> &'static str {
        match self {
            Reaction::Like => "like",
            Reaction::Love => "love",
            Reaction::Wow => "wow",
        }
    }
}

impl FromStr for Reaction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Reaction::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown reaction: {}", s))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Latest,
    Trending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Latest => "latest",
            SortOrder::Trending => "trending",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Ingredient {
    pub name: String,
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Step {
    pub description: String,
}

/// A recipe as returned by the API. Server-owned enumerations are kept as
/// strings so unknown values do not break decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Recipe {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub cooking_time: Option<u32>,
    #[serde(default)]
    pub portions: Option<u32>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub reactions: HashMap<String, u32>,
    #[serde(default)]
    pub user_reaction: Option<String>,
    #[serde(default)]
    pub is_saved: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Recipe {
    pub fn reaction_count(&self, reaction: Reaction) -> u32 {
        self.reactions.get(reaction.as_str()).copied().unwrap_or(0)
    }

    /// The caller's own reaction, if it is one this client knows.
    pub fn my_reaction(&self) -> Option<Reaction> {
        self.user_reaction.as_deref().and_then(|r| r.parse().ok())
    }

    /// Image to show first: `image_url`, else the first uploaded image.
    pub fn cover_image(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .or_else(|| self.images.first().map(String::as_str))
    }

    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .map(|a| a.display_name())
            .unwrap_or("Unknown")
    }
}

/// Filters and paging for `GET /recipes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub category: Option<Category>,
    pub sort: SortOrder,
}

impl Default for RecipeQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            search: None,
            category: None,
            sort: SortOrder::default(),
        }
    }
}

impl RecipeQuery {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query.push(("search".to_string(), search.to_string()));
        }
        if let Some(category) = self.category {
            query.push(("category".to_string(), category.as_str().to_string()));
        }
        query.push(("sort".to_string(), self.sort.as_str().to_string()));
        query
    }

    pub fn next_page(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }
}

/// One page of `GET /recipes`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipePage {
    pub recipes: Vec<Recipe>,
    pub page: u32,
    pub limit: u32,
}

impl RecipePage {
    /// A full page suggests there may be more.
    pub fn has_more(&self) -> bool {
        self.limit > 0 && self.recipes.len() >= self.limit as usize
    }
}

/// Raw image bytes to upload with a new recipe.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl ImageUpload {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: "image/jpeg".to_string(),
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let mime = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            _ => "image/jpeg",
        };
        Ok(Self {
            bytes,
            mime: mime.to_string(),
        })
    }

    fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A recipe to publish (or save as draft), sent as multipart with its images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub cooking_time: u32,
    pub portions: u32,
    pub difficulty: Difficulty,
    pub status: RecipeStatus,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<Step>,
    pub images: Vec<ImageUpload>,
}

impl NewRecipe {
    pub fn new(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            category: Category::MainCourse,
            cooking_time: 0,
            portions: 0,
            difficulty: Difficulty::default(),
            status: RecipeStatus::default(),
            ingredients: Vec::new(),
            steps: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        Validator::new()
            .check(!self.title.trim().is_empty(), "title", "Title is required")
            .check(
                !self.description.trim().is_empty(),
                "description",
                "Description is required",
            )
            .check(self.cooking_time > 0, "cookingTime", "Cooking time is required")
            .check(self.portions > 0, "portions", "Portions is required")
            .check(
                self.ingredients
                    .iter()
                    .all(|i| !i.name.trim().is_empty() && !i.quantity.trim().is_empty()),
                "ingredients",
                "All ingredients must have name and quantity",
            )
            .check(
                self.steps.iter().all(|s| !s.description.trim().is_empty()),
                "steps",
                "All steps must have descriptions",
            )
            .finish()
    }

    /// Encode as multipart. `timestamp_millis` names the image parts
    /// (`recipe-<millis>-<index>.jpg`).
    pub fn to_multipart(&self, timestamp_millis: i64) -> Result<MultipartForm, ApiError> {
        let mut form = MultipartForm::new()
            .text("title", self.title.trim())
            .text("description", self.description.trim())
            .text("category", self.category.as_str())
            .text("cooking_time", self.cooking_time.to_string())
            .text("portions", self.portions.to_string())
            .text("difficulty", self.difficulty.as_str())
            .text("status", self.status.as_str())
            .text("ingredients", serde_json::to_string(&self.ingredients)?)
            .text("steps", serde_json::to_string(&self.steps)?);

        for (index, image) in self.images.iter().enumerate() {
            form = form.file(FilePart {
                field: "images".to_string(),
                file_name: format!("recipe-{}-{}.{}", timestamp_millis, index, image.extension()),
                mime: image.mime.clone(),
                bytes: image.bytes.clone(),
            });
        }
        Ok(form)
    }
}

/// Payload for `PUT /recipes/{id}`. Only present fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecipeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooking_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecipeStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<Ingredient>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
}
