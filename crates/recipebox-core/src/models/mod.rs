//! Data models for recipebox entities.
//!
//! - `User`: profile record, also the persisted half of a session
//! - `Recipe`, `NewRecipe`, `RecipeUpdate`, `RecipeQuery`: recipes and
//!   their request payloads
//! - `Comment`: recipe comments
//! - `Credentials`, `Registration`, `AuthResponse`: authentication payloads
//!
//! Request payloads carry their own client-side validation.

pub mod auth;
pub mod comment;
pub mod page;
pub mod recipe;
pub mod user;
pub mod validation;

pub use auth::{AuthResponse, Credentials, Registration, TokenRefresh};
pub use comment::Comment;
pub use page::{ListEnvelope, PageQuery};
pub use recipe::{
    Category, Difficulty, ImageUpload, Ingredient, NewRecipe, Reaction, Recipe, RecipePage,
    RecipeQuery, RecipeStatus, RecipeUpdate, SortOrder, Step,
};
pub use user::{ProfileUpdate, User};
