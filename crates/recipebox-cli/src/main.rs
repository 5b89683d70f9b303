//! recipebox - command-line client for the recipebox recipe-sharing service.
//!
//! Each invocation loads the persisted session, runs one command against the
//! REST API, and exits. Run without arguments for usage.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use recipebox_core::api::ApiClient;
use recipebox_core::models::{Credentials, PageQuery, Reaction, Recipe, RecipeQuery, Registration};
use recipebox_core::{ApiError, Config, SessionStatus, SessionStore};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

/// Log file name in the data directory
const LOG_FILE: &str = "recipebox.log";

/// Comments shown by `comments <id>`
const COMMENTS_PAGE_SIZE: u32 = 20;

/// Recipes shown under a profile
const PROFILE_RECIPES_LIMIT: u32 = 5;

const USAGE: &str = "\
Usage: recipebox [--api-url URL] <command> [args]

Commands:
  login <email>                 Log in (password is prompted)
  register <name> <email>       Create an account and log in
  logout                        End the session
  whoami                        Show the logged-in user
  recipes [search]              List recipes
  recipe <id>                   Show a recipe
  comments <id>                 List comments on a recipe
  comment <id> <text>           Comment on a recipe
  save <id> | unsave <id>       Bookmark or un-bookmark a recipe
  react <id> <like|love|wow|none>
  profile [user-id]             Show a profile (default: yourself)
  follow <user-id> | unfollow <user-id>";

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG to control the level (e.g. RUST_LOG=recipebox_core=debug).
/// Output goes to stderr and, when the data directory is available, to a
/// log file; the returned guard flushes the file on drop.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file = Config::data_dir()
        .ok()
        .filter(|dir| std::fs::create_dir_all(dir).is_ok())
        .map(|dir| tracing_appender::non_blocking(tracing_appender::rolling::never(dir, LOG_FILE)));
    let (file_layer, guard) = match file {
        Some((writer, guard)) => (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

/// Command line split into the optional base URL override and the rest.
struct Args {
    api_url: Option<String>,
    command: Vec<String>,
}

impl Args {
    fn parse(raw: impl Iterator<Item = String>) -> Result<Self> {
        let mut api_url = None;
        let mut command = Vec::new();
        let mut raw = raw.peekable();
        while let Some(arg) = raw.next() {
            if arg == "--api-url" {
                api_url = Some(raw.next().context("--api-url needs a value")?);
            } else if let Some(url) = arg.strip_prefix("--api-url=") {
                api_url = Some(url.to_string());
            } else {
                command.push(arg);
            }
        }
        Ok(Self { api_url, command })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _log_guard = init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn report(error: &anyhow::Error) {
    match error.downcast_ref::<ApiError>() {
        Some(api_error) => {
            eprintln!("Error: {}", api_error.message);
            for (field, message) in api_error.field_errors.iter().flatten() {
                eprintln!("  {}: {}", field, message);
            }
        }
        None => eprintln!("Error: {:#}", error),
    }
}

async fn run() -> Result<()> {
    let args = Args::parse(std::env::args().skip(1))?;
    let mut config = Config::load()?;
    if let Some(url) = args.api_url {
        config.api_base_url = url;
    }
    debug!(api = %config.api_base_url, storage = ?config.storage, "Configuration loaded");

    let session = SessionStore::new(config.open_storage()?);
    session.load_persisted();
    let client = ApiClient::new(&config.api_base_url, session.clone())?;

    let command: Vec<&str> = args.command.iter().map(String::as_str).collect();
    match command.as_slice() {
        ["login", email] => login(&client, &mut config, email).await,
        ["register", name, email] => register(&client, name, email).await,
        ["logout"] => {
            session.logout(&client).await;
            println!("Logged out.");
            Ok(())
        }
        ["whoami"] => whoami(&session),
        ["recipes", search @ ..] => list_recipes(&client, &search.join(" ")).await,
        ["recipe", id] => show_recipe(&client, id).await,
        ["comments", id] => list_comments(&client, id).await,
        ["comment", id, text @ ..] if !text.is_empty() => {
            let comment = client.comments().create(id, &text.join(" ")).await?;
            println!("Comment {} posted.", comment.id);
            Ok(())
        }
        ["save", id] => {
            client.recipes().save(id).await?;
            println!("Saved.");
            Ok(())
        }
        ["unsave", id] => {
            client.recipes().unsave(id).await?;
            println!("Removed from saved.");
            Ok(())
        }
        ["react", id, reaction] => react(&client, id, reaction).await,
        ["profile"] => {
            let user = session
                .user()
                .ok_or_else(ApiError::not_logged_in)?;
            show_profile(&client, &user.id).await
        }
        ["profile", user_id] => show_profile(&client, user_id).await,
        ["follow", user_id] => {
            client.users().follow(user_id).await?;
            println!("Following.");
            Ok(())
        }
        ["unfollow", user_id] => {
            client.users().unfollow(user_id).await?;
            println!("Unfollowed.");
            Ok(())
        }
        _ => {
            eprintln!("{}", USAGE);
            bail!("Unknown or incomplete command");
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn login(client: &ApiClient, config: &mut Config, email: &str) -> Result<()> {
    let password = prompt_password("Password: ")?;
    let credentials = Credentials::new(email, &password);
    client.session().login(client, &credentials).await?;

    config.last_email = Some(credentials.email.clone());
    if let Err(e) = config.save() {
        debug!(error = %e, "Failed to remember last email");
    }

    let name = client.session().user().map(|u| u.display_name().to_string());
    println!("Logged in as {}.", name.as_deref().unwrap_or(email));
    Ok(())
}

async fn register(client: &ApiClient, name: &str, email: &str) -> Result<()> {
    let password = prompt_password("Password: ")?;
    let confirmation = prompt_password("Confirm password: ")?;
    let registration = Registration::new(name, email, &password);
    registration.validate_with_confirmation(&confirmation)?;
    client.session().register(client, &registration).await?;
    println!("Welcome, {}!", name.trim());
    Ok(())
}

fn whoami(session: &SessionStore) -> Result<()> {
    match (session.status(), session.user()) {
        (SessionStatus::Authenticated, Some(user)) => {
            println!("{} ({})", user.display_name(), user.id);
            if let Some(email) = &user.email {
                println!("{}", email);
            }
        }
        _ => println!("Not logged in."),
    }
    Ok(())
}

async fn list_recipes(client: &ApiClient, search: &str) -> Result<()> {
    let query = RecipeQuery {
        search: Some(search.to_string()).filter(|s| !s.trim().is_empty()),
        ..RecipeQuery::default()
    };
    let page = client.recipes().list(&query).await?;
    if page.recipes.is_empty() {
        println!("No recipes found.");
    }
    for recipe in &page.recipes {
        print_recipe_line(recipe);
    }
    if page.has_more() {
        println!("(more results available)");
    }
    Ok(())
}

async fn show_recipe(client: &ApiClient, id: &str) -> Result<()> {
    let recipe = client.recipes().get(id).await?;
    println!("{}", recipe.title);
    println!("by {}", recipe.author_name());
    if let Some(description) = &recipe.description {
        println!("\n{}", description);
    }
    match (recipe.cooking_time, recipe.portions) {
        (Some(minutes), Some(portions)) => println!("\n{} min, serves {}", minutes, portions),
        (Some(minutes), None) => println!("\n{} min", minutes),
        (None, Some(portions)) => println!("\nServes {}", portions),
        (None, None) => {}
    }

    if !recipe.ingredients.is_empty() {
        println!("\nIngredients:");
        for ingredient in &recipe.ingredients {
            println!("  - {} {} {}", ingredient.quantity, ingredient.unit, ingredient.name);
        }
    }
    if !recipe.steps.is_empty() {
        println!("\nSteps:");
        for (i, step) in recipe.steps.iter().enumerate() {
            println!("  {}. {}", i + 1, step.description);
        }
    }

    let reactions: Vec<String> = Reaction::ALL
        .iter()
        .map(|r| format!("{} {}", r.as_str(), recipe.reaction_count(*r)))
        .collect();
    println!("\n{}", reactions.join("  "));
    if let Some(mine) = recipe.my_reaction() {
        println!("You reacted: {}", mine.as_str());
    }
    if recipe.is_saved {
        println!("Saved");
    }
    Ok(())
}

async fn list_comments(client: &ApiClient, recipe_id: &str) -> Result<()> {
    let comments = client
        .comments()
        .list(recipe_id, &PageQuery::new(1, COMMENTS_PAGE_SIZE))
        .await?;
    if comments.is_empty() {
        println!("No comments yet.");
    }
    for comment in &comments {
        match comment.created_at {
            Some(at) => println!("{} ({}): {}", comment.author_name(), at.format("%Y-%m-%d"), comment.content),
            None => println!("{}: {}", comment.author_name(), comment.content),
        }
    }
    Ok(())
}

async fn react(client: &ApiClient, recipe_id: &str, reaction: &str) -> Result<()> {
    let reaction = match reaction {
        "none" => None,
        other => Some(other.parse::<Reaction>().map_err(anyhow::Error::msg)?),
    };
    client.recipes().react(recipe_id, reaction).await?;
    match reaction {
        Some(r) => println!("Reacted with {}.", r.as_str()),
        None => println!("Reaction removed."),
    }
    Ok(())
}

async fn show_profile(client: &ApiClient, user_id: &str) -> Result<()> {
    let users = client.users();
    let recent = PageQuery::new(1, PROFILE_RECIPES_LIMIT);
    let (user, recipes) = futures::try_join!(users.get(user_id), users.recipes(user_id, &recent))?;

    // Keep the cached copy of our own profile current.
    if client.session().user().is_some_and(|me| me.id == user.id) {
        client.session().update_profile(user.clone());
    }

    println!("{} ({})", user.display_name(), user.initial());
    if let Some(bio) = &user.bio {
        println!("{}", bio);
    }
    println!(
        "{} followers, {} following{}",
        user.followers_count,
        user.following_count,
        if user.is_following { ", you follow them" } else { "" }
    );
    if !recipes.is_empty() {
        println!("\nRecent recipes:");
        for recipe in &recipes {
            print_recipe_line(recipe);
        }
    }
    info!(user = %user.id, "Profile shown");
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn print_recipe_line(recipe: &Recipe) {
    let category = recipe.category.as_deref().unwrap_or("-");
    println!("{:<26} {:<40} [{}] by {}", recipe.id, recipe.title, category, recipe.author_name());
}

fn prompt_password(prompt: &str) -> Result<String> {
    io::stdout().flush()?;
    rpassword::prompt_password(prompt).context("Failed to read password")
}
