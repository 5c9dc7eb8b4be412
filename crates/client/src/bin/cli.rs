use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{ArgAction, Parser, Subcommand};

use client::api::{BackendApi, HttpApi};
use client::forms::{
    submit_login, submit_profile_update, submit_register, LoginForm, ProfileForm, ProfileImage,
    RegisterForm,
};
use curtidas_core::config::CurtidasConfig;
use curtidas_core::feedback::Notifier;
use curtidas_core::CurtidasResult;

#[derive(Parser)]
#[command(author, version, about, long_about=None)]
struct Cli {
    #[arg(short, long, value_name = "FILE")]
    /// Path to config file; defaults to ~/.curtidas/curtidas.toml
    config: Option<PathBuf>,

    #[arg(short, long)]
    /// Base URL of the backend. For ex, http://localhost:8000
    base_url: Option<String>,

    #[arg(short, long, action = ArgAction::SetTrue)]
    /// Select if the output should be json
    json: bool,

    #[command(subcommand)]
    command: CurtidasCommand,
}

#[derive(Subcommand, Clone, Debug)]
pub enum CurtidasCommand {
    /// Like a post on behalf of a user
    Like { user: u64, post: u64 },

    /// Remove a like from a post
    Unlike { post: u64 },

    /// List the posts a user has favorited
    Favorites { user: u64 },

    /// Sign in with form credentials
    Login {
        #[arg(short, long)]
        username: Option<String>,
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account from `key=value` fields
    Register {
        #[arg(short, long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Update a profile from `key=value` fields
    UpdateProfile {
        user: u64,
        #[arg(short, long)]
        token: String,
        #[arg(short, long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
        #[arg(short, long)]
        image: Option<PathBuf>,
    },
}

fn parse_fields(raw: &[String]) -> CurtidasResult<Vec<(String, String)>> {
    let mut fields = Vec::with_capacity(raw.len());
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected KEY=VALUE, got: {pair}"))?;
        fields.push((key.to_string(), value.to_string()));
    }
    Ok(fields)
}

fn load_image(path: Option<PathBuf>) -> CurtidasResult<Option<ProfileImage>> {
    let Some(path) = path else { return Ok(None) };
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".into());
    let bytes = std::fs::read(&path)?;
    Ok(Some(ProfileImage { filename, bytes }))
}

fn prompt(label: &str) -> CurtidasResult<String> {
    print!("{label}: ");
    std::io::stdout().flush()?;
    let mut buf = String::new();
    std::io::stdin().read_line(&mut buf)?;
    Ok(buf.trim().to_string())
}

#[tokio::main]
async fn main() -> CurtidasResult<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(CurtidasConfig::resolve_path);
    let mut config = CurtidasConfig::load_or_default(&config_path)?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    let api = HttpApi::new(config.base_url.clone());
    let notifier = Mutex::new(Notifier::new());

    match cli.command {
        CurtidasCommand::Like { user, post } => {
            let result = api.like(user, post).await?;
            if cli.json {
                println!("{}", serde_json::to_string(&result)?);
            } else {
                println!("post {post}: {} likes", result.total_likes);
            }
        }

        CurtidasCommand::Unlike { post } => {
            let result = api.unlike(post).await?;
            if cli.json {
                println!("{}", serde_json::to_string(&result)?);
            } else {
                println!("post {post}: {} likes", result.total_likes);
            }
        }

        CurtidasCommand::Favorites { user } => {
            let favorites = api.favorites(user).await?;
            if cli.json {
                println!("{}", serde_json::to_string(&favorites)?);
            } else {
                for favorite in favorites {
                    println!("post {}", favorite.id_postagem);
                }
            }
        }

        CurtidasCommand::Login { username, password } => {
            let username = match username {
                Some(username) => username,
                None => prompt("Enter username")?,
            };
            let password = match password {
                Some(password) => password,
                None => prompt("Enter password")?,
            };
            let outcome = submit_login(
                &api,
                &notifier,
                &config,
                LoginForm::new(username, password),
            )
            .await;
            report(cli.json, &outcome)?;
        }

        CurtidasCommand::Register { fields, image } => {
            let form = RegisterForm {
                fields: parse_fields(&fields)?.into_iter().collect(),
                image: load_image(image)?,
            };
            let outcome = submit_register(&api, &notifier, &config, form).await;
            report(cli.json, &outcome)?;
        }

        CurtidasCommand::UpdateProfile {
            user,
            token,
            fields,
            image,
        } => {
            let form = ProfileForm {
                user_id: user,
                access_token: Some(token),
                fields: parse_fields(&fields)?.into_iter().collect(),
                image: load_image(image)?,
            };
            let outcome = submit_profile_update(&api, &notifier, &config, form).await;
            report(cli.json, &outcome)?;
        }
    }

    Ok(())
}

fn report(json: bool, outcome: &client::forms::FormOutcome) -> CurtidasResult<()> {
    if json {
        println!("{}", serde_json::to_string(&outcome.feedback)?);
        return Ok(());
    }
    println!("{}", outcome.feedback.text);
    if let Some(target) = &outcome.redirect {
        println!("next: {target}");
    }
    Ok(())
}
