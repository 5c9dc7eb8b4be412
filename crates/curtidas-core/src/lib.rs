//! Domain model for the curtidas like-state synchronizer. The browser
//! page of the original app is modeled as a registry of typed controls:
//! click events arrive as [`Command`]s, confirmed server responses fan
//! out to every control bound for the affected post.
mod error;
pub mod config;
pub mod control;
pub mod detail;
pub mod feedback;
pub mod registry;
pub mod state;

pub use error::{CurtidasError, CurtidasResult};

use control::{ControlId, Dataset, LikeControl, Surface};

pub mod constant {
    pub const SUCCESS_BANNER_MS: u64 = 2000;
    pub const FAILURE_BANNER_MS: u64 = 5000;
    pub const REDIRECT_HOME: &str = "/home";
    pub const REDIRECT_LOGIN: &str = "/auth/login";
    pub const REDIRECT_PROFILE: &str = "/profile";
    pub const CONFIG_DIR: &str = ".curtidas";
    pub const CONFIG_FILE: &str = "curtidas.toml";
    pub const CONFIG_ENV: &str = "CURTIDASCONF";
    pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
    pub const DETAIL_TEXT_WIDTH: usize = 50;
}

/// Identifier of a post, as carried in `data-post-id`.
pub type PostId = u64;

/// Identifier of the acting user, absent when nobody is signed in.
pub type UserId = u64;

/// Used to send the outcome of a command back to its issuer.
pub type Responder<T> = tokio::sync::oneshot::Sender<T>;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub enum Command {
    Bind { surface: Surface, dataset: Dataset },
    Toggle { control: ControlId },
    Prime { user: UserId },
    OpenDetail { dataset: Dataset },
    CloseDetail,
    Snapshot,
}

pub struct SyncCommand {
    pub cmd: Command,
    pub resp: Option<Responder<EngineReply>>,
}

/// Outcome of a [`Command`], sent back over the responder.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub enum EngineReply {
    Bound { control: Option<ControlId> },
    Toggled { post: PostId, liked: bool, count: u32 },
    Skipped { reason: String },
    Primed { liked_posts: usize },
    DetailOpened { post: PostId, control: ControlId },
    DetailClosed,
    Snapshot { controls: Vec<LikeControl> },
}

impl std::fmt::Display for EngineReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineReply::Bound { control: Some(id) } => write!(f, "bound control {id}"),
            EngineReply::Bound { control: None } => write!(f, "control not bound"),
            EngineReply::Toggled { post, liked, count } => {
                write!(f, "post {post}: liked={liked} count={count}")
            }
            EngineReply::Skipped { reason } => write!(f, "skipped: {reason}"),
            EngineReply::Primed { liked_posts } => {
                write!(f, "primed {liked_posts} liked post(s)")
            }
            EngineReply::DetailOpened { post, control } => {
                write!(f, "detail open for post {post} (control {control})")
            }
            EngineReply::DetailClosed => write!(f, "detail closed"),
            EngineReply::Snapshot { controls } => {
                for control in controls {
                    writeln!(f, "{control}")?;
                }
                Ok(())
            }
        }
    }
}
