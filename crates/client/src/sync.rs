//! The like-state synchronizer engine. Commands arrive over a channel,
//! toggles run as their own tasks so a slow backend never blocks the
//! rest of the UI, and every confirmed change fans out through the
//! shared registry.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use curtidas_core::config::CurtidasConfig;
use curtidas_core::control::{
    ControlId, Dataset, LikeControl, Surface, POST_ID_KEYS, USER_ID_KEYS,
};
use curtidas_core::detail::PostDetail;
use curtidas_core::feedback::{FeedbackMessage, Notifier};
use curtidas_core::registry::ControlRegistry;
use curtidas_core::{Command, EngineReply, PostId, SyncCommand, UserId};

use crate::api::{ApiError, BackendApi};
use crate::respond;

pub const MSG_SIGN_IN: &str = "Por favor, faça login para curtir esta postagem";
pub const MSG_TOGGLE_ERROR: &str = "Ocorreu um erro ao processar seu like";

pub type SharedRegistry = Arc<Mutex<ControlRegistry>>;
pub type SharedNotifier = Arc<Mutex<Notifier>>;

struct OverlayState {
    detail: PostDetail,
    control: ControlId,
}

pub struct Engine {
    api: Arc<dyn BackendApi>,
    registry: SharedRegistry,
    notifier: SharedNotifier,
    config: Arc<CurtidasConfig>,
    overlay: Option<OverlayState>,
}

impl Engine {
    pub fn new(api: Arc<dyn BackendApi>, config: CurtidasConfig) -> Self {
        Self {
            api,
            registry: Arc::new(Mutex::new(ControlRegistry::new())),
            notifier: Arc::new(Mutex::new(Notifier::new())),
            config: Arc::new(config),
            overlay: None,
        }
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn notifier(&self) -> SharedNotifier {
        self.notifier.clone()
    }

    fn failure_banner(&self) -> Duration {
        Duration::from_millis(self.config.failure_banner_ms)
    }

    /// Bind a feed control from the attributes it was rendered with.
    /// Ids missing from the dataset are borrowed from the open detail
    /// overlay; a control that still lacks a post or user id is left
    /// unbound, exactly one handler is attached otherwise.
    pub fn bind_dataset(&mut self, surface: Surface, mut dataset: Dataset) -> Option<ControlId> {
        if let Some(overlay) = &self.overlay {
            dataset.fill_missing(&overlay.detail.control_dataset(), &[&POST_ID_KEYS, &USER_ID_KEYS]);
        }
        let control = match LikeControl::from_dataset(surface, &dataset) {
            Ok(control) => control,
            Err(err) => {
                debug!("control not bound: {err}");
                return None;
            }
        };
        if control.user_id.is_none() {
            debug!("control for post {} has no user, not bound", control.post_id);
            return None;
        }
        Some(self.registry.lock().unwrap().bind(control))
    }

    /// Run one toggle to completion. The command loop spawns this; it
    /// is also awaited directly where the caller wants the outcome.
    pub async fn toggle(&self, id: ControlId) -> EngineReply {
        run_toggle(
            self.api.clone(),
            self.registry.clone(),
            self.notifier.clone(),
            self.failure_banner(),
            id,
        )
        .await
    }

    /// Mark everything the user has already favorited. Failures stay
    /// silent: the controls simply keep their rendered state.
    pub async fn prime(&self, user: UserId) -> EngineReply {
        run_prime(self.api.clone(), self.registry.clone(), user).await
    }

    /// Populate the overlay from a clicked thumbnail and register its
    /// like control into the post's fan-out group. Reopening replaces
    /// the previous detail, never stacks a second binding.
    pub fn open_detail(&mut self, dataset: &Dataset) -> EngineReply {
        let detail = match PostDetail::from_dataset(dataset) {
            Ok(detail) => detail,
            Err(err) => {
                warn!("thumbnail dataset rejected: {err}");
                return EngineReply::Skipped {
                    reason: "thumbnail dataset rejected".into(),
                };
            }
        };

        let control = LikeControl::from_dataset(Surface::Modal, &detail.control_dataset())
            .expect("control dataset built from a valid detail");
        let mut registry = self.registry.lock().unwrap();
        let control_id = match &self.overlay {
            Some(open) => {
                let id = open.control;
                registry
                    .rebind(id, control)
                    .expect("overlay control is bound while the overlay is open");
                id
            }
            None => registry.bind(control),
        };
        drop(registry);

        let post = detail.post_id;
        self.overlay = Some(OverlayState {
            detail,
            control: control_id,
        });
        EngineReply::DetailOpened {
            post,
            control: control_id,
        }
    }

    /// Click outside the content box.
    pub fn close_detail(&mut self) -> EngineReply {
        match self.overlay.take() {
            Some(open) => {
                self.registry.lock().unwrap().unbind(open.control);
                EngineReply::DetailClosed
            }
            None => EngineReply::Skipped {
                reason: "no detail open".into(),
            },
        }
    }

    pub fn snapshot(&self) -> EngineReply {
        EngineReply::Snapshot {
            controls: self.registry.lock().unwrap().snapshot(),
        }
    }
}

async fn run_prime(api: Arc<dyn BackendApi>, registry: SharedRegistry, user: UserId) -> EngineReply {
    match api.favorites(user).await {
        Ok(favorites) => {
            let liked: HashSet<PostId> = favorites.into_iter().map(|fav| fav.id_postagem).collect();
            let touched = registry.lock().unwrap().mark_liked(&liked);
            EngineReply::Primed {
                liked_posts: touched,
            }
        }
        Err(err) => {
            warn!("favorites listing failed: {err}");
            EngineReply::Skipped {
                reason: "favorites unavailable".into(),
            }
        }
    }
}

/// One full toggle interaction: guard, request, fan-out.
async fn run_toggle(
    api: Arc<dyn BackendApi>,
    registry: SharedRegistry,
    notifier: SharedNotifier,
    failure_banner: Duration,
    id: ControlId,
) -> EngineReply {
    let Some(control) = registry.lock().unwrap().get(id).cloned() else {
        return EngineReply::Skipped {
            reason: format!("no control bound with id {id}"),
        };
    };

    // hard guard, not a retry case
    let Some(user) = control.user_id else {
        notifier
            .lock()
            .unwrap()
            .show(FeedbackMessage::failure(MSG_SIGN_IN).lasting(failure_banner));
        return EngineReply::Skipped {
            reason: "sign-in required".into(),
        };
    };

    let post = control.post_id;
    let was_liked = control.liked;

    if !registry.lock().unwrap().begin_toggle(post) {
        debug!("toggle already in flight for post {post}, click dropped");
        return EngineReply::Skipped {
            reason: format!("toggle in flight for post {post}"),
        };
    }

    // the displayed state decides the verb; nothing is flipped until
    // the server has confirmed
    let result = if was_liked {
        api.unlike(post).await
    } else {
        api.like(user, post).await
    };
    registry.lock().unwrap().finish_toggle(post);

    match result {
        Ok(toggled) => {
            registry
                .lock()
                .unwrap()
                .apply_toggle(post, was_liked, toggled.total_likes);
            EngineReply::Toggled {
                post,
                liked: !was_liked,
                count: toggled.total_likes,
            }
        }
        Err(ApiError::Server { status, body }) => {
            let text = match body.detail() {
                Some(detail) => format!("Erro: {detail}"),
                None => MSG_TOGGLE_ERROR.to_string(),
            };
            debug!("toggle rejected with HTTP {status}");
            notifier
                .lock()
                .unwrap()
                .show(FeedbackMessage::failure(text).lasting(failure_banner));
            EngineReply::Skipped {
                reason: format!("rejected with HTTP {status}"),
            }
        }
        Err(err) => {
            warn!("toggle failed: {err}");
            notifier
                .lock()
                .unwrap()
                .show(FeedbackMessage::failure(MSG_TOGGLE_ERROR).lasting(failure_banner));
            EngineReply::Skipped {
                reason: "transport error".into(),
            }
        }
    }
}

/// Command loop. Toggles and primes run as their own tasks; binding and
/// overlay bookkeeping mutate the engine in place.
pub async fn run(mut engine: Engine, mut rx: mpsc::Receiver<SyncCommand>) {
    debug!("sync engine running...");
    while let Some(SyncCommand { cmd, resp }) = rx.recv().await {
        match cmd {
            Command::Bind { surface, dataset } => {
                let control = engine.bind_dataset(surface, dataset);
                respond(resp, EngineReply::Bound { control });
            }

            Command::Toggle { control } => {
                let api = engine.api.clone();
                let registry = engine.registry.clone();
                let notifier = engine.notifier.clone();
                let failure_banner = engine.failure_banner();
                tokio::spawn(async move {
                    let reply =
                        run_toggle(api, registry, notifier, failure_banner, control).await;
                    respond(resp, reply);
                });
            }

            Command::Prime { user } => {
                let api = engine.api.clone();
                let registry = engine.registry.clone();
                tokio::spawn(async move {
                    respond(resp, run_prime(api, registry, user).await);
                });
            }

            Command::OpenDetail { dataset } => {
                let reply = engine.open_detail(&dataset);
                respond(resp, reply);
            }

            Command::CloseDetail => {
                let reply = engine.close_detail();
                respond(resp, reply);
            }

            Command::Snapshot => {
                let reply = engine.snapshot();
                respond(resp, reply);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{server_error, FakeApi};
    use curtidas_core::state::{FavoriteEntry, ToggleResult};

    fn dataset(pairs: &[(&str, &str)]) -> Dataset {
        let mut ds = Dataset::new();
        for (key, val) in pairs {
            ds.insert(*key, *val);
        }
        ds
    }

    fn engine_with(api: FakeApi) -> (Engine, Arc<FakeApi>) {
        let api = Arc::new(api);
        let engine = Engine::new(api.clone(), CurtidasConfig::default());
        (engine, api)
    }

    fn feed_control(engine: &mut Engine, post: &str, user: Option<&str>, count: &str) -> ControlId {
        let mut pairs = vec![("data-post-id", post), ("data-likes", count)];
        if let Some(user) = user {
            pairs.push(("data-user-id", user));
        }
        engine
            .bind_dataset(Surface::Feed, dataset(&pairs))
            .expect("control should bind")
    }

    #[tokio::test]
    async fn successful_like_fans_out_to_every_sibling() {
        let (mut engine, api) = engine_with(
            FakeApi::default().like_replies([Ok(ToggleResult { total_likes: 6 })]),
        );
        let feed = feed_control(&mut engine, "12", Some("3"), "5");
        let opened = engine.open_detail(&dataset(&[
            ("data-postid", "12"),
            ("data-userid", "3"),
            ("data-likes", "5"),
        ]));
        let EngineReply::DetailOpened { control: modal, .. } = opened else {
            panic!("detail should open");
        };

        let reply = engine.toggle(feed).await;

        assert!(matches!(
            reply,
            EngineReply::Toggled {
                post: 12,
                liked: true,
                count: 6
            }
        ));
        let registry = engine.registry();
        let registry = registry.lock().unwrap();
        for id in [feed, modal] {
            let control = registry.get(id).unwrap();
            assert!(control.liked);
            assert_eq!(control.count, 6);
        }
        assert_eq!(api.call_log(), vec!["like 3/12"]);
    }

    #[tokio::test]
    async fn failed_unlike_leaves_every_control_untouched() {
        let (mut engine, api) = engine_with(FakeApi::default().unlike_replies([Err(
            server_error(500, br#"{"detail": "server error"}"#),
        )]));
        let feed = {
            let ds = dataset(&[
                ("data-post-id", "12"),
                ("data-user-id", "3"),
                ("data-likes", "6"),
                ("data-favoritado", "true"),
            ]);
            engine.bind_dataset(Surface::Feed, ds).unwrap()
        };

        let reply = engine.toggle(feed).await;

        assert!(matches!(reply, EngineReply::Skipped { .. }));
        let registry = engine.registry();
        let control = registry.lock().unwrap().get(feed).cloned().unwrap();
        assert!(control.liked);
        assert_eq!(control.count, 6);
        assert_eq!(api.call_log(), vec!["unlike 12"]);

        let visible = engine.notifier().lock().unwrap().visible().unwrap();
        assert_eq!(visible.text, "Erro: server error");
    }

    #[tokio::test]
    async fn like_then_unlike_returns_to_original_state() {
        let (mut engine, _api) = engine_with(
            FakeApi::default()
                .like_replies([Ok(ToggleResult { total_likes: 6 })])
                .unlike_replies([Ok(ToggleResult { total_likes: 5 })]),
        );
        let feed = feed_control(&mut engine, "12", Some("3"), "5");

        engine.toggle(feed).await;
        engine.toggle(feed).await;

        let registry = engine.registry();
        let control = registry.lock().unwrap().get(feed).cloned().unwrap();
        assert!(!control.liked);
        assert_eq!(control.count, 5);
    }

    #[tokio::test]
    async fn toggle_without_user_never_reaches_the_network() {
        let (mut engine, api) = engine_with(FakeApi::default());
        // modal controls bind even without a user; the guard fires on click
        let opened = engine.open_detail(&dataset(&[("data-postid", "4")]));
        let EngineReply::DetailOpened { control, .. } = opened else {
            panic!("detail should open");
        };

        let reply = engine.toggle(control).await;

        assert!(matches!(reply, EngineReply::Skipped { .. }));
        assert!(api.call_log().is_empty());
        let visible = engine.notifier().lock().unwrap().visible().unwrap();
        assert_eq!(visible.text, MSG_SIGN_IN);
    }

    #[tokio::test]
    async fn transport_error_shows_generic_notice_and_mutates_nothing() {
        let (mut engine, _api) = engine_with(
            FakeApi::default().like_replies([Err(ApiError::Decode("bad json".into()))]),
        );
        let feed = feed_control(&mut engine, "12", Some("3"), "5");

        engine.toggle(feed).await;

        let registry = engine.registry();
        let control = registry.lock().unwrap().get(feed).cloned().unwrap();
        assert!(!control.liked);
        assert_eq!(control.count, 5);
        let visible = engine.notifier().lock().unwrap().visible().unwrap();
        assert_eq!(visible.text, MSG_TOGGLE_ERROR);
    }

    #[tokio::test]
    async fn second_click_while_in_flight_is_dropped() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let started = Arc::new(tokio::sync::Notify::new());
        let (mut engine, api) = engine_with(
            FakeApi::default()
                .like_replies([Ok(ToggleResult { total_likes: 6 })])
                .gated(gate.clone(), started.clone()),
        );
        let feed = feed_control(&mut engine, "12", Some("3"), "5");
        let engine = Arc::new(engine);

        let racing = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.toggle(feed).await })
        };
        started.notified().await;

        // a second click lands while the first request is in flight
        let reply = engine.toggle(feed).await;
        assert!(matches!(reply, EngineReply::Skipped { .. }));

        gate.notify_one();
        let first = racing.await.unwrap();
        assert!(matches!(first, EngineReply::Toggled { count: 6, .. }));
        assert_eq!(api.call_log(), vec!["like 3/12"]);
    }

    #[tokio::test]
    async fn prime_marks_listed_favorites() {
        let (mut engine, _api) = engine_with(FakeApi::default().favorites_reply(Ok(vec![
            FavoriteEntry { id_postagem: 1 },
            FavoriteEntry { id_postagem: 3 },
        ])));
        let first = feed_control(&mut engine, "1", Some("9"), "0");
        let second = feed_control(&mut engine, "2", Some("9"), "0");

        let reply = engine.prime(9).await;

        assert!(matches!(reply, EngineReply::Primed { liked_posts: 1 }));
        let registry = engine.registry();
        let registry = registry.lock().unwrap();
        assert!(registry.get(first).unwrap().liked);
        assert!(!registry.get(second).unwrap().liked);
    }

    #[tokio::test]
    async fn prime_failure_stays_silent() {
        let (mut engine, _api) = engine_with(
            FakeApi::default().favorites_reply(Err(server_error(500, b"{}"))),
        );
        feed_control(&mut engine, "1", Some("9"), "0");

        let reply = engine.prime(9).await;

        assert!(matches!(reply, EngineReply::Skipped { .. }));
        assert!(engine.notifier().lock().unwrap().visible().is_none());
    }

    #[tokio::test]
    async fn feed_control_without_ids_borrows_from_open_overlay() {
        let (mut engine, _api) = engine_with(FakeApi::default());
        engine.open_detail(&dataset(&[("data-postid", "7"), ("data-userid", "2")]));

        let bound = engine.bind_dataset(Surface::Feed, dataset(&[("data-likes", "1")]));
        let id = bound.expect("overlay ids should fill the gap");

        let registry = engine.registry();
        let control = registry.lock().unwrap().get(id).cloned().unwrap();
        assert_eq!(control.post_id, 7);
        assert_eq!(control.user_id, Some(2));
    }

    #[tokio::test]
    async fn reopening_detail_replaces_the_modal_binding() {
        let (mut engine, _api) = engine_with(FakeApi::default());
        let first = engine.open_detail(&dataset(&[("data-postid", "7"), ("data-userid", "2")]));
        let second = engine.open_detail(&dataset(&[("data-postid", "8"), ("data-userid", "2")]));

        let EngineReply::DetailOpened { control: a, .. } = first else {
            panic!()
        };
        let EngineReply::DetailOpened {
            control: b,
            post: 8,
        } = second
        else {
            panic!()
        };
        assert_eq!(a, b);
        assert_eq!(engine.registry().lock().unwrap().len(), 1);

        let closed = engine.close_detail();
        assert!(matches!(closed, EngineReply::DetailClosed));
        assert!(engine.registry().lock().unwrap().is_empty());
    }
}
