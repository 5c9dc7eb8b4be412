//! The single global notification banner. At most one message is ever
//! visible; a newer message pre-empts the pending dismiss timer of the
//! old one regardless of kind.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::constant::{FAILURE_BANNER_MS, SUCCESS_BANNER_MS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FeedbackMessage {
    pub text: String,
    pub kind: FeedbackKind,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl FeedbackMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: FeedbackKind::Success,
            duration: Duration::from_millis(SUCCESS_BANNER_MS),
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: FeedbackKind::Failure,
            duration: Duration::from_millis(FAILURE_BANNER_MS),
        }
    }

    pub fn lasting(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, ser: S) -> Result<S::Ok, S::Error> {
        (value.as_millis() as u64).serialize(ser)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(de)?))
    }
}

/// Owns the banner state and its one dismiss timer. `show` replaces
/// whatever is pending, so the timer handle can never leak or fire for
/// a superseded message.
#[derive(Debug)]
pub struct Notifier {
    current: watch::Sender<Option<FeedbackMessage>>,
    dismiss: Option<JoinHandle<()>>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current,
            dismiss: None,
        }
    }

    /// Observe the currently visible banner; `None` means dismissed.
    pub fn subscribe(&self) -> watch::Receiver<Option<FeedbackMessage>> {
        self.current.subscribe()
    }

    /// Display `message` and schedule its auto-dismissal, cancelling
    /// any dismissal still pending for an earlier message.
    pub fn show(&mut self, message: FeedbackMessage) {
        if let Some(pending) = self.dismiss.take() {
            pending.abort();
        }

        let duration = message.duration;
        self.current.send_replace(Some(message));

        let sender = self.current.clone();
        self.dismiss = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            sender.send_replace(None);
        }));
    }

    /// The banner's close button.
    pub fn dismiss_now(&mut self) {
        if let Some(pending) = self.dismiss.take() {
            pending.abort();
        }
        self.current.send_replace(None);
    }

    pub fn visible(&self) -> Option<FeedbackMessage> {
        self.current.borrow().clone()
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        if let Some(pending) = self.dismiss.take() {
            pending.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn message_auto_dismisses() {
        let mut notifier = Notifier::new();
        notifier.show(FeedbackMessage::success("ok").lasting(Duration::from_millis(20)));
        assert!(notifier.visible().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(notifier.visible().is_none());
    }

    #[tokio::test]
    async fn newer_message_preempts_older_timer() {
        let mut notifier = Notifier::new();
        notifier.show(FeedbackMessage::failure("first").lasting(Duration::from_millis(30)));
        notifier.show(FeedbackMessage::success("second").lasting(Duration::from_millis(200)));

        // past the first message's deadline: its timer must not have
        // dismissed the replacement
        tokio::time::sleep(Duration::from_millis(80)).await;
        let visible = notifier.visible().unwrap();
        assert_eq!(visible.text, "second");
    }

    #[tokio::test]
    async fn dismiss_now_clears_immediately() {
        let mut notifier = Notifier::new();
        notifier.show(FeedbackMessage::success("ok"));
        notifier.dismiss_now();
        assert!(notifier.visible().is_none());
    }
}
