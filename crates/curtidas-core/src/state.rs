use serde::{Deserialize, Serialize};

/// Authoritative new count returned by a like/unlike request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub struct ToggleResult {
    pub total_likes: u32,
}

/// One element of the favorites listing. The backend sends more
/// fields; only the post reference matters here.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FavoriteEntry {
    pub id_postagem: u64,
}

/// Reply to the profile-image upload.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UploadedImage {
    pub url: String,
}

/// Success body of calls that may carry a human-readable note.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ServerMessage {
    pub message: Option<String>,
}

/// Error payload of the backend. `detail` arrives either as a plain
/// string or as a validation array of `{msg}` objects; some routes use
/// `message` instead. Decoded defensively: an unreadable body becomes
/// the empty default rather than a second error.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ErrorBody {
    pub detail: Option<Detail>,
    pub message: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum Detail {
    Text(String),
    Items(Vec<DetailItem>),
}

#[derive(Deserialize, Debug, Clone)]
pub struct DetailItem {
    pub msg: String,
}

impl ErrorBody {
    pub fn from_json_slice(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_default()
    }

    /// Best human-readable detail the payload offers.
    pub fn detail(&self) -> Option<String> {
        match &self.detail {
            Some(Detail::Text(text)) => Some(text.clone()),
            Some(Detail::Items(items)) => items.first().map(|item| item.msg.clone()),
            None => self.message.clone(),
        }
    }

    /// First entry of a validation-error array, if that is the shape
    /// this payload has.
    pub fn first_validation_msg(&self) -> Option<&str> {
        match &self.detail {
            Some(Detail::Items(items)) => items.first().map(|item| item.msg.as_str()),
            _ => None,
        }
    }
}
