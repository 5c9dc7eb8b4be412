//! This module defines the `LikeControl` struct, one on-screen like
//! affordance bound to a (post, user) pair.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::{CurtidasError, CurtidasResult, PostId, UserId};

/// Accepted spellings for the post id attribute. The feed templates
/// emit `data-post-id`, the detail overlay emits `data-postid`.
pub const POST_ID_KEYS: [&str; 2] = ["data-post-id", "data-postid"];
/// Accepted spellings for the user id attribute.
pub const USER_ID_KEYS: [&str; 2] = ["data-user-id", "data-userid"];

pub const LIKED_KEY: &str = "data-favoritado";
pub const LIKES_KEY: &str = "data-likes";

/// The `data-*` attribute map a control or thumbnail was rendered with.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Dataset(HashMap<String, String>);

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// First value present under any of the given spellings.
    pub fn first_of<'s>(&'s self, keys: &[&'static str]) -> Option<(&'static str, &'s str)> {
        keys.iter()
            .find_map(|key| self.0.get(*key).map(|val| (*key, val.as_str())))
    }

    /// Whether the attribute holds a truthy marker.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .map(|val| val.eq_ignore_ascii_case("true") || val == "1")
            .unwrap_or(false)
    }

    /// Copy `keys` from `other` for every spelling this map lacks.
    /// Used when a feed control carries no ids of its own and borrows
    /// them from the open detail overlay.
    pub fn fill_missing(&mut self, other: &Dataset, keys: &[&[&'static str]]) {
        for spellings in keys {
            if self.first_of(spellings).is_some() {
                continue;
            }
            if let Some((key, val)) = other.first_of(spellings) {
                self.0.insert(key.to_string(), val.to_string());
            }
        }
    }

    fn parse_id(&self, keys: &[&'static str]) -> CurtidasResult<Option<u64>> {
        match self.first_of(keys) {
            None => Ok(None),
            Some((key, val)) => {
                let id = val
                    .parse::<u64>()
                    .map_err(|_| CurtidasError::InvalidDatasetValue {
                        key: key.into(),
                        value: val.into(),
                    })?;
                Ok(Some(id))
            }
        }
    }
}

impl From<HashMap<String, String>> for Dataset {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

/// Where on screen a control lives. Controls on different surfaces for
/// the same post belong to the same fan-out group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Feed,
    Modal,
}

impl FromStr for Surface {
    type Err = CurtidasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feed" => Ok(Surface::Feed),
            "modal" => Ok(Surface::Modal),
            other => Err(CurtidasError::custom_error(format!(
                "Unknown surface: {other}"
            ))),
        }
    }
}

impl Display for Surface {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Surface::Feed => write!(f, "feed"),
            Surface::Modal => write!(f, "modal"),
        }
    }
}

/// Handle of a bound control, assigned by the registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct ControlId(pub u32);

impl Display for ControlId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One like affordance. `liked` is an explicit typed field, never
/// inferred from rendering state.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LikeControl {
    pub(crate) id: ControlId,
    pub surface: Surface,
    pub post_id: PostId,
    pub user_id: Option<UserId>,
    pub liked: bool,
    pub count: u32,
}

impl LikeControl {
    /// Build a control from the attributes it was rendered with. The
    /// post id is required; everything else degrades to defaults.
    pub fn from_dataset(surface: Surface, dataset: &Dataset) -> CurtidasResult<Self> {
        let post_id = dataset
            .parse_id(&POST_ID_KEYS)?
            .ok_or(CurtidasError::MissingPostId)?;
        let user_id = dataset.parse_id(&USER_ID_KEYS)?;
        let count = match dataset.get(LIKES_KEY) {
            None => 0,
            Some(val) => val
                .parse::<u32>()
                .map_err(|_| CurtidasError::InvalidDatasetValue {
                    key: LIKES_KEY.into(),
                    value: val.into(),
                })?,
        };

        Ok(LikeControl {
            id: ControlId(0),
            surface,
            post_id,
            user_id,
            liked: dataset.flag(LIKED_KEY),
            count,
        })
    }

    pub fn id(&self) -> ControlId {
        self.id
    }
}

impl Display for LikeControl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let marker = if self.liked { "liked" } else { "not liked" };
        write!(
            f,
            "#{} [{}] post {}: {} ({} likes)",
            self.id, self.surface, self.post_id, marker, self.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(pairs: &[(&str, &str)]) -> Dataset {
        let mut ds = Dataset::new();
        for (key, val) in pairs {
            ds.insert(*key, *val);
        }
        ds
    }

    #[test]
    fn parses_feed_spelling() {
        let ds = dataset(&[
            ("data-post-id", "12"),
            ("data-user-id", "3"),
            ("data-likes", "6"),
            ("data-favoritado", "true"),
        ]);
        let control = LikeControl::from_dataset(Surface::Feed, &ds).unwrap();
        assert_eq!(control.post_id, 12);
        assert_eq!(control.user_id, Some(3));
        assert_eq!(control.count, 6);
        assert!(control.liked);
    }

    #[test]
    fn falls_back_to_overlay_spelling() {
        let ds = dataset(&[("data-postid", "7"), ("data-userid", "2")]);
        let control = LikeControl::from_dataset(Surface::Modal, &ds).unwrap();
        assert_eq!(control.post_id, 7);
        assert_eq!(control.user_id, Some(2));
        assert_eq!(control.count, 0);
        assert!(!control.liked);
    }

    #[test]
    fn missing_post_id_is_an_error() {
        let ds = dataset(&[("data-user-id", "2")]);
        let result = LikeControl::from_dataset(Surface::Feed, &ds);
        assert!(result.is_err());
    }

    #[test]
    fn unparseable_id_is_an_error() {
        let ds = dataset(&[("data-post-id", "doze")]);
        assert!(LikeControl::from_dataset(Surface::Feed, &ds).is_err());
    }

    #[test]
    fn fill_missing_borrows_overlay_ids() {
        let mut ds = dataset(&[("data-likes", "4")]);
        let overlay = dataset(&[("data-postid", "9"), ("data-userid", "5")]);
        ds.fill_missing(&overlay, &[&POST_ID_KEYS, &USER_ID_KEYS]);

        let control = LikeControl::from_dataset(Surface::Feed, &ds).unwrap();
        assert_eq!(control.post_id, 9);
        assert_eq!(control.user_id, Some(5));
        assert_eq!(control.count, 4);
    }
}
