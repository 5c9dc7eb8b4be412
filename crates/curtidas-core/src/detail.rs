//! Static fields of the post-detail overlay, populated from the
//! clicked thumbnail's data attributes. Purely presentational; the
//! overlay's like control joins the regular fan-out group.

use std::fmt::{Display, Formatter};

use textwrap::core::display_width;
use textwrap::wrap;

use crate::constant::DETAIL_TEXT_WIDTH;
use crate::control::{Dataset, LikeControl, Surface};
use crate::{CurtidasResult, PostId, UserId};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PostDetail {
    pub post_id: PostId,
    pub user_id: Option<UserId>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub category_slug: String,
    pub date: String,
    pub username: String,
    pub avatar: String,
    pub liked: bool,
    pub likes: u32,
    pub comments: u32,
}

impl PostDetail {
    /// The most recently clicked thumbnail wins; there is no merging
    /// with a previously open detail.
    pub fn from_dataset(dataset: &Dataset) -> CurtidasResult<Self> {
        // ids and counts share the like-control parsing rules
        let control = LikeControl::from_dataset(Surface::Modal, dataset)?;
        let text = |key: &str| dataset.get(key).unwrap_or_default().to_string();

        Ok(PostDetail {
            post_id: control.post_id,
            user_id: control.user_id,
            title: text("data-title"),
            description: text("data-description"),
            category: text("data-category"),
            category_slug: text("data-categoryslug"),
            date: text("data-date"),
            username: text("data-username"),
            avatar: text("data-avatar"),
            liked: control.liked,
            likes: control.count,
            comments: dataset
                .get("data-comments")
                .and_then(|val| val.parse().ok())
                .unwrap_or(0),
        })
    }

    /// The dataset the overlay's own like control is bound from.
    pub fn control_dataset(&self) -> Dataset {
        let mut ds = Dataset::new();
        ds.insert("data-postid", self.post_id.to_string());
        if let Some(user) = self.user_id {
            ds.insert("data-userid", user.to_string());
        }
        ds.insert("data-likes", self.likes.to_string());
        if self.liked {
            ds.insert("data-favoritado", "true");
        }
        ds
    }
}

impl Display for PostDetail {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:-<54}\n", "")?;
        write!(f, "\\ {:^50} /\n", self.title)?;
        write!(f, "/ {:^50} \\\n", format!("{} em {}", self.username, self.date))?;
        let mut count = 0u8;
        let wrapping_config = textwrap::Options::new(DETAIL_TEXT_WIDTH).break_words(true);
        for line in wrap(&self.description, wrapping_config) {
            let (left_closure, right_closure) = if count % 2 == 0 {
                ("\\ ", " /")
            } else {
                ("/ ", " \\")
            };
            let text_width = display_width(&line);
            let whitespace = DETAIL_TEXT_WIDTH.saturating_sub(text_width);
            write!(
                f,
                "{left_closure}{}{}{right_closure}\n",
                line,
                " ".repeat(whitespace)
            )?;
            count += 1;
        }
        write!(
            f,
            "\\ {:<50} /\n",
            format!("[{}] {} likes, {} comments", self.category, self.likes, self.comments)
        )?;
        write!(f, "{:-<54}", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thumbnail() -> Dataset {
        let mut ds = Dataset::new();
        ds.insert("data-postid", "12");
        ds.insert("data-userid", "3");
        ds.insert("data-title", "Cesta de verduras");
        ds.insert("data-description", "Sobras da feira de quarta, retirar ate sexta.");
        ds.insert("data-category", "Hortifruti");
        ds.insert("data-categoryslug", "hortifruti");
        ds.insert("data-date", "2024-11-20");
        ds.insert("data-username", "rafa");
        ds.insert("data-avatar", "/static/avatars/rafa.png");
        ds.insert("data-likes", "6");
        ds.insert("data-comments", "2");
        ds
    }

    #[test]
    fn populates_every_static_field() {
        let detail = PostDetail::from_dataset(&thumbnail()).unwrap();
        assert_eq!(detail.post_id, 12);
        assert_eq!(detail.user_id, Some(3));
        assert_eq!(detail.title, "Cesta de verduras");
        assert_eq!(detail.category_slug, "hortifruti");
        assert_eq!(detail.likes, 6);
        assert_eq!(detail.comments, 2);
    }

    #[test]
    fn control_dataset_round_trips_into_a_modal_control() {
        let detail = PostDetail::from_dataset(&thumbnail()).unwrap();
        let control =
            LikeControl::from_dataset(Surface::Modal, &detail.control_dataset()).unwrap();
        assert_eq!(control.post_id, 12);
        assert_eq!(control.user_id, Some(3));
        assert_eq!(control.count, 6);
    }

    #[test]
    fn detail_formatting_using_display() {
        let detail = PostDetail::from_dataset(&thumbnail()).unwrap();
        let rendered = format!("{detail}");
        assert!(rendered.contains("Cesta de verduras"));
        assert!(rendered.contains("2 comments"));
    }
}
