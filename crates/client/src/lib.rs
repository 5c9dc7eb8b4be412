mod error;
pub mod api;
pub mod forms;
pub mod sync;

pub use error::ClientError;

use std::collections::HashMap;
use std::path::Path;

use curtidas_core::control::{Dataset, Surface};
use curtidas_core::{EngineReply, Responder};

/// Sending a reply over a oneshot channel returns the input value as
/// the error, so there is nothing useful to handle.
pub fn respond(resp: Option<Responder<EngineReply>>, reply: EngineReply) {
    if let Some(resp) = resp {
        let _ = resp.send(reply);
    }
}

/// Read the controls a page was rendered with from a JSON fixture: an
/// array of attribute maps, each with an optional `surface` key. This
/// stands in for the server-rendered markup the original read its
/// datasets from.
pub fn load_controls(path: &Path) -> anyhow::Result<Vec<(Surface, Dataset)>> {
    let buf = std::fs::read_to_string(path)?;
    let raw: Vec<HashMap<String, String>> = serde_json::from_str(&buf)?;

    let mut controls = Vec::with_capacity(raw.len());
    for mut map in raw {
        let surface = match map.remove("surface") {
            Some(name) => name.parse::<Surface>()?,
            None => Surface::Feed,
        };
        controls.push((surface, Dataset::from(map)));
    }
    Ok(controls)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_parses_surfaces_and_datasets() {
        let dir = std::env::temp_dir().join("curtidas-fixture-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("controls.json");
        std::fs::write(
            &path,
            r#"[
                {"surface": "feed", "data-post-id": "12", "data-user-id": "3", "data-likes": "5"},
                {"data-post-id": "13", "data-user-id": "3"}
            ]"#,
        )
        .unwrap();

        let controls = load_controls(&path).unwrap();
        assert_eq!(controls.len(), 2);
        assert_eq!(controls[0].0, Surface::Feed);
        assert_eq!(controls[1].0, Surface::Feed);
        assert_eq!(controls[0].1.get("data-post-id"), Some("12"));
    }

    #[test]
    fn fixture_rejects_unknown_surface() {
        let dir = std::env::temp_dir().join("curtidas-fixture-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(&path, r#"[{"surface": "sidebar", "data-post-id": "1"}]"#).unwrap();

        assert!(load_controls(&path).is_err());
    }
}
