//! Share-link encoding.
//!
//! A shared link reopens the navigation page centred on the sharer's last
//! location: `/pages/mapa/mapa?fcid=<floor>&flat=<lat>&flng=<lng>`.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Canonical navigation page path
pub const DEFAULT_SHARE_PATH: &str = "/pages/mapa/mapa";

/// Share card title
pub const SHARE_TITLE: &str = "IndoorGo 导航";

/// Location echoed from the web page to the mini-program.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SharedLocation {
    /// Floor (cartogram) the location lies on
    #[serde(rename = "cid")]
    pub floor_id: String,
    pub lng: f64,
    pub lat: f64,
}

/// Payload returned to the share hook.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareMessage {
    pub title: String,
    pub path: String,
}

/// Build the share path; bare `base_path` when no location is known.
pub fn share_path(base_path: &str, location: Option<&SharedLocation>) -> String {
    let Some(loc) = location else {
        return base_path.to_string();
    };
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("fcid", &loc.floor_id)
        .append_pair("flat", &loc.lat.to_string())
        .append_pair("flng", &loc.lng.to_string())
        .finish();
    format!("{}?{}", base_path, query)
}

/// Share message for `location` under the default title.
pub fn share_message(base_path: &str, location: Option<&SharedLocation>) -> ShareMessage {
    ShareMessage {
        title: SHARE_TITLE.to_string(),
        path: share_path(base_path, location),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_path_without_location() {
        assert_eq!(share_path(DEFAULT_SHARE_PATH, None), "/pages/mapa/mapa");
    }

    #[test]
    fn test_query_order_and_values() {
        let loc = SharedLocation {
            floor_id: "F3".into(),
            lng: 113.25,
            lat: 23.5,
        };
        assert_eq!(
            share_path(DEFAULT_SHARE_PATH, Some(&loc)),
            "/pages/mapa/mapa?fcid=F3&flat=23.5&flng=113.25"
        );
    }

    #[test]
    fn test_floor_id_is_escaped() {
        let loc = SharedLocation {
            floor_id: "a b&c".into(),
            lng: 0.0,
            lat: 0.0,
        };
        assert!(share_path("/p", Some(&loc)).starts_with("/p?fcid=a+b%26c&"));
    }

    #[test]
    fn test_page_message_field_name() {
        let loc: SharedLocation =
            serde_json::from_str(r#"{"cid":"F3","lng":1.5,"lat":2.5}"#).unwrap();
        assert_eq!(loc.floor_id, "F3");
    }
}
