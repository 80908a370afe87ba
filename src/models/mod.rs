use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Backend identifiers are opaque. The current backend issues integers, some
/// responses send them as strings, and either form is kept verbatim.
fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Str(String),
    }

    let id = match RawId::deserialize(deserializer)? {
        RawId::Int(n) => n.to_string(),
        RawId::Str(s) => s.trim().to_string(),
    };
    if id.is_empty() {
        return Err(serde::de::Error::custom("empty id"));
    }
    Ok(id)
}

/// Integer-looking ids go back out as JSON numbers so integer-typed request
/// schemas accept them; anything else stays a string.
fn serialize_id<S: Serializer>(id: &str, serializer: S) -> Result<S::Ok, S::Error> {
    match id.parse::<i64>() {
        Ok(n) => serializer.serialize_i64(n),
        Err(_) => serializer.serialize_str(id),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("empty id")]
pub(crate) struct EmptyId;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[serde(transparent)]
        pub(crate) struct $name(
            #[serde(deserialize_with = "deserialize_id", serialize_with = "serialize_id")] String,
        );

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = EmptyId;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    "" => Err(EmptyId),
                    id => Ok($name(id.to_string())),
                }
            }
        }

        impl From<i64> for $name {
            fn from(n: i64) -> Self {
                $name(n.to_string())
            }
        }
    };
}

id_type!(
    /// Owner of diaries; issued by the backend at login.
    UserId
);
id_type!(
    /// Assigned by the backend when a diary is created.
    DiaryId
);
id_type!(
    /// A single comic panel ("cut" on the wire).
    PanelId
);

/// Creative parameters fixed at creation time.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct DiarySettings {
    pub character_note: String,
    pub genre: String,
    pub style: String,
    pub cuts_count: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Panel {
    pub panel_id: PanelId,

    /// 1-based, matches the position in `Diary::panels`.
    pub panel_number: u32,

    pub text: String,

    /// `None` while the image is still being generated.
    pub image_url: Option<String>,
}

/// A persisted diary as returned by the detail endpoint.
///
/// `full_story` and panel text only ever change by replacing the whole value
/// with a fresh server response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Diary {
    pub diary_id: DiaryId,
    pub user_id: Option<UserId>,
    pub original_content: String,
    pub full_story: String,
    pub settings: DiarySettings,
    pub panels: Vec<Panel>,
    pub created_at: Option<String>,
}

impl Diary {
    pub fn panel(&self, panel_id: &PanelId) -> Option<&Panel> {
        self.panels.iter().find(|p| &p.panel_id == panel_id)
    }

    /// Patch one panel's image in place. Returns false when the panel is gone.
    pub fn set_panel_image(&mut self, panel_id: &PanelId, image_url: String) -> bool {
        match self.panels.iter_mut().find(|p| &p.panel_id == panel_id) {
            Some(panel) => {
                panel.image_url = Some(image_url);
                true
            }
            None => false,
        }
    }

    pub fn pending_images(&self) -> usize {
        self.panels.iter().filter(|p| p.image_url.is_none()).count()
    }
}

/// List item from `GET /api/diaries`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct DiarySummary {
    #[serde(alias = "id")]
    pub diary_id: DiaryId,

    #[serde(default, alias = "original")]
    pub original_content: String,

    #[serde(default, alias = "llm")]
    pub full_story: Option<String>,

    #[serde(default, alias = "date")]
    pub created_at: Option<String>,
}

/// Unsaved compose-form contents. Panel count is kept as typed so validation
/// can report a bad value instead of silently coercing it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct DiaryDraft {
    pub original_content: String,
    pub character_note: String,
    pub genre: String,
    pub style: String,
    pub cuts: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diary_with_panels(n: u32) -> Diary {
        Diary {
            diary_id: DiaryId::from(1),
            user_id: Some(UserId::from(3)),
            original_content: "rainy day".to_string(),
            full_story: "the sky wept".to_string(),
            settings: DiarySettings {
                cuts_count: n,
                ..Default::default()
            },
            panels: (1..=n)
                .map(|i| Panel {
                    panel_id: PanelId::from(i as i64 * 10),
                    panel_number: i,
                    text: format!("panel {i}"),
                    image_url: None,
                })
                .collect(),
            created_at: None,
        }
    }

    #[test]
    fn test_ids_accept_numbers_and_strings() {
        let a: DiaryId = serde_json::from_str("15").expect("int id");
        let b: DiaryId = serde_json::from_str("\"15\"").expect("string id");
        assert_eq!(a, b);

        let opaque: DiaryId = serde_json::from_str("\"d-9f2c\"").expect("opaque id");
        assert_eq!(opaque.as_str(), "d-9f2c");
        assert!(serde_json::from_str::<DiaryId>("\"  \"").is_err());
    }

    #[test]
    fn test_ids_serialize_numbers_as_numbers() {
        assert_eq!(serde_json::to_value(PanelId::from(7)).expect("serialize"), serde_json::json!(7));
        let opaque: PanelId = "c-1".parse().expect("opaque");
        assert_eq!(serde_json::to_value(opaque).expect("serialize"), serde_json::json!("c-1"));
    }

    #[test]
    fn test_id_from_route_param() {
        assert_eq!("42".parse::<DiaryId>().ok(), Some(DiaryId::from(42)));
        assert_eq!("d-9f2c".parse::<DiaryId>().map(|d| d.to_string()), Ok("d-9f2c".to_string()));
        assert_eq!("".parse::<DiaryId>(), Err(EmptyId));
        assert_eq!(DiaryId::from(42).to_string(), "42");
    }

    #[test]
    fn test_set_panel_image_only_touches_target() {
        let mut d = diary_with_panels(3);
        assert!(d.set_panel_image(&PanelId::from(20), "https://x/20.png".to_string()));
        assert_eq!(d.panels[1].image_url.as_deref(), Some("https://x/20.png"));
        assert!(d.panels[0].image_url.is_none());
        assert!(d.panels[2].image_url.is_none());
        assert_eq!(d.pending_images(), 2);
    }

    #[test]
    fn test_set_panel_image_unknown_panel() {
        let mut d = diary_with_panels(2);
        let before = d.clone();
        assert!(!d.set_panel_image(&PanelId::from(99), "u".to_string()));
        assert_eq!(d, before);
    }

    #[test]
    fn test_summary_accepts_legacy_keys() {
        let json = r#"{"id": 2, "original": "pancakes", "llm": "a feast", "date": "2025. 11. 17"}"#;
        let s: DiarySummary = serde_json::from_str(json).expect("summary should parse");
        assert_eq!(s.diary_id, DiaryId::from(2));
        assert_eq!(s.original_content, "pancakes");
        assert_eq!(s.full_story.as_deref(), Some("a feast"));
        assert_eq!(s.created_at.as_deref(), Some("2025. 11. 17"));
    }
}
