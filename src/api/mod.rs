use crate::models::{Diary, DiaryId, DiarySettings, DiarySummary, Panel, PanelId, UserId};
use crate::session::Session;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    Unauthorized,
    NotFound,
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    pub(crate) fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    pub(crate) fn not_found(path: &str) -> Self {
        Self {
            kind: ApiErrorKind::NotFound,
            message: format!("Not found: {path}"),
        }
    }

    fn http(status: StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NotFound
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct EnvConfig {
    pub api_url: String,
    pub log_level: String,
}

impl EnvConfig {
    pub const DEFAULT_API_URL: &'static str = "http://localhost:8000";

    pub fn new() -> Self {
        // `window.ENV.API_URL` is the documented key; `api_url` is still accepted.
        let api_url = env_string("API_URL")
            .or_else(|| env_string("api_url"))
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| Self::DEFAULT_API_URL.to_string());

        let log_level = env_string("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Self { api_url, log_level }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a string from the deployment-provided `window.ENV` object.
fn env_string(key: &str) -> Option<String> {
    let env = web_sys::window()?.get("ENV")?;
    if env.is_undefined() || !env.is_object() {
        return None;
    }
    js_sys::Reflect::get(&env, &key.into())
        .ok()
        .and_then(|v| v.as_string())
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct SignupRequest {
    pub email: String,
    pub password: String,
    pub nickname: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct LoginResponse {
    pub access_token: String,
    pub nickname: String,
    pub user_id: UserId,
}

impl From<LoginResponse> for Session {
    fn from(r: LoginResponse) -> Self {
        Session {
            access_token: r.access_token,
            nickname: r.nickname,
            user_id: r.user_id,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct CreateDiaryRequest {
    pub user_id: UserId,
    pub original_content: String,
    pub genre: String,
    pub style: String,
    pub character_note: String,
    pub cuts_count: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct CreateDiaryResponse {
    pub diary_id: DiaryId,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct PanelTextUpdate {
    pub cut_id: PanelId,
    pub text: String,
}

/// Body of `PUT /api/diaries/{id}`.
///
/// The backend schema requires the story and every panel's text even though
/// only `original_content` is editable; they are echoed back unchanged.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct UpdateDiaryRequest {
    pub original_content: String,
    pub full_story: String,
    pub cuts: Vec<PanelTextUpdate>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct RegenerateDiaryRequest {
    pub original_content: String,
    pub user_id: UserId,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct RegenerateDiaryResponse {
    pub diary_id: DiaryId,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct RegeneratePanelRequest {
    /// Empty string asks the backend to reuse the panel's stored prompt.
    pub prompt_override: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct RegeneratePanelResponse {
    pub new_image_url: String,
}

/// The diary operations the lifecycle controller depends on.
pub(crate) trait DiaryGateway {
    async fn create_diary(&self, req: &CreateDiaryRequest) -> ApiResult<DiaryId>;
    async fn get_diary(&self, diary_id: &DiaryId) -> ApiResult<Diary>;
    async fn update_diary(&self, diary_id: &DiaryId, req: &UpdateDiaryRequest) -> ApiResult<Diary>;
    async fn regenerate_diary(
        &self,
        diary_id: &DiaryId,
        req: &RegenerateDiaryRequest,
    ) -> ApiResult<DiaryId>;
    async fn regenerate_panel(
        &self,
        panel_id: &PanelId,
        req: &RegeneratePanelRequest,
    ) -> ApiResult<String>;
    async fn delete_diary(&self, diary_id: &DiaryId) -> ApiResult<()>;
}

#[derive(Clone, Debug)]
pub(crate) struct ApiClient {
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
}

impl ApiClient {
    #[allow(dead_code)]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            token: None,
        }
    }

    pub fn from_session(base_url: String, session: Option<&Session>) -> Self {
        let token = session
            .map(|s| s.access_token.clone())
            .filter(|t| !t.trim().is_empty());
        Self { base_url, token }
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token).filter(|t| !t.trim().is_empty());
    }

    pub(crate) fn get_auth_token(&self) -> Option<String> {
        self.token.clone()
    }

    pub fn logout(&mut self) {
        self.token = None;
    }

    #[allow(dead_code)]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn with_auth_headers(
        mut req: reqwest::RequestBuilder,
        token: Option<String>,
    ) -> reqwest::RequestBuilder {
        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        req
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&impl Serialize>,
        ctx: &str,
    ) -> ApiResult<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("{method} {url}");

        let client = reqwest::Client::new();
        let mut req = client.request(method, url);
        req = Self::with_auth_headers(req, self.get_auth_token());

        if let Some(b) = body {
            req = req.json(b);
        }

        let res = req.send().await.map_err(ApiError::network)?;
        let status = res.status();

        if status.is_success() {
            Ok(res)
        } else if status == StatusCode::UNAUTHORIZED {
            Err(ApiError::unauthorized())
        } else if status == StatusCode::NOT_FOUND {
            Err(ApiError::not_found(path))
        } else {
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, ctx))
        }
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&impl Serialize>,
        ctx: &str,
    ) -> ApiResult<T> {
        let res = self.send(method, path, body, ctx).await?;
        res.json().await.map_err(ApiError::parse)
    }

    pub async fn signup(&self, req: &SignupRequest) -> ApiResult<Value> {
        self.request(Method::POST, "/api/users/signup", Some(req), "Signup failed")
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        self.request(
            Method::POST,
            "/api/auth/login",
            Some(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            }),
            "Login failed",
        )
        .await
    }

    pub async fn list_diaries(&self, user_id: &UserId) -> ApiResult<Vec<DiarySummary>> {
        let path = format!(
            "/api/diaries?user_id={}",
            urlencoding::encode(user_id.as_str())
        );
        let data: Value = self
            .request(Method::GET, &path, None::<&()>, "Loading diaries failed")
            .await?;
        Ok(Self::parse_diary_list_response(data))
    }

    /// Accepts a bare array or one wrapped in `diaries`/`items`. Entries
    /// without a usable id are skipped with a warning.
    pub(crate) fn parse_diary_list_response(data: Value) -> Vec<DiarySummary> {
        let list = data
            .as_array()
            .or_else(|| data.get("diaries").and_then(Value::as_array))
            .or_else(|| data.get("items").and_then(Value::as_array))
            .cloned()
            .unwrap_or_default();

        list.into_iter()
            .enumerate()
            .filter_map(|(index, item)| {
                serde_json::from_value::<DiarySummary>(item)
                    .map_err(|e| log::warn!("skipping diary list entry {index}: {e}"))
                    .ok()
            })
            .collect()
    }

    /// Decode the detail payload.
    ///
    /// Two shapes have been served: settings nested under `settings` (with
    /// `character`/`cuts`) or flattened onto the diary, and panels under
    /// `cuts` or `panels`.
    pub(crate) fn parse_diary_response(data: &Value) -> ApiResult<Diary> {
        let diary_id = id_field::<DiaryId>(data, &["diary_id", "id"])
            .ok_or_else(|| ApiError::parse(format!("diary response is missing diary_id: {data}")))?;

        let get_s = |v: &Value, keys: &[&str]| -> String {
            keys.iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str))
                .unwrap_or_default()
                .to_string()
        };

        let raw_panels = ["cuts", "panels"]
            .iter()
            .find_map(|k| data.get(*k).and_then(Value::as_array))
            .cloned()
            .unwrap_or_default();

        let mut panels: Vec<Panel> = Vec::with_capacity(raw_panels.len());
        for (index, item) in raw_panels.iter().enumerate() {
            let Some(panel_id) = id_field::<PanelId>(item, &["cut_id", "panel_id", "id"]) else {
                return Err(ApiError::parse(format!("panel {} is missing cut_id", index + 1)));
            };

            let panel_number = item
                .get("cut_number")
                .or_else(|| item.get("panel_number"))
                .and_then(Value::as_u64)
                .map(|n| n as u32)
                .unwrap_or(index as u32 + 1);

            let image_url = ["image_url", "image"]
                .iter()
                .find_map(|k| item.get(*k).and_then(Value::as_str))
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string);

            panels.push(Panel {
                panel_id,
                panel_number,
                text: get_s(item, &["text"]),
                image_url,
            });
        }

        let settings_src = data.get("settings").filter(|v| v.is_object()).unwrap_or(data);
        let cuts_count = ["cuts_count", "cuts"]
            .iter()
            .find_map(|k| settings_src.get(*k).and_then(Value::as_u64))
            .map(|n| n as u32)
            .unwrap_or(panels.len() as u32);

        Ok(Diary {
            diary_id,
            user_id: id_field(data, &["user_id"]),
            original_content: get_s(data, &["original_content", "original"]),
            full_story: get_s(data, &["full_story", "fullStory"]),
            settings: DiarySettings {
                character_note: get_s(settings_src, &["character_note", "character"]),
                genre: get_s(settings_src, &["genre"]),
                style: get_s(settings_src, &["style"]),
                cuts_count,
            },
            panels,
            created_at: data
                .get("created_at")
                .or_else(|| data.get("date"))
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

/// First key holding an id, sent either as a number or a non-empty string.
fn id_field<T: FromStr>(v: &Value, keys: &[&str]) -> Option<T> {
    keys.iter().find_map(|k| match v.get(*k)? {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

fn diary_path(diary_id: &DiaryId) -> String {
    format!("/api/diaries/{}", urlencoding::encode(diary_id.as_str()))
}

impl DiaryGateway for ApiClient {
    async fn create_diary(&self, req: &CreateDiaryRequest) -> ApiResult<DiaryId> {
        let res: CreateDiaryResponse = self
            .request(Method::POST, "/api/diaries", Some(req), "Creating diary failed")
            .await?;
        Ok(res.diary_id)
    }

    async fn get_diary(&self, diary_id: &DiaryId) -> ApiResult<Diary> {
        let data: Value = self
            .request(
                Method::GET,
                &diary_path(diary_id),
                None::<&()>,
                "Loading diary failed",
            )
            .await?;
        Self::parse_diary_response(&data)
    }

    async fn update_diary(&self, diary_id: &DiaryId, req: &UpdateDiaryRequest) -> ApiResult<Diary> {
        let data: Value = self
            .request(
                Method::PUT,
                &diary_path(diary_id),
                Some(req),
                "Saving diary failed",
            )
            .await?;

        // Some deployments answer with a bare message; fetch the stored copy then.
        if id_field::<DiaryId>(&data, &["diary_id", "id"]).is_some() {
            Self::parse_diary_response(&data)
        } else {
            self.get_diary(diary_id).await
        }
    }

    async fn regenerate_diary(
        &self,
        diary_id: &DiaryId,
        req: &RegenerateDiaryRequest,
    ) -> ApiResult<DiaryId> {
        let res: RegenerateDiaryResponse = self
            .request(
                Method::POST,
                &format!("{}/regenerate", diary_path(diary_id)),
                Some(req),
                "Regenerating diary failed",
            )
            .await?;
        Ok(res.diary_id)
    }

    async fn regenerate_panel(
        &self,
        panel_id: &PanelId,
        req: &RegeneratePanelRequest,
    ) -> ApiResult<String> {
        let res: RegeneratePanelResponse = self
            .request(
                Method::POST,
                &format!("/api/cuts/{}/regenerate", urlencoding::encode(panel_id.as_str())),
                Some(req),
                "Regenerating image failed",
            )
            .await?;
        Ok(res.new_image_url)
    }

    async fn delete_diary(&self, diary_id: &DiaryId) -> ApiResult<()> {
        self.send(
            Method::DELETE,
            &diary_path(diary_id),
            None::<&()>,
            "Deleting diary failed",
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_contract_deserialize() {
        let json = r#"{"access_token": "jwt-token", "nickname": "kim", "user_id": 3}"#;
        let parsed: LoginResponse =
            serde_json::from_str(json).expect("login response should parse");
        assert_eq!(parsed.access_token, "jwt-token");

        let session: Session = parsed.into();
        assert_eq!(session.user_id, UserId::from(3));
        assert_eq!(session.nickname, "kim");
    }

    #[test]
    fn test_create_request_serialization() {
        let req = CreateDiaryRequest {
            user_id: UserId::from(1),
            original_content: "today I woke up late".to_string(),
            genre: "fantasy".to_string(),
            style: "ghibli".to_string(),
            character_note: "cat in a blue hoodie".to_string(),
            cuts_count: 4,
        };
        let v = serde_json::to_value(req).expect("should serialize");
        assert_eq!(v["user_id"], 1);
        assert_eq!(v["original_content"], "today I woke up late");
        assert_eq!(v["character_note"], "cat in a blue hoodie");
        assert_eq!(v["cuts_count"], 4);
    }

    #[test]
    fn test_create_response_contract_deserialize() {
        let json = r#"{"message": "done", "diary_id": 15}"#;
        let parsed: CreateDiaryResponse = serde_json::from_str(json).expect("should parse");
        assert_eq!(parsed.diary_id, DiaryId::from(15));
        assert_eq!(parsed.message.as_deref(), Some("done"));
    }

    #[test]
    fn test_update_request_uses_cut_keys() {
        let req = UpdateDiaryRequest {
            original_content: "new".to_string(),
            full_story: "story".to_string(),
            cuts: vec![PanelTextUpdate {
                cut_id: PanelId::from(7),
                text: "caption".to_string(),
            }],
        };
        let v = serde_json::to_value(req).expect("should serialize");
        assert_eq!(v["cuts"][0]["cut_id"], 7);
        assert_eq!(v["cuts"][0]["text"], "caption");
    }

    #[test]
    fn test_regenerate_requests_serialization() {
        let v = serde_json::to_value(RegeneratePanelRequest::default()).expect("serialize");
        assert_eq!(v, serde_json::json!({ "prompt_override": "" }));

        let v = serde_json::to_value(RegenerateDiaryRequest {
            original_content: "again".to_string(),
            user_id: UserId::from(2),
        })
        .expect("serialize");
        assert_eq!(v["user_id"], 2);
    }

    #[test]
    fn test_parse_diary_response_nested_settings() {
        let data = serde_json::json!({
            "diary_id": 42,
            "user_id": 1,
            "original_content": "today I woke up late",
            "full_story": "The hero was cursed with oversleeping.",
            "created_at": "2025-11-18T08:00:00",
            "settings": {"character": "boy in a blue hoodie", "genre": "action", "style": "webtoon", "cuts": 2},
            "cuts": [
                {"cut_id": 7, "cut_number": 1, "text": "8:30?!", "image_url": null},
                {"cut_id": 8, "cut_number": 2, "text": "safe!", "image_url": "https://x/8.png"}
            ]
        });
        let d = ApiClient::parse_diary_response(&data).expect("should parse");
        assert_eq!(d.diary_id, DiaryId::from(42));
        assert_eq!(d.user_id, Some(UserId::from(1)));
        assert_eq!(d.settings.character_note, "boy in a blue hoodie");
        assert_eq!(d.settings.cuts_count, 2);
        assert_eq!(d.panels.len(), 2);
        assert_eq!(d.panels[0].panel_id, PanelId::from(7));
        assert!(d.panels[0].image_url.is_none());
        assert_eq!(d.panels[1].image_url.as_deref(), Some("https://x/8.png"));
    }

    #[test]
    fn test_parse_diary_response_flat_settings_and_panel_keys() {
        let data = serde_json::json!({
            "id": "5",
            "original_content": "rain",
            "full_story": "sorrow from the sky",
            "genre": "fantasy",
            "style": "watercolor",
            "character_note": "wizard",
            "panels": [
                {"panel_id": 1, "text": "a", "image_url": ""},
                {"panel_id": 2, "text": "b"}
            ]
        });
        let d = ApiClient::parse_diary_response(&data).expect("should parse");
        assert_eq!(d.diary_id, DiaryId::from(5));
        assert_eq!(d.settings.genre, "fantasy");
        assert_eq!(d.settings.character_note, "wizard");
        // Count falls back to the panels actually returned.
        assert_eq!(d.settings.cuts_count, 2);
        assert_eq!(
            d.panels.iter().map(|p| p.panel_number).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(d.panels[0].image_url.is_none());
    }

    #[test]
    fn test_parse_diary_response_keeps_opaque_ids() {
        let data = serde_json::json!({
            "diary_id": "d-9f2c",
            "user_id": "u-1",
            "cuts": [{"cut_id": "c-1", "text": "a"}]
        });
        let d = ApiClient::parse_diary_response(&data).expect("should parse");
        assert_eq!(d.diary_id.as_str(), "d-9f2c");
        assert_eq!(d.user_id.as_ref().map(UserId::as_str), Some("u-1"));
        assert_eq!(d.panels[0].panel_id.as_str(), "c-1");
        assert_eq!(diary_path(&d.diary_id), "/api/diaries/d-9f2c");

        let list = ApiClient::parse_diary_list_response(serde_json::json!([{"diary_id": "d-9f2c"}]));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_parse_diary_response_requires_ids() {
        let err = ApiClient::parse_diary_response(&serde_json::json!({"message": "ok"}))
            .expect_err("missing diary id");
        assert_eq!(err.kind, ApiErrorKind::Parse);

        let err = ApiClient::parse_diary_response(&serde_json::json!({
            "diary_id": 1,
            "cuts": [{"text": "no id"}]
        }))
        .expect_err("missing cut id");
        assert_eq!(err.kind, ApiErrorKind::Parse);
    }

    #[test]
    fn test_parse_diary_list_response_shapes() {
        let bare = serde_json::json!([
            {"diary_id": 15, "original_content": "..."},
            {"original_content": "no id"}
        ]);
        let list = ApiClient::parse_diary_list_response(bare);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].diary_id, DiaryId::from(15));

        let wrapped = serde_json::json!({"diaries": [{"diary_id": 1}, {"diary_id": 2}]});
        assert_eq!(ApiClient::parse_diary_list_response(wrapped).len(), 2);

        assert!(ApiClient::parse_diary_list_response(serde_json::json!({})).is_empty());
    }

    #[test]
    fn test_api_client_from_session() {
        let session = Session {
            access_token: "my-jwt-token".to_string(),
            nickname: "kim".to_string(),
            user_id: UserId::from(1),
        };
        let client = ApiClient::from_session("http://localhost:8000".to_string(), Some(&session));
        assert_eq!(client.get_auth_token().as_deref(), Some("my-jwt-token"));
        assert!(client.is_authenticated());

        let anon = ApiClient::from_session("http://localhost:8000".to_string(), None);
        assert!(!anon.is_authenticated());
    }

    #[test]
    fn test_api_client_set_token_and_logout() {
        let mut client = ApiClient::new("http://localhost:8000".to_string());
        client.set_token("".to_string());
        assert!(!client.is_authenticated());

        client.set_token("t1".to_string());
        assert_eq!(client.get_auth_token().as_deref(), Some("t1"));

        client.logout();
        assert!(client.get_auth_token().is_none());
    }

    #[test]
    fn test_api_error_kinds() {
        assert!(ApiError::not_found("/api/diaries/42").is_not_found());
        assert!(ApiError::unauthorized().is_unauthorized());
        let e = ApiError::http(StatusCode::UNPROCESSABLE_ENTITY, "bad".into(), "Saving diary failed");
        assert_eq!(e.kind, ApiErrorKind::Http);
        assert!(e.to_string().contains("422"));
    }
}
