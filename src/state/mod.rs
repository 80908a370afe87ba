use crate::api::{ApiClient, ApiError, EnvConfig};
use crate::models::{Diary, DiaryId, DiarySummary};
use crate::session::{Session, SessionStore};
use leptos::prelude::*;
use leptos::task::spawn_local;

#[derive(Clone, Copy)]
pub(crate) struct AppState {
    pub api_client: RwSignal<ApiClient>,

    /// Logged-in user, mirrored to localStorage by `sign_in`/`sign_out`.
    pub session: RwSignal<Option<Session>>,

    /// The signed-in user's diaries, newest first as the backend returns them.
    pub diaries: RwSignal<Vec<DiarySummary>>,
    pub diaries_loading: RwSignal<bool>,
    pub diaries_error: RwSignal<Option<String>>,

    /// Bumped per list request; responses carrying an older id are ignored.
    pub diaries_request_id: RwSignal<u64>,

    /// A diary one view already fetched, handed to the next route so it does
    /// not fetch again.
    pub handoff: RwSignal<Option<Diary>>,

    /// One-shot message for the next page (e.g. "Logged out.").
    pub flash: RwSignal<Option<String>>,
}

impl AppState {
    pub fn new(config: &EnvConfig) -> Self {
        Self::with_session(config, SessionStore::browser().load())
    }

    pub fn with_session(config: &EnvConfig, session: Option<Session>) -> Self {
        let api_client = ApiClient::from_session(config.api_url.clone(), session.as_ref());

        Self {
            api_client: RwSignal::new(api_client),
            session: RwSignal::new(session),
            diaries: RwSignal::new(vec![]),
            diaries_loading: RwSignal::new(false),
            diaries_error: RwSignal::new(None),
            diaries_request_id: RwSignal::new(0),
            handoff: RwSignal::new(None),
            flash: RwSignal::new(None),
        }
    }

    pub fn sign_in(&self, session: Session) {
        SessionStore::browser().save(&session);
        self.api_client
            .update(|c| c.set_token(session.access_token.clone()));
        log::info!("signed in as user {}", session.user_id);
        self.session.set(Some(session));
    }

    pub fn sign_out(&self) {
        SessionStore::browser().clear();
        self.api_client.update(|c| c.logout());
        self.session.set(None);
        self.diaries.set(vec![]);
        self.diaries_error.set(None);
        self.handoff.set(None);
        log::info!("signed out");
    }

    /// On `Unauthorized`, drop the session; `RequireSession` then routes to
    /// login. Returns true when the error was handled that way.
    pub fn expire_if_unauthorized(&self, err: &ApiError) -> bool {
        if !err.is_unauthorized() {
            return false;
        }
        log::warn!("session rejected by backend");
        self.sign_out();
        self.flash
            .set(Some("Your session has expired. Please log in again.".to_string()));
        true
    }

    pub fn hand_off(&self, diary: Diary) {
        self.handoff.set(Some(diary));
    }

    /// Take the handed-off diary if it is the one `diary_id` names.
    pub fn take_handoff(&self, diary_id: &DiaryId) -> Option<Diary> {
        let matches = self
            .handoff
            .with_untracked(|d| d.as_ref().map(|d| &d.diary_id) == Some(diary_id));
        if !matches {
            return None;
        }
        let mut taken = None;
        self.handoff.update(|d| taken = d.take());
        taken
    }

    pub fn take_flash(&self) -> Option<String> {
        if self.flash.with_untracked(Option::is_none) {
            return None;
        }
        let mut taken = None;
        self.flash.update(|f| taken = f.take());
        taken
    }

    /// A deleted diary disappears from the list right away; the next refresh
    /// confirms it.
    pub fn forget_diary(&self, diary_id: &DiaryId) {
        self.diaries.update(|list| list.retain(|d| &d.diary_id != diary_id));
        if self
            .handoff
            .with_untracked(|d| d.as_ref().map(|d| &d.diary_id) == Some(diary_id))
        {
            self.handoff.set(None);
        }
    }

    pub fn refresh_diaries(&self) {
        let Some(user_id) = self.session.with_untracked(|s| s.as_ref().map(|s| s.user_id.clone())) else {
            return;
        };

        let req_id = self.diaries_request_id.get_untracked().saturating_add(1);
        self.diaries_request_id.set(req_id);
        self.diaries_loading.set(true);
        self.diaries_error.set(None);

        let state = *self;
        let api_client = self.api_client.get_untracked();
        spawn_local(async move {
            let result = api_client.list_diaries(&user_id).await;

            // Ignore stale responses.
            if state.diaries_request_id.get_untracked() != req_id {
                return;
            }

            match result {
                Ok(diaries) => state.diaries.set(diaries),
                Err(e) => {
                    if !state.expire_if_unauthorized(&e) {
                        log::warn!("listing diaries failed: {e}");
                        state.diaries_error.set(Some(e.to_string()));
                        state.diaries.set(vec![]);
                    }
                }
            }
            state.diaries_loading.set(false);
        });
    }
}

#[derive(Clone, Copy)]
pub(crate) struct AppContext(pub AppState);

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::with_session(
            &EnvConfig {
                api_url: "http://localhost:8000".to_string(),
                log_level: "info".to_string(),
            },
            None,
        )
    }

    fn summary(id: i64) -> DiarySummary {
        DiarySummary {
            diary_id: DiaryId::from(id),
            original_content: format!("entry {id}"),
            full_story: None,
            created_at: None,
        }
    }

    #[test]
    fn test_forget_diary_drops_it_from_list_and_handoff() {
        let state = state();
        state.diaries.set(vec![summary(41), summary(42), summary(43)]);
        state.hand_off(Diary {
            diary_id: DiaryId::from(42),
            user_id: None,
            original_content: "entry 42".to_string(),
            full_story: String::new(),
            settings: Default::default(),
            panels: vec![],
            created_at: None,
        });

        state.forget_diary(&DiaryId::from(42));

        let ids: Vec<String> = state
            .diaries
            .get_untracked()
            .iter()
            .map(|d| d.diary_id.to_string())
            .collect();
        assert_eq!(ids, vec!["41", "43"]);
        assert!(state.take_handoff(&DiaryId::from(42)).is_none());
    }

    #[test]
    fn test_take_flash_is_one_shot() {
        let state = state();
        state.flash.set(Some("Diary deleted.".to_string()));
        assert_eq!(state.take_flash().as_deref(), Some("Diary deleted."));
        assert!(state.take_flash().is_none());
    }
}
