use crate::api::ApiResult;
use crate::components::Header;
use crate::lifecycle::{DiaryLifecycle, Phase};
use crate::models::DiaryId;
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos_router::components::Redirect;
use leptos_router::params::Params;

mod auth;
mod detail;
mod diaries;
mod edit;

pub use auth::{LoginPage, SignupPage};
pub use detail::DiaryDetailPage;
pub use diaries::DiaryListPage;
pub use edit::DiaryEditPage;

pub(crate) fn diary_path(diary_id: &DiaryId) -> String {
    format!("/diaries/{}", urlencoding::encode(diary_id.as_str()))
}

#[derive(Params, PartialEq, Clone, Debug)]
pub struct DiaryRouteParams {
    pub id: Option<String>,
}

/// The `:id` segment of the current route, if it names a diary.
pub(crate) fn use_diary_id() -> Option<DiaryId> {
    leptos_router::hooks::use_params::<DiaryRouteParams>()
        .get_untracked()
        .ok()
        .and_then(|p| p.id)
        .and_then(|raw| raw.parse().ok())
}

/// Start from a diary the previous view handed over, or fetch it.
pub(crate) fn open_lifecycle(app_state: AppState, diary_id: DiaryId) -> RwSignal<DiaryLifecycle> {
    let lc = match app_state.take_handoff(&diary_id) {
        Some(diary) => DiaryLifecycle::viewing(diary),
        None => DiaryLifecycle::open(diary_id),
    };
    RwSignal::new(lc)
}

/// Surface the outcome of a lifecycle action. Unauthorized sends the user to
/// login; other failures raise a blocking alert naming the action. Returns
/// true when the diary is gone (deleted or missing) and the view should leave.
/// Outcomes for a view that has already been disposed are dropped.
pub(crate) fn settle(
    app_state: AppState,
    lifecycle: RwSignal<DiaryLifecycle>,
    result: ApiResult<()>,
) -> bool {
    if let Err(err) = &result {
        if app_state.expire_if_unauthorized(err) {
            return false;
        }
    }

    let Some((notice, gone, deleted, diary_id)) = lifecycle.try_with_untracked(|lc| {
        (
            lc.notice().map(ToString::to_string),
            lc.is_gone(),
            lc.phase() == Phase::Deleted,
            lc.diary_id().cloned(),
        )
    }) else {
        if let Err(err) = &result {
            log::debug!("view closed before the response arrived: {err}");
        }
        return false;
    };

    if let Err(err) = &result {
        let message = notice.unwrap_or_else(|| err.to_string());
        let _ = window().alert_with_message(&message);
    }

    if !gone {
        return false;
    }
    if let Some(id) = &diary_id {
        app_state.forget_diary(id);
    }
    if deleted {
        app_state.flash.set(Some("Diary deleted.".to_string()));
    }
    true
}

#[component]
pub fn AppLayout(children: Children) -> impl IntoView {
    view! {
        <div class="min-h-screen bg-background">
            <Header />
            <main class="mx-auto w-full max-w-3xl px-4 py-6">{children()}</main>
        </div>
    }
}

/// Renders `children` only with a session; otherwise goes to login.
#[component]
pub fn RequireSession(children: ChildrenFn) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let signed_in = move || app_state.0.session.with(Option::is_some);

    // Store children so the view macro sees an `Fn` (not an `FnOnce`).
    let children = StoredValue::new(children);

    view! {
        <Show when=signed_in fallback=|| view! { <Redirect path="/login" /> }>
            <AppLayout>
                {move || children.with_value(|c| c())}
            </AppLayout>
        </Show>
    }
}

#[component]
pub fn RootPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let signed_in = move || app_state.0.session.with(Option::is_some);

    view! {
        <Show when=signed_in fallback=|| view! { <LoginPage /> }>
            <Redirect path="/diaries" />
        </Show>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ApiErrorKind, EnvConfig};
    use crate::models::{Diary, DiarySettings};

    fn state() -> AppState {
        AppState::with_session(
            &EnvConfig {
                api_url: "http://localhost:8000".to_string(),
                log_level: "info".to_string(),
            },
            None,
        )
    }

    fn diary(id: &str) -> Diary {
        Diary {
            diary_id: id.parse().expect("id"),
            user_id: None,
            original_content: "rain".to_string(),
            full_story: String::new(),
            settings: DiarySettings::default(),
            panels: vec![],
            created_at: None,
        }
    }

    #[test]
    fn test_diary_path_encodes_opaque_ids() {
        assert_eq!(diary_path(&DiaryId::from(42)), "/diaries/42");
        assert_eq!(diary_path(&"a b".parse().expect("id")), "/diaries/a%20b");
    }

    #[test]
    fn test_settle_drops_outcome_of_closed_view() {
        let app_state = state();
        let lifecycle = RwSignal::new(DiaryLifecycle::viewing(diary("42")));
        lifecycle.dispose();

        // Reaching the alert would need a browser window.
        let err = ApiError {
            kind: ApiErrorKind::Http,
            message: "backend exploded".to_string(),
        };
        assert!(!settle(app_state, lifecycle, Err(err)));
        assert!(app_state.flash.get_untracked().is_none());
    }

    #[test]
    fn test_open_lifecycle_takes_matching_handoff() {
        let app_state = state();
        app_state.hand_off(diary("42"));

        let other = open_lifecycle(app_state, "7".parse().expect("id"));
        assert_eq!(other.with_untracked(|lc| lc.phase()), Phase::Unloaded);
        assert!(app_state.handoff.get_untracked().is_some());

        let same = open_lifecycle(app_state, "42".parse().expect("id"));
        assert_eq!(same.with_untracked(|lc| lc.phase()), Phase::Viewing);
        assert!(app_state.handoff.get_untracked().is_none());
    }
}
