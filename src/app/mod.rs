use crate::api::EnvConfig;
use crate::pages::{
    DiaryDetailPage, DiaryEditPage, DiaryListPage, LoginPage, RequireSession, RootPage, SignupPage,
};
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
    let config = EnvConfig::new();
    log::info!("backend at {}", config.api_url);
    provide_context(AppContext(AppState::new(&config)));

    // Router hooks (use_navigate, use_params) need the <Router> context.
    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!("login") view=LoginPage />
                <Route path=path!("signup") view=SignupPage />
                <Route path=path!("diaries") view=move || view! {
                    <RequireSession>
                        <DiaryListPage />
                    </RequireSession>
                } />
                <Route path=path!("diaries/:id") view=move || view! {
                    <RequireSession>
                        <DiaryDetailPage />
                    </RequireSession>
                } />
                <Route path=path!("diaries/:id/edit") view=move || view! {
                    <RequireSession>
                        <DiaryEditPage />
                    </RequireSession>
                } />
                <Route path=path!("") view=RootPage />
            </Routes>
        </Router>
    }
}
