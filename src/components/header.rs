use crate::components::ui::{Button, ButtonSize, ButtonVariant};
use crate::state::AppContext;
use leptos::prelude::*;
use leptos_router::hooks::use_navigate;

const GUEST_NAME: &str = "Guest";

#[component]
pub fn Header() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let navigate = StoredValue::new(use_navigate());

    let greeting = move || {
        let name = app_state
            .0
            .session
            .with(|s| s.as_ref().map(|s| s.nickname.clone()))
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| GUEST_NAME.to_string());
        format!("Hi, {name}")
    };

    let on_logout = move |_| {
        app_state.0.sign_out();
        app_state.0.flash.set(Some("Logged out.".to_string()));
        navigate.with_value(|nav| nav("/login", Default::default()));
    };

    view! {
        <header class="border-b bg-background">
            <div class="mx-auto flex h-12 w-full max-w-3xl items-center justify-between px-4">
                <a href="/diaries" class="text-sm font-semibold text-foreground">"Comic Diary"</a>
                <div class="flex items-center gap-3">
                    <span class="text-xs text-muted-foreground">{greeting}</span>
                    <Show when=move || app_state.0.session.with(Option::is_some) fallback=|| ().into_view()>
                        <Button variant=ButtonVariant::Ghost size=ButtonSize::Xs on:click=on_logout>
                            "Log out"
                        </Button>
                    </Show>
                </div>
            </div>
        </header>
    }
}
