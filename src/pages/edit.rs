use super::detail::{DiaryBody, LoadStatus};
use super::{diary_path, open_lifecycle, settle, use_diary_id};
use crate::components::ui::{Button, ButtonSize, ButtonVariant, Label, Spinner, Textarea};
use crate::components::PanelGrid;
use crate::lifecycle::{
    run_full_regenerate, run_load, run_regenerate_panel, run_save, BrowserConfirm, DiaryLifecycle,
    Phase,
};
use crate::models::PanelId;
use crate::state::{AppContext, AppState};
use leptos::ev;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::window_event_listener;
use leptos_router::components::Redirect;
use leptos_router::hooks::use_navigate;

/// Hand the settled diary back to the detail route.
fn back_to_detail(
    app_state: AppState,
    lifecycle: RwSignal<DiaryLifecycle>,
    detail_path: &str,
    navigate: &impl Fn(&str, leptos_router::NavigateOptions),
) {
    if let Some(diary) = lifecycle.try_with_untracked(|lc| lc.diary().cloned()).flatten() {
        app_state.hand_off(diary);
    }
    navigate(detail_path, Default::default());
}

#[component]
pub fn DiaryEditPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let navigate = StoredValue::new(use_navigate());

    let Some(diary_id) = use_diary_id() else {
        return view! { <Redirect path="/diaries" /> }.into_any();
    };

    let detail_path = StoredValue::new(diary_path(&diary_id));
    let lifecycle = open_lifecycle(app_state.0, diary_id);

    let go_back = move || {
        detail_path.try_with_value(|path| {
            navigate.try_with_value(|nav| back_to_detail(app_state.0, lifecycle, path, nav))
        });
    };

    // Mirror of the lifecycle's edit buffer for the textarea.
    let text: RwSignal<String> = RwSignal::new(String::new());

    let start_editing = move || {
        let started = lifecycle
            .try_update(|lc| lc.request_edit().then(|| lc.edit_text().unwrap_or_default().to_string()))
            .flatten();
        if let Some(initial) = started {
            text.set(initial);
        }
    };

    let leave = move || {
        navigate.try_with_value(|nav| nav("/diaries", Default::default()));
    };

    let load = move || {
        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            let result = run_load(&lifecycle, &api_client).await;
            if settle(app_state.0, lifecycle, result) {
                leave();
                return;
            }
            start_editing();
        });
    };

    if lifecycle.with_untracked(|lc| lc.phase() == Phase::Unloaded) {
        load();
    } else {
        start_editing();
    }

    Effect::new(move |_| {
        let t = text.get();
        lifecycle.update(|lc| lc.set_edit_text(t));
    });

    let cancel = move || {
        let cancelled = lifecycle.try_update(|lc| lc.cancel_edit()).unwrap_or(false);
        if cancelled {
            go_back();
        }
    };

    let key_handle = window_event_listener(ev::keydown, move |ev: web_sys::KeyboardEvent| {
        if ev.key() == "Escape" {
            ev.prevent_default();
            cancel();
        }
    });
    on_cleanup(move || key_handle.remove());

    let on_save = move |_| {
        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            let result = run_save(&lifecycle, &api_client, &BrowserConfirm).await;
            let saved = result.is_ok()
                && lifecycle.try_with_untracked(|lc| lc.phase() == Phase::Viewing) == Some(true);
            if settle(app_state.0, lifecycle, result) {
                leave();
            } else if saved {
                go_back();
            }
        });
    };

    let on_full_regenerate = move |_| {
        let session = app_state.0.session.get_untracked();
        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            let result =
                run_full_regenerate(&lifecycle, &api_client, session.as_ref(), &BrowserConfirm)
                    .await;
            let regenerated = result.is_ok()
                && lifecycle.try_with_untracked(|lc| lc.phase() == Phase::Viewing) == Some(true);
            if settle(app_state.0, lifecycle, result) {
                leave();
            } else if regenerated {
                go_back();
            }
        });
    };

    let on_regenerate_panel = move |panel_id: PanelId| {
        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            let result =
                run_regenerate_panel(&lifecycle, &api_client, panel_id, &BrowserConfirm).await;
            settle(app_state.0, lifecycle, result);
        });
    };

    let phase = move || lifecycle.with(|lc| lc.phase());
    let saving = move || phase() == Phase::Saving;
    let regenerating = move || phase() == Phase::Regenerating;
    let loaded = move || lifecycle.with(|lc| lc.diary().is_some());

    view! {
        <div class="flex flex-col gap-6">
            <div class="flex items-center justify-between">
                <h2 class="text-sm font-semibold">"Edit diary"</h2>
                <div class="flex items-center gap-2">
                    <Button
                        variant=ButtonVariant::Ghost
                        size=ButtonSize::Sm
                        attr:title="Esc"
                        attr:disabled=move || phase() != Phase::Editing
                        on:click=move |_| cancel()
                    >
                        "Cancel"
                    </Button>
                    <Button
                        variant=ButtonVariant::Secondary
                        size=ButtonSize::Sm
                        attr:disabled=move || !lifecycle.with(|lc| lc.can_full_regenerate())
                        on:click=on_full_regenerate
                    >
                        <Show when=regenerating fallback=|| ().into_view()>
                            <Spinner />
                        </Show>
                        {move || if regenerating() { "Regenerating..." } else { "Regenerate all" }}
                    </Button>
                    <Button
                        size=ButtonSize::Sm
                        attr:disabled=move || !lifecycle.with(|lc| lc.can_save())
                        on:click=on_save
                    >
                        <Show when=saving fallback=|| ().into_view()>
                            <Spinner />
                        </Show>
                        {move || if saving() { "Saving..." } else { "Save" }}
                    </Button>
                </div>
            </div>

            <Show
                when=loaded
                fallback=move || view! { <LoadStatus lifecycle=lifecycle on_retry=move |_| load() /> }
            >
                <div class="flex flex-col gap-1.5">
                    <Label html_for="original_content" class="text-xs">"Diary"</Label>
                    <Textarea
                        id="original_content"
                        bind_value=text
                        rows=10
                        readonly=Signal::derive(move || !lifecycle.with(|lc| lc.can_edit_text()))
                    />
                </div>
                <DiaryBody lifecycle=lifecycle hide_original=true />
                <PanelGrid lifecycle=lifecycle on_regenerate=on_regenerate_panel />
            </Show>
        </div>
    }
    .into_any()
}
