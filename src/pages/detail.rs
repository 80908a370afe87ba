use super::{diary_path, open_lifecycle, settle, use_diary_id};
use crate::components::ui::{Button, ButtonSize, ButtonVariant, Spinner};
use crate::components::{DiaryTags, PanelGrid};
use crate::lifecycle::{
    run_delete, run_full_regenerate, run_load, run_regenerate_panel, BrowserConfirm, DiaryLifecycle,
    Phase,
};
use crate::models::PanelId;
use crate::state::AppContext;
use crate::util::display_date;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::components::Redirect;
use leptos_router::hooks::use_navigate;

#[component]
pub fn DiaryDetailPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let navigate = StoredValue::new(use_navigate());

    let Some(diary_id) = use_diary_id() else {
        return view! { <Redirect path="/diaries" /> }.into_any();
    };

    let edit_path = StoredValue::new(format!("{}/edit", diary_path(&diary_id)));
    let lifecycle = open_lifecycle(app_state.0, diary_id);

    let leave = move || {
        navigate.try_with_value(|nav| nav("/diaries", Default::default()));
    };

    let load = move || {
        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            let result = run_load(&lifecycle, &api_client).await;
            if settle(app_state.0, lifecycle, result) {
                leave();
            }
        });
    };

    if lifecycle.with_untracked(|lc| lc.phase() == Phase::Unloaded) {
        load();
    }

    let on_edit = move |_| {
        if let Some(diary) = lifecycle.with_untracked(|lc| lc.diary().cloned()) {
            app_state.0.hand_off(diary);
        }
        navigate.with_value(|nav| edit_path.with_value(|path| nav(path, Default::default())));
    };

    let on_full_regenerate = move |_| {
        let session = app_state.0.session.get_untracked();
        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            let result =
                run_full_regenerate(&lifecycle, &api_client, session.as_ref(), &BrowserConfirm)
                    .await;
            settle(app_state.0, lifecycle, result);
        });
    };

    let on_delete = move |_| {
        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            let result = run_delete(&lifecycle, &api_client, &BrowserConfirm).await;
            if settle(app_state.0, lifecycle, result) {
                leave();
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
    let loaded = move || lifecycle.with(|lc| lc.diary().is_some());
    let regenerating = move || phase() == Phase::Regenerating;

    view! {
        <div class="flex flex-col gap-6">
            <div class="flex items-center justify-between">
                <a href="/diaries" class="text-xs text-muted-foreground hover:text-foreground">"← All diaries"</a>
                <div class="flex items-center gap-2">
                    <Button
                        variant=ButtonVariant::Outline
                        size=ButtonSize::Sm
                        attr:disabled=move || phase() != Phase::Viewing
                        on:click=on_edit
                    >
                        "Edit"
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
                        variant=ButtonVariant::Destructive
                        size=ButtonSize::Sm
                        attr:disabled=move || !lifecycle.with(|lc| lc.can_delete())
                        on:click=on_delete
                    >
                        {move || if phase() == Phase::Deleting { "Deleting..." } else { "Delete" }}
                    </Button>
                </div>
            </div>

            <Show
                when=loaded
                fallback=move || view! { <LoadStatus lifecycle=lifecycle on_retry=move |_| load() /> }
            >
                <DiaryBody lifecycle=lifecycle />
                <PanelGrid lifecycle=lifecycle on_regenerate=on_regenerate_panel />
            </Show>
        </div>
    }
    .into_any()
}

/// Placeholder while the diary is fetched; offers a retry after a failure.
#[component]
pub(super) fn LoadStatus(
    lifecycle: RwSignal<DiaryLifecycle>,
    #[prop(into)] on_retry: Callback<()>,
) -> impl IntoView {
    let failed = move || lifecycle.with(|lc| lc.phase() == Phase::Unloaded && lc.notice().is_some());

    view! {
        <div class="flex items-center gap-2 text-xs text-muted-foreground">
            <Show
                when=failed
                fallback=|| view! { <Spinner /> "Loading diary..." }
            >
                "This diary could not be loaded."
                <Button variant=ButtonVariant::Link size=ButtonSize::Xs on:click=move |_| on_retry.run(())>
                    "Retry"
                </Button>
            </Show>
        </div>
    }
}

/// Date, tags and story of the loaded diary; the original text too unless
/// the caller shows it in an editor.
#[component]
pub(super) fn DiaryBody(
    lifecycle: RwSignal<DiaryLifecycle>,
    #[prop(optional)] hide_original: bool,
) -> impl IntoView {
    move || {
        lifecycle.with(|lc| {
            lc.diary().map(|d| {
                let date = display_date(d.created_at.as_deref());
                let original = (!hide_original).then(|| {
                    view! {
                        <div class="flex flex-col gap-1">
                            <h3 class="text-xs font-semibold text-muted-foreground">"Diary"</h3>
                            <p class="whitespace-pre-wrap text-sm leading-relaxed">{d.original_content.clone()}</p>
                        </div>
                    }
                });
                let pending = match d.pending_images() {
                    0 => None,
                    1 => Some("1 image is still being drawn.".to_string()),
                    n => Some(format!("{n} images are still being drawn.")),
                };
                view! {
                    <section class="flex flex-col gap-4">
                        <div class="text-xs text-muted-foreground">{date}</div>
                        <DiaryTags settings=d.settings.clone() />
                        {original}
                        <div class="flex flex-col gap-1">
                            <h3 class="text-xs font-semibold text-muted-foreground">"Story"</h3>
                            <p class="whitespace-pre-wrap text-sm leading-relaxed">{d.full_story.clone()}</p>
                        </div>
                        {pending.map(|p| view! { <p class="text-xs text-muted-foreground">{p}</p> })}
                    </section>
                }
            })
        })
    }
}
