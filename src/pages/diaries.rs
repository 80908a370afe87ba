use super::{diary_path, settle};
use crate::components::ui::{
    Button, ButtonSize, Card, CardContent, CardDescription, CardHeader, CardTitle, Input, Label,
    Spinner, Textarea,
};
use crate::components::{ErrorAlert, InfoAlert};
use crate::lifecycle::{run_submit, DiaryLifecycle, NoticeKind, Phase};
use crate::models::{DiaryDraft, DiarySummary};
use crate::state::AppContext;
use crate::util::{display_date, preview, DEFAULT_CUTS, MAX_CUTS, PREVIEW_CHARS};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_navigate;

#[component]
pub fn DiaryListPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let info: RwSignal<Option<String>> = RwSignal::new(app_state.0.take_flash());

    // Reads only untracked state, so this runs once per visit.
    Effect::new(move |_| app_state.0.refresh_diaries());

    let diaries = app_state.0.diaries;
    let loading = app_state.0.diaries_loading;

    view! {
        <div class="flex flex-col gap-6">
            <InfoAlert message=info />
            <ComposeForm />

            <section class="flex flex-col gap-3">
                <div class="flex items-center justify-between">
                    <h2 class="text-sm font-semibold">"My diaries"</h2>
                    <Show when=move || loading.get() fallback=|| ().into_view()>
                        <Spinner />
                    </Show>
                </div>

                <ErrorAlert message=app_state.0.diaries_error />

                <Show
                    when=move || !diaries.with(Vec::is_empty)
                    fallback=move || view! {
                        <Show when=move || !loading.get() fallback=|| ().into_view()>
                            <p class="text-xs text-muted-foreground">"No diaries yet. Write your first one above."</p>
                        </Show>
                    }
                >
                    <ul class="flex flex-col gap-3">
                        <For
                            each=move || diaries.get()
                            key=|d| d.diary_id.clone()
                            children=move |d: DiarySummary| view! { <DiaryCard diary=d /> }
                        />
                    </ul>
                </Show>
            </section>
        </div>
    }
}

#[component]
fn DiaryCard(diary: DiarySummary) -> impl IntoView {
    let href = diary_path(&diary.diary_id);
    let date = display_date(diary.created_at.as_deref());
    let text = preview(&diary.original_content, PREVIEW_CHARS);
    let story = diary
        .full_story
        .filter(|s| !s.trim().is_empty())
        .map(|s| view! { <p class="text-xs text-muted-foreground line-clamp-2">{s}</p> });

    view! {
        <li>
            <a href=href class="block rounded-lg border p-4 transition-colors hover:bg-accent">
                <div class="text-xs text-muted-foreground">{date}</div>
                <div class="mt-1 text-sm font-medium">{text}</div>
                {story}
            </a>
        </li>
    }
}

/// New-diary form. Owns a Composing lifecycle; on success the created diary
/// is handed to the detail route.
#[component]
fn ComposeForm() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let navigate = StoredValue::new(use_navigate());

    let content: RwSignal<String> = RwSignal::new(String::new());
    let character_note: RwSignal<String> = RwSignal::new(String::new());
    let genre: RwSignal<String> = RwSignal::new(String::new());
    let style: RwSignal<String> = RwSignal::new(String::new());
    let cuts: RwSignal<String> = RwSignal::new(String::new());

    let lifecycle = RwSignal::new(DiaryLifecycle::compose());
    let submitting = move || lifecycle.with(|lc| lc.phase() == Phase::Submitting || lc.phase() == Phase::Loading);
    let validation = Signal::derive(move || {
        lifecycle.with(|lc| {
            lc.notice()
                .filter(|n| n.kind == NoticeKind::Validation)
                .map(ToString::to_string)
        })
    });

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();

        lifecycle.update(|lc| {
            lc.set_draft(DiaryDraft {
                original_content: content.get_untracked(),
                character_note: character_note.get_untracked(),
                genre: genre.get_untracked(),
                style: style.get_untracked(),
                cuts: cuts.get_untracked(),
            })
        });

        let session = app_state.0.session.get_untracked();
        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            let result = run_submit(&lifecycle, &api_client, session.as_ref()).await;
            settle(app_state.0, lifecycle, result);

            // Created, even if the follow-up fetch failed; the detail view retries.
            let created = lifecycle
                .try_with_untracked(|lc| match lc.phase() {
                    Phase::Submitting | Phase::Composing => None,
                    _ => lc.diary_id().map(|id| (id.clone(), lc.diary().cloned())),
                })
                .flatten();

            if let Some((diary_id, diary)) = created {
                if let Some(diary) = diary {
                    app_state.0.hand_off(diary);
                }
                navigate.try_with_value(|nav| nav(&diary_path(&diary_id), Default::default()));
            }
        });
    };

    let cuts_placeholder = format!("{DEFAULT_CUTS} (1-{MAX_CUTS})");

    view! {
        <Card>
            <CardHeader>
                <CardTitle class="text-base">"Today's diary"</CardTitle>
                <CardDescription class="text-xs">"Write about your day and we'll draw it as a comic."</CardDescription>
            </CardHeader>
            <CardContent>
                <form class="flex flex-col gap-3" on:submit=on_submit>
                    <div class="flex flex-col gap-1.5">
                        <Label html_for="content" class="text-xs">"Diary"</Label>
                        <Textarea
                            id="content"
                            placeholder="What happened today?"
                            bind_value=content
                            readonly=Signal::derive(submitting)
                        />
                    </div>

                    <div class="grid grid-cols-1 gap-3 sm:grid-cols-2">
                        <div class="flex flex-col gap-1.5">
                            <Label html_for="character_note" class="text-xs">"Main character"</Label>
                            <Input
                                id="character_note"
                                placeholder="a sleepy cat in a yellow raincoat"
                                bind_value=character_note
                                disabled=Signal::derive(submitting)
                                class="h-8 text-sm"
                            />
                        </div>
                        <div class="flex flex-col gap-1.5">
                            <Label html_for="genre" class="text-xs">"Genre"</Label>
                            <Input
                                id="genre"
                                placeholder="comedy"
                                bind_value=genre
                                disabled=Signal::derive(submitting)
                                class="h-8 text-sm"
                            />
                        </div>
                        <div class="flex flex-col gap-1.5">
                            <Label html_for="style" class="text-xs">"Art style"</Label>
                            <Input
                                id="style"
                                placeholder="watercolor"
                                bind_value=style
                                disabled=Signal::derive(submitting)
                                class="h-8 text-sm"
                            />
                        </div>
                        <div class="flex flex-col gap-1.5">
                            <Label html_for="cuts" class="text-xs">"Panels"</Label>
                            <Input
                                id="cuts"
                                r#type="number"
                                placeholder=cuts_placeholder
                                bind_value=cuts
                                disabled=Signal::derive(submitting)
                                class="h-8 text-sm"
                            />
                        </div>
                    </div>

                    <ErrorAlert message=validation />

                    <Button class="w-full" size=ButtonSize::Sm attr:disabled=submitting>
                        <span class="inline-flex items-center gap-2">
                            <Show when=submitting fallback=|| ().into_view()>
                                <Spinner />
                            </Show>
                            {move || if submitting() { "Drawing your comic..." } else { "Create comic" }}
                        </span>
                    </Button>
                </form>
            </CardContent>
        </Card>
    }
}
