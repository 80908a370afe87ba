use crate::api::SignupRequest;
use crate::components::ui::{
    Button, ButtonSize, Card, CardContent, CardDescription, CardHeader, CardTitle, Input, Label,
    Spinner,
};
use crate::components::{ErrorAlert, InfoAlert};
use crate::state::AppContext;
use crate::util::{validate_login, validate_signup};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_navigate;

#[component]
fn AuthShell(
    #[prop(into)] title: String,
    #[prop(into)] description: String,
    children: Children,
) -> impl IntoView {
    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex min-h-screen w-full max-w-sm flex-col justify-center px-4 py-10">
                <div class="mb-6 flex items-center justify-center">
                    <a href="/" class="text-sm font-medium text-foreground">"Comic Diary"</a>
                </div>

                <Card>
                    <CardHeader>
                        <CardTitle class="text-lg">{title}</CardTitle>
                        <CardDescription class="text-xs">{description}</CardDescription>
                    </CardHeader>
                    <CardContent>{children()}</CardContent>
                </Card>
            </div>
        </div>
    }
}

#[component]
pub fn LoginPage() -> impl IntoView {
    let email: RwSignal<String> = RwSignal::new(String::new());
    let password: RwSignal<String> = RwSignal::new(String::new());
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let loading: RwSignal<bool> = RwSignal::new(false);

    let app_state = expect_context::<AppContext>();
    let navigate = StoredValue::new(use_navigate());

    // e.g. "Logged out." or an expired-session note from the previous page.
    let info: RwSignal<Option<String>> = RwSignal::new(app_state.0.take_flash());

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();

        let email_val = email.get_untracked();
        let password_val = password.get_untracked();

        if let Err(e) = validate_login(&email_val, &password_val) {
            error.set(Some(e.to_string()));
            return;
        }

        let api_client = app_state.0.api_client.get_untracked();
        loading.set(true);
        error.set(None);
        info.set(None);

        spawn_local(async move {
            match api_client.login(email_val.trim(), &password_val).await {
                Ok(response) => {
                    let nickname = response.nickname.clone();
                    app_state.0.sign_in(response.into());
                    app_state.0.flash.set(Some(format!("Welcome, {nickname}!")));
                    navigate.with_value(|nav| nav("/diaries", Default::default()));
                }
                Err(e) => {
                    log::warn!("login failed: {e}");
                    error.set(Some(e.to_string()));
                }
            }
            loading.set(false);
        });
    };

    view! {
        <AuthShell title="Log in" description="Use your email and password to continue.">
            <form class="flex flex-col gap-3" on:submit=on_submit>
                <InfoAlert message=info />

                <div class="flex flex-col gap-1.5">
                    <Label html_for="email" class="text-xs">"Email"</Label>
                    <Input
                        id="email"
                        r#type="email"
                        placeholder="you@example.com"
                        bind_value=email
                        class="h-8 text-sm"
                    />
                </div>

                <div class="flex flex-col gap-1.5">
                    <Label html_for="password" class="text-xs">"Password"</Label>
                    <Input
                        id="password"
                        r#type="password"
                        placeholder="••••••••"
                        bind_value=password
                        class="h-8 text-sm"
                    />
                </div>

                <ErrorAlert message=error />

                <Button class="w-full" size=ButtonSize::Sm attr:disabled=move || loading.get()>
                    <span class="inline-flex items-center gap-2">
                        <Show when=move || loading.get() fallback=|| ().into_view()>
                            <Spinner />
                        </Show>
                        {move || if loading.get() { "Signing in..." } else { "Continue" }}
                    </span>
                </Button>

                <div class="pt-1 text-xs text-muted-foreground">
                    "No account? "
                    <a class="text-primary underline underline-offset-4" href="/signup">"Sign up"</a>
                </div>
            </form>
        </AuthShell>
    }
}

#[component]
pub fn SignupPage() -> impl IntoView {
    let nickname: RwSignal<String> = RwSignal::new(String::new());
    let email: RwSignal<String> = RwSignal::new(String::new());
    let password: RwSignal<String> = RwSignal::new(String::new());
    let confirm_password: RwSignal<String> = RwSignal::new(String::new());
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let loading: RwSignal<bool> = RwSignal::new(false);

    let app_state = expect_context::<AppContext>();
    let navigate = StoredValue::new(use_navigate());

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();

        let nickname_val = nickname.get_untracked();
        let email_val = email.get_untracked();
        let password_val = password.get_untracked();
        let confirm_val = confirm_password.get_untracked();

        if let Err(e) = validate_signup(&nickname_val, &email_val, &password_val, &confirm_val) {
            error.set(Some(e.to_string()));
            return;
        }

        let req = SignupRequest {
            email: email_val.trim().to_string(),
            password: password_val,
            nickname: nickname_val.trim().to_string(),
        };
        let api_client = app_state.0.api_client.get_untracked();
        loading.set(true);
        error.set(None);

        spawn_local(async move {
            match api_client.signup(&req).await {
                // The body is only a confirmation; the user logs in next.
                Ok(_) => {
                    log::info!("account created for {}", req.email);
                    app_state
                        .0
                        .flash
                        .set(Some("Account created. Please log in.".to_string()));
                    navigate.with_value(|nav| nav("/login", Default::default()));
                }
                Err(e) => {
                    log::warn!("signup failed: {e}");
                    error.set(Some(e.to_string()));
                }
            }
            loading.set(false);
        });
    };

    view! {
        <AuthShell title="Create account" description="Pick a nickname for your diary.">
            <form class="flex flex-col gap-3" on:submit=on_submit>
                <div class="flex flex-col gap-1.5">
                    <Label html_for="nickname" class="text-xs">"Nickname"</Label>
                    <Input id="nickname" placeholder="yourname" bind_value=nickname class="h-8 text-sm" />
                </div>

                <div class="flex flex-col gap-1.5">
                    <Label html_for="email" class="text-xs">"Email"</Label>
                    <Input
                        id="email"
                        r#type="email"
                        placeholder="you@example.com"
                        bind_value=email
                        class="h-8 text-sm"
                    />
                </div>

                <div class="flex flex-col gap-1.5">
                    <Label html_for="password" class="text-xs">"Password"</Label>
                    <Input
                        id="password"
                        r#type="password"
                        placeholder="••••••••"
                        bind_value=password
                        class="h-8 text-sm"
                    />
                </div>

                <div class="flex flex-col gap-1.5">
                    <Label html_for="confirm_password" class="text-xs">"Confirm password"</Label>
                    <Input
                        id="confirm_password"
                        r#type="password"
                        placeholder="••••••••"
                        bind_value=confirm_password
                        class="h-8 text-sm"
                    />
                </div>

                <ErrorAlert message=error />

                <Button class="w-full" size=ButtonSize::Sm attr:disabled=move || loading.get()>
                    <span class="inline-flex items-center gap-2">
                        <Show when=move || loading.get() fallback=|| ().into_view()>
                            <Spinner />
                        </Show>
                        {move || if loading.get() { "Creating..." } else { "Continue" }}
                    </span>
                </Button>

                <div class="pt-1 text-xs text-muted-foreground">
                    "Already have an account? "
                    <a class="text-primary underline underline-offset-4" href="/login">"Log in"</a>
                </div>
            </form>
        </AuthShell>
    }
}
