//! State machine for the one diary a Compose/Detail/Edit view works on.
//!
//! Every network-backed transition is split in two: `begin_*` checks the guard,
//! moves into the in-flight phase and returns a ticket describing the request;
//! `finish_*` applies the gateway result. The async `run_*` helpers pair them
//! around a [`DiaryGateway`] call. Server responses always replace local state
//! wholesale; nothing here derives story or panel content.

mod runner;

pub(crate) use runner::{
    run_delete, run_full_regenerate, run_load, run_regenerate_panel, run_save, run_submit,
};

use crate::api::{
    ApiError, ApiResult, CreateDiaryRequest, PanelTextUpdate, RegenerateDiaryRequest,
    RegeneratePanelRequest, UpdateDiaryRequest,
};
use crate::models::{Diary, DiaryDraft, DiaryId, PanelId};
use crate::session::Session;
use crate::util::{parse_cuts_count, ValidationError};

pub(crate) const CONFIRM_SAVE: &str = "Save your changes to this diary?";
pub(crate) const CONFIRM_FULL_REGENERATE: &str =
    "Rebuild the story, panels and images from the diary text? The current comic will be replaced.";
pub(crate) const CONFIRM_PANEL_REGENERATE: &str =
    "Generate a new image for this panel with the same prompt?";
pub(crate) const CONFIRM_DELETE: &str = "Delete this diary? This cannot be undone.";

/// Asks the user to approve an irreversible action.
pub(crate) trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// `window.confirm`; answers no when there is no window.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct BrowserConfirm;

impl Confirm for BrowserConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        web_sys::window()
            .and_then(|w| w.confirm_with_message(prompt).ok())
            .unwrap_or(false)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub(crate) enum Phase {
    Composing,
    Submitting,
    /// Id known, nothing fetched yet (or the last fetch failed).
    Unloaded,
    Loading,
    Viewing,
    Editing,
    Saving,
    Regenerating,
    Deleting,
    Deleted,
    /// The backend no longer has this diary.
    Missing,
}

/// What the user was trying to do when a notice was raised.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub(crate) enum Action {
    #[strum(to_string = "create the diary")]
    Create,
    #[strum(to_string = "load the diary")]
    Load,
    #[strum(to_string = "save the diary")]
    Save,
    #[strum(to_string = "regenerate the diary")]
    Regenerate,
    #[strum(to_string = "regenerate the panel image")]
    RegeneratePanel,
    #[strum(to_string = "delete the diary")]
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NoticeKind {
    Validation,
    Failure,
    NotFound,
    /// The action went through on the backend but the fresh copy could not
    /// be fetched.
    ReloadFailed,
}

/// User-facing report of a rejected or failed action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Notice {
    pub action: Action,
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn validation(action: Action, err: ValidationError) -> Self {
        Self {
            action,
            kind: NoticeKind::Validation,
            message: err.to_string(),
        }
    }

    fn reload_failed(action: Action, err: &ApiError) -> Self {
        Self {
            action,
            kind: NoticeKind::ReloadFailed,
            message: err.to_string(),
        }
    }

    fn failure(action: Action, err: &ApiError) -> Self {
        Self {
            action,
            kind: if err.is_not_found() {
                NoticeKind::NotFound
            } else {
                NoticeKind::Failure
            },
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            NoticeKind::Validation => write!(f, "{}", self.message),
            NoticeKind::NotFound => write!(f, "This diary no longer exists."),
            NoticeKind::Failure => write!(f, "Could not {}: {}", self.action, self.message),
            NoticeKind::ReloadFailed => write!(
                f,
                "The request to {} went through, but reloading failed: {}",
                self.action, self.message
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SaveTicket {
    pub diary_id: DiaryId,
    pub request: UpdateDiaryRequest,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RegenerateTicket {
    pub diary_id: DiaryId,
    pub request: RegenerateDiaryRequest,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PanelTicket {
    pub panel_id: PanelId,
    pub request: RegeneratePanelRequest,
    epoch: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct DiaryLifecycle {
    phase: Phase,

    /// Viewing or Editing; restored when a regenerate/delete fails.
    resume: Phase,

    draft: DiaryDraft,
    diary_id: Option<DiaryId>,
    diary: Option<Diary>,

    /// Local copy of `original_content` while Editing (and while a save of it
    /// is in flight).
    edit_text: Option<String>,

    panel_in_flight: Option<PanelId>,

    /// Set while Loading the copy a finished action produced.
    reloading_after: Option<Action>,

    /// Bumped whenever `diary` is replaced; late panel results from an older
    /// epoch are dropped.
    epoch: u64,

    notice: Option<Notice>,
}

impl DiaryLifecycle {
    fn with_phase(phase: Phase) -> Self {
        Self {
            phase,
            resume: Phase::Viewing,
            draft: DiaryDraft::default(),
            diary_id: None,
            diary: None,
            edit_text: None,
            panel_in_flight: None,
            reloading_after: None,
            epoch: 0,
            notice: None,
        }
    }

    pub fn compose() -> Self {
        Self::with_phase(Phase::Composing)
    }

    pub fn open(diary_id: DiaryId) -> Self {
        let mut lc = Self::with_phase(Phase::Unloaded);
        lc.diary_id = Some(diary_id);
        lc
    }

    /// Start from a representation another view already fetched.
    pub fn viewing(diary: Diary) -> Self {
        let mut lc = Self::with_phase(Phase::Viewing);
        lc.diary_id = Some(diary.diary_id.clone());
        lc.diary = Some(diary);
        lc
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn diary_id(&self) -> Option<&DiaryId> {
        self.diary_id.as_ref()
    }

    pub fn diary(&self) -> Option<&Diary> {
        self.diary.as_ref()
    }

    pub fn edit_text(&self) -> Option<&str> {
        self.edit_text.as_deref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn panel_in_flight(&self) -> Option<&PanelId> {
        self.panel_in_flight.as_ref()
    }

    fn is_settled(&self) -> bool {
        matches!(self.phase, Phase::Viewing | Phase::Editing)
    }

    /// True once the entity is gone and the view should leave.
    pub fn is_gone(&self) -> bool {
        matches!(self.phase, Phase::Deleted | Phase::Missing)
    }

    pub fn can_edit_text(&self) -> bool {
        self.phase == Phase::Editing
    }

    pub fn can_save(&self) -> bool {
        self.phase == Phase::Editing
    }

    pub fn can_full_regenerate(&self) -> bool {
        self.is_settled()
    }

    pub fn can_regenerate_panel(&self) -> bool {
        self.is_settled() && self.panel_in_flight.is_none()
    }

    pub fn can_delete(&self) -> bool {
        self.is_settled()
    }

    fn fail(&mut self, notice: Notice) {
        log::warn!("{notice}");
        self.notice = Some(notice);
    }

    fn replace_diary(&mut self, diary: Diary) {
        self.diary_id = Some(diary.diary_id.clone());
        self.diary = Some(diary);
        self.edit_text = None;
        self.epoch += 1;
        self.phase = Phase::Viewing;
        self.notice = None;
    }

    pub fn set_draft(&mut self, draft: DiaryDraft) {
        if self.phase == Phase::Composing {
            self.draft = draft;
        }
    }

    /// Validate the draft and move to Submitting. Validation problems are
    /// reported as a notice and no request is issued.
    pub fn begin_submit(&mut self, session: Option<&Session>) -> Option<CreateDiaryRequest> {
        if self.phase != Phase::Composing {
            return None;
        }

        let request = match self.draft_request(session) {
            Ok(request) => request,
            Err(err) => {
                self.fail(Notice::validation(Action::Create, err));
                return None;
            }
        };

        self.notice = None;
        self.phase = Phase::Submitting;
        Some(request)
    }

    fn draft_request(&self, session: Option<&Session>) -> Result<CreateDiaryRequest, ValidationError> {
        let d = &self.draft;
        if d.original_content.trim().is_empty() {
            return Err(ValidationError::EmptyDiary);
        }
        let session = session.ok_or(ValidationError::NotLoggedIn)?;
        let cuts_count = parse_cuts_count(&d.cuts)?;

        Ok(CreateDiaryRequest {
            user_id: session.user_id.clone(),
            original_content: d.original_content.clone(),
            genre: d.genre.trim().to_string(),
            style: d.style.trim().to_string(),
            character_note: d.character_note.trim().to_string(),
            cuts_count,
        })
    }

    /// On success the diary exists but has not been fetched yet.
    pub fn finish_submit(&mut self, result: ApiResult<DiaryId>) {
        if self.phase != Phase::Submitting {
            return;
        }

        match result {
            Ok(diary_id) => {
                log::info!("diary {diary_id} created");
                self.draft = DiaryDraft::default();
                self.diary_id = Some(diary_id);
                self.phase = Phase::Unloaded;
            }
            Err(err) => {
                self.phase = Phase::Composing;
                self.fail(Notice::failure(Action::Create, &err));
            }
        }
    }

    pub fn begin_load(&mut self) -> Option<DiaryId> {
        if self.phase != Phase::Unloaded {
            return None;
        }
        let diary_id = self.diary_id.clone()?;
        self.phase = Phase::Loading;
        Some(diary_id)
    }

    /// A failed fetch leaves nothing displayed; the view offers a retry.
    pub fn finish_load(&mut self, result: ApiResult<Diary>) {
        if self.phase != Phase::Loading {
            return;
        }

        let after = self.reloading_after.take();
        match result {
            Ok(diary) => self.replace_diary(diary),
            Err(err) if err.is_not_found() => {
                self.phase = Phase::Missing;
                self.diary = None;
                self.fail(Notice::failure(Action::Load, &err));
            }
            Err(err) => {
                self.phase = Phase::Unloaded;
                self.diary = None;
                self.edit_text = None;
                let notice = match after {
                    Some(action) => Notice::reload_failed(action, &err),
                    None => Notice::failure(Action::Load, &err),
                };
                self.fail(notice);
            }
        }
    }

    pub fn request_edit(&mut self) -> bool {
        if self.phase != Phase::Viewing {
            return false;
        }
        let Some(diary) = &self.diary else {
            return false;
        };
        self.edit_text = Some(diary.original_content.clone());
        self.phase = Phase::Editing;
        true
    }

    pub fn set_edit_text(&mut self, text: String) {
        if self.phase == Phase::Editing {
            self.edit_text = Some(text);
        }
    }

    pub fn cancel_edit(&mut self) -> bool {
        if self.phase != Phase::Editing {
            return false;
        }
        self.edit_text = None;
        self.phase = Phase::Viewing;
        true
    }

    /// Only the original text changes; story and panel text are sent back as
    /// the server last returned them.
    pub fn begin_save(&mut self, confirm: &impl Confirm) -> Option<SaveTicket> {
        if !self.can_save() {
            return None;
        }
        let diary = self.diary.as_ref()?;
        let original_content = self.edit_text.clone()?;

        if !confirm.confirm(CONFIRM_SAVE) {
            return None;
        }

        let ticket = SaveTicket {
            diary_id: diary.diary_id.clone(),
            request: UpdateDiaryRequest {
                original_content,
                full_story: diary.full_story.clone(),
                cuts: diary
                    .panels
                    .iter()
                    .map(|p| PanelTextUpdate {
                        cut_id: p.panel_id.clone(),
                        text: p.text.clone(),
                    })
                    .collect(),
            },
        };

        self.notice = None;
        self.phase = Phase::Saving;
        Some(ticket)
    }

    /// A failed save keeps the text the user typed.
    pub fn finish_save(&mut self, result: ApiResult<Diary>) {
        if self.phase != Phase::Saving {
            return;
        }

        match result {
            Ok(diary) => {
                log::info!("diary {} saved", diary.diary_id);
                self.replace_diary(diary);
            }
            Err(err) => {
                self.phase = Phase::Editing;
                self.fail(Notice::failure(Action::Save, &err));
            }
        }
    }

    /// Rebuild story and panels from the current text (the edit buffer when
    /// Editing). A second call while one is running does nothing.
    pub fn begin_full_regenerate(
        &mut self,
        session: Option<&Session>,
        confirm: &impl Confirm,
    ) -> Option<RegenerateTicket> {
        if !self.can_full_regenerate() || self.diary.is_none() {
            return None;
        }

        let Some(session) = session else {
            self.fail(Notice::validation(
                Action::Regenerate,
                ValidationError::NotLoggedIn,
            ));
            return None;
        };

        let diary = self.diary.as_ref()?;
        let original_content = match (self.phase, &self.edit_text) {
            (Phase::Editing, Some(text)) => text.clone(),
            _ => diary.original_content.clone(),
        };

        if !confirm.confirm(CONFIRM_FULL_REGENERATE) {
            return None;
        }

        let ticket = RegenerateTicket {
            diary_id: diary.diary_id.clone(),
            request: RegenerateDiaryRequest {
                original_content,
                user_id: session.user_id.clone(),
            },
        };

        self.resume = self.phase;
        self.notice = None;
        self.phase = Phase::Regenerating;
        Some(ticket)
    }

    /// A failed regenerate call restores the previous phase. Once it
    /// succeeds the backend has replaced story and panels, so the lifecycle
    /// moves to Loading and returns the id to fetch; `finish_load` completes
    /// the transition. The id stays the one this view opened.
    pub fn finish_full_regenerate(&mut self, result: ApiResult<DiaryId>) -> Option<DiaryId> {
        if self.phase != Phase::Regenerating {
            return None;
        }

        match result {
            Ok(returned) => {
                let Some(diary_id) = self.diary_id.clone() else {
                    self.phase = self.resume;
                    return None;
                };
                if returned != diary_id {
                    log::warn!("regenerate of diary {diary_id} answered with id {returned}; keeping {diary_id}");
                }
                log::info!("diary {diary_id} regenerated");
                self.edit_text = None;
                self.epoch += 1;
                self.reloading_after = Some(Action::Regenerate);
                self.phase = Phase::Loading;
                Some(diary_id)
            }
            Err(err) => {
                self.phase = self.resume;
                self.fail(Notice::failure(Action::Regenerate, &err));
                None
            }
        }
    }

    pub fn begin_regenerate_panel(
        &mut self,
        panel_id: PanelId,
        confirm: &impl Confirm,
    ) -> Option<PanelTicket> {
        if !self.can_regenerate_panel() {
            return None;
        }
        self.diary.as_ref()?.panel(&panel_id)?;

        if !confirm.confirm(CONFIRM_PANEL_REGENERATE) {
            return None;
        }

        self.notice = None;
        self.panel_in_flight = Some(panel_id.clone());
        Some(PanelTicket {
            panel_id,
            request: RegeneratePanelRequest::default(),
            epoch: self.epoch,
        })
    }

    /// Patch only the ticket's panel. Results for a diary that has since been
    /// replaced are dropped.
    pub fn finish_regenerate_panel(&mut self, ticket: &PanelTicket, result: ApiResult<String>) {
        if self.panel_in_flight.as_ref() == Some(&ticket.panel_id) {
            self.panel_in_flight = None;
        }

        if ticket.epoch != self.epoch {
            log::debug!("dropping stale image for panel {}", ticket.panel_id);
            return;
        }

        match result {
            Ok(image_url) => {
                let patched = self
                    .diary
                    .as_mut()
                    .is_some_and(|d| d.set_panel_image(&ticket.panel_id, image_url));
                if !patched {
                    log::warn!("panel {} no longer on this diary", ticket.panel_id);
                }
            }
            Err(err) => self.fail(Notice::failure(Action::RegeneratePanel, &err)),
        }
    }

    pub fn begin_delete(&mut self, confirm: &impl Confirm) -> Option<DiaryId> {
        if !self.can_delete() {
            return None;
        }
        let diary_id = self.diary_id.clone()?;

        if !confirm.confirm(CONFIRM_DELETE) {
            return None;
        }

        self.resume = self.phase;
        self.notice = None;
        self.phase = Phase::Deleting;
        Some(diary_id)
    }

    pub fn finish_delete(&mut self, result: ApiResult<()>) {
        if self.phase != Phase::Deleting {
            return;
        }

        match result {
            Ok(()) => {
                log::info!("diary deleted");
                self.diary = None;
                self.edit_text = None;
                self.panel_in_flight = None;
                self.epoch += 1;
                self.phase = Phase::Deleted;
            }
            Err(err) => {
                self.phase = self.resume;
                self.fail(Notice::failure(Action::Delete, &err));
            }
        }
    }
}
