use super::{Confirm, DiaryLifecycle};
use crate::api::{ApiResult, DiaryGateway};
use crate::models::PanelId;
use crate::session::Session;
use leptos::prelude::*;
use std::cell::RefCell;

/// Somewhere a [`DiaryLifecycle`] lives between awaits.
///
/// `with_mut` returns `None` once the owner is gone (a disposed view); the
/// runners then drop the response.
pub(crate) trait LifecycleHandle {
    fn with_mut<R>(&self, f: impl FnOnce(&mut DiaryLifecycle) -> R) -> Option<R>;
}

impl LifecycleHandle for RwSignal<DiaryLifecycle> {
    fn with_mut<R>(&self, f: impl FnOnce(&mut DiaryLifecycle) -> R) -> Option<R> {
        self.try_update(f)
    }
}

impl LifecycleHandle for RefCell<DiaryLifecycle> {
    fn with_mut<R>(&self, f: impl FnOnce(&mut DiaryLifecycle) -> R) -> Option<R> {
        Some(f(&mut self.borrow_mut()))
    }
}

/// Fetch the diary if the lifecycle is waiting for one.
pub(crate) async fn run_load(h: &impl LifecycleHandle, gw: &impl DiaryGateway) -> ApiResult<()> {
    let Some(diary_id) = h.with_mut(|lc| lc.begin_load()).flatten() else {
        return Ok(());
    };

    let result = gw.get_diary(&diary_id).await;
    let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
    h.with_mut(|lc| lc.finish_load(result));
    outcome
}

/// Create the diary from the current draft, then fetch what the backend built.
pub(crate) async fn run_submit(
    h: &impl LifecycleHandle,
    gw: &impl DiaryGateway,
    session: Option<&Session>,
) -> ApiResult<()> {
    let Some(request) = h.with_mut(|lc| lc.begin_submit(session)).flatten() else {
        return Ok(());
    };

    let result = gw.create_diary(&request).await;
    let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
    h.with_mut(|lc| lc.finish_submit(result));
    outcome?;

    run_load(h, gw).await
}

pub(crate) async fn run_save(
    h: &impl LifecycleHandle,
    gw: &impl DiaryGateway,
    confirm: &impl Confirm,
) -> ApiResult<()> {
    let Some(ticket) = h.with_mut(|lc| lc.begin_save(confirm)).flatten() else {
        return Ok(());
    };

    let result = gw.update_diary(&ticket.diary_id, &ticket.request).await;
    let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
    h.with_mut(|lc| lc.finish_save(result));
    outcome
}

/// Regenerate, then re-fetch so story and panels come from the server. A
/// failed re-fetch leaves the lifecycle Unloaded; `run_load` retries it.
pub(crate) async fn run_full_regenerate(
    h: &impl LifecycleHandle,
    gw: &impl DiaryGateway,
    session: Option<&Session>,
    confirm: &impl Confirm,
) -> ApiResult<()> {
    let Some(ticket) = h
        .with_mut(|lc| lc.begin_full_regenerate(session, confirm))
        .flatten()
    else {
        return Ok(());
    };

    let result = gw.regenerate_diary(&ticket.diary_id, &ticket.request).await;
    let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
    let reload = h.with_mut(|lc| lc.finish_full_regenerate(result)).flatten();
    outcome?;
    let Some(diary_id) = reload else {
        return Ok(());
    };

    let result = gw.get_diary(&diary_id).await;
    let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
    h.with_mut(|lc| lc.finish_load(result));
    outcome
}

pub(crate) async fn run_regenerate_panel(
    h: &impl LifecycleHandle,
    gw: &impl DiaryGateway,
    panel_id: PanelId,
    confirm: &impl Confirm,
) -> ApiResult<()> {
    let Some(ticket) = h
        .with_mut(|lc| lc.begin_regenerate_panel(panel_id, confirm))
        .flatten()
    else {
        return Ok(());
    };

    let result = gw.regenerate_panel(&ticket.panel_id, &ticket.request).await;
    let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
    h.with_mut(|lc| lc.finish_regenerate_panel(&ticket, result));
    outcome
}

pub(crate) async fn run_delete(
    h: &impl LifecycleHandle,
    gw: &impl DiaryGateway,
    confirm: &impl Confirm,
) -> ApiResult<()> {
    let Some(diary_id) = h.with_mut(|lc| lc.begin_delete(confirm)).flatten() else {
        return Ok(());
    };

    let result = gw.delete_diary(&diary_id).await;
    let outcome = result.clone();
    h.with_mut(|lc| lc.finish_delete(result));
    outcome
}
