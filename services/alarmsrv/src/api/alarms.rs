//! Alarm endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};

use crate::api::auth::AuthSession;
use crate::api::models::{AcceptedAlarm, AcceptedDeletion, ListAlarmsQuery, PaginatedAlarms};
use crate::api::remember;
use crate::cache::keys;
use crate::domain::{Alarm, AlarmPreview, CreateAlarmRequest, UpdateAlarmRequest};
use crate::error::ApiError;
use crate::queue::{Command, Envelope};
use crate::AppState;

/// GET /alarmes
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListAlarmsQuery>,
) -> Result<Response, ApiError> {
    let filter = query.to_filter().map_err(ApiError::from)?;
    let key = keys::alarm_collection(&query.cache_params());

    remember(&state, &key, || async {
        let page = state.alarms.list(&filter).await.map_err(ApiError::from)?;
        let body = PaginatedAlarms::new(page.items, page.total, filter.page, filter.per_page);
        serde_json::to_string(&body)
            .map_err(|e| ApiError::internal_error(format!("Serialization failed: {}", e)))
    })
    .await
}

/// GET /alarmes/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    // Cache first; the store is only consulted on a miss, and a 404 aborts
    // the build so missing ids never get cached
    remember(&state, &keys::alarm_entity(id), || async {
        let alarm = state
            .alarms
            .find(id)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::not_found(format!("Alarme não encontrado: {}", id)))?;
        serde_json::to_string(&alarm)
            .map_err(|e| ApiError::internal_error(format!("Serialization failed: {}", e)))
    })
    .await
}

/// GET /alarmes/stats
pub async fn stats(State(state): State<AppState>) -> Result<Response, ApiError> {
    remember(&state, keys::ALARM_STATS_KEY, || async {
        let stats = state.alarms.stats().await.map_err(ApiError::from)?;
        serde_json::to_string(&stats)
            .map_err(|e| ApiError::internal_error(format!("Serialization failed: {}", e)))
    })
    .await
}

/// POST /alarmes
pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Json(request): Json<CreateAlarmRequest>,
) -> Result<Response, ApiError> {
    let mut new = request.validate().map_err(ApiError::from)?;

    // Resolve a free-text type eagerly so the preview carries a concrete
    // id; the worker repeats the same find-or-create, which is idempotent.
    let mut resolved_type = false;
    if new.type_id.is_none() {
        if let Some(name) = new.new_type_name.as_deref() {
            let alarm_type = state
                .types
                .find_or_create(name)
                .await
                .map_err(ApiError::from)?;
            new.type_id = Some(alarm_type.id);
            resolved_type = true;
        }
    }

    let preview = AlarmPreview::from_new(&new, session.user_id);
    let envelope = Envelope::new(Command::AlarmCreate {
        user_id: session.user_id,
        data: new,
    });
    state.queue.enqueue(&envelope).await.map_err(ApiError::from)?;
    // A resolved name may have materialized a new type row, so the type
    // listing goes stale along with the alarm caches
    if resolved_type {
        state.invalidator.alarms_and_types_changed(None).await;
    } else {
        state.invalidator.alarms_changed(None).await;
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedAlarm {
            message: "Alarme enviado para processamento".to_string(),
            alarme: preview,
            provisional: true,
            job_dispatched: true,
        }),
    )
        .into_response())
}

/// PUT/PATCH /alarmes/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateAlarmRequest>,
) -> Result<Response, ApiError> {
    let snapshot = state
        .alarms
        .find(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found(format!("Alarme não encontrado: {}", id)))?;

    let mut patch = request.validate().map_err(ApiError::from)?;

    let mut resolved_type = false;
    if let Some(name) = patch.new_type_name.as_deref() {
        let alarm_type = state
            .types
            .find_or_create(name)
            .await
            .map_err(ApiError::from)?;
        patch.type_id = Some(alarm_type.id);
        patch.new_type_name = None;
        resolved_type = true;
    }

    let preview = preview_update(snapshot, &patch);

    let envelope = Envelope::new(Command::AlarmUpdate {
        alarm_id: id,
        patch,
    });
    state.queue.enqueue(&envelope).await.map_err(ApiError::from)?;
    if resolved_type {
        state.invalidator.alarms_and_types_changed(Some(id)).await;
    } else {
        state.invalidator.alarms_changed(Some(id)).await;
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedAlarm {
            message: "Atualização de alarme enviada para processamento".to_string(),
            alarme: preview,
            provisional: true,
            job_dispatched: true,
        }),
    )
        .into_response())
}

/// DELETE /alarmes/{id}
pub async fn destroy(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let snapshot = state
        .alarms
        .find(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found(format!("Alarme não encontrado: {}", id)))?;

    // Pre-check against the current snapshot; the store re-checks
    // atomically when the worker commits.
    if !snapshot.can_soft_delete() {
        return Err(ApiError::forbidden(
            "Só é possível deletar alarmes com status 1 (aberto)",
        ));
    }

    let envelope = Envelope::new(Command::AlarmDelete {
        alarm_id: id,
        user_id: session.user_id,
    });
    state.queue.enqueue(&envelope).await.map_err(ApiError::from)?;
    state.invalidator.alarms_changed(Some(id)).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedDeletion {
            message: "Solicitação de exclusão enviada para processamento".to_string(),
            job_dispatched: true,
        }),
    )
        .into_response())
}

/// Overlay a patch onto the stored snapshot for the 202 preview
fn preview_update(mut snapshot: Alarm, patch: &crate::domain::AlarmPatch) -> Alarm {
    snapshot.apply_patch(patch);
    snapshot
}
