//! Alarm type endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use errors::AlarmeError;

use crate::api::models::{AcceptedDeletion, AcceptedType};
use crate::api::remember;
use crate::cache::keys;
use crate::domain::{CreateTypeRequest, UpdateTypeRequest};
use crate::error::ApiError;
use crate::queue::{Command, Envelope};
use crate::AppState;

/// GET /tipo-alarmes
pub async fn index(State(state): State<AppState>) -> Result<Response, ApiError> {
    remember(&state, keys::TYPE_LIST_KEY, || async {
        let types = state.types.all().await.map_err(ApiError::from)?;
        serde_json::to_string(&types)
            .map_err(|e| ApiError::internal_error(format!("Serialization failed: {}", e)))
    })
    .await
}

/// GET /tipo-alarmes/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    remember(&state, &keys::type_entity(id), || async {
        let alarm_type = state
            .types
            .find(id)
            .await
            .map_err(ApiError::from)?
            .ok_or_else(|| {
                ApiError::not_found(format!("Tipo de alarme não encontrado: {}", id))
            })?;
        serde_json::to_string(&alarm_type)
            .map_err(|e| ApiError::internal_error(format!("Serialization failed: {}", e)))
    })
    .await
}

/// POST /tipo-alarmes
pub async fn store(
    State(state): State<AppState>,
    Json(request): Json<CreateTypeRequest>,
) -> Result<Response, ApiError> {
    let name = request.validate().map_err(ApiError::from)?;

    // Uniqueness is checked synchronously so the caller gets a field error
    // instead of a silently dead-lettered command.
    if state
        .types
        .find_by_name(&name)
        .await
        .map_err(ApiError::from)?
        .is_some()
    {
        return Err(AlarmeError::invalid_field("nome", "already taken").into());
    }

    let preview = serde_json::json!({
        "nome": name,
        "created_at": Utc::now(),
    });

    let envelope = Envelope::new(Command::TypeCreate { name });
    state.queue.enqueue(&envelope).await.map_err(ApiError::from)?;
    state.invalidator.types_changed(None).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedType {
            message: "Tipo de alarme enviado para processamento".to_string(),
            tipo_alarme: preview,
            provisional: true,
            job_dispatched: true,
        }),
    )
        .into_response())
}

/// PUT /tipo-alarmes/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTypeRequest>,
) -> Result<Response, ApiError> {
    let mut alarm_type = state
        .types
        .find(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found(format!("Tipo de alarme não encontrado: {}", id)))?;

    let name = request.validate().map_err(ApiError::from)?;

    if let Some(existing) = state
        .types
        .find_by_name(&name)
        .await
        .map_err(ApiError::from)?
    {
        if existing.id != id {
            return Err(AlarmeError::invalid_field("nome", "already taken").into());
        }
    }

    alarm_type.name = name.clone();

    let envelope = Envelope::new(Command::TypeUpdate { type_id: id, name });
    state.queue.enqueue(&envelope).await.map_err(ApiError::from)?;
    state.invalidator.types_changed(Some(id)).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedType {
            message: "Atualização de tipo de alarme enviada para processamento".to_string(),
            tipo_alarme: alarm_type,
            provisional: true,
            job_dispatched: true,
        }),
    )
        .into_response())
}

/// DELETE /tipo-alarmes/{id}
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    state
        .types
        .find(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found(format!("Tipo de alarme não encontrado: {}", id)))?;

    // Referential guard, repeated atomically in the store when the worker
    // commits.
    let in_use = state.alarms.count_for_type(id).await.map_err(ApiError::from)?;
    if in_use > 0 {
        return Err(ApiError::conflict(format!(
            "Tipo de alarme em uso por {} alarme(s)",
            in_use
        )));
    }

    let envelope = Envelope::new(Command::TypeDelete { type_id: id });
    state.queue.enqueue(&envelope).await.map_err(ApiError::from)?;
    state.invalidator.types_changed(Some(id)).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedDeletion {
            message: "Solicitação de exclusão enviada para processamento".to_string(),
            job_dispatched: true,
        }),
    )
        .into_response())
}
