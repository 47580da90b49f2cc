//! Medicine catalog: pharmacist CRUD, public search, recommendations and
//! AI-assisted lookup.
//!
//! Endpoints:
//! - GET /medicines - filtered catalog search
//! - GET /medicines/mine - the pharmacist's own catalog
//! - POST /medicines - add a medicine (pharmacist)
//! - PUT /medicines/{id} - update a medicine (pharmacist, own catalog only)
//! - DELETE /medicines - bulk delete (pharmacist, own catalog only)
//! - GET /medicines/recommendations - by the customer's health conditions
//! - POST /medicines/suggest - AI lookup from a free-text description
//! - GET /medicines/{id} - a single medicine

use axum::{
    Json, Router, debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use garde::Validate;
use shared::api::{
    DeleteManyPayload, MedicineInfo, MedicinePayload, MedicineSearchQuery, PageQuery,
    SuggestMedicinesPayload, SuggestMedicinesResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::{AuthSession, CustomerSession, PharmacistSession},
    models::Pharmacy,
    state::AppState,
};

/// How many AI suggestions are searched against the catalog.
const MAX_SUGGESTION_LOOKUPS: usize = 5;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search).post(add_medicine).delete(delete_medicines))
        .route("/mine", get(list_mine))
        .route("/recommendations", get(recommendations))
        .route("/suggest", post(suggest))
        .route("/{id}", get(get_medicine).put(update_medicine))
}

/// Catalog writes require a pharmacy profile: medicines hang off the
/// pharmacy, not the account.
async fn own_pharmacy(state: &AppState, user_id: Uuid) -> Result<Pharmacy, AppError> {
    state
        .repos
        .pharmacies
        .find_by_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Pharmacy profile not set."))
}

#[debug_handler]
async fn add_medicine(
    PharmacistSession(session): PharmacistSession,
    State(state): State<AppState>,
    Json(payload): Json<MedicinePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let pharmacy = own_pharmacy(&state, session.id).await?;
    let medicine = state.repos.medicines.create(pharmacy.id, payload).await?;

    tracing::info!(pharmacy_id = %pharmacy.id, medicine_id = %medicine.id, "medicine added");

    Ok((StatusCode::CREATED, Json(medicine.into_info())))
}

#[debug_handler]
async fn update_medicine(
    PharmacistSession(session): PharmacistSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MedicinePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let pharmacy = own_pharmacy(&state, session.id).await?;

    let Some(medicine) = state.repos.medicines.update(pharmacy.id, id, payload).await? else {
        return Err(AppError::not_found("Medicine not found."));
    };

    Ok(Json(medicine.into_info()))
}

#[debug_handler]
async fn delete_medicines(
    PharmacistSession(session): PharmacistSession,
    State(state): State<AppState>,
    Json(payload): Json<DeleteManyPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let pharmacy = own_pharmacy(&state, session.id).await?;
    let deleted = state
        .repos
        .medicines
        .delete_many(pharmacy.id, &payload.ids)
        .await?;

    tracing::info!(pharmacy_id = %pharmacy.id, deleted, "medicines deleted");

    Ok(StatusCode::OK)
}

#[derive(Debug, serde::Deserialize)]
struct ListQuery {
    page: Option<i64>,
    count: Option<i64>,
}

impl ListQuery {
    fn page_query(&self) -> PageQuery {
        let defaults = PageQuery::default();
        PageQuery {
            page: self.page.unwrap_or(defaults.page),
            count: self.count.unwrap_or(defaults.count),
        }
    }
}

#[debug_handler]
async fn list_mine(
    PharmacistSession(session): PharmacistSession,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = query.page_query();
    page.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let pharmacy = own_pharmacy(&state, session.id).await?;
    let medicines = state
        .repos
        .medicines
        .list_by_pharmacy(pharmacy.id, page.page, page.count)
        .await?;

    let result: Vec<MedicineInfo> = medicines.into_iter().map(|m| m.into_info()).collect();

    Ok(Json(result))
}

#[debug_handler]
async fn search(
    _session: AuthSession,
    State(state): State<AppState>,
    Query(filter): Query<MedicineSearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    filter
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let medicines = state.repos.medicines.search(filter).await?;

    let result: Vec<MedicineInfo> = medicines.into_iter().map(|m| m.into_info()).collect();

    Ok(Json(result))
}

#[debug_handler]
async fn get_medicine(
    _session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let Some(medicine) = state.repos.medicines.find_by_id(id).await? else {
        return Err(AppError::not_found("Medicine not found."));
    };

    Ok(Json(medicine.into_info()))
}

/// Medicines tagged with any of the customer's recorded health conditions.
#[debug_handler]
async fn recommendations(
    CustomerSession(session): CustomerSession,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = query.page_query();
    page.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let Some(customer) = state.repos.customers.find_by_user(session.id).await? else {
        return Err(AppError::not_found("Customer profile not set."));
    };

    let conditions: Vec<String> = customer
        .conditions()
        .iter()
        .map(|c| c.as_str().to_owned())
        .collect();

    if conditions.is_empty() {
        return Ok(Json(Vec::<MedicineInfo>::new()));
    }

    let medicines = state
        .repos
        .medicines
        .recommend(&conditions, page.page, page.count)
        .await?;

    let result: Vec<MedicineInfo> = medicines.into_iter().map(|m| m.into_info()).collect();

    Ok(Json(result))
}

/// Ask the AI for medicine names matching a condition description, then look
/// each suggestion up in the catalog. The AI call is best-effort; an empty
/// suggestion list is a valid answer, not an error.
#[debug_handler]
async fn suggest(
    CustomerSession(_session): CustomerSession,
    State(state): State<AppState>,
    Json(payload): Json<SuggestMedicinesPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let suggestions = state.ai.suggest(&payload.description).await;

    let mut medicines: Vec<MedicineInfo> = Vec::new();
    for name in suggestions.iter().take(MAX_SUGGESTION_LOOKUPS) {
        let filter = MedicineSearchQuery {
            name: Some(name.clone()),
            ..Default::default()
        };

        for medicine in state.repos.medicines.search(filter).await? {
            if medicines.iter().all(|m| m.id != medicine.id) {
                medicines.push(medicine.into_info());
            }
        }
    }

    Ok(Json(SuggestMedicinesResponse {
        suggestions,
        medicines,
    }))
}
