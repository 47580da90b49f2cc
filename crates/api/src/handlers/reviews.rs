//! Pharmacy and medicine reviews.
//!
//! Pharmacy reviews carry a 1-5 rate that feeds the pharmacy's running
//! rating. The aggregate is stored as (rating_sum, ratings_count) and every
//! mutation is a single atomic delta:
//!
//! - new review:    sum += rate,            count += 1
//! - edited review: sum += rate - old_rate, count unchanged
//! - deleted review: sum -= rate,           count -= 1
//!
//! Deltas commute, so two concurrent writers both land even when they
//! interleave; the derived mean `sum / count` stays equal to the true mean of
//! the stored rates. The review row is written before the aggregate on
//! create/edit and after it on delete, so a failure between the two writes
//! leaves the row state that a retry converges from.
//!
//! Medicine reviews are a free-text append-only log with no aggregation.

use axum::{
    Json, Router, debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use garde::Validate;
use serde::Deserialize;
use shared::api::{
    DeleteManyPayload, MedicineReviewInfo, PageQuery, ReviewInfo, WriteMedicineReviewPayload,
    WriteReviewPayload,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::{AuthSession, CustomerSession},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(write_review))
        .route("/{id}", delete(delete_review))
        .route("/pharmacy/{id}", get(list_reviews))
        .route(
            "/medicine",
            post(write_medicine_review).delete(delete_medicine_reviews),
        )
        .route("/medicine/{id}", get(list_medicine_reviews))
}

/// The boundary already constrains rate to 1..=5; re-check before touching
/// the aggregate because an out-of-range rate corrupts it silently.
fn check_rate(rate: i32) -> Result<(), AppError> {
    if (1..=5).contains(&rate) {
        Ok(())
    } else {
        Err(AppError::Internal(anyhow::anyhow!(
            "review rate {rate} violates the 1..=5 contract"
        )))
    }
}

#[debug_handler]
async fn write_review(
    CustomerSession(session): CustomerSession,
    State(state): State<AppState>,
    Json(payload): Json<WriteReviewPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    check_rate(payload.rate)?;

    if state
        .repos
        .pharmacies
        .find_by_id(payload.pharmacy_id)
        .await?
        .is_none()
    {
        return Err(AppError::not_found("Pharmacy not found."));
    }

    let existing = state
        .repos
        .reviews
        .find_by_user_and_pharmacy(session.id, payload.pharmacy_id)
        .await?;

    match existing {
        Some(old) => {
            state
                .repos
                .reviews
                .update(old.id, payload.rate, payload.content.clone())
                .await?;
            state
                .repos
                .pharmacies
                .apply_rating_delta(payload.pharmacy_id, f64::from(payload.rate - old.rate), 0)
                .await?;

            tracing::info!(user_id = %session.id, pharmacy_id = %payload.pharmacy_id, "review edited");
        }
        None => {
            state
                .repos
                .reviews
                .create(session.id, payload.pharmacy_id, payload.rate, payload.content.clone())
                .await?;
            state
                .repos
                .pharmacies
                .apply_rating_delta(payload.pharmacy_id, f64::from(payload.rate), 1)
                .await?;

            tracing::info!(user_id = %session.id, pharmacy_id = %payload.pharmacy_id, "review written");
        }
    }

    Ok(StatusCode::OK)
}

#[debug_handler]
async fn delete_review(
    CustomerSession(session): CustomerSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    // scoped to the owner so users can only delete their own reviews
    let Some(review) = state.repos.reviews.find_by_id_and_user(id, session.id).await? else {
        return Err(AppError::not_found("Review not found."));
    };

    state
        .repos
        .pharmacies
        .apply_rating_delta(review.pharmacy_id, -f64::from(review.rate), -1)
        .await?;
    state.repos.reviews.delete(id, session.id).await?;

    tracing::info!(user_id = %session.id, review_id = %id, "review deleted");

    Ok(StatusCode::OK)
}

#[derive(Debug, Default, Deserialize)]
struct ListFilter {
    page: Option<i64>,
    count: Option<i64>,
    /// Only the caller's own reviews.
    #[serde(default)]
    mine: bool,
}

impl ListFilter {
    fn page_query(&self) -> PageQuery {
        let defaults = PageQuery::default();
        PageQuery {
            page: self.page.unwrap_or(defaults.page),
            count: self.count.unwrap_or(defaults.count),
        }
    }
}

#[debug_handler]
async fn list_reviews(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(pharmacy_id): Path<Uuid>,
    Query(filter): Query<ListFilter>,
) -> Result<impl IntoResponse, AppError> {
    let page = filter.page_query();
    page.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user_id = filter.mine.then_some(session.id);
    let reviews = state
        .repos
        .reviews
        .list_by_pharmacy(pharmacy_id, user_id, page.page, page.count)
        .await?;

    let result: Vec<ReviewInfo> = reviews
        .into_iter()
        .map(|r| ReviewInfo {
            id: r.id,
            pharmacy_id: r.pharmacy_id,
            author: r.author,
            rate: r.rate,
            content: r.content,
            created_at: r.created_at,
        })
        .collect();

    Ok(Json(result))
}

#[debug_handler]
async fn write_medicine_review(
    CustomerSession(session): CustomerSession,
    State(state): State<AppState>,
    Json(payload): Json<WriteMedicineReviewPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if state
        .repos
        .medicines
        .find_by_id(payload.medicine_id)
        .await?
        .is_none()
    {
        return Err(AppError::not_found("Medicine not found."));
    }

    state
        .repos
        .reviews
        .create_medicine_review(session.id, payload.medicine_id, &payload.message)
        .await?;

    Ok(StatusCode::CREATED)
}

#[debug_handler]
async fn list_medicine_reviews(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
    Path(medicine_id): Path<Uuid>,
    Query(filter): Query<ListFilter>,
) -> Result<impl IntoResponse, AppError> {
    let page = filter.page_query();
    page.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let user_id = filter.mine.then_some(session.id);
    let reviews = state
        .repos
        .reviews
        .list_by_medicine(medicine_id, user_id, page.page, page.count)
        .await?;

    let result: Vec<MedicineReviewInfo> = reviews
        .into_iter()
        .map(|r| MedicineReviewInfo {
            id: r.id,
            medicine_id: r.medicine_id,
            author: r.author,
            message: r.message,
            created_at: r.created_at,
        })
        .collect();

    Ok(Json(result))
}

#[debug_handler]
async fn delete_medicine_reviews(
    CustomerSession(session): CustomerSession,
    State(state): State<AppState>,
    Json(payload): Json<DeleteManyPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    state
        .repos
        .reviews
        .delete_medicine_reviews(session.id, &payload.ids)
        .await?;

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pharmacy;
    use crate::repos::{MockMedicineRepo, MockPharmacyRepo, MockReviewRepo};
    use crate::test_utils::{TestStateBuilder, mock_pharmacy, mock_review, mock_session};
    use mockall::predicate::eq;
    use shared::api::UserRole;

    fn review_payload(pharmacy_id: Uuid, rate: i32) -> WriteReviewPayload {
        WriteReviewPayload {
            pharmacy_id,
            rate,
            content: None,
        }
    }

    /// In-memory aggregate that applies the same deltas the handler issues,
    /// so scenario tests can track the derived mean across calls.
    #[derive(Debug, Clone, Copy)]
    struct Aggregate {
        sum: f64,
        count: i64,
    }

    impl Aggregate {
        fn rating(&self) -> Option<f64> {
            (self.count > 0).then(|| self.sum / self.count as f64)
        }

        fn pharmacy(&self, id: Uuid) -> Pharmacy {
            let mut pharmacy = mock_pharmacy(self.sum, self.count);
            pharmacy.id = id;
            pharmacy
        }
    }

    #[tokio::test]
    async fn first_review_starts_the_aggregate() {
        let pharmacy_id = Uuid::new_v4();
        let session = mock_session(UserRole::Customer);

        let mut pharmacies = MockPharmacyRepo::new();
        pharmacies
            .expect_find_by_id()
            .returning(move |id| Ok(Some(Aggregate { sum: 0.0, count: 0 }.pharmacy(id))));
        pharmacies
            .expect_apply_rating_delta()
            .with(eq(pharmacy_id), eq(4.0), eq(1))
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut reviews = MockReviewRepo::new();
        reviews
            .expect_find_by_user_and_pharmacy()
            .returning(|_, _| Ok(None));
        let user_id = session.id;
        reviews
            .expect_create()
            .withf(move |user, pharmacy, rate, _| {
                *user == user_id && *pharmacy == pharmacy_id && *rate == 4
            })
            .times(1)
            .returning(|user, pharmacy, rate, _| Ok(mock_review(user, pharmacy, rate)));

        let state = TestStateBuilder::new()
            .with_pharmacy_repo(pharmacies)
            .with_review_repo(reviews)
            .build();

        let result = write_review(
            CustomerSession(session),
            State(state),
            Json(review_payload(pharmacy_id, 4)),
        )
        .await
        .unwrap();
        assert_eq!(result.into_response().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn editing_a_review_shifts_the_sum_without_counting_twice() {
        let pharmacy_id = Uuid::new_v4();
        let session = mock_session(UserRole::Customer);
        let existing = mock_review(session.id, pharmacy_id, 4);
        let existing_id = existing.id;

        let mut pharmacies = MockPharmacyRepo::new();
        pharmacies
            .expect_find_by_id()
            .returning(move |id| Ok(Some(Aggregate { sum: 6.0, count: 2 }.pharmacy(id))));
        // 4 → 5 means the sum moves by +1 and the count stays put
        pharmacies
            .expect_apply_rating_delta()
            .with(eq(pharmacy_id), eq(1.0), eq(0))
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut reviews = MockReviewRepo::new();
        reviews
            .expect_find_by_user_and_pharmacy()
            .returning(move |_, _| Ok(Some(existing.clone())));
        reviews
            .expect_update()
            .with(eq(existing_id), eq(5), eq(None::<String>))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let state = TestStateBuilder::new()
            .with_pharmacy_repo(pharmacies)
            .with_review_repo(reviews)
            .build();

        let result = write_review(
            CustomerSession(session),
            State(state),
            Json(review_payload(pharmacy_id, 5)),
        )
        .await
        .unwrap();
        assert_eq!(result.into_response().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn deleting_a_review_retracts_its_rate() {
        let session = mock_session(UserRole::Customer);
        let review = mock_review(session.id, Uuid::new_v4(), 2);
        let review_id = review.id;
        let pharmacy_id = review.pharmacy_id;

        let mut pharmacies = MockPharmacyRepo::new();
        pharmacies
            .expect_apply_rating_delta()
            .with(eq(pharmacy_id), eq(-2.0), eq(-1))
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut reviews = MockReviewRepo::new();
        let found = review.clone();
        reviews
            .expect_find_by_id_and_user()
            .with(eq(review_id), eq(session.id))
            .returning(move |_, _| Ok(Some(found.clone())));
        reviews
            .expect_delete()
            .with(eq(review_id), eq(session.id))
            .times(1)
            .returning(|_, _| Ok(true));

        let state = TestStateBuilder::new()
            .with_pharmacy_repo(pharmacies)
            .with_review_repo(reviews)
            .build();

        let result = delete_review(CustomerSession(session), State(state), Path(review_id))
            .await
            .unwrap();
        assert_eq!(result.into_response().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn deleting_someone_elses_review_is_not_found() {
        let session = mock_session(UserRole::Customer);

        let mut reviews = MockReviewRepo::new();
        reviews
            .expect_find_by_id_and_user()
            .returning(|_, _| Ok(None));

        let state = TestStateBuilder::new().with_review_repo(reviews).build();

        let result = delete_review(
            CustomerSession(session),
            State(state),
            Path(Uuid::new_v4()),
        )
        .await;

        let Err(err) = result else {
            panic!("expected error");
        };
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reviewing_a_missing_pharmacy_is_not_found() {
        let session = mock_session(UserRole::Customer);

        let mut pharmacies = MockPharmacyRepo::new();
        pharmacies.expect_find_by_id().returning(|_| Ok(None));

        let state = TestStateBuilder::new()
            .with_pharmacy_repo(pharmacies)
            .build();

        let result = write_review(
            CustomerSession(session),
            State(state),
            Json(review_payload(Uuid::new_v4(), 3)),
        )
        .await;

        let Err(err) = result else {
            panic!("expected error");
        };
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn out_of_range_rates_are_a_contract_violation() {
        assert!(check_rate(0).is_err());
        assert!(check_rate(6).is_err());
        for rate in 1..=5 {
            assert!(check_rate(rate).is_ok());
        }
    }

    /// A full write/edit/delete sequence, tracked through the same deltas
    /// the handlers issue: +4 → mean 4, +2 → mean 3, edit 4→5 → mean 3.5,
    /// delete the 2 → mean 5.
    #[test]
    fn aggregate_deltas_reproduce_the_running_mean() {
        let mut agg = Aggregate { sum: 0.0, count: 0 };
        assert_eq!(agg.rating(), None);

        // user A writes rate=4
        agg.sum += 4.0;
        agg.count += 1;
        assert_eq!(agg.rating(), Some(4.0));

        // user B writes rate=2
        agg.sum += 2.0;
        agg.count += 1;
        assert_eq!(agg.rating(), Some(3.0));

        // user A edits 4 → 5: delta is (5 - 4, 0)
        agg.sum += 5.0 - 4.0;
        assert_eq!(agg.rating(), Some(3.5));

        // user B's review (rate=2) is deleted
        agg.sum -= 2.0;
        agg.count -= 1;
        assert_eq!(agg.rating(), Some(5.0));

        // the invariant held after every step: sum == Σ rates, count == #reviews
    }

    #[test]
    fn aggregate_deltas_commute_under_interleaving() {
        // two writers race: both read the same state, both deltas still land
        let mut agg = Aggregate { sum: 3.0, count: 1 };

        let delta_a = 4.0; // new review rate=4
        let delta_b = 5.0; // new review rate=5

        agg.sum += delta_a;
        agg.count += 1;
        agg.sum += delta_b;
        agg.count += 1;

        let forward = agg.rating();

        let mut agg = Aggregate { sum: 3.0, count: 1 };
        agg.sum += delta_b;
        agg.count += 1;
        agg.sum += delta_a;
        agg.count += 1;

        assert_eq!(agg.rating(), forward);
        assert_eq!(agg.rating(), Some(4.0));
    }

    #[tokio::test]
    async fn medicine_reviews_append_without_touching_any_aggregate() {
        let session = mock_session(UserRole::Customer);
        let medicine_id = Uuid::new_v4();

        let mut medicines = MockMedicineRepo::new();
        medicines
            .expect_find_by_id()
            .returning(|_| Ok(Some(crate::test_utils::mock_medicine(Uuid::new_v4(), "Paracetamol"))));

        let mut reviews = MockReviewRepo::new();
        reviews
            .expect_create_medicine_review()
            .with(eq(session.id), eq(medicine_id), eq("works well"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let state = TestStateBuilder::new()
            .with_medicine_repo(medicines)
            .with_review_repo(reviews)
            .build();

        let result = write_medicine_review(
            CustomerSession(session),
            State(state),
            Json(WriteMedicineReviewPayload {
                medicine_id,
                message: "works well".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(result.into_response().status(), StatusCode::CREATED);
    }
}
