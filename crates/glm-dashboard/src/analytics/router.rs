use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::service::{AnalyticsService, FilterQuery, PivotQuery};
use super::views::ViewKind;
use crate::error::AppError;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Router builder exposing the dataset, pivot, view and export endpoints.
pub fn analytics_router(service: Arc<AnalyticsService>) -> Router {
    Router::new()
        .route("/api/v1/dataset", get(dataset_handler))
        .route("/api/v1/pivot", post(pivot_handler))
        .route("/api/v1/pivot/csv", post(pivot_csv_handler))
        .route("/api/v1/views/:kind", post(view_handler))
        .route("/api/v1/export/csv", post(export_handler))
        .with_state(service)
}

pub(crate) async fn dataset_handler(State(service): State<Arc<AnalyticsService>>) -> Response {
    (StatusCode::OK, Json(service.summary())).into_response()
}

pub(crate) async fn pivot_handler(
    State(service): State<Arc<AnalyticsService>>,
    Json(query): Json<PivotQuery>,
) -> Response {
    match service.pivot(&query) {
        Ok(result) => (StatusCode::OK, Json(result.to_view())).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn pivot_csv_handler(
    State(service): State<Arc<AnalyticsService>>,
    Json(query): Json<PivotQuery>,
) -> Response {
    match service.pivot_csv(&query) {
        Ok(body) => csv_response(body),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn view_handler(
    State(service): State<Arc<AnalyticsService>>,
    Path(kind): Path<String>,
    Json(query): Json<FilterQuery>,
) -> Response {
    match kind.parse::<ViewKind>() {
        Ok(kind) => (StatusCode::OK, Json(service.view(kind, &query.filters))).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn export_handler(
    State(service): State<Arc<AnalyticsService>>,
    Json(query): Json<FilterQuery>,
) -> Response {
    match service.export_rows(&query.filters) {
        Ok(body) => csv_response(body),
        Err(err) => AppError::from(err).into_response(),
    }
}

fn csv_response(body: String) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, CSV_CONTENT_TYPE)], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::dataset::fixtures::three_rows;
    use crate::analytics::dataset::Dataset;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router() -> Router {
        let dataset = Arc::new(Dataset::from_records(three_rows()));
        analytics_router(Arc::new(AnalyticsService::new(dataset, 8)))
    }

    fn post_json(uri: &str, payload: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&payload).unwrap()))
            .unwrap()
    }

    async fn read_body(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body")
            .to_vec()
    }

    async fn read_json_body(response: Response) -> Value {
        serde_json::from_slice(&read_body(response).await).expect("json payload")
    }

    #[tokio::test]
    async fn dataset_route_lists_vocabularies() {
        let response = router()
            .oneshot(Request::get("/api/v1/dataset").body(Body::empty()).unwrap())
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["rows"], 3);
        assert_eq!(payload["dimensions"][0]["dimension"], "Region");
        assert_eq!(payload["dimensions"][0]["values"], json!(["A", "B"]));
    }

    #[tokio::test]
    async fn pivot_route_returns_raw_and_formatted_values() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/pivot",
                json!({ "rows": "Region", "metrics": ["Frequency", "PolicyCount"] }),
            ))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["shape"], "table");
        let first = &payload["rows"][0];
        assert_eq!(first["key"], "A");
        assert_eq!(first["cells"][0]["value"], 0.5);
        assert_eq!(first["cells"][0]["display"], "0.5000");
        assert_eq!(first["cells"][1]["display"], "2");
    }

    #[tokio::test]
    async fn pivot_route_rejects_unknown_dimensions_and_empty_metrics() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/pivot",
                json!({ "rows": "Colour", "metrics": ["Frequency"] }),
            ))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = read_json_body(response).await;
        assert_eq!(payload["error"], "unknown dimension 'Colour'");

        let response = router()
            .oneshot(post_json(
                "/api/v1/pivot",
                json!({ "rows": "Region", "metrics": [] }),
            ))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cross_tab_pivot_is_dense() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/pivot",
                json!({
                    "rows": "Region",
                    "columns": "Area",
                    "metrics": ["TotalExposure"],
                    "filters": { "categorical": [
                        { "dimension": "Region", "selection": { "one_of": ["A", "B"] } }
                    ] }
                }),
            ))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["shape"], "cross_tab");
        assert_eq!(payload["matrices"][0]["values"], json!([[2.0], [2.0]]));
    }

    #[tokio::test]
    async fn pivot_csv_route_sets_content_type() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/pivot/csv",
                json!({ "rows": "Region", "metrics": ["TotalExposure"], "formatted": true }),
            ))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            CSV_CONTENT_TYPE
        );
        let body = String::from_utf8(read_body(response).await).unwrap();
        assert_eq!(body, "Region,TotalExposure\nA,2.00\nB,2.00\n");
    }

    #[tokio::test]
    async fn view_route_dispatches_by_name() {
        let response = router()
            .oneshot(post_json("/api/v1/views/claims", json!({})))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["view"], "claims");
        assert_eq!(payload["kpis"][0]["value"], 1.0);

        let response = router()
            .oneshot(post_json("/api/v1/views/pivot", json!({})))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn export_route_streams_filtered_rows() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/export/csv",
                json!({ "filters": { "categorical": [
                    { "dimension": "Region", "selection": { "one_of": ["B"] } }
                ] } }),
            ))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        let body = String::from_utf8(read_body(response).await).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("3,0,2.0,C,"));
    }
}
