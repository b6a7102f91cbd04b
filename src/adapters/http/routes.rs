use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::adapters::http::state::HttpState;

pub async fn health(State(st): State<HttpState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "model_loaded": st.pipeline.model_loaded(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::adapters::http::router;
    use crate::test_support::http_state;
    use axum::{body::Body, http::Request};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn get_health(app: axum::Router) -> Value {
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(resp.status().is_success());
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn reports_model_state() {
        let (state, _shutdown) = http_state(vec![]);
        let pipeline = state.pipeline.clone();
        let app = router(state);

        let body = get_health(app.clone()).await;
        assert_eq!(body, serde_json::json!({"status": "ok", "model_loaded": true}));

        pipeline.mark_unloaded();
        let body = get_health(app).await;
        assert_eq!(body["model_loaded"], false);
    }
}
