use super::handlers::{comments, health, ratings, reactions, sse};
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

const METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

pub fn build_router(state: AppState, allowed_origins: &str) -> Router {
    let cors = if allowed_origins == "*" {
        CorsLayer::new()
            .allow_methods(METHODS)
            .allow_origin(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("CORS config is invalid or empty, falling back to allow ANY.");
            CorsLayer::new()
                .allow_methods(METHODS)
                .allow_origin(Any)
                .allow_headers(Any)
        } else {
            tracing::info!("CORS enabled for origins: {:?}", origins);
            CorsLayer::new()
                .allow_methods(METHODS)
                .allow_origin(origins)
                .allow_headers(Any)
        }
    };

    Router::new()
        .route("/api/health", get(health::health))
        .route(
            "/api/comments/:report_id",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/api/comments/:report_id/count", get(comments::count_comments))
        .route(
            "/api/comment/:id",
            put(comments::edit_comment).delete(comments::delete_comment),
        )
        .route("/api/likes/:report_id/count", get(reactions::reaction_summary))
        .route("/api/likes/:report_id/toggle", post(reactions::toggle_reaction))
        .route("/api/likes/:report_id/reactions", get(reactions::reaction_detail))
        .route("/api/ratings/:report_id/stats", get(ratings::rating_stats))
        .route("/api/ratings/:report_id", post(ratings::rate))
        .route("/api/reports/:report_id/events", get(sse::sse_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapter::{
        ClientSettings, CommentController, CommentStore, EventBus, HttpStore, RatingStore,
        ReactionAggregator, ReactionStore, StoreError,
    };
    use domain::{ActorId, CommentId, NewComment, RatingValue, ReactionKind, ReportId, Session};
    use std::sync::Arc;
    use std::time::Duration;
    use storage::Db;

    async fn spawn_server(allow_edit: bool) -> String {
        let db = Db::in_memory().await.unwrap();
        let app = build_router(AppState::new(db, 16, allow_edit), "*");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn http_store(base: &str, session: &Session) -> HttpStore {
        let settings = ClientSettings {
            api_url: base.to_string(),
            request_timeout: Duration::from_secs(5),
        };
        HttpStore::new(&settings, session).unwrap()
    }

    fn new_comment(report: &str, text: &str, parent: Option<&CommentId>) -> NewComment {
        NewComment::new(ReportId::new_unchecked(report), text, parent.cloned(), None).unwrap()
    }

    #[tokio::test]
    async fn comment_lifecycle_over_http() {
        let base = spawn_server(true).await;
        let store = http_store(&base, &Session::anonymous());
        let report = ReportId::new_unchecked("flood-12");

        let root = store.create_comment(&new_comment("flood-12", "water rising", None)).await.unwrap();
        assert_eq!(root.author_name, "Anonymous");
        let reply = store
            .create_comment(&new_comment("flood-12", "sandbags at the school", Some(&root.id)))
            .await
            .unwrap();

        let listed = store.list_comments(&report).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, [reply.id.clone(), root.id.clone()]);

        let edited = store.edit_comment(&reply.id, "sandbags at the library").await.unwrap();
        assert_eq!(edited.text, "sandbags at the library");
        assert!(edited.updated_at.is_some());

        store.delete_comment(&root.id).await.unwrap();
        assert!(store.list_comments(&report).await.unwrap().is_empty());
        assert_eq!(store.delete_comment(&root.id).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn bad_input_is_rejected() {
        let base = spawn_server(true).await;
        let store = http_store(&base, &Session::anonymous());

        let orphan = new_comment("r1", "hello", Some(&CommentId::new_unchecked("nope")));
        assert!(matches!(
            store.create_comment(&orphan).await,
            Err(StoreError::Rejected(_))
        ));

        let mut blank = new_comment("r1", "x", None);
        blank.text = "   ".into();
        assert!(matches!(
            store.create_comment(&blank).await,
            Err(StoreError::Rejected(_))
        ));

        let missing = store
            .edit_comment(&CommentId::new_unchecked("missing"), "text")
            .await;
        assert_eq!(missing, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn malformed_bodies_get_json_errors() {
        let base = spawn_server(true).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/api/comments/r1", base))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());

        let resp = client
            .post(format!("{}/api/comments/r1", base))
            .json(&serde_json::json!({ "authorName": "Ana" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "missing required field: text");

        let resp = client
            .post(format!("{}/api/ratings/r1", base))
            .json(&serde_json::json!({ "userId": "u1", "value": "five" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn edit_disabled_reverts_controller() {
        let base = spawn_server(false).await;
        let store = Arc::new(http_store(&base, &Session::anonymous()));
        let ctl = CommentController::new(
            ReportId::new_unchecked("fire-3"),
            Session::anonymous(),
            store.clone(),
            EventBus::new(),
        );

        let c = ctl.create("road closed", None).await.unwrap();
        let err = ctl.edit(&c.id, "road open").await.unwrap_err();
        assert_eq!(err, adapter::ClientError::Store(StoreError::Unsupported));
        assert_eq!(ctl.tree().roots()[0].comment.text, "road closed");

        ctl.refresh().await.unwrap();
        assert_eq!(ctl.tree().roots()[0].comment.text, "road closed");
    }

    #[tokio::test]
    async fn controller_tree_matches_server() {
        let base = spawn_server(true).await;
        let session = Session::anonymous();
        let store = Arc::new(http_store(&base, &session));
        let report = ReportId::new_unchecked("quake-1");
        let ctl = CommentController::new(report.clone(), session, store.clone(), EventBus::new());

        let a = ctl.create("need water", None).await.unwrap();
        let b = ctl.create("on our way", Some(&a.id)).await.unwrap();
        ctl.create("how many people?", Some(&b.id)).await.unwrap();
        let local = ctl.tree();

        let fresh = CommentController::new(report, Session::anonymous(), store, EventBus::new());
        assert_eq!(fresh.refresh().await.unwrap(), 3);
        assert_eq!(fresh.tree().flatten(), local.flatten());
    }

    #[tokio::test]
    async fn reactions_and_ratings_over_http() {
        let base = spawn_server(true).await;
        let session = Session::resume(ActorId::new_unchecked("s-1"));
        let store = Arc::new(http_store(&base, &session));
        let report = ReportId::new_unchecked("storm-8");
        let agg = ReactionAggregator::new(report.clone(), session, store.clone(), EventBus::new());

        let s = agg.react(Some(ReactionKind::Love)).await.unwrap();
        assert_eq!(s.count(ReactionKind::Love), 1);
        assert_eq!(s.user_reaction, Some(ReactionKind::Love));
        let detail = agg.detail().await.unwrap();
        assert_eq!(detail[&ReactionKind::Love], vec![ActorId::new_unchecked("s-1")]);

        let s = agg.react(Some(ReactionKind::Love)).await.unwrap();
        assert_eq!(s.total, 0);
        assert_eq!(agg.refresh().await.unwrap(), s);

        let me = ActorId::new_unchecked("s-1");
        store.rate(&report, &me, RatingValue::new(4).unwrap()).await.unwrap();
        let stats = store
            .rate(&report, &ActorId::new_unchecked("s-2"), RatingValue::new(2).unwrap())
            .await
            .unwrap();
        assert_eq!(stats.total, 2);
        assert!((stats.average - 3.0).abs() < f64::EPSILON);
        let mine = store.rating_stats(&report, Some(&me)).await.unwrap();
        assert_eq!(mine.user_rating, RatingValue::new(4).ok());
    }

    #[tokio::test]
    async fn event_stream_is_scoped_to_its_report() {
        let base = spawn_server(true).await;
        let store = http_store(&base, &Session::anonymous());
        let mut resp = reqwest::get(format!("{}/api/reports/mine/events", base))
            .await
            .unwrap();
        assert!(resp.status().is_success());

        store.create_comment(&new_comment("theirs", "elsewhere", None)).await.unwrap();
        store.create_comment(&new_comment("mine", "here", None)).await.unwrap();

        let mut buf = String::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !buf.contains("comment_created") {
                let chunk = resp.chunk().await.unwrap().expect("stream ended");
                buf.push_str(&String::from_utf8_lossy(&chunk));
            }
        })
        .await
        .expect("no event arrived");

        assert!(buf.contains("\"reportId\":\"mine\""));
        assert!(!buf.contains("report_id"));
        assert!(!buf.contains("theirs"));
    }
}
