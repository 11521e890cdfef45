use async_trait::async_trait;
use domain::{
    protocol, ActorId, Comment, CommentId, NewComment, RatingStats, RatingValue, ReactionDetail,
    ReactionKind, ReactionSummary, ReportId, Session,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientSettings;
use crate::traits::{CommentStore, RatingStore, ReactionStore};
use crate::StoreError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCommentBody<'a> {
    text: &'a str,
    parent_id: Option<&'a str>,
    author_name: &'a str,
}

#[derive(Serialize)]
struct EditCommentBody<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToggleBody<'a> {
    session_id: &'a str,
    reaction_type: Option<ReactionKind>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RateBody<'a> {
    user_id: &'a str,
    value: u8,
}

/// Talks to the REST store.
#[derive(Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpStore {
    pub fn new(settings: &ClientSettings, session: &Session) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: settings.api_url.trim_end_matches('/').to_string(),
            token: session.token().map(str::to_string),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, StoreError> {
        let req = match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        };
        Ok(req.send().await?)
    }

    async fn json(resp: Response) -> Result<Value, StoreError> {
        resp.json::<Value>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    /// Maps non-success statuses onto store errors.
    async fn check(resp: Response) -> Result<Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or(body);
        debug!("Store answered {}: {}", status, message);
        Err(match status {
            StatusCode::NOT_FOUND => StoreError::NotFound,
            StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED => StoreError::Unsupported,
            s if s.is_client_error() => StoreError::Rejected(message),
            s => StoreError::Transport(format!("{}: {}", s, message)),
        })
    }

    fn summary(value: &Value) -> Result<ReactionSummary, StoreError> {
        protocol::decode_summary(value)
            .ok_or_else(|| StoreError::Decode("reaction aggregate".to_string()))
    }

    fn rating(value: Value) -> Result<RatingStats, StoreError> {
        serde_json::from_value(value).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CommentStore for HttpStore {
    async fn list_comments(&self, report_id: &ReportId) -> Result<Vec<Comment>, StoreError> {
        let resp = self
            .send(self.client.get(self.url(&format!("comments/{}", report_id))))
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let value = Self::json(Self::check(resp).await?).await?;
        Ok(protocol::decode_comments(&value, Some(report_id)))
    }

    async fn create_comment(&self, new: &NewComment) -> Result<Comment, StoreError> {
        let body = CreateCommentBody {
            text: &new.text,
            parent_id: new.parent_id.as_ref().map(CommentId::as_str),
            author_name: &new.author_name,
        };
        let resp = self
            .send(
                self.client
                    .post(self.url(&format!("comments/{}", new.report_id)))
                    .json(&body),
            )
            .await?;
        let value = Self::json(Self::check(resp).await?).await?;
        protocol::decode_comment(&value, Some(&new.report_id))
            .ok_or_else(|| StoreError::Decode("created comment".to_string()))
    }

    async fn edit_comment(&self, id: &CommentId, text: &str) -> Result<Comment, StoreError> {
        let resp = self
            .send(
                self.client
                    .put(self.url(&format!("comment/{}", id)))
                    .json(&EditCommentBody { text }),
            )
            .await?;
        let value = Self::json(Self::check(resp).await?).await?;
        protocol::decode_comment(&value, None)
            .ok_or_else(|| StoreError::Decode("edited comment".to_string()))
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<(), StoreError> {
        let resp = self
            .send(self.client.delete(self.url(&format!("comment/{}", id))))
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl ReactionStore for HttpStore {
    async fn reaction_summary(
        &self,
        report_id: &ReportId,
        actor_id: &ActorId,
    ) -> Result<ReactionSummary, StoreError> {
        let resp = self
            .send(
                self.client
                    .get(self.url(&format!("likes/{}/count", report_id)))
                    .query(&[("sessionId", actor_id.as_str())]),
            )
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(ReactionSummary::default());
        }
        Self::summary(&Self::json(Self::check(resp).await?).await?)
    }

    async fn toggle_reaction(
        &self,
        report_id: &ReportId,
        actor_id: &ActorId,
        kind: Option<ReactionKind>,
    ) -> Result<ReactionSummary, StoreError> {
        let body = ToggleBody {
            session_id: actor_id.as_str(),
            reaction_type: kind,
        };
        let resp = self
            .send(
                self.client
                    .post(self.url(&format!("likes/{}/toggle", report_id)))
                    .json(&body),
            )
            .await?;
        Self::summary(&Self::json(Self::check(resp).await?).await?)
    }

    async fn reaction_detail(&self, report_id: &ReportId) -> Result<ReactionDetail, StoreError> {
        let resp = self
            .send(self.client.get(self.url(&format!("likes/{}/reactions", report_id))))
            .await?;
        let value = Self::json(Self::check(resp).await?).await?;
        if !value.is_object() {
            warn!("Reaction listing for {} is not an object", report_id);
        }
        Ok(protocol::decode_detail(&value))
    }
}

#[async_trait]
impl RatingStore for HttpStore {
    async fn rating_stats(
        &self,
        report_id: &ReportId,
        actor_id: Option<&ActorId>,
    ) -> Result<RatingStats, StoreError> {
        let mut req = self
            .client
            .get(self.url(&format!("ratings/{}/stats", report_id)));
        if let Some(actor) = actor_id {
            req = req.query(&[("userId", actor.as_str())]);
        }
        let resp = self.send(req).await?;
        Self::rating(Self::json(Self::check(resp).await?).await?)
    }

    async fn rate(
        &self,
        report_id: &ReportId,
        actor_id: &ActorId,
        value: RatingValue,
    ) -> Result<RatingStats, StoreError> {
        let body = RateBody {
            user_id: actor_id.as_str(),
            value: value.get(),
        };
        let resp = self
            .send(
                self.client
                    .post(self.url(&format!("ratings/{}", report_id)))
                    .json(&body),
            )
            .await?;
        Self::rating(Self::json(Self::check(resp).await?).await?)
    }
}
