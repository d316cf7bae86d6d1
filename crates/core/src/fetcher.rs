use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::ServiceConfig,
    error::{Result, VidquizError},
    types::{QuizContentSet, SegmentQuiz, SessionId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchState {
    Idle,
    FetchingTranscript,
    FetchingQuiz,
    Ready,
    Failed,
}

impl FetchState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, FetchState::FetchingTranscript | FetchState::FetchingQuiz)
    }
}

/// Pipeline state, tagged with the session it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchStatus {
    pub session: Option<SessionId>,
    pub state: FetchState,
}

/// Remote side of the two-stage content pipeline.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Ask the service to transcribe `url`; `minutes` is the video length rounded up.
    async fn request_transcript(&self, url: &str, minutes: u64) -> Result<()>;

    /// Fetch the per-segment quizzes generated from the transcript of `url`.
    async fn request_quiz(&self, url: &str) -> Result<QuizContentSet>;
}

#[derive(Serialize)]
struct TranscribeRequest<'a> {
    url: &'a str,
    duration: String,
}

#[derive(Serialize)]
struct QuizRequest<'a> {
    url: &'a str,
}

const TRANSCRIBE_SUCCESS: &str = "success";

pub struct HttpContentService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentService {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl ContentService for HttpContentService {
    async fn request_transcript(&self, url: &str, minutes: u64) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("transcribe"))
            .json(&TranscribeRequest {
                url,
                duration: minutes.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        debug!(%status, %body, "transcribe response");

        if !status.is_success() || body["message"].as_str() != Some(TRANSCRIBE_SUCCESS) {
            return Err(VidquizError::TranscriptFailed {
                url: url.to_string(),
                status: status.as_u16(),
                reason: error_message(&body),
            });
        }

        Ok(())
    }

    async fn request_quiz(&self, url: &str) -> Result<QuizContentSet> {
        let response = self
            .client
            .post(self.endpoint("quiz"))
            .json(&QuizRequest { url })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(VidquizError::QuizFailed {
                url: url.to_string(),
                status: status.as_u16(),
                reason: error_message(&body),
            });
        }

        let body = response.json::<Value>().await?;
        Ok(parse_quiz_response(&body))
    }
}

fn error_message(body: &Value) -> String {
    body["message"]
        .as_str()
        .or_else(|| body["error"].as_str())
        .unwrap_or("Unknown error")
        .to_string()
}

/// Adapt the quiz service response into a [`QuizContentSet`].
///
/// Expects `{"segment_quizzes": [{"questions": [...]}, ...]}`. A missing list is
/// an empty set; each entry is parsed on its own and a broken or question-less
/// entry becomes a skipped slot instead of failing the whole set.
pub fn parse_quiz_response(body: &Value) -> QuizContentSet {
    let Some(entries) = body.get("segment_quizzes").and_then(Value::as_array) else {
        return QuizContentSet::empty();
    };

    let segments = entries
        .iter()
        .enumerate()
        .map(|(segment, entry)| match SegmentQuiz::deserialize(entry) {
            Ok(quiz) if !quiz.questions.is_empty() => Some(quiz),
            Ok(_) => {
                warn!(segment, "segment quiz has no questions, skipping");
                None
            }
            Err(e) => {
                warn!(segment, error = %e, "malformed segment quiz, skipping");
                None
            }
        })
        .collect();

    QuizContentSet::new(segments)
}

/// Whole minutes, rounded up, as the transcript request expects.
pub fn duration_minutes(duration_secs: f64) -> u64 {
    if duration_secs.is_finite() && duration_secs > 0.0 {
        (duration_secs / 60.0).ceil() as u64
    } else {
        0
    }
}

/// Runs the transcript-then-quiz pipeline, at most once per session.
#[derive(Clone)]
pub struct ContentFetcher {
    service: Arc<dyn ContentService>,
    status: Arc<watch::Sender<FetchStatus>>,
}

impl ContentFetcher {
    pub fn new(service: Arc<dyn ContentService>) -> Self {
        let (status, _) = watch::channel(FetchStatus {
            session: None,
            state: FetchState::Idle,
        });
        Self {
            service,
            status: Arc::new(status),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> FetchStatus {
        *self.status.borrow()
    }

    /// Point the pipeline at a new session. Anything still running for the
    /// previous one can no longer change the published state.
    pub fn attach(&self, session: SessionId) {
        self.status.send_replace(FetchStatus {
            session: Some(session),
            state: FetchState::Idle,
        });
    }

    /// `idle -> fetchingTranscript`; false if this session already started.
    pub fn try_begin(&self, session: SessionId) -> bool {
        self.transition(session, FetchState::Idle, FetchState::FetchingTranscript)
    }

    fn transition(&self, session: SessionId, from: FetchState, to: FetchState) -> bool {
        self.status.send_if_modified(|status| {
            if status.session == Some(session) && status.state == from {
                status.state = to;
                true
            } else {
                false
            }
        })
    }

    /// Run both requests for a session started with [`ContentFetcher::try_begin`].
    ///
    /// Returns `None` when the work was cancelled or the session was replaced;
    /// such results must not reach the scheduler.
    pub async fn run(
        &self,
        session: SessionId,
        url: &str,
        duration_secs: f64,
        cancel: &CancellationToken,
    ) -> Option<Result<QuizContentSet>> {
        let minutes = duration_minutes(duration_secs);
        info!(%session, url, minutes, "requesting transcript");

        let transcript = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            result = self.service.request_transcript(url, minutes) => result,
        };
        if let Err(e) = transcript {
            return self.fail(session, FetchState::FetchingTranscript, cancel, e);
        }

        if cancel.is_cancelled()
            || !self.transition(session, FetchState::FetchingTranscript, FetchState::FetchingQuiz)
        {
            return None;
        }
        info!(%session, url, "transcript ready, requesting quiz");

        let quiz = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            result = self.service.request_quiz(url) => result,
        };

        match quiz {
            Ok(content) => {
                if cancel.is_cancelled()
                    || !self.transition(session, FetchState::FetchingQuiz, FetchState::Ready)
                {
                    return None;
                }
                info!(
                    %session,
                    segments = content.len(),
                    playable = content.playable_count(),
                    "quiz content ready"
                );
                Some(Ok(content))
            }
            Err(e) => self.fail(session, FetchState::FetchingQuiz, cancel, e),
        }
    }

    fn fail(
        &self,
        session: SessionId,
        stage: FetchState,
        cancel: &CancellationToken,
        error: VidquizError,
    ) -> Option<Result<QuizContentSet>> {
        if cancel.is_cancelled() || !self.transition(session, stage, FetchState::Failed) {
            return None;
        }
        warn!(%session, ?stage, %error, "content pipeline failed");
        Some(Err(error))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::Question;

    fn segment_json(prompt: &str) -> Value {
        json!({
            "questions": [{
                "question": prompt,
                "options": ["A. yes", "B. no"],
                "correct_answer": "A",
                "explanation": "because"
            }]
        })
    }

    fn content(n: usize) -> QuizContentSet {
        (0..n)
            .map(|i| SegmentQuiz {
                questions: vec![Question {
                    question: format!("q{i}"),
                    options: vec!["A. yes".into(), "B. no".into()],
                    correct_answer: "A".into(),
                    explanation: String::new(),
                }],
            })
            .collect()
    }

    #[test]
    fn minutes_round_up() {
        assert_eq!(duration_minutes(1250.0), 21);
        assert_eq!(duration_minutes(600.0), 10);
        assert_eq!(duration_minutes(0.5), 1);
        assert_eq!(duration_minutes(0.0), 0);
    }

    #[test]
    fn parses_segments_and_skips_malformed_entries() {
        let body = json!({
            "segment_quizzes": [
                segment_json("first"),
                {"title": "no questions field"},
                {"questions": []},
                segment_json("last"),
            ]
        });

        let set = parse_quiz_response(&body);
        assert_eq!(set.len(), 4);
        assert_eq!(set.playable_count(), 2);
        assert_eq!(set.get(0).unwrap().questions[0].question, "first");
        assert!(set.get(1).is_none());
        assert!(set.get(2).is_none());
        assert_eq!(set.get(3).unwrap().questions[0].question, "last");
    }

    #[test]
    fn missing_list_is_empty_set() {
        assert!(parse_quiz_response(&json!({"status": "ok"})).is_empty());
        assert!(parse_quiz_response(&json!({"segment_quizzes": null})).is_empty());
    }

    #[test]
    fn error_message_prefers_message_then_error() {
        assert_eq!(error_message(&json!({"message": "boom"})), "boom");
        assert_eq!(error_message(&json!({"error": "bad url"})), "bad url");
        assert_eq!(error_message(&Value::Null), "Unknown error");
    }

    #[tokio::test]
    async fn pipeline_runs_both_stages_in_order() {
        let mut service = MockContentService::new();
        let mut seq = mockall::Sequence::new();
        service
            .expect_request_transcript()
            .withf(|url, minutes| url.contains("FQdaUv95mR8") && *minutes == 21)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        service
            .expect_request_quiz()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(content(3)));

        let fetcher = ContentFetcher::new(Arc::new(service));
        let session = SessionId::new();
        fetcher.attach(session);
        assert!(fetcher.try_begin(session));

        let result = fetcher
            .run(
                session,
                "https://youtu.be/FQdaUv95mR8",
                1250.0,
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(result.unwrap().unwrap().len(), 3);
        assert_eq!(fetcher.status().state, FetchState::Ready);
    }

    #[test]
    fn begins_only_once_per_session() {
        let fetcher = ContentFetcher::new(Arc::new(MockContentService::new()));
        let session = SessionId::new();

        assert!(!fetcher.try_begin(session), "not attached yet");
        fetcher.attach(session);
        assert!(fetcher.try_begin(session));
        assert!(!fetcher.try_begin(session));

        fetcher.attach(SessionId::new());
        assert!(!fetcher.try_begin(session), "stale session cannot start");
    }

    #[tokio::test]
    async fn transcript_failure_stops_pipeline() {
        let mut service = MockContentService::new();
        service.expect_request_transcript().returning(|url, _| {
            Err(VidquizError::TranscriptFailed {
                url: url.to_string(),
                status: 500,
                reason: "whisper crashed".into(),
            })
        });
        service.expect_request_quiz().never();

        let fetcher = ContentFetcher::new(Arc::new(service));
        let session = SessionId::new();
        fetcher.attach(session);
        fetcher.try_begin(session);

        let result = fetcher
            .run(session, "https://youtu.be/x", 90.0, &CancellationToken::new())
            .await;

        let err = result.unwrap().unwrap_err();
        assert!(err.is_pipeline_failure());
        assert_eq!(fetcher.status().state, FetchState::Failed);
    }

    #[tokio::test]
    async fn cancelled_pipeline_yields_nothing() {
        let cancel = CancellationToken::new();
        let cancel_in_flight = cancel.clone();

        let mut service = MockContentService::new();
        service.expect_request_transcript().returning(move |_, _| {
            cancel_in_flight.cancel();
            Ok(())
        });
        service.expect_request_quiz().never();

        let fetcher = ContentFetcher::new(Arc::new(service));
        let session = SessionId::new();
        fetcher.attach(session);
        fetcher.try_begin(session);

        assert!(
            fetcher
                .run(session, "https://youtu.be/x", 90.0, &cancel)
                .await
                .is_none()
        );
        assert_eq!(fetcher.status().state, FetchState::FetchingTranscript);
    }

    #[tokio::test]
    async fn replaced_session_cannot_publish_result() {
        let fetcher = ContentFetcher::new(Arc::new(MockContentService::new()));
        let stale = SessionId::new();
        fetcher.attach(stale);
        fetcher.try_begin(stale);

        let fresh = SessionId::new();
        fetcher.attach(fresh);

        let mut service = MockContentService::new();
        service.expect_request_transcript().returning(|_, _| Ok(()));
        service.expect_request_quiz().never();
        let stale_fetcher = ContentFetcher {
            service: Arc::new(service),
            status: fetcher.status.clone(),
        };

        let result = stale_fetcher
            .run(stale, "https://youtu.be/x", 90.0, &CancellationToken::new())
            .await;

        assert!(result.is_none());
        assert_eq!(
            fetcher.status(),
            FetchStatus {
                session: Some(fresh),
                state: FetchState::Idle
            }
        );
    }
}
