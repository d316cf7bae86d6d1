use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position of a segment within a video's quiz content, 0-based.
pub type SegmentIndex = usize;

/// Identifies one selected video for as long as it stays selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSource {
    pub session: SessionId,
    pub url: String,
    /// Seconds; known only once the player reports it.
    pub duration: Option<f64>,
}

impl VideoSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            session: SessionId::new(),
            url: url.into(),
            duration: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    /// Label of an option rendered as `"A. Some text"`.
    pub fn option_label(option: &str) -> &str {
        option.split('.').next().unwrap_or(option).trim()
    }

    pub fn is_correct(&self, option: &str) -> bool {
        Self::option_label(option) == self.correct_answer.trim()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentQuiz {
    pub questions: Vec<Question>,
}

/// Quiz payloads for one video, in segment order.
///
/// A `None` slot is a segment whose payload could not be understood; it keeps
/// its index so the plan stays aligned with the content, but it never fires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizContentSet {
    segments: Vec<Option<SegmentQuiz>>,
}

impl QuizContentSet {
    pub fn new(segments: Vec<Option<SegmentQuiz>>) -> Self {
        Self { segments }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, segment: SegmentIndex) -> Option<&SegmentQuiz> {
        self.segments.get(segment).and_then(Option::as_ref)
    }

    pub fn is_playable(&self, segment: SegmentIndex) -> bool {
        self.get(segment).is_some()
    }

    pub fn playable_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_some()).count()
    }
}

impl FromIterator<SegmentQuiz> for QuizContentSet {
    fn from_iter<I: IntoIterator<Item = SegmentQuiz>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Some).collect())
    }
}

/// What the display surface receives when a quiz fires.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizPrompt {
    pub session: SessionId,
    pub segment: SegmentIndex,
    pub questions: Vec<Question>,
}

/// Report from the display surface once a quiz is gone from the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum QuizOutcome {
    Completed { correct_answers: u32 },
    Dismissed { correct_answers: u32 },
}

impl QuizOutcome {
    pub fn correct_answers(&self) -> u32 {
        match self {
            QuizOutcome::Completed { correct_answers }
            | QuizOutcome::Dismissed { correct_answers } => *correct_answers,
        }
    }

    pub fn was_dismissed(&self) -> bool {
        matches!(self, QuizOutcome::Dismissed { .. })
    }
}

/// Count correct answers; `chosen[i]` is the option picked for `questions[i]`.
pub fn score_answers<S: AsRef<str>>(questions: &[Question], chosen: &[Option<S>]) -> u32 {
    questions
        .iter()
        .zip(chosen)
        .filter(|(q, pick)| match pick {
            Some(option) => q.is_correct(option.as_ref()),
            None => false,
        })
        .count() as u32
}
