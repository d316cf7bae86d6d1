pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod planner;
pub mod queues;
pub mod reward;
pub mod routes;
pub mod scheduler;
pub mod session;
pub mod types;
pub mod video;
pub mod workers;

pub use clock::{PlaybackClock, SimulatedClock};
pub use config::{SchedulerConfig, ServiceConfig, VidquizConfig};
pub use error::{Result, VidquizError};
pub use fetcher::{ContentFetcher, ContentService, FetchState, FetchStatus, HttpContentService};
pub use planner::{PlanEntry, SegmentPlan, Trigger, plan_segments};
pub use reward::{InMemoryRewardStore, RewardAccumulator, RewardStore};
pub use scheduler::{QuizScheduler, SchedulerState};
pub use session::QuizSession;
pub use types::{
    Question, QuizContentSet, QuizOutcome, QuizPrompt, SegmentIndex, SegmentQuiz, SessionId,
    VideoSource, score_answers,
};
pub use video::youtube_video_id;
pub use workers::SessionNotice;
