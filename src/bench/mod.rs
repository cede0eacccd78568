//! Benchmark sampling, scoring and submission

pub mod score;
pub mod session;
pub mod submission;

pub use score::{compute_score, score_for_frame_time, trimmed_mean, Score, MIN_SCORE_SAMPLES};
pub use session::{BenchmarkSession, FrameSample, SessionPhase};
pub use submission::{rank_entries, LeaderboardEntry, Submission};
