//! Change feed: a time-ordered, compactable log of update/delete events
//! used by mirrors and edge nodes for incremental replication, with resync
//! as the first-class fallback whenever incremental state cannot be
//! trusted.

pub mod error;
pub mod recorder;
pub mod reader;
pub mod score;
pub mod types;

pub use error::{FeedError, Result};
pub use recorder::FeedRecorder;
pub use reader::{FeedReader, DELETE_RACE_WINDOW, MAX_ACTIONS};
pub use score::{head_score, ScoreClock, PROTOCOL_EPOCH, SCORE_RESOLUTION};
pub use types::{ActionType, FeedAction, FeedResponse};
