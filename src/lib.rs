//! OwnMon activity statistics.
//!
//! Aggregates raw input and break-lifecycle events into per-day counters,
//! keeps a crash-safe history of past days in an append-only log and merges
//! day records exchanged with peer instances.
//!
//! ```ignore
//! let hub = Arc::new(InputHub::new());
//! let stats = Statistics::init(
//!     StatsConfig::new("/var/lib/ownmon"),
//!     StatsDeps::system().with_input(hub.clone()),
//! )?;
//!
//! // Platform hooks call into the hub.
//! hub.keyboard(false);
//!
//! // Drive rollover and checkpoints.
//! stats.update();
//! ```

pub mod clock;
pub mod config;
pub mod distribution;
pub mod error;
pub mod monitor;
pub mod persistence;
pub mod statistics;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use distribution::PeerLink;
pub use error::{DecodeError, StatsError, StorageError, SubscribeError};
pub use monitor::{InputHub, InputListener, InputSource};
pub use statistics::{Statistics, StatsConfig, StatsDeps, StatsHealth};
pub use store::{BreakCounter, BreakEvent, BreakKind, DailyRecord, DailySummary, DayLookup, MiscCounter};
