pub mod history;
pub mod metrics;
pub mod prompt;
pub mod providers;
pub mod run_poller;
pub mod schema;

pub use history::{HistoryStore, DEFAULT_SESSION};
pub use metrics::{get_metrics, init_metrics};
pub use run_poller::{PollError, PollSettings, RunPoller};
