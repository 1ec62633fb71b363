//! lanhub-services — the state every connection shares: the file store,
//! the session registry with its usage stats, and the message log.

pub mod file_store;
pub mod message_log;
pub mod session;
pub mod stats;

pub use file_store::{FileInfo, FileStore, StoreError};
pub use message_log::MessageLog;
pub use session::{Admission, Outbound, OutboundRx, OutboundTx, Role, SessionRegistry};
pub use stats::{Stats, StatsReport};
