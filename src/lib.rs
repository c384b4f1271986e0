/*!
 * skiff - chunked transfers between local filesystems and flat-namespace
 * object stores
 *
 * The engine decides how files split into parts, matches local and remote
 * entries for bulk operations with glob-style include/exclude filters, and
 * drives concurrent part transfer with partial-failure recovery. Everything
 * reaches the store through the `Connection` seam, so the signed REST
 * transport and the in-memory test store are interchangeable.
 */

pub mod bucket;
pub mod chunk;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod part;
pub mod path;
pub mod pattern;
pub mod transfer;
pub mod uri;

// Re-export commonly used types
pub use bucket::validate_bucket_name;
pub use chunk::ChunkReader;
pub use config::{EngineConfig, Settings, TransferOptions};
pub use connection::{Connection, MemoryConnection, Request, Response, RestConnection};
pub use error::{Result, SkiffError};
pub use part::{plan_parts, Part};
pub use pattern::{is_pattern_match, pattern_match};
pub use transfer::TransferOrchestrator;
pub use uri::{parse_remote_uri, RemoteAddress};
