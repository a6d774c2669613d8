//! Write-Ahead Log (WAL) Module
//!
//! Provides durability through append-only logging of mutating commands.
//!
//! ## Responsibilities
//! - Append each SET/PUSH/POP frame before the store changes
//! - Replay records on startup
//! - Truncate a torn tail left by a crash mid-append
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1: SET/PUSH/POP frame            │
//! │ ┌──────────┬─────────┬─────┬─────────┐  │
//! │ │ Size (8) │ Tag (2) │ Key │ [Value] │  │
//! │ └──────────┴─────────┴─────┴─────────┘  │
//! ├─────────────────────────────────────────┤
//! │ Record 2                                │
//! │ ...                                     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Records are exactly the wire frames, so there is no separate checksum:
//! an intact prefix is whatever decodes.

mod reader;
mod recovery;
mod writer;

pub use reader::WalReader;
pub use recovery::{RecoveryResult, WalRecovery};
pub use writer::WalWriter;
