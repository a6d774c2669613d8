//! Protocol Module
//!
//! Defines the wire protocol for client-server communication and the
//! persistent log, which stores the same frames.
//!
//! ## Frame Format
//! ```text
//! ┌───────────┬─────────┬─────────┬─────┬────────────────┬──────────────┐
//! │ Size (8)  │ Tag (2) │   Key   │ NUL │ ValueSize (8)  │    Value     │
//! └───────────┴─────────┴─────────┴─────┴────────────────┴──────────────┘
//! ```
//!
//! ### Commands
//! - 0: GET      - reply: SET(key, value)
//! - 1: SET      - key + value
//! - 2: PUSH     - key + value
//! - 3: POP      - key
//! - 4: SUM      - reply: SET(key, sum)
//! - 5: MAX      - reply: SET(key, max)
//! - 6: MIN      - reply: SET(key, min)
//! - 7: SOURCE   - library path
//! - 8: EXECUTE  - procedure name
//!
//! There is no error reply: absent keys, wrong types and empty reductions
//! all answer Null. Malformed frames close the connection.

mod codec;
mod command;

pub use codec::{complete_frame_len, decode_command, Frame, HEADER_SIZE, MAX_FRAME_SIZE};
pub use command::{Command, CommandTag, Reply};
