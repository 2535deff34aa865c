//! Write-ahead log
//!
//! Every mutation is appended to `wal.log` before it reaches the MemTable.
//! On open the log is replayed and a torn tail is cut off; after a flush the
//! log is truncated.
//!
//! One frame per [`WalEntry`]:
//!
//! ```text
//! field     size   notes
//! ───────   ────   ──────────────────────────────────────────────
//! lsn       8      u64 LE, strictly increasing
//! crc32     4      over lsn ‖ body
//! len       4      u32 LE, size of body
//! body      len    bincode (Operation, timestamp)
//!                    Operation::Put   { key, value }
//!                    Operation::Batch { pairs }  (applied all-or-nothing)
//! ```

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{WalEntry, Operation, HEADER_SIZE};
pub use writer::WalWriter;
pub use reader::{WalReader, WalIterator};
pub use recovery::{WalRecovery, RecoveryResult};
