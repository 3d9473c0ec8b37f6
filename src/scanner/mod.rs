//! Work-stealing directory scanner.
//!
//! The orchestrator seeds one [`queue::WorkQueue`] per worker with the root,
//! workers claim directories from their own queue or steal from others,
//! stat files in fixed-size batches and merge matches into the
//! [`session::ScanSession`]; the final list is sorted largest first.

pub mod batch;
pub mod orchestrator;
pub mod queue;
pub mod session;
pub mod worker;

pub use orchestrator::{ScanHandle, Scanner, run_scan, run_scan_blocking, start_scan};
pub use session::ScanSession;
