//! Dump generation, garbage collection and the long-running dump loop.

pub mod context;
pub mod dumper;
pub mod error;
pub mod gc;
pub mod run_loop;
pub mod shutdown;

pub use context::DumpContext;
pub use dumper::{
    remove_package_artifacts, run_dump, DumpOptions, DumpSummary, DUMP_LEASE, GC_LEASE,
};
pub use error::{DumpError, Result};
pub use gc::gc_run;
pub use run_loop::{dump_loop, LoopOutcome};
pub use shutdown::Shutdown;
