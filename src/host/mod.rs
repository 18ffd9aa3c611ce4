//! # host
//! The process-wide runtime lifecycle. One engine is constructed on the
//! first [`initialize`] call and lives for the rest of the process; there
//! are no static constructors, construction is deferred to the explicit
//! call. Initialization is assumed to run before any second thread exists
//! and before the interception layer installs its hooks - a documented
//! precondition, no synchronization is provided for concurrent first
//! calls beyond the one-shot cell.
//!
//! The only unrecoverable failure in the engine lives here: if the shadow
//! window cannot be reserved at its mandated fixed address the mapping
//! invariant cannot be satisfied, there is no fallback, and the process
//! terminates with a fatal diagnostic.
use core::sync::atomic::{AtomicBool, Ordering};

use log::{error, info, warn};
use spin::Once;

use crate::{
    layout::{AccessLayout, CoverageLayout, ShadowLayout},
    mmap::{LibcMmap, Mmap},
    options::{Mode, Options},
    report::Reporter,
    shadow::GuestShadow,
    tracker::{CoverageTracker, Tracker, WriteTracker},
    GuestAddr,
};

pub const TOOL_NAME: &str = "ShadowTrack";

enum Engine {
    Coverage(CoverageTracker<GuestShadow<LibcMmap, CoverageLayout>>),
    WriteAfterWrite(WriteTracker<GuestShadow<LibcMmap, AccessLayout>>),
}

impl Engine {
    fn tracker(&self) -> &dyn Tracker {
        match self {
            Engine::Coverage(t) => t,
            Engine::WriteAfterWrite(t) => t,
        }
    }
}

struct Runtime {
    engine: Engine,
    options: Options,
}

static RUNTIME: Once<Runtime> = Once::new();
static FINALIZED: AtomicBool = AtomicBool::new(false);

fn reserve_or_die<L: ShadowLayout>() -> GuestShadow<LibcMmap, L> {
    match GuestShadow::new() {
        Ok(shadow) => shadow,
        Err(e) => {
            // No fallback mapping exists; the affine transform only works
            // at the fixed window.
            eprintln!("FATAL: {TOOL_NAME} failed to reserve its shadow memory: {e}");
            std::process::abort();
        }
    }
}

/// Establish the application regions and reserve the metadata store.
/// Must run before any access-processing call; calls after the first are
/// no-ops.
pub fn initialize() {
    RUNTIME.call_once(|| {
        let options = Options::from_env();
        let _ = env_logger::Builder::new()
            .filter_level(options.level_filter())
            .try_init();
        if options.help {
            eprintln!("{}", Options::usage());
        }
        if !options.unrecognized.is_empty() && options.verbosity > 0 {
            warn!("unrecognized options: {:?}", options.unrecognized);
        }
        let engine = match options.mode {
            Mode::Coverage => Engine::Coverage(CoverageTracker::new(reserve_or_die())),
            Mode::WriteAfterWrite => Engine::WriteAfterWrite(WriteTracker::with_counter_bits(
                reserve_or_die(),
                options.counter_bits,
                crate::findings::DEFAULT_BUCKETS,
            )),
        };
        info!("{TOOL_NAME} initialized, mode: {:?}", options.mode);
        Runtime { engine, options }
    });
}

/// Arbitrary byte length, no alignment assumption. The sized entry points
/// are thin wrappers over this.
pub fn process_range_access(pc: GuestAddr, addr: GuestAddr, size: usize, is_write: bool) {
    if let Some(runtime) = RUNTIME.get() {
        runtime.engine.tracker().range_access(pc, addr, size, is_write);
    }
}

/// Fixed small power-of-two sizes (1/2/4/8/16 bytes), naturally aligned.
pub fn process_access(pc: GuestAddr, addr: GuestAddr, size: usize, is_write: bool) {
    debug_assert!(matches!(size, 1 | 2 | 4 | 8 | 16));
    debug_assert_eq!(addr & (size - 1), 0);
    process_range_access(pc, addr, size, is_write);
}

/// Arbitrary byte length, no alignment assumption.
pub fn process_unaligned_access(pc: GuestAddr, addr: GuestAddr, size: usize, is_write: bool) {
    process_range_access(pc, addr, size, is_write);
}

/// Emit the shutdown report. Idempotent: whether invoked on explicit
/// termination or from a normal-exit hook, only the first call reports.
/// Returns a process-style status code, 0 when there is nothing to report
/// or the report succeeded.
pub fn finalize() -> i32 {
    if FINALIZED.swap(true, Ordering::SeqCst) {
        return 0;
    }
    let Some(runtime) = RUNTIME.get() else {
        return 0;
    };
    match &runtime.engine {
        Engine::WriteAfterWrite(tracker) => {
            let reporter = Reporter::new(runtime.options.report_path.clone());
            match reporter.emit(tracker.findings()) {
                Ok(()) => 0,
                Err(e) => {
                    error!("failed to emit report: {e}");
                    1
                }
            }
        }
        // Coverage keeps its state in the shadow window; there is no
        // aggregated table to walk.
        Engine::Coverage(_) => 0,
    }
}

/// Shadow bytes reserved by the running engine. Diagnostic only.
pub fn reserved_shadow_len() -> Option<usize> {
    RUNTIME.get().map(|runtime| match &runtime.engine {
        Engine::Coverage(t) => t.shadow().reservations().iter().map(Mmap::len).sum(),
        Engine::WriteAfterWrite(t) => t.shadow().reservations().iter().map(Mmap::len).sum(),
    })
}
