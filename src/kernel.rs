//! # Kernel
//!
//! The global scheduler instance and the public kernel API.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::add_threads(&[..])   ← Fill the TCB pool and ready ring
//!         └─► kernel::launch(cp, quantum)  ← No return
//!               ├─► Set PendSV / SysTick priorities
//!               ├─► Configure SysTick
//!               └─► kernel::launch_scheduler()
//!                     └─► arch::start_first_thread()
//! ```

use crate::arch::cortex_m4;
use crate::error::{KernelError, Result};
use crate::scheduler::Scheduler;
use crate::sync::KernelCell;
use crate::thread::ThreadEntry;

/// The kernel. Mutated by `switch_context` inside PendSV once running.
pub(crate) static SCHEDULER: KernelCell<Scheduler> = KernelCell::new(Scheduler::new());

/// Register the threads to run, in round-robin order.
///
/// May be retried until it succeeds, but only before [`launch`].
pub fn add_threads(entries: &[ThreadEntry]) -> Result<()> {
    SCHEDULER.lock(|scheduler| scheduler.add_threads(entries))
}

/// [`add_threads`] reporting `1` on success and `0` on failure.
pub fn add_threads_status(entries: &[ThreadEntry]) -> u8 {
    SCHEDULER.lock(|scheduler| scheduler.add_threads_status(entries))
}

/// Start preemptive scheduling with `quantum` ticks per thread.
/// **Does not return.**
///
/// Halts if no threads were registered or `quantum` is zero.
pub fn launch(mut core_peripherals: cortex_m::Peripherals, quantum: u32) -> ! {
    if let Err(err) = SCHEDULER.lock(|scheduler| scheduler.launch(quantum)) {
        fault(err);
    }

    cortex_m::interrupt::disable();
    cortex_m4::set_interrupt_priorities(&mut core_peripherals.SCB);
    cortex_m4::configure_systick(&mut core_peripherals.SYST);

    launch_scheduler()
}

/// Enter the first registered thread. **Does not return.**
///
/// Halts unless [`launch`] has configured the kernel.
pub fn launch_scheduler() -> ! {
    cortex_m::interrupt::disable();

    let first_sp = match SCHEDULER.lock(|scheduler| scheduler.start()) {
        Ok(sp) => sp,
        Err(err) => fault(err),
    };

    unsafe { cortex_m4::start_first_thread(first_sp) }
}

fn fault(err: KernelError) -> ! {
    panic!("kernel fault ({}): {}", err.code(), err);
}
