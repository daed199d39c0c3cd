//! # RingOS Demo Firmware
//!
//! Four threads sharing the CPU in 10 ms slices:
//!
//! | Thread | Behavior |
//! |--------|----------|
//! | `counter_thread` | Counts as fast as it can |
//! | `checksum_thread` | Folds its own progress into a running checksum |
//! | `fibonacci_thread` | Steps a wrapping Fibonacci sequence |
//! | `idle_thread` | Sleeps until the next interrupt |
//!
//! With a debugger attached, `PROGRESS` shows every slot advancing in
//! turn; none of the threads ever yields.

#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_std)]
#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_main)]

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod firmware {
    use core::sync::atomic::{AtomicU32, Ordering};

    use cortex_m_rt::entry;
    use panic_halt as _;

    use ringos::config::DEFAULT_QUANTUM;
    use ringos::kernel;

    /// Per-thread progress, read by a debugger.
    #[no_mangle]
    static PROGRESS: [AtomicU32; 4] = [const { AtomicU32::new(0) }; 4];

    extern "C" fn counter_thread() -> ! {
        loop {
            PROGRESS[0].fetch_add(1, Ordering::Relaxed);
        }
    }

    extern "C" fn checksum_thread() -> ! {
        let mut sum: u32 = 0;
        loop {
            sum = sum.rotate_left(5) ^ PROGRESS[1].load(Ordering::Relaxed);
            PROGRESS[1].store(sum.wrapping_add(1), Ordering::Relaxed);
        }
    }

    extern "C" fn fibonacci_thread() -> ! {
        let (mut a, mut b) = (0u32, 1u32);
        loop {
            (a, b) = (b, a.wrapping_add(b));
            PROGRESS[2].store(a, Ordering::Relaxed);
        }
    }

    extern "C" fn idle_thread() -> ! {
        loop {
            PROGRESS[3].fetch_add(1, Ordering::Relaxed);
            cortex_m::asm::wfi();
        }
    }

    #[entry]
    fn main() -> ! {
        let cp = cortex_m::Peripherals::take().unwrap();

        kernel::add_threads(&[counter_thread, checksum_thread, fibonacci_thread, idle_thread])
            .expect("Failed to register threads");

        // Start the scheduler — does not return
        kernel::launch(cp, DEFAULT_QUANTUM)
    }
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn main() {}
