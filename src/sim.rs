//! Host model of the Cortex-M4 exception mechanics around a `Scheduler`.
//!
//! The model keeps a register file and a PSP. Exception entry stacks the
//! hardware half of the frame, the PendSV model stacks R4–R11 below it and
//! calls `switch_context`, and exception return pops the frame found at
//! the returned stack pointer. Threads "run" by bumping R4, so a thread
//! whose frame is saved and restored wrongly loses its progress.

use core::ptr;

use crate::frame::{self, HardwareFrame, SavedFrame, SoftwareFrame, FRAME_WORDS};
use crate::scheduler::Scheduler;
use crate::thread::ThreadEntry;

const HALF_WORDS: usize = FRAME_WORDS / 2;

pub struct Cpu {
    /// Live register file.
    pub regs: SavedFrame,
    /// Process stack pointer.
    pub psp: *mut u32,
    /// PENDSVSET.
    pub pendsv: bool,
}

impl Cpu {
    /// Enter the first thread the way `start_first_thread` does.
    pub fn boot<const N: usize, const S: usize>(sched: &mut Scheduler<N, S>) -> Self {
        let sp = sched.start().expect("scheduler starts");
        let mut cpu = Self {
            regs: SavedFrame::default(),
            psp: ptr::null_mut(),
            pendsv: false,
        };
        cpu.exception_return(sp);
        cpu
    }

    /// The running thread makes progress.
    pub fn run(&mut self) {
        self.regs.software.r4 += 1;
    }

    /// SysTick handler. Pends PendSV at the end of a quantum.
    pub fn systick<const N: usize, const S: usize>(&mut self, sched: &mut Scheduler<N, S>) {
        if sched.on_tick() {
            self.pendsv = true;
        }
    }

    /// Tail-chain into PendSV if it is pending.
    pub fn service_pendsv<const N: usize, const S: usize>(&mut self, sched: &mut Scheduler<N, S>) {
        if core::mem::take(&mut self.pendsv) {
            self.pendsv_handler(sched);
        }
    }

    /// PendSV: complete the frame, switch, restore.
    pub fn pendsv_handler<const N: usize, const S: usize>(&mut self, sched: &mut Scheduler<N, S>) {
        // Hardware stacking on exception entry
        self.psp = self.psp.wrapping_sub(HALF_WORDS);
        unsafe { ptr::write(self.psp.cast::<HardwareFrame>(), self.regs.hardware) };

        // stmdb r0!, {r4-r11}
        self.psp = self.psp.wrapping_sub(HALF_WORDS);
        unsafe { ptr::write(self.psp.cast::<SoftwareFrame>(), self.regs.software) };

        let next = sched.switch_context(self.psp);
        self.exception_return(next);
    }

    /// One tick of wall time: the thread runs, SysTick fires and PendSV
    /// follows if it was pended.
    pub fn step<const N: usize, const S: usize>(&mut self, sched: &mut Scheduler<N, S>) {
        self.run();
        self.systick(sched);
        self.service_pendsv(sched);
    }

    /// Index into `entries` of the thread whose code is loaded in PC.
    pub fn running(&self, entries: &[ThreadEntry]) -> Option<usize> {
        entries
            .iter()
            .position(|&entry| frame::code_address(entry) == self.regs.hardware.pc)
    }

    fn exception_return(&mut self, sp: *mut u32) {
        self.regs = unsafe { frame::read_frame(sp) };
        self.psp = sp.wrapping_add(FRAME_WORDS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{exit_address, INITIAL_XPSR};
    use core::sync::atomic::{AtomicU32, Ordering};

    static WORK: [AtomicU32; 4] = [const { AtomicU32::new(0) }; 4];

    extern "C" fn t0() -> ! {
        loop {
            WORK[0].fetch_add(1, Ordering::Relaxed);
        }
    }

    extern "C" fn t1() -> ! {
        loop {
            WORK[1].fetch_add(2, Ordering::Relaxed);
        }
    }

    extern "C" fn t2() -> ! {
        loop {
            WORK[2].fetch_add(3, Ordering::Relaxed);
        }
    }

    extern "C" fn t3() -> ! {
        loop {
            WORK[3].fetch_add(4, Ordering::Relaxed);
        }
    }

    const ENTRIES: [ThreadEntry; 4] = [t0, t1, t2, t3];

    type Sched = Scheduler<4, 512>;

    fn launched(count: usize, quantum: u32) -> Sched {
        let mut sched = Sched::new();
        sched.add_threads(&ENTRIES[..count]).unwrap();
        sched.launch(quantum).unwrap();
        sched
    }

    #[test]
    fn test_each_thread_once_per_cycle() {
        for count in 1..=4 {
            let quantum = 3;
            let mut sched = launched(count, quantum);
            let mut cpu = Cpu::boot(&mut sched);

            for slot in 0..count * 3 {
                assert_eq!(cpu.running(&ENTRIES), Some(slot % count));
                assert_eq!(sched.current(), slot % count);
                for _ in 0..quantum {
                    cpu.step(&mut sched);
                }
            }
        }
    }

    #[test]
    fn test_four_thread_trace() {
        let mut sched = launched(4, 10);
        let mut cpu = Cpu::boot(&mut sched);

        let mut trace = [usize::MAX; 10];
        for slot in trace.iter_mut() {
            *slot = cpu.running(&ENTRIES).unwrap();
            for _ in 0..10 {
                cpu.step(&mut sched);
            }
        }

        assert_eq!(trace, [0, 1, 2, 3, 0, 1, 2, 3, 0, 1]);
        assert_eq!(sched.tick_count(), 100);
    }

    #[test]
    fn test_forty_ticks_switch_four_times() {
        let mut sched = launched(4, 10);
        let mut cpu = Cpu::boot(&mut sched);

        let mut switches = 0;
        let mut last = sched.current();
        for _ in 0..40 {
            cpu.step(&mut sched);
            if sched.current() != last {
                switches += 1;
                assert_eq!(sched.current(), (last + 1) % 4);
                last = sched.current();
            }
        }

        assert_eq!(switches, 4);
        assert_eq!(sched.current(), 0);
    }

    #[test]
    fn test_round_robin_fairness() {
        let quantum = 5;
        let mut sched = launched(4, quantum);
        let mut cpu = Cpu::boot(&mut sched);

        // Any window of `count` consecutive quanta covers every thread once
        let mut window = [0u32; 4];
        for cycle in 0..6 {
            for _ in 0..4 {
                window[cpu.running(&ENTRIES).unwrap()] += 1;
                for _ in 0..quantum {
                    cpu.step(&mut sched);
                }
            }
            assert_eq!(window, [cycle + 1; 4]);
        }

        for id in 0..4 {
            let tcb = sched.thread(id).unwrap();
            assert_eq!(tcb.run_ticks(), 6 * quantum);
        }
    }

    #[test]
    fn test_saved_frames_restore_progress() {
        let quantum = 4;
        let mut sched = launched(3, quantum);
        let mut cpu = Cpu::boot(&mut sched);

        for _ in 0..3 * 2 * quantum {
            cpu.step(&mut sched);
        }

        // Back on thread 0 after two full cycles with its work counter intact
        assert_eq!(cpu.running(&ENTRIES), Some(0));
        assert_eq!(cpu.regs.software.r4, 2 * quantum);
        for id in 1..3 {
            let saved = sched.thread(id).unwrap().saved_frame();
            assert_eq!(saved.software.r4, 2 * quantum);
        }
    }

    #[test]
    fn test_saved_frame_matches_built_frame_layout() {
        let mut sched = launched(2, 1);
        let built = sched.thread(0).unwrap().saved_frame();
        let mut cpu = Cpu::boot(&mut sched);
        cpu.step(&mut sched);

        // The frame PendSV saved for thread 0 differs from the one the
        // builder made only in the registers the thread changed
        let saved = sched.thread(0).unwrap().saved_frame();
        assert_eq!(saved.hardware, built.hardware);
        assert_eq!(saved.software, SoftwareFrame { r4: 1, ..built.software });
        assert_eq!(saved.hardware.lr, exit_address());
        assert_eq!(saved.hardware.xpsr, INITIAL_XPSR);

        // Thread 1 restored from a built frame, thread 0 from a saved one
        assert_eq!(cpu.running(&ENTRIES), Some(1));
        cpu.step(&mut sched);
        assert_eq!(cpu.running(&ENTRIES), Some(0));
        assert_eq!(cpu.regs, saved);
    }

    #[test]
    fn test_double_tick_before_pendsv_advances_once() {
        let mut sched = launched(4, 1);
        let mut cpu = Cpu::boot(&mut sched);

        cpu.run();
        cpu.systick(&mut sched);
        cpu.systick(&mut sched);
        assert!(cpu.pendsv);

        cpu.service_pendsv(&mut sched);
        assert_eq!(sched.current(), 1);

        // A stray PendSV with nothing pending leaves the ring alone
        cpu.pendsv_handler(&mut sched);
        assert_eq!(sched.current(), 1);
        assert_eq!(cpu.running(&ENTRIES), Some(1));
    }

    #[test]
    fn test_single_thread_resumes_itself() {
        let mut sched = launched(1, 2);
        let mut cpu = Cpu::boot(&mut sched);

        for _ in 0..10 {
            cpu.step(&mut sched);
            assert_eq!(cpu.running(&ENTRIES), Some(0));
        }
        assert_eq!(cpu.regs.software.r4, 10);
        assert_eq!(sched.thread(0).unwrap().dispatches(), 6);
    }

    #[test]
    fn test_dispatch_counts() {
        let quantum = 2;
        let mut sched = launched(4, quantum);
        let mut cpu = Cpu::boot(&mut sched);

        for _ in 0..4 * 3 * quantum {
            cpu.step(&mut sched);
        }

        // Thread 0 was entered at boot and at the start of each cycle
        assert_eq!(sched.thread(0).unwrap().dispatches(), 4);
        for id in 1..4 {
            assert_eq!(sched.thread(id).unwrap().dispatches(), 3);
        }
    }
}
