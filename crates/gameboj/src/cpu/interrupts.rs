use crate::bus::{BusView, Interrupt};

use super::Cpu;

/// Extra machine cycles taken by an interrupt entry.
const INTERRUPT_ENTRY_CYCLES: u64 = 5;

impl Cpu {
    /// Interrupts both requested and enabled.
    pub(super) fn pending_interrupts(&self) -> u8 {
        self.ie & self.interrupts.flags() & Interrupt::LINES_MASK
    }

    /// Jump to the handler of the highest-priority pending interrupt if
    /// interrupts are enabled. Returns whether an interrupt was taken.
    pub(super) fn service_interrupt(&mut self, bus: &mut BusView<'_>) -> bool {
        if !self.ime {
            return false;
        }
        let Some(interrupt) = Interrupt::highest_priority(self.pending_interrupts()) else {
            return false;
        };

        log::debug!(
            "servicing {:?} interrupt, PC=0x{:04X} -> 0x{:04X}",
            interrupt,
            self.pc,
            interrupt.vector()
        );
        self.ime = false;
        self.interrupts.clear(interrupt);
        let pc = self.pc;
        self.push16(bus, pc);
        self.pc = interrupt.vector();
        self.next_non_idle_cycle += INTERRUPT_ENTRY_CYCLES;
        true
    }
}
