use std::any::Any;

use anyhow::Result;
use bitflags::bitflags;

use crate::address_map::{REG_DIV, REG_TAC, REG_TIMA, REG_TMA};
use crate::bus::{BusView, Component, Interrupt, InterruptLine};

bitflags! {
    /// Timer control register (TAC). Bits 3..8 are kept as written.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Tac: u8 {
        const CLOCK_SELECT = 0b0000_0011;
        const ENABLE = 0b0000_0100;
    }
}

/// Main counter bit watched by TIMA, indexed by TAC's clock select.
const TAP_BITS: [u32; 4] = [9, 3, 5, 7];

/// Clock ticks per machine cycle.
const TICKS_PER_CYCLE: u16 = 4;

/// Timer and divider.
///
/// A 16-bit main counter advances by four every machine cycle; DIV exposes
/// its upper byte. TIMA counts falling edges of the tapped counter bit
/// (ANDed with the enable bit), so anything that changes the tap state,
/// including writes to DIV and TAC, can increment it.
pub struct Timer {
    main_counter: u16,
    tima: u8,
    tma: u8,
    tac: Tac,
    interrupts: InterruptLine,
}

impl Timer {
    pub fn new(interrupts: InterruptLine) -> Self {
        Self {
            main_counter: 0,
            tima: 0,
            tma: 0,
            tac: Tac::empty(),
            interrupts,
        }
    }

    pub fn main_counter(&self) -> u16 {
        self.main_counter
    }

    pub fn tima(&self) -> u8 {
        self.tima
    }

    /// Current value of the signal whose falling edges increment TIMA.
    fn state(&self) -> bool {
        let tap = TAP_BITS[(self.tac & Tac::CLOCK_SELECT).bits() as usize];
        self.tac.contains(Tac::ENABLE) && self.main_counter & (1 << tap) != 0
    }

    fn increment_if_change(&mut self, previous: bool) {
        if previous && !self.state() {
            let (next, overflow) = self.tima.overflowing_add(1);
            if overflow {
                self.tima = self.tma;
                self.interrupts.request(Interrupt::Timer);
            } else {
                self.tima = next;
            }
        }
    }
}

impl Component for Timer {
    fn read(&self, address: u16) -> Option<u8> {
        match address {
            REG_DIV => Some((self.main_counter >> 8) as u8),
            REG_TIMA => Some(self.tima),
            REG_TMA => Some(self.tma),
            REG_TAC => Some(self.tac.bits()),
            _ => None,
        }
    }

    fn write(&mut self, address: u16, data: u8) {
        match address {
            REG_DIV => {
                let previous = self.state();
                self.main_counter = 0;
                self.increment_if_change(previous);
            }
            REG_TIMA => self.tima = data,
            REG_TMA => self.tma = data,
            REG_TAC => {
                let previous = self.state();
                self.tac = Tac::from_bits_retain(data);
                self.increment_if_change(previous);
            }
            _ => {}
        }
    }

    fn cycle(&mut self, _cycle: u64, _bus: &mut BusView<'_>) -> Result<()> {
        let previous = self.state();
        self.main_counter = self.main_counter.wrapping_add(TICKS_PER_CYCLE);
        self.increment_if_change(previous);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Bus, Handle};

    fn timer_on_bus() -> (Bus, Handle<Timer>, InterruptLine) {
        let interrupts = InterruptLine::new();
        let mut bus = Bus::new();
        let timer = bus.attach(Timer::new(interrupts.clone()));
        (bus, timer, interrupts)
    }

    fn run(bus: &mut Bus, timer: Handle<Timer>, cycles: u64) {
        for c in 0..cycles {
            bus.cycle(timer, c).unwrap();
        }
    }

    #[test]
    fn div_is_upper_byte_of_main_counter() {
        let (mut bus, timer, _) = timer_on_bus();
        run(&mut bus, timer, 64);
        assert_eq!(bus.get(timer).main_counter(), 256);
        assert_eq!(bus.read(REG_DIV), 1);
        bus.write(REG_DIV, 0x77);
        assert_eq!(bus.read(REG_DIV), 0);
    }

    #[test]
    fn full_tap_period_increments_tima_once() {
        let (mut bus, timer, _) = timer_on_bus();
        // Enabled, tapping bit 3: one falling edge every 16 ticks.
        bus.write(REG_TAC, 0b101);
        run(&mut bus, timer, 3);
        assert_eq!(bus.read(REG_TIMA), 0);
        run(&mut bus, timer, 1);
        assert_eq!(bus.read(REG_TIMA), 1);
        run(&mut bus, timer, 3);
        assert_eq!(bus.read(REG_TIMA), 1);
    }

    #[test]
    fn overflow_reloads_tma_and_requests_interrupt_once() {
        let (mut bus, timer, interrupts) = timer_on_bus();
        bus.write(REG_TMA, 0x42);
        bus.write(REG_TIMA, 0xFF);
        bus.write(REG_TAC, 0b101);

        let mut requests = 0;
        for c in 0..8 {
            bus.cycle(timer, c).unwrap();
            if interrupts.is_requested(Interrupt::Timer) {
                requests += 1;
                interrupts.clear(Interrupt::Timer);
            }
        }
        assert_eq!(requests, 1);
        assert_eq!(bus.read(REG_TIMA), 0x43);
    }

    #[test]
    fn disabling_timer_on_high_tap_counts_an_edge() {
        let (mut bus, timer, _) = timer_on_bus();
        bus.write(REG_TAC, 0b101);
        run(&mut bus, timer, 2);
        // Tap bit is high: turning the timer off is a falling edge.
        bus.write(REG_TAC, 0b001);
        assert_eq!(bus.read(REG_TIMA), 1);
    }

    #[test]
    fn resetting_div_on_high_tap_counts_an_edge() {
        let (mut bus, timer, _) = timer_on_bus();
        bus.write(REG_TAC, 0b101);
        run(&mut bus, timer, 2);
        bus.write(REG_DIV, 0);
        assert_eq!(bus.read(REG_TIMA), 1);
        assert_eq!(bus.get(timer).main_counter(), 0);
    }

    #[test]
    fn tac_keeps_unused_bits() {
        let (mut bus, timer, _) = timer_on_bus();
        bus.write(REG_TAC, 0b1111_1101);
        assert_eq!(bus.read(REG_TAC), 0b1111_1101);
        run(&mut bus, timer, 4);
        assert_eq!(bus.read(REG_TIMA), 1);
    }
}
