//! Shared address space.
//!
//! A [`Bus`] is an ordered list of [`Component`]s. Reads ask each
//! component in attachment order and take the first answer; writes are
//! broadcast to everyone and each component decides whether the address
//! is its own. Components that need to reach the rest of the machine
//! while they run (the CPU, DMA in the display controller) receive a
//! [`BusView`] from [`Bus::cycle`].

mod interrupt;

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use anyhow::Result;

pub use interrupt::{Interrupt, InterruptLine};

/// Value returned by [`Bus::read`] when no component claims an address.
pub const OPEN_BUS: u8 = 0xFF;

/// A hardware unit mapped into the 16-bit address space.
pub trait Component: Any {
    /// Byte stored at `address`, or `None` when the address is not ours.
    fn read(&self, address: u16) -> Option<u8>;

    /// Store `data` at `address` if the address is ours, otherwise ignore it.
    fn write(&mut self, address: u16, data: u8);

    /// Advance by one machine cycle. `bus` gives access to every other
    /// component attached to the same bus.
    fn cycle(&mut self, _cycle: u64, _bus: &mut BusView<'_>) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Typed index of a component attached to a [`Bus`].
pub struct Handle<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.index)
    }
}

#[derive(Default)]
pub struct Bus {
    components: Vec<Box<dyn Component>>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `component` after every component already attached.
    pub fn attach<T: Component>(&mut self, component: T) -> Handle<T> {
        self.components.push(Box::new(component));
        Handle {
            index: self.components.len() - 1,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn read(&self, address: u16) -> u8 {
        first_answer(&self.components, address).unwrap_or(OPEN_BUS)
    }

    pub fn write(&mut self, address: u16, data: u8) {
        for component in self.components.iter_mut() {
            component.write(address, data);
        }
    }

    pub fn get<T: Component>(&self, handle: Handle<T>) -> &T {
        self.components[handle.index]
            .as_any()
            .downcast_ref()
            .unwrap_or_else(|| panic!("{handle:?} does not refer to this bus"))
    }

    pub fn get_mut<T: Component>(&mut self, handle: Handle<T>) -> &mut T {
        self.components[handle.index]
            .as_any_mut()
            .downcast_mut()
            .unwrap_or_else(|| panic!("{handle:?} does not refer to this bus"))
    }

    /// Run one cycle of the component behind `handle`.
    pub fn cycle<T: Component>(&mut self, handle: Handle<T>, cycle: u64) -> Result<()> {
        let (before, rest) = self.components.split_at_mut(handle.index);
        let (current, after) = rest
            .split_first_mut()
            .unwrap_or_else(|| panic!("{handle:?} does not refer to this bus"));
        let mut view = BusView { before, after };
        current.cycle(cycle, &mut view)
    }
}

/// The bus as seen by a component while it runs.
///
/// The running component is borrowed mutably, so it is not part of the
/// view; it passes itself as `owner` and is consulted at its own position
/// in the attachment order.
pub struct BusView<'a> {
    before: &'a mut [Box<dyn Component>],
    after: &'a mut [Box<dyn Component>],
}

impl BusView<'_> {
    pub fn read(&self, owner: &dyn Component, address: u16) -> u8 {
        first_answer(self.before, address)
            .or_else(|| owner.read(address))
            .or_else(|| first_answer(self.after, address))
            .unwrap_or(OPEN_BUS)
    }

    pub fn write(&mut self, owner: &mut dyn Component, address: u16, data: u8) {
        for component in self.before.iter_mut() {
            component.write(address, data);
        }
        owner.write(address, data);
        for component in self.after.iter_mut() {
            component.write(address, data);
        }
    }
}

fn first_answer(components: &[Box<dyn Component>], address: u16) -> Option<u8> {
    components.iter().find_map(|c| c.read(address))
}
