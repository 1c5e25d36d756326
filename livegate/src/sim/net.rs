//! Net signal state and edge triggers.

use std::cell::RefCell;
use std::rc::Rc;

use super::{SimError, Simulation, Trigger};

/// Which subscriber list a trigger goes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Every assignment, changed or not.
    Change,
    /// Assignment of `true` over anything but `true`.
    Rising,
    /// Assignment of `false` over anything but `false`.
    Falling,
}

/// One net's value and subscribers.
#[derive(Default)]
pub(crate) struct NetState {
    pub(crate) value: Option<bool>,
    on_change: Vec<Trigger>,
    on_rise: Vec<Trigger>,
    on_fall: Vec<Trigger>,
}

impl NetState {
    pub(crate) fn subscribe(&mut self, edge: Edge, trigger: Trigger) {
        match edge {
            Edge::Change => self.on_change.push(trigger),
            Edge::Rising => self.on_rise.push(trigger),
            Edge::Falling => self.on_fall.push(trigger),
        }
    }

    /// Store `value` and return the triggers it fires, in firing order.
    pub(crate) fn assign(&mut self, value: bool) -> Vec<Trigger> {
        let old = self.value.replace(value);
        let mut fired = self.on_change.clone();
        if old != Some(value) {
            let edge = if value { &self.on_rise } else { &self.on_fall };
            fired.extend(edge.iter().cloned());
        }
        fired
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.on_change.len() + self.on_rise.len() + self.on_fall.len()
    }
}

/// Handle to a net inside a [`Simulation`].
///
/// Handles are plain indices; all access goes through the simulation so
/// every write notifies subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetHandle(usize);

impl NetHandle {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// Current value; `None` until the first assignment lands.
    pub fn get(self, sim: &Simulation) -> Option<bool> {
        sim.net_state(self).value
    }

    /// Assign now. Before the clock starts the write is held until
    /// timestep 0.
    pub fn set(self, sim: &mut Simulation, value: bool) {
        if sim.started() {
            sim.assign(self, value);
        } else {
            sim.defer_to_start(Box::new(move |sim| {
                sim.assign(self, value);
                Ok(())
            }));
        }
    }

    /// Assign through [`Simulation::schedule_later`].
    pub fn set_later(
        self,
        sim: &mut Simulation,
        value: bool,
        delay: Option<u64>,
    ) -> Result<(), SimError> {
        sim.schedule_later(
            move |sim| {
                self.set(sim, value);
                Ok(())
            },
            delay,
        )
    }

    pub fn subscribe<F>(self, sim: &mut Simulation, edge: Edge, f: F)
    where
        F: FnMut(&mut Simulation) -> Result<(), SimError> + 'static,
    {
        let trigger: Trigger = Rc::new(RefCell::new(f));
        sim.net_state_mut(self).subscribe(edge, trigger);
    }

    pub fn on_change<F>(self, sim: &mut Simulation, f: F)
    where
        F: FnMut(&mut Simulation) -> Result<(), SimError> + 'static,
    {
        self.subscribe(sim, Edge::Change, f)
    }

    pub fn on_posedge<F>(self, sim: &mut Simulation, f: F)
    where
        F: FnMut(&mut Simulation) -> Result<(), SimError> + 'static,
    {
        self.subscribe(sim, Edge::Rising, f)
    }

    pub fn on_negedge<F>(self, sim: &mut Simulation, f: F)
    where
        F: FnMut(&mut Simulation) -> Result<(), SimError> + 'static,
    {
        self.subscribe(sim, Edge::Falling, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting() -> (Rc<RefCell<usize>>, Trigger) {
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let trigger: Trigger = Rc::new(RefCell::new(move |_: &mut Simulation| {
            *c.borrow_mut() += 1;
            Ok(())
        }));
        (count, trigger)
    }

    #[test]
    fn assign_selects_triggers_by_edge() {
        let mut net = NetState::default();
        let (_, change) = counting();
        let (_, rise) = counting();
        let (_, fall) = counting();
        net.subscribe(Edge::Change, change);
        net.subscribe(Edge::Rising, rise);
        net.subscribe(Edge::Falling, fall);
        assert_eq!(net.subscriber_count(), 3);

        // unset -> false is a falling edge.
        assert_eq!(net.assign(false).len(), 2);
        // false -> true: change + rise.
        assert_eq!(net.assign(true).len(), 2);
        // true -> true: change only.
        assert_eq!(net.assign(true).len(), 1);
        assert_eq!(net.value, Some(true));
    }
}
