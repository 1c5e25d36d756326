//! Discrete-event simulator.
//!
//! Single-threaded and run-to-completion. A [`Simulation`] owns the clock,
//! the work queues and every net's value; callbacks receive `&mut
//! Simulation` and may schedule more work or assign nets.
//!
//! # Timestep structure
//!
//! ```text
//! advance_timestep():
//!   now += 1
//!   postponed[now] ──► ready
//!   loop {
//!     drain ready          (callbacks may push more ready work)
//!     inactive ──► ready   (stop when both are empty)
//!   }
//! ```
//!
//! Net assignments queue their triggers on ready, so a chain of zero-delay
//! gates settles within one timestep.

mod net;
mod scheduler;

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

pub use net::{Edge, NetHandle};
pub use scheduler::Scheduler;

use net::NetState;

/// One-shot queued work.
pub type Callback = Box<dyn FnOnce(&mut Simulation) -> Result<(), SimError>>;

/// Reusable net subscriber.
pub type Trigger = Rc<RefCell<dyn FnMut(&mut Simulation) -> Result<(), SimError>>>;

/// Default callback budget per timestep.
pub const DEFAULT_MAX_MICRO_ROUNDS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("cannot schedule for timestep {target}: current timestep is {now}")]
    ScheduledInPast { now: i64, target: i64 },
    #[error("timestep {timestep} did not settle within {limit} callbacks")]
    RoundLimit { timestep: i64, limit: usize },
    #[error("callback failed: {0}")]
    Callback(String),
}

impl SimError {
    pub fn callback(msg: impl std::fmt::Display) -> Self {
        SimError::Callback(msg.to_string())
    }
}

pub struct Simulation {
    scheduler: Scheduler,
    nets: Vec<NetState>,
    max_micro_rounds: usize,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("scheduler", &self.scheduler)
            .field("nets", &self.net_values())
            .field("max_micro_rounds", &self.max_micro_rounds)
            .finish()
    }
}

impl Simulation {
    /// A simulation with `net_count` unset nets.
    pub fn new(net_count: usize) -> Self {
        Self {
            scheduler: Scheduler::new(),
            nets: (0..net_count).map(|_| NetState::default()).collect(),
            max_micro_rounds: DEFAULT_MAX_MICRO_ROUNDS,
        }
    }

    pub fn with_round_limit(mut self, limit: usize) -> Self {
        self.max_micro_rounds = limit;
        self
    }

    pub fn now(&self) -> i64 {
        self.scheduler.now()
    }

    pub fn started(&self) -> bool {
        self.scheduler.started()
    }

    /// Callbacks waiting in any queue.
    pub fn pending(&self) -> usize {
        self.scheduler.pending()
    }

    // -----------------------------------------------------------------------
    // Nets
    // -----------------------------------------------------------------------

    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Handles are handed out inside the crate only: behaviors reach nets
    /// through their port table, hosts through `LiveCircuit`.
    pub(crate) fn net(&self, index: usize) -> Option<NetHandle> {
        (index < self.nets.len()).then(|| NetHandle::new(index))
    }

    /// Value of every net, indexed like the netlist.
    pub fn net_values(&self) -> Vec<Option<bool>> {
        self.nets.iter().map(|n| n.value).collect()
    }

    pub fn subscriber_count(&self, net: NetHandle) -> usize {
        self.net_state(net).subscriber_count()
    }

    fn net_state(&self, net: NetHandle) -> &NetState {
        &self.nets[net.index()]
    }

    fn net_state_mut(&mut self, net: NetHandle) -> &mut NetState {
        &mut self.nets[net.index()]
    }

    /// Store the value and queue whatever it triggers.
    fn assign(&mut self, net: NetHandle, value: bool) {
        for trigger in self.net_state_mut(net).assign(value) {
            self.scheduler.push_ready(Box::new(move |sim| {
                let mut f = trigger
                    .try_borrow_mut()
                    .map_err(|_| SimError::callback("trigger re-entered while running"))?;
                (*f)(sim)
            }));
        }
    }

    fn defer_to_start(&mut self, cb: Callback) {
        self.scheduler.postpone(0, cb);
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Run in the current drain.
    pub fn schedule_now<F>(&mut self, cb: F)
    where
        F: FnOnce(&mut Simulation) -> Result<(), SimError> + 'static,
    {
        self.scheduler.push_ready(Box::new(cb));
    }

    /// `None`: after the ready queue empties, same timestep.
    /// `Some(d)`: at timestep `now + d`, which must be in the future.
    pub fn schedule_later<F>(&mut self, cb: F, delay: Option<u64>) -> Result<(), SimError>
    where
        F: FnOnce(&mut Simulation) -> Result<(), SimError> + 'static,
    {
        match delay {
            None => {
                self.scheduler.push_inactive(Box::new(cb));
                Ok(())
            }
            Some(d) => {
                let now = self.now();
                let target = i64::try_from(d)
                    .ok()
                    .and_then(|d| now.checked_add(d))
                    .unwrap_or(i64::MAX);
                if target <= now {
                    return Err(SimError::ScheduledInPast { now, target });
                }
                self.scheduler.postpone(target, Box::new(cb));
                Ok(())
            }
        }
    }

    /// Run at timestep 0. Only valid before the clock starts.
    pub fn schedule_at_start<F>(&mut self, cb: F) -> Result<(), SimError>
    where
        F: FnOnce(&mut Simulation) -> Result<(), SimError> + 'static,
    {
        if self.started() {
            return Err(SimError::ScheduledInPast {
                now: self.now(),
                target: 0,
            });
        }
        self.defer_to_start(Box::new(cb));
        Ok(())
    }

    /// Step to the next timestep and run it to quiescence.
    ///
    /// A failing callback stops the drain and its error is returned; work
    /// still queued stays queued and state already written is kept.
    pub fn advance_timestep(&mut self) -> Result<i64, SimError> {
        let now = self.scheduler.tick();
        let mut rounds = 0usize;
        loop {
            while let Some(cb) = self.scheduler.pop_ready() {
                rounds += 1;
                if rounds > self.max_micro_rounds {
                    // Put it back so the queue reflects what never ran.
                    self.scheduler.push_ready(cb);
                    return Err(SimError::RoundLimit {
                        timestep: now,
                        limit: self.max_micro_rounds,
                    });
                }
                cb(self)?;
            }
            if !self.scheduler.promote_inactive() {
                break;
            }
        }
        Ok(now)
    }
}
