//! Discrete-event loop advancing rising clock edges.
//!
//! Each rising edge has two phases. In the observe phase every monitor
//! samples the bus exactly as it was left by the previous edge; only then
//! does the drive phase let tasks change signals for the next edge. That
//! ordering is what makes captures race-free without modeling sub-cycle
//! delta time.

use crate::bus::SignalBus;
use crate::error::Result;
use crate::monitor::BusMonitor;
use tracing::{debug, trace};

/// What a task wants after one resumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Resume again after this many further rising edges (minimum 1)
    AfterEdges(u64),
    /// Task finished; never resume it again
    Done,
}

/// One cooperative participant of the simulation.
///
/// `resume` is called in the drive phase of every edge the task is due,
/// with the current edge number and mutable access to the bus.
pub trait SimTask {
    /// Advance the task by one scheduling step.
    ///
    /// # Errors
    ///
    /// A task error aborts the whole run.
    fn resume(&mut self, edge: u64, bus: &mut SignalBus) -> Result<Wake>;
}

/// Run limits
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Hard edge limit; reaching it ends the run as [`RunOutcome::MaxCycles`]
    pub max_cycles: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { max_cycles: 100_000 }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The watched finish signal went high at this edge
    Finished {
        /// Edge at which the finish signal was observed high
        edge: u64,
    },
    /// The edge limit was reached first
    MaxCycles,
}

struct Scheduled {
    wake_at: u64,
    task: Box<dyn SimTask>,
    done: bool,
}

/// Edge-driven simulation: a bus, scheduled tasks, and passive monitors.
pub struct Simulation {
    config: SimConfig,
    bus: SignalBus,
    tasks: Vec<Scheduled>,
    monitors: Vec<BusMonitor>,
}

impl Simulation {
    /// New simulation over a pre-wired bus
    pub fn new(config: SimConfig, bus: SignalBus) -> Self {
        Self {
            config,
            bus,
            tasks: Vec::new(),
            monitors: Vec::new(),
        }
    }

    /// Bus access for wiring before the run
    pub fn bus_mut(&mut self) -> &mut SignalBus {
        &mut self.bus
    }

    /// Schedule a task, first resumed at edge 0
    pub fn add_task(&mut self, task: Box<dyn SimTask>) {
        self.tasks.push(Scheduled {
            wake_at: 0,
            task,
            done: false,
        });
    }

    /// Attach a passive monitor, sampled in every observe phase
    pub fn add_monitor(&mut self, monitor: BusMonitor) {
        self.monitors.push(monitor);
    }

    /// Run until the finish signal, all tasks done, or the edge limit.
    ///
    /// `finish` is a bus signal observed in the observe phase; the edge at
    /// which it is seen high is the last edge of the run.
    ///
    /// # Errors
    ///
    /// Propagates the first task or monitor error.
    pub fn run(&mut self, finish: crate::bus::SignalId) -> Result<RunOutcome> {
        for edge in 0..self.config.max_cycles {
            // Observe phase: monitors see the state driven at edge - 1.
            for m in &mut self.monitors {
                m.sample(&self.bus)?;
            }
            if self.bus.is_high(finish) {
                debug!(edge, "finish observed");
                return Ok(RunOutcome::Finished { edge });
            }

            // Drive phase. Done tasks stay done; the loop keeps observing
            // so a finish driven on the last task's edge is still seen.
            for s in &mut self.tasks {
                if s.done || s.wake_at > edge {
                    continue;
                }
                trace!(edge, "task resumed");
                match s.task.resume(edge, &mut self.bus)? {
                    Wake::AfterEdges(n) => s.wake_at = edge + n.max(1),
                    Wake::Done => s.done = true,
                }
            }
        }
        debug!(max_cycles = self.config.max_cycles, "edge limit reached");
        Ok(RunOutcome::MaxCycles)
    }

    /// Tear down, handing the captured monitor sequences to the caller
    pub fn into_monitors(self) -> Vec<BusMonitor> {
        self.monitors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SignalId;

    struct Counter {
        out: SignalId,
        count: u64,
    }

    impl SimTask for Counter {
        fn resume(&mut self, _edge: u64, bus: &mut SignalBus) -> Result<Wake> {
            self.count += 1;
            bus.set(self.out, self.count)?;
            Ok(if self.count == 5 {
                Wake::Done
            } else {
                Wake::AfterEdges(1)
            })
        }
    }

    struct FinishAt {
        finish: SignalId,
        edge: u64,
    }

    impl SimTask for FinishAt {
        fn resume(&mut self, edge: u64, bus: &mut SignalBus) -> Result<Wake> {
            if edge >= self.edge {
                bus.set(self.finish, 1)?;
                return Ok(Wake::Done);
            }
            Ok(Wake::AfterEdges(self.edge - edge))
        }
    }

    #[test]
    fn finish_ends_run_on_following_observe() {
        let mut bus = SignalBus::new();
        let finish = bus.register("finish", 1);
        let mut sim = Simulation::new(SimConfig { max_cycles: 100 }, bus);
        sim.add_task(Box::new(FinishAt { finish, edge: 7 }));
        // Driven at edge 7, observed at edge 8.
        assert_eq!(sim.run(finish).unwrap(), RunOutcome::Finished { edge: 8 });
    }

    #[test]
    fn edge_limit_bounds_the_run() {
        let mut bus = SignalBus::new();
        let finish = bus.register("finish", 1);
        let out = bus.register("count", 8);
        let mut sim = Simulation::new(SimConfig { max_cycles: 3 }, bus);
        sim.add_task(Box::new(Counter { out, count: 0 }));
        assert_eq!(sim.run(finish).unwrap(), RunOutcome::MaxCycles);
    }

    #[test]
    fn wake_after_n_skips_edges() {
        struct Sparse {
            out: SignalId,
            resumed: u64,
        }
        impl SimTask for Sparse {
            fn resume(&mut self, edge: u64, bus: &mut SignalBus) -> Result<Wake> {
                self.resumed += 1;
                bus.set(self.out, edge)?;
                Ok(Wake::AfterEdges(4))
            }
        }
        let mut bus = SignalBus::new();
        let finish = bus.register("finish", 1);
        let out = bus.register("last_edge", 8);
        let mut sim = Simulation::new(SimConfig { max_cycles: 10 }, bus);
        sim.add_task(Box::new(Sparse { out, resumed: 0 }));
        sim.run(finish).unwrap();
        // Resumed at edges 0, 4, 8: the last drive happened at edge 8.
        let bus = sim.bus_mut();
        let id = bus.lookup("last_edge").unwrap();
        assert_eq!(bus.get(id), 8);
    }
}
