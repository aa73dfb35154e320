//! Single-server queueing system.
//!
//! Customers arrive with exponential interarrival times, wait in a FIFO
//! queue of bounded length and are served one at a time with exponential
//! service times. The run ends once a target number of customers has
//! completed their delay in queue.
//!
//! # Measures
//!
//! ```text
//! d(n) = total delay in queue / customers delayed
//! q(n) = area under Q(t) / T(n)
//! u(n) = area under B(t) / T(n)
//! ```

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::engine::{
    EventContext, EventList, Interval, Model, SimEngine, SimTime, VariateGenerator,
};
use crate::error::{SimError, SimResult};

/// Queue event kinds, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueEvent {
    /// A customer arrives.
    Arrival,
    /// The customer in service leaves.
    Departure,
}

/// Time-weighted quantities of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QueueStat {
    /// Number of customers waiting.
    NumInQueue,
    /// 1 while the server is busy.
    ServerBusy,
}

/// Server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServerStatus {
    /// No customer in service.
    #[default]
    Idle,
    /// A customer is in service.
    Busy,
}

fn default_queue_limit() -> usize {
    100
}

/// Queue scenario parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct QueueParams {
    /// Mean interarrival time.
    #[validate(range(exclusive_min = 0.0))]
    pub mean_interarrival: f64,

    /// Mean service time.
    #[validate(range(exclusive_min = 0.0))]
    pub mean_service: f64,

    /// Customers whose delay must be observed before stopping.
    #[validate(range(min = 1))]
    pub num_delays_required: u64,

    /// Maximum number of waiting customers.
    #[validate(range(min = 1))]
    #[serde(default = "default_queue_limit")]
    pub queue_limit: usize,
}

impl QueueParams {
    /// Parameters with the default queue limit.
    #[must_use]
    pub fn new(mean_interarrival: f64, mean_service: f64, num_delays_required: u64) -> Self {
        Self {
            mean_interarrival,
            mean_service,
            num_delays_required,
            queue_limit: default_queue_limit(),
        }
    }

    /// Validate field constraints and finiteness.
    ///
    /// # Errors
    ///
    /// Returns error describing the first violated constraint.
    pub fn check(&self) -> SimResult<()> {
        self.validate()?;
        if !self.mean_interarrival.is_finite() || !self.mean_service.is_finite() {
            return Err(SimError::invalid_parameter(
                "mean",
                "queue means must be finite",
            ));
        }
        Ok(())
    }
}

/// Single-server queue state.
#[derive(Debug, Clone)]
pub struct SingleServerQueue {
    params: QueueParams,
    server: ServerStatus,
    /// Arrival times of waiting customers, oldest first.
    waiting: VecDeque<SimTime>,
    num_custs_delayed: u64,
    total_of_delays: f64,
}

impl SingleServerQueue {
    /// Empty, idle system.
    #[must_use]
    pub fn new(params: QueueParams) -> Self {
        Self {
            params,
            server: ServerStatus::Idle,
            waiting: VecDeque::new(),
            num_custs_delayed: 0,
            total_of_delays: 0.0,
        }
    }

    /// Current number waiting.
    #[must_use]
    pub fn num_in_queue(&self) -> usize {
        self.waiting.len()
    }

    /// Server state.
    #[must_use]
    pub const fn server(&self) -> ServerStatus {
        self.server
    }

    /// Customers whose delay has been observed.
    #[must_use]
    pub const fn customers_delayed(&self) -> u64 {
        self.num_custs_delayed
    }

    /// Sum of observed delays.
    #[must_use]
    pub const fn total_of_delays(&self) -> f64 {
        self.total_of_delays
    }

    fn arrive(&mut self, ctx: &mut EventContext<'_, QueueEvent>) -> SimResult<()> {
        let interarrival = ctx.rng().exponential(self.params.mean_interarrival)?;
        ctx.schedule_in(QueueEvent::Arrival, interarrival)?;

        match self.server {
            ServerStatus::Busy => {
                if self.waiting.len() >= self.params.queue_limit {
                    return Err(SimError::QueueOverflow {
                        time: ctx.now().as_f64(),
                        limit: self.params.queue_limit,
                    });
                }
                self.waiting.push_back(ctx.now());
            }
            ServerStatus::Idle => {
                // Zero delay still counts as a delay.
                self.num_custs_delayed += 1;
                self.server = ServerStatus::Busy;
                let service = ctx.rng().exponential(self.params.mean_service)?;
                ctx.schedule_in(QueueEvent::Departure, service)?;
            }
        }
        Ok(())
    }

    fn depart(&mut self, ctx: &mut EventContext<'_, QueueEvent>) -> SimResult<()> {
        let Some(arrived) = self.waiting.pop_front() else {
            self.server = ServerStatus::Idle;
            return ctx.cancel(QueueEvent::Departure);
        };

        self.total_of_delays += ctx.now() - arrived;
        self.num_custs_delayed += 1;
        let service = ctx.rng().exponential(self.params.mean_service)?;
        ctx.schedule_in(QueueEvent::Departure, service)
    }
}

impl Model for SingleServerQueue {
    type Kind = QueueEvent;
    type Bucket = QueueStat;

    fn register_events(
        &mut self,
        events: &mut EventList<QueueEvent>,
        rng: &mut dyn VariateGenerator,
    ) -> SimResult<()> {
        let first_arrival = rng.exponential(self.params.mean_interarrival)?;
        events.register(QueueEvent::Arrival, SimTime::ZERO + first_arrival)?;
        events.register(QueueEvent::Departure, SimTime::INFINITY)
    }

    fn buckets(&self) -> Vec<QueueStat> {
        vec![QueueStat::NumInQueue, QueueStat::ServerBusy]
    }

    fn record(&self, interval: &mut Interval<'_, QueueStat>) {
        interval.add(QueueStat::NumInQueue, self.waiting.len() as f64);
        if self.server == ServerStatus::Busy {
            interval.add(QueueStat::ServerBusy, 1.0);
        }
    }

    fn handle(
        &mut self,
        kind: QueueEvent,
        ctx: &mut EventContext<'_, QueueEvent>,
    ) -> SimResult<()> {
        match kind {
            QueueEvent::Arrival => self.arrive(ctx),
            QueueEvent::Departure => self.depart(ctx),
        }
    }

    fn should_stop(&self) -> bool {
        self.num_custs_delayed >= self.params.num_delays_required
    }
}

/// Measures of performance of one queue run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueReport {
    /// Parameters the run used.
    pub params: QueueParams,
    /// Average delay in queue.
    pub avg_delay_in_queue: f64,
    /// Time-average number in queue.
    pub avg_num_in_queue: f64,
    /// Fraction of time the server was busy.
    pub server_utilization: f64,
    /// Simulated time of the last event.
    pub time_end: f64,
    /// Customers whose delay was observed.
    pub customers_delayed: u64,
}

impl fmt::Display for QueueReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Single-server queueing system")?;
        writeln!(f)?;
        writeln!(
            f,
            "Mean interarrival time{:11.3} minutes",
            self.params.mean_interarrival
        )?;
        writeln!(f)?;
        writeln!(f, "Mean service time{:16.3} minutes", self.params.mean_service)?;
        writeln!(f)?;
        writeln!(f, "Number of customers{:14}", self.params.num_delays_required)?;
        writeln!(f)?;
        writeln!(f)?;
        writeln!(f, "Average delay in queue{:11.3} minutes", self.avg_delay_in_queue)?;
        writeln!(f)?;
        writeln!(f, "Average number in queue{:10.3}", self.avg_num_in_queue)?;
        writeln!(f)?;
        writeln!(f, "Server utilization{:15.3}", self.server_utilization)?;
        writeln!(f)?;
        write!(f, "Time simulation ended{:12.3} minutes", self.time_end)
    }
}

/// Run one queue simulation to completion.
///
/// # Errors
///
/// Returns error if parameters are invalid, the queue overflows, or the
/// kernel aborts.
pub fn simulate<R: VariateGenerator>(params: &QueueParams, rng: R) -> SimResult<QueueReport> {
    params.check()?;

    let mut engine = SimEngine::new(SingleServerQueue::new(params.clone()), rng)?;
    let summary = engine.run()?;
    let model = engine.model();

    let customers_delayed = model.customers_delayed();
    let avg_delay_in_queue = if customers_delayed > 0 {
        model.total_of_delays() / customers_delayed as f64
    } else {
        0.0
    };

    let report = QueueReport {
        params: params.clone(),
        avg_delay_in_queue,
        avg_num_in_queue: summary.time_average(QueueStat::NumInQueue),
        server_utilization: summary.time_average(QueueStat::ServerBusy),
        time_end: summary.end_time,
        customers_delayed,
    };
    info!(
        customers = report.customers_delayed,
        avg_delay = report.avg_delay_in_queue,
        utilization = report.server_utilization,
        "queue run complete"
    );
    Ok(report)
}
