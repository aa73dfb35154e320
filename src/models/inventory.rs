//! Single-product inventory under an (s, S) periodic-review policy.
//!
//! Demands arrive with exponential interdemand times and have sizes drawn
//! from an empirical distribution. At the start of every month the level is
//! reviewed: below `s`, an order brings it back up to `S` after a uniform
//! delivery lag. Unfilled demand is backlogged (negative level).
//!
//! # Costs per month
//!
//! ```text
//! ordering = sum(K + i * Z) / n
//! holding  = h * area(I+) / n
//! shortage = pi * area(I-) / n
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use crate::engine::{
    EmpiricalDistribution, EventContext, EventList, Interval, Model, SimEngine, SimRng, SimTime,
    VariateGenerator,
};
use crate::error::{SimError, SimResult};

/// Largest magnitude accepted for inventory levels and policy bounds.
///
/// Order sizes are `S - level`, so both operands stay within half the `i64`
/// range.
pub const LEVEL_BOUND: i64 = i64::MAX / 2;

/// Inventory event kinds, in tie-break order.
///
/// `EndSimulation` precedes `Evaluate`, so the review that coincides with
/// the horizon is never run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryEvent {
    /// An outstanding order is delivered.
    OrderArrival,
    /// A customer demand.
    Demand,
    /// End of the simulated horizon.
    EndSimulation,
    /// Monthly inventory review.
    Evaluate,
}

/// Time-weighted quantities of the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InventoryStat {
    /// Positive inventory level.
    Holding,
    /// Backlog (magnitude of a negative level).
    Shortage,
}

/// An (s, S) reorder policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InventoryPolicy {
    /// Reorder point `s`.
    pub small_s: i64,
    /// Order-up-to level `S`.
    pub big_s: i64,
}

impl InventoryPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(small_s: i64, big_s: i64) -> Self {
        Self { small_s, big_s }
    }

    /// Require `s <= S` with both within [`LEVEL_BOUND`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` naming the offending bound.
    pub fn check(&self) -> SimResult<()> {
        check_level("small_s", self.small_s)?;
        check_level("big_s", self.big_s)?;
        if self.small_s > self.big_s {
            return Err(SimError::invalid_parameter(
                "policies",
                format!("policy {self} has s > S"),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for InventoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:3},{:3})", self.small_s, self.big_s)
    }
}

/// Inventory scenario parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct InventoryParams {
    /// Starting inventory level.
    pub initial_inv_level: i64,

    /// Horizon in months.
    #[validate(range(min = 1))]
    pub num_months: u32,

    /// Mean time between demands, in months.
    #[validate(range(exclusive_min = 0.0))]
    pub mean_interdemand: f64,

    /// Setup cost per order (K).
    #[validate(range(min = 0.0))]
    pub setup_cost: f64,

    /// Cost per item ordered (i).
    #[validate(range(min = 0.0))]
    pub incremental_cost: f64,

    /// Holding cost per item per month (h).
    #[validate(range(min = 0.0))]
    pub holding_cost: f64,

    /// Backlog cost per item per month (pi).
    #[validate(range(min = 0.0))]
    pub shortage_cost: f64,

    /// Minimum delivery lag, in months.
    #[validate(range(min = 0.0))]
    pub minlag: f64,

    /// Maximum delivery lag, in months.
    #[validate(range(min = 0.0))]
    pub maxlag: f64,

    /// Cumulative distribution of demand sizes `1..=k`.
    pub demand_distribution: EmpiricalDistribution,

    /// Policies to evaluate.
    #[validate(length(min = 1))]
    pub policies: Vec<InventoryPolicy>,
}

impl InventoryParams {
    /// Validate field constraints and cross-field rules.
    ///
    /// # Errors
    ///
    /// Returns error describing the first violated constraint.
    pub fn check(&self) -> SimResult<()> {
        self.validate()?;

        let reals = [
            ("mean_interdemand", self.mean_interdemand),
            ("setup_cost", self.setup_cost),
            ("incremental_cost", self.incremental_cost),
            ("holding_cost", self.holding_cost),
            ("shortage_cost", self.shortage_cost),
            ("minlag", self.minlag),
            ("maxlag", self.maxlag),
        ];
        if let Some((name, value)) = reals.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SimError::invalid_parameter(*name, format!("{value} is not finite")));
        }

        check_level("initial_inv_level", self.initial_inv_level)?;

        if self.minlag > self.maxlag {
            return Err(SimError::invalid_parameter(
                "minlag",
                format!("minlag {} exceeds maxlag {}", self.minlag, self.maxlag),
            ));
        }

        for policy in &self.policies {
            policy.check()?;
        }
        Ok(())
    }
}

fn check_level(name: &str, value: i64) -> SimResult<()> {
    if value.checked_abs().map_or(true, |v| v > LEVEL_BOUND) {
        return Err(SimError::invalid_parameter(
            name,
            format!("{value} exceeds the level bound {LEVEL_BOUND}"),
        ));
    }
    Ok(())
}

/// Inventory state for one policy.
#[derive(Debug, Clone)]
pub struct InventorySystem<'p> {
    params: &'p InventoryParams,
    policy: InventoryPolicy,
    inv_level: i64,
    /// Size of the outstanding order.
    amount: i64,
    total_ordering_cost: f64,
    orders_placed: u64,
    horizon_reached: bool,
}

impl<'p> InventorySystem<'p> {
    /// Fresh system at the initial level with no outstanding order.
    #[must_use]
    pub const fn new(params: &'p InventoryParams, policy: InventoryPolicy) -> Self {
        Self {
            params,
            policy,
            inv_level: params.initial_inv_level,
            amount: 0,
            total_ordering_cost: 0.0,
            orders_placed: 0,
            horizon_reached: false,
        }
    }

    /// Current inventory level (negative when backlogged).
    #[must_use]
    pub const fn inv_level(&self) -> i64 {
        self.inv_level
    }

    /// Accumulated ordering cost.
    #[must_use]
    pub const fn total_ordering_cost(&self) -> f64 {
        self.total_ordering_cost
    }

    /// Orders placed so far.
    #[must_use]
    pub const fn orders_placed(&self) -> u64 {
        self.orders_placed
    }

    fn order_arrival(&mut self, ctx: &mut EventContext<'_, InventoryEvent>) -> SimResult<()> {
        self.inv_level = self.inv_level.checked_add(self.amount).ok_or_else(|| {
            ctx.handler_error(format!(
                "delivery of {} overflows level {}",
                self.amount, self.inv_level
            ))
        })?;
        ctx.cancel(InventoryEvent::OrderArrival)
    }

    fn demand(&mut self, ctx: &mut EventContext<'_, InventoryEvent>) -> SimResult<()> {
        let size = ctx.rng().empirical_discrete(&self.params.demand_distribution)?;
        self.inv_level = i64::try_from(size)
            .ok()
            .and_then(|size| self.inv_level.checked_sub(size))
            .ok_or_else(|| {
                ctx.handler_error(format!(
                    "demand of {size} overflows level {}",
                    self.inv_level
                ))
            })?;

        let gap = ctx.rng().exponential(self.params.mean_interdemand)?;
        ctx.schedule_in(InventoryEvent::Demand, gap)
    }

    fn evaluate(&mut self, ctx: &mut EventContext<'_, InventoryEvent>) -> SimResult<()> {
        if self.inv_level < self.policy.small_s {
            self.amount = self
                .policy
                .big_s
                .checked_sub(self.inv_level)
                .ok_or_else(|| {
                    ctx.handler_error(format!(
                        "order up to {} from level {} overflows",
                        self.policy.big_s, self.inv_level
                    ))
                })?;
            self.total_ordering_cost +=
                self.params.setup_cost + self.params.incremental_cost * self.amount as f64;
            self.orders_placed += 1;

            let lag = ctx
                .rng()
                .uniform_range(self.params.minlag, self.params.maxlag)?;
            debug!(
                time = ctx.now().as_f64(),
                level = self.inv_level,
                amount = self.amount,
                lag,
                "order placed"
            );
            ctx.schedule_in(InventoryEvent::OrderArrival, lag)?;
        }

        ctx.schedule_in(InventoryEvent::Evaluate, 1.0)
    }
}

impl Model for InventorySystem<'_> {
    type Kind = InventoryEvent;
    type Bucket = InventoryStat;

    fn register_events(
        &mut self,
        events: &mut EventList<InventoryEvent>,
        rng: &mut dyn VariateGenerator,
    ) -> SimResult<()> {
        let first_demand = rng.exponential(self.params.mean_interdemand)?;
        events.register(InventoryEvent::OrderArrival, SimTime::INFINITY)?;
        events.register(InventoryEvent::Demand, SimTime::ZERO + first_demand)?;
        events.register(
            InventoryEvent::EndSimulation,
            SimTime::new(f64::from(self.params.num_months)),
        )?;
        events.register(InventoryEvent::Evaluate, SimTime::ZERO)
    }

    fn buckets(&self) -> Vec<InventoryStat> {
        vec![InventoryStat::Holding, InventoryStat::Shortage]
    }

    fn record(&self, interval: &mut Interval<'_, InventoryStat>) {
        let level = self.inv_level as f64;
        if self.inv_level < 0 {
            interval.add(InventoryStat::Shortage, level);
        } else if self.inv_level > 0 {
            interval.add(InventoryStat::Holding, level);
        }
    }

    fn handle(
        &mut self,
        kind: InventoryEvent,
        ctx: &mut EventContext<'_, InventoryEvent>,
    ) -> SimResult<()> {
        match kind {
            InventoryEvent::OrderArrival => self.order_arrival(ctx),
            InventoryEvent::Demand => self.demand(ctx),
            InventoryEvent::Evaluate => self.evaluate(ctx),
            InventoryEvent::EndSimulation => {
                self.horizon_reached = true;
                Ok(())
            }
        }
    }

    fn should_stop(&self) -> bool {
        self.horizon_reached
    }
}

/// Average monthly costs of one policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyReport {
    /// Policy evaluated.
    pub policy: InventoryPolicy,
    /// Sum of the three components.
    pub avg_total_cost: f64,
    /// Ordering cost per month.
    pub avg_ordering_cost: f64,
    /// Holding cost per month.
    pub avg_holding_cost: f64,
    /// Shortage cost per month.
    pub avg_shortage_cost: f64,
    /// Orders placed during the run.
    pub orders_placed: u64,
}

impl fmt::Display for PolicyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:15.2}{:15.2}{:15.2}{:15.2}",
            self.policy,
            self.avg_total_cost,
            self.avg_ordering_cost,
            self.avg_holding_cost,
            self.avg_shortage_cost
        )
    }
}

/// Results of a policy sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryReport {
    /// Parameters of the sweep.
    pub params: InventoryParams,
    /// One entry per policy, in input order.
    pub policies: Vec<PolicyReport>,
}

impl fmt::Display for InventoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.params;
        writeln!(f, "Single-product inventory system")?;
        writeln!(f)?;
        writeln!(f, "Initial inventory level{:24} items", p.initial_inv_level)?;
        writeln!(f)?;
        writeln!(f, "Number of demand sizes{:25}", p.demand_distribution.len())?;
        writeln!(f)?;
        write!(f, "Distribution function of demand sizes  ")?;
        for value in p.demand_distribution.cumulative() {
            write!(f, "{value:8.3}")?;
        }
        writeln!(f)?;
        writeln!(f)?;
        writeln!(f, "Mean interdemand time{:26.2}", p.mean_interdemand)?;
        writeln!(f)?;
        writeln!(
            f,
            "Delivery lag range{:29.2} to{:10.2} months",
            p.minlag, p.maxlag
        )?;
        writeln!(f)?;
        writeln!(f, "Length of the simulation{:23} months", p.num_months)?;
        writeln!(f)?;
        writeln!(
            f,
            "K ={:6.1}   i ={:6.1}   h ={:6.1}   pi ={:6.1}",
            p.setup_cost, p.incremental_cost, p.holding_cost, p.shortage_cost
        )?;
        writeln!(f)?;
        writeln!(f, "Number of policies{:29}", p.policies.len())?;
        writeln!(f)?;
        writeln!(
            f,
            "                 Average        Average        Average        Average"
        )?;
        write!(
            f,
            "  Policy       total cost    ordering cost  holding cost   shortage cost"
        )?;
        for report in &self.policies {
            writeln!(f)?;
            writeln!(f)?;
            write!(f, "{report}")?;
        }
        Ok(())
    }
}

/// Simulate one policy to the horizon.
///
/// # Errors
///
/// Returns error if parameters are invalid or the kernel aborts.
pub fn run_policy<R: VariateGenerator>(
    params: &InventoryParams,
    policy: InventoryPolicy,
    rng: R,
) -> SimResult<PolicyReport> {
    params.check()?;
    policy.check()?;

    let mut engine = SimEngine::new(InventorySystem::new(params, policy), rng)?;
    let summary = engine.run()?;
    let model = engine.model();

    let months = f64::from(params.num_months);
    let avg_ordering_cost = model.total_ordering_cost() / months;
    let avg_holding_cost = params.holding_cost * summary.area(InventoryStat::Holding) / months;
    let avg_shortage_cost = params.shortage_cost * summary.area(InventoryStat::Shortage) / months;

    Ok(PolicyReport {
        policy,
        avg_total_cost: avg_ordering_cost + avg_holding_cost + avg_shortage_cost,
        avg_ordering_cost,
        avg_holding_cost,
        avg_shortage_cost,
        orders_placed: model.orders_placed(),
    })
}

/// Simulate every policy, each on its own partition of `rng`.
///
/// # Errors
///
/// Returns error if parameters are invalid or any run aborts.
pub fn run_policies(params: &InventoryParams, rng: &mut SimRng) -> SimResult<InventoryReport> {
    params.check()?;

    let streams = rng.partition(params.policies.len());
    let policies = params
        .policies
        .iter()
        .zip(streams)
        .map(|(&policy, stream)| {
            let report = run_policy(params, policy, stream)?;
            info!(
                small_s = policy.small_s,
                big_s = policy.big_s,
                total = report.avg_total_cost,
                "policy evaluated"
            );
            Ok(report)
        })
        .collect::<SimResult<Vec<_>>>()?;

    Ok(InventoryReport {
        params: params.clone(),
        policies,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::engine::ScriptedUniforms;

    fn params() -> InventoryParams {
        InventoryParams {
            initial_inv_level: 60,
            num_months: 120,
            mean_interdemand: 0.1,
            setup_cost: 32.0,
            incremental_cost: 3.0,
            holding_cost: 1.0,
            shortage_cost: 5.0,
            minlag: 0.5,
            maxlag: 1.0,
            demand_distribution: EmpiricalDistribution::new(vec![0.167, 0.5, 0.833, 1.0])
                .unwrap(),
            policies: vec![
                InventoryPolicy::new(20, 40),
                InventoryPolicy::new(20, 60),
                InventoryPolicy::new(40, 80),
            ],
        }
    }

    #[test]
    fn test_params_validation() {
        assert!(params().check().is_ok());

        let mut p = params();
        p.minlag = 2.0;
        assert!(p.check().is_err());

        let mut p = params();
        p.policies.push(InventoryPolicy::new(50, 10));
        assert!(p.check().is_err());

        let mut p = params();
        p.policies.clear();
        assert!(p.check().is_err());

        let mut p = params();
        p.mean_interdemand = 0.0;
        assert!(p.check().is_err());

        let mut p = params();
        p.num_months = 0;
        assert!(p.check().is_err());
    }

    #[test]
    fn test_level_bounds_rejected() {
        let mut p = params();
        p.initial_inv_level = -1;
        p.policies = vec![InventoryPolicy::new(0, i64::MAX)];
        assert!(matches!(
            p.check(),
            Err(SimError::InvalidParameter { ref name, .. }) if name == "big_s"
        ));

        let mut p = params();
        p.initial_inv_level = i64::MIN;
        assert!(matches!(
            p.check(),
            Err(SimError::InvalidParameter { ref name, .. }) if name == "initial_inv_level"
        ));

        let mut p = params();
        p.initial_inv_level = LEVEL_BOUND;
        p.policies = vec![InventoryPolicy::new(-LEVEL_BOUND, LEVEL_BOUND)];
        assert!(p.check().is_ok());
    }

    #[test]
    fn test_order_overflow_is_handler_error() {
        // Bypasses check(): the kernel must still fail cleanly.
        let mut p = params();
        p.initial_inv_level = -1;
        p.mean_interdemand = 1.0e6;
        let policy = InventoryPolicy::new(0, i64::MAX);
        let rng = ScriptedUniforms::new(vec![0.5]).unwrap();
        let mut engine = SimEngine::new(InventorySystem::new(&p, policy), rng).unwrap();

        match engine.run().unwrap_err() {
            SimError::Handler { time, kind, .. } => {
                assert!(time.abs() < f64::EPSILON);
                assert_eq!(kind, "Evaluate");
            }
            other => panic!("expected Handler, got {other:?}"),
        }
        assert_eq!(engine.model().inv_level(), -1);
    }

    #[test]
    fn test_run_policy_checks_params() {
        let mut p = params();
        p.num_months = 0;
        let rng = ScriptedUniforms::new(vec![0.5]).unwrap();
        assert!(matches!(
            run_policy(&p, InventoryPolicy::new(20, 40), rng),
            Err(SimError::Validation(_))
        ));

        let mut p = params();
        p.minlag = 2.0;
        assert!(matches!(
            run_policy(&p, InventoryPolicy::new(20, 40), SimRng::new(1)),
            Err(SimError::InvalidParameter { ref name, .. }) if name == "minlag"
        ));

        assert!(run_policy(&params(), InventoryPolicy::new(50, 10), SimRng::new(1)).is_err());
    }

    #[test]
    fn test_bad_lag_range_reports_event_context() {
        // Unchecked parameters reach the handler; the error names the review.
        let mut p = params();
        p.initial_inv_level = 0;
        p.minlag = 2.0;
        let mut engine =
            SimEngine::new(InventorySystem::new(&p, p.policies[0]), SimRng::new(3)).unwrap();

        match engine.run().unwrap_err() {
            SimError::EventFailed { time, kind, source } => {
                assert!(time.abs() < f64::EPSILON);
                assert_eq!(kind, "Evaluate");
                assert!(matches!(*source, SimError::InvalidParameter { .. }));
            }
            other => panic!("expected EventFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_policy_display() {
        assert_eq!(InventoryPolicy::new(20, 40).to_string(), "( 20, 40)");
    }

    #[test]
    fn test_no_demand_pressure_only_holding() {
        // First demand at -1e6 * ln(0.5), far past the horizon; the level
        // stays at 60 for all 120 months.
        let mut p = params();
        p.mean_interdemand = 1.0e6;
        let rng = ScriptedUniforms::new(vec![0.5]).unwrap();
        let report = run_policy(&p, InventoryPolicy::new(20, 40), rng).unwrap();

        assert!((report.avg_holding_cost - 60.0).abs() < 1e-9);
        assert!(report.avg_shortage_cost.abs() < 1e-12);
        assert!(report.avg_ordering_cost.abs() < 1e-12);
        assert_eq!(report.orders_placed, 0);
    }

    #[test]
    fn test_order_placed_below_reorder_point() {
        // Level 10 < s = 20 at the first review: order 30 units.
        let mut p = params();
        p.initial_inv_level = 10;
        p.mean_interdemand = 1.0e6;
        p.num_months = 2;
        let rng = ScriptedUniforms::new(vec![0.5]).unwrap();

        let report = run_policy(&p, InventoryPolicy::new(20, 40), rng).unwrap();

        assert_eq!(report.orders_placed, 1);
        // K + i * Z = 32 + 3 * 30 over 2 months
        assert!((report.avg_ordering_cost - 61.0).abs() < 1e-9);
        // Lag 0.75: level 10 on [0, 0.75), 40 on [0.75, 2]
        let holding_area = 10.0 * 0.75 + 40.0 * 1.25;
        assert!((report.avg_holding_cost - holding_area / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_backlog_counts_as_shortage() {
        let mut p = params();
        p.initial_inv_level = -5;
        p.mean_interdemand = 1.0e6;
        p.num_months = 1;
        // s below the level so no order is placed.
        let rng = ScriptedUniforms::new(vec![0.5]).unwrap();
        let report = run_policy(&p, InventoryPolicy::new(-10, 0), rng).unwrap();

        assert!((report.avg_shortage_cost - 5.0 * 5.0).abs() < 1e-9);
        assert!(report.avg_holding_cost.abs() < 1e-12);
    }

    #[test]
    fn test_end_wins_tie_with_review() {
        let p = params();
        let mut engine =
            SimEngine::new(InventorySystem::new(&p, p.policies[0]), SimRng::new(42)).unwrap();
        let summary = engine.run().unwrap();

        assert!((summary.end_time - 120.0).abs() < f64::EPSILON);
        // The final review was never dispatched, so it is still pending.
        assert_eq!(
            engine.events().next_time(InventoryEvent::Evaluate),
            Some(SimTime::new(120.0))
        );
    }

    #[test]
    fn test_policy_sweep_matches_reference_magnitudes() {
        let mut rng = SimRng::new(42);
        let report = run_policies(&params(), &mut rng).unwrap();

        assert_eq!(report.policies.len(), 3);
        for policy in &report.policies {
            let sum =
                policy.avg_ordering_cost + policy.avg_holding_cost + policy.avg_shortage_cost;
            assert!((policy.avg_total_cost - sum).abs() < 1e-9);
            // Textbook results for these policies lie roughly between 110 and 140.
            assert!(policy.avg_total_cost > 90.0 && policy.avg_total_cost < 160.0);
        }
    }

    #[test]
    fn test_policy_sweep_reproducible() {
        let a = run_policies(&params(), &mut SimRng::new(7)).unwrap();
        let b = run_policies(&params(), &mut SimRng::new(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_report_display() {
        let report = run_policies(&params(), &mut SimRng::new(42)).unwrap();
        let text = report.to_string();

        assert!(text.starts_with("Single-product inventory system"));
        assert!(text.contains("Number of policies                            3"));
        assert!(text.contains("( 20, 40)"));
        assert!(text.contains("K =  32.0   i =   3.0   h =   1.0   pi =   5.0"));
    }
}
