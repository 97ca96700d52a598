//! Space-Time Planner: time-expanded A* with shared reservation tables.

mod planner;

pub use planner::{
    astar_with_time, plan_prioritized, plan_single, ReservationTable, TimedPath,
    DEFAULT_MAX_TIME, DEFAULT_STAY_AT_GOAL,
};
