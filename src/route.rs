//! Routed path geometry.
//!
//! A [`Route`] is split into legs and steps the way road routers report them.
//! Geometry is only present when the route was requested with
//! [`RoutingType::FullRoute`]; duration-only routes have no legs.
//!
//! The truncation helpers cut the already-driven front off a route, which is
//! how vehicles move along their committed schedule.

use crate::types::Pos;

/// Fidelity of a router query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingType {
    /// Duration and distance only. Used for every speculative trial.
    TimeOnly,
    /// Duration, distance and path geometry. Used when committing.
    FullRoute,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Step {
    pub distance_m: f64,
    pub duration_s: f64,
    pub poses: Vec<Pos>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Leg {
    pub distance_m: f64,
    pub duration_s: f64,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    pub distance_m: f64,
    pub duration_s: f64,
    pub legs: Vec<Leg>,
}

impl Route {
    /// A route without geometry.
    pub fn time_only(distance_m: f64, duration_s: f64) -> Self {
        Self {
            distance_m,
            duration_s,
            legs: Vec::new(),
        }
    }

    pub fn has_geometry(&self) -> bool {
        self.legs
            .iter()
            .flat_map(|leg| leg.steps.iter())
            .any(|step| !step.poses.is_empty())
    }

    /// The path as one ordered sequence, dropping the repeated pose where
    /// consecutive steps meet.
    pub fn poses(&self) -> Vec<Pos> {
        let mut poses: Vec<Pos> = Vec::new();
        for pose in self
            .legs
            .iter()
            .flat_map(|leg| leg.steps.iter())
            .flat_map(|step| step.poses.iter())
        {
            if poses.last() != Some(pose) {
                poses.push(*pose);
            }
        }
        poses
    }

    /// First pose of the remaining path.
    pub fn first_pose(&self) -> Option<Pos> {
        self.legs
            .iter()
            .flat_map(|leg| leg.steps.iter())
            .find_map(|step| step.poses.first().copied())
    }
}

/// Remove the first `time_s` seconds of a step. Progress along the poses is
/// measured by Manhattan distance.
pub fn truncate_step_by_time(step: &mut Step, time_s: f64) {
    if time_s <= 0.0 {
        return;
    }
    if time_s >= step.duration_s {
        if let Some(last) = step.poses.last().copied() {
            step.poses = vec![last];
        }
        step.distance_m = 0.0;
        step.duration_s = 0.0;
        return;
    }

    let ratio = time_s / step.duration_s;
    let total_dist: f64 = step.poses.windows(2).map(|w| w[0].manhattan(w[1])).sum();
    let truncated_dist = total_dist * ratio;

    let mut accumulated_dist = 0.0;
    for i in 0..step.poses.len().saturating_sub(1) {
        let dist = step.poses[i].manhattan(step.poses[i + 1]);
        if accumulated_dist + dist > truncated_dist {
            let subratio = (truncated_dist - accumulated_dist) / dist;
            step.poses[i] = step.poses[i].lerp(step.poses[i + 1], subratio);
            step.poses.drain(..i);
            break;
        }
        accumulated_dist += dist;
    }

    step.distance_m *= 1.0 - ratio;
    step.duration_s *= 1.0 - ratio;
}

pub fn truncate_leg_by_time(leg: &mut Leg, mut time_s: f64) {
    while let Some(step) = leg.steps.first_mut() {
        if step.duration_s <= time_s {
            time_s -= step.duration_s;
            leg.steps.remove(0);
            continue;
        }
        truncate_step_by_time(step, time_s);
        break;
    }

    leg.distance_m = leg.steps.iter().map(|s| s.distance_m).sum();
    leg.duration_s = leg.steps.iter().map(|s| s.duration_s).sum();
}

pub fn truncate_route_by_time(route: &mut Route, mut time_s: f64) {
    if time_s <= 0.0 {
        return;
    }

    // Duration-only route: shrink the totals proportionally.
    if route.legs.is_empty() {
        if route.duration_s <= time_s {
            route.distance_m = 0.0;
            route.duration_s = 0.0;
        } else {
            let remaining = 1.0 - time_s / route.duration_s;
            route.distance_m *= remaining;
            route.duration_s -= time_s;
        }
        return;
    }

    while let Some(leg) = route.legs.first_mut() {
        if leg.duration_s <= time_s {
            time_s -= leg.duration_s;
            route.legs.remove(0);
            continue;
        }
        truncate_leg_by_time(leg, time_s);
        break;
    }

    route.distance_m = route.legs.iter().map(|l| l.distance_m).sum();
    route.duration_s = route.legs.iter().map(|l| l.duration_s).sum();
}
