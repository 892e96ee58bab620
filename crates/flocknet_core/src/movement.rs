//! Velocity integration step.
//!
//! Stand-in for the steering collaborator: moves each agent along its
//! velocity and reflects it off the simulation extent, then notifies the
//! directory so both indexes follow.

use crate::directory::SimulationDirectory;
use glam::Vec3;

/// Moves every agent by `velocity * dt`, bouncing off the cube of half-size `extent`.
pub fn integrate(directory: &mut SimulationDirectory, dt: f32, extent: f32) {
    for handle in directory.handles() {
        let Some(agent) = directory.agent(handle) else {
            continue;
        };
        let (location, velocity) = reflect(agent.location + agent.velocity * dt, agent.velocity, extent);
        if velocity != agent.velocity {
            directory.set_velocity(handle, velocity);
        }
        directory.relocate_agent(handle, location);
    }
}

fn reflect(mut location: Vec3, mut velocity: Vec3, extent: f32) -> (Vec3, Vec3) {
    for axis in 0..3 {
        if location[axis] > extent {
            location[axis] = (2.0 * extent - location[axis]).max(-extent);
            velocity[axis] = -velocity[axis].abs();
        } else if location[axis] < -extent {
            location[axis] = (-2.0 * extent - location[axis]).min(extent);
            velocity[axis] = velocity[axis].abs();
        }
    }
    (location, velocity)
}
