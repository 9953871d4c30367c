use crate::particle::{FlowUniforms, Particle};
use crate::shader_utils::{work_groups_for, WORK_GROUP_SIZE};
use cgmath::{InnerSpace, MetricSpace, Vector3};
use std::f32::consts::PI;

pub fn spawn_point(uniforms: &FlowUniforms, seed: f32, lens: f32) -> Vector3<f32> {
    let source = Vector3::from(uniforms.source);
    let sink = Vector3::from(uniforms.sink);
    let axis = sink - source;
    let axis = if axis.magnitude() < 0.000001 {
        Vector3::unit_x()
    } else {
        axis.normalize()
    };
    let helper = if axis.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };
    let u = axis.cross(helper).normalize();
    let w = axis.cross(u);
    let angle = (seed * 97.0).fract() * 2.0 * PI;
    let radius = lens * (seed * 13.0).fract().sqrt();
    source + (u * angle.cos() + w * angle.sin()) * radius
}

// One application of the update rule. Depends only on the particle's
// previous state and the uniforms.
pub fn advance(particle: &Particle, uniforms: &FlowUniforms) -> Particle {
    let source = Vector3::from(uniforms.source);
    let sink = Vector3::from(uniforms.sink);
    let lens = uniforms.lens_radius.max(0.0);
    let mut life = particle.life + uniforms.dt;
    let mut position = Vector3::from(particle.position);
    if particle.is_waiting() {
        // Waiting particles sit at the current source.
        if life <= 0.0 {
            return Particle {
                position: uniforms.source,
                life,
                velocity: [0.0; 3],
                ..*particle
            };
        }
        position = spawn_point(uniforms, particle.seed, lens);
    }

    let refraction = if position.distance(source) < lens {
        uniforms.lens_index
    } else {
        1.0
    };
    let rate = uniforms.speed.max(0.0) / refraction;
    let blend = 1.0 - (-rate * uniforms.dt).exp();
    let next = position + (sink - position) * blend;

    let velocity = if uniforms.dt > 0.0 {
        (next - position) / uniforms.dt
    } else {
        Vector3::new(0.0, 0.0, 0.0)
    };
    if next.distance(sink) <= uniforms.arrival_radius {
        life = 0.0;
    }
    Particle {
        position: next.into(),
        life,
        velocity: velocity.into(),
        seed: particle.seed,
    }
}

// Same partitioning as the device; out-of-range invocations return early.
// Reads only `previous`, so no invocation observes another's new state.
pub fn dispatch(
    previous: &[Particle],
    next: &mut [Particle],
    invocations: &mut [u32],
    uniforms: &FlowUniforms,
) -> u32 {
    let work_groups = work_groups_for(uniforms.count);
    log::trace!(
        "Host dispatch of {} work groups, size {}",
        work_groups,
        WORK_GROUP_SIZE
    );
    for group in 0..work_groups {
        for local in 0..WORK_GROUP_SIZE {
            let index = (group * WORK_GROUP_SIZE + local) as usize;
            if index >= uniforms.count as usize {
                continue;
            }
            next[index] = advance(&previous[index], uniforms);
            invocations[index] += 1;
        }
    }
    work_groups
}
