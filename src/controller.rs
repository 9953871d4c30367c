use crate::backend::{DrawStats, ParticleBackend};
use crate::config::{FermatConfig, FlowParams};
use crate::error::{FermatError, Result};
use crate::gpu::{GpuContext, RenderTarget};
use crate::gpu_backend::GpuBackend;
use crate::host_backend::HostBackend;
use crate::particle::{self, ParticleCount, SimulationParameters};
use std::convert::TryFrom;
use std::sync::Arc;

// Every step is a dispatch immediately followed by a barrier. Parameters are
// snapshotted at the start of a step.
pub struct SimulationController<B> {
    backend: B,
    flow: FlowParams,
    parameters: SimulationParameters,
    steps: u64,
    // Epochs of the last dispatch and of the last barrier covering it.
    dispatched: u64,
    synchronized: u64,
}

impl<T: RenderTarget> SimulationController<GpuBackend<T>> {
    pub fn new(
        context: Arc<GpuContext>,
        target: T,
        particle_count: i64,
        config: &FermatConfig,
    ) -> Result<Self> {
        let count = ParticleCount::try_from(particle_count)?;
        let backend = GpuBackend::new(context, target, count, &config.render)?;
        Ok(SimulationController::with_backend(backend, &config.flow))
    }
}

impl SimulationController<HostBackend> {
    pub fn new_host(particle_count: i64, config: &FermatConfig) -> Result<Self> {
        let count = ParticleCount::try_from(particle_count)?;
        Ok(SimulationController::with_backend(
            HostBackend::new(count),
            &config.flow,
        ))
    }
}

impl<B: ParticleBackend> SimulationController<B> {
    pub fn with_backend(backend: B, flow: &FlowParams) -> Self {
        let mut controller = SimulationController {
            backend,
            flow: *flow,
            parameters: SimulationParameters::from_config(flow),
            steps: 0,
            dispatched: 0,
            synchronized: 0,
        };
        controller.seed();
        log::info!(
            "Simulation ready with {} particles",
            controller.particle_count()
        );
        controller
    }

    fn seed(&mut self) {
        let particles = particle::seed_particles(
            self.backend.particle_count(),
            self.parameters.source,
            &self.flow,
        );
        self.backend.upload(&particles);
    }

    pub fn step(&mut self, dt: f32) -> Result<()> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(FermatError::InvalidTimeStep(dt));
        }
        let uniforms =
            self.parameters
                .to_uniforms(dt, self.backend.particle_count(), &self.flow);
        self.backend.dispatch(&uniforms);
        self.dispatched += 1;
        self.backend.barrier();
        self.synchronized = self.dispatched;
        self.steps += 1;
        log::trace!("Step {} (dt {})", self.steps, dt);
        Ok(())
    }

    pub fn render(&mut self) -> Result<DrawStats> {
        if self.synchronized != self.dispatched {
            return Err(FermatError::MisorderedCall);
        }
        self.backend.draw()
    }

    pub fn set_source(&mut self, x: f32, y: f32, z: f32) -> Result<()> {
        self.parameters.source = particle::finite_vector("source", x, y, z)?;
        Ok(())
    }

    pub fn set_sink(&mut self, x: f32, y: f32, z: f32) -> Result<()> {
        self.parameters.sink = particle::finite_vector("sink", x, y, z)?;
        Ok(())
    }

    // Negative radii are accepted and disable the lens.
    pub fn set_lens_radius(&mut self, radius: f32) -> Result<()> {
        self.parameters.lens_radius = particle::finite_scalar("lens_radius", radius)?;
        Ok(())
    }

    // Negative speeds are accepted and freeze the flow.
    pub fn set_flow_speed(&mut self, speed: f32) -> Result<()> {
        self.parameters.flow_speed = particle::finite_scalar("flow_speed", speed)?;
        Ok(())
    }

    /// Puts every particle back at the source, waiting to spawn. The buffer
    /// and the parameters are kept.
    pub fn reset(&mut self) {
        log::info!("Resetting {} particles", self.particle_count());
        self.seed();
    }

    pub fn particle_count(&self) -> u32 {
        self.backend.particle_count().get()
    }

    pub fn parameters(&self) -> &SimulationParameters {
        &self.parameters
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;
    use cgmath::{MetricSpace, Vector3};

    fn host(count: i64) -> SimulationController<HostBackend> {
        SimulationController::new_host(count, &FermatConfig::default()).unwrap()
    }

    fn scenario_config() -> FermatConfig {
        let mut config = FermatConfig::default();
        config.flow.source = [0.0, 0.0, 0.0];
        config.flow.sink = [10.0, 0.0, 0.0];
        config.flow.lens_radius = 1.0;
        config.flow.spawn_window = 0.0;
        config
    }

    #[test]
    fn render_before_any_step_draws_every_particle() {
        let mut controller = host(7);
        assert_eq!(controller.render().unwrap(), DrawStats { points: 7 });
        assert_eq!(controller.backend().last_frame().len(), 7);
        assert_eq!(controller.steps(), 0);
    }

    #[test]
    fn every_step_applies_the_kernel_once_per_particle() {
        let mut controller = host(1000);
        for _ in 0..5 {
            controller.step(0.016).unwrap();
        }
        assert_eq!(controller.steps(), 5);
        assert!(controller.backend().invocations().iter().all(|&n| n == 5));
    }

    #[test]
    fn repeated_renders_see_identical_state() {
        let mut controller = host(64);
        controller.step(0.5).unwrap();
        controller.step(0.5).unwrap();
        controller.render().unwrap();
        let first = controller.backend().last_frame().to_vec();
        controller.render().unwrap();
        assert_eq!(controller.backend().last_frame(), &first[..]);
        assert_eq!(controller.backend().draws(), 2);
    }

    #[test]
    fn render_reads_the_latest_step() {
        let mut controller = SimulationController::new_host(4, &scenario_config()).unwrap();
        controller.step(1.0).unwrap();
        controller.render().unwrap();
        assert_eq!(controller.backend().last_frame(), controller.backend().particles());
        assert!(controller.backend().last_frame().iter().all(|p| p.life > 0.0));
    }

    #[test]
    fn parameters_apply_from_the_next_step() {
        let mut controller = SimulationController::new_host(16, &scenario_config()).unwrap();
        controller.set_lens_radius(0.0).unwrap();
        controller.set_source(-5.0, 0.0, 0.0).unwrap();
        controller.step(0.25).unwrap();
        // Spawned at the new source, so still on the far side of the origin.
        assert!(controller
            .backend()
            .particles()
            .iter()
            .all(|p| p.position[0] < 0.0));

        let after_step = controller.backend().particles().to_vec();
        controller.set_sink(0.0, 50.0, 0.0).unwrap();
        controller.set_flow_speed(3.0).unwrap();
        assert_eq!(controller.backend().particles(), &after_step[..]);
        controller.render().unwrap();
        assert_eq!(controller.backend().last_frame(), &after_step[..]);

        controller.step(0.5).unwrap();
        assert!(controller
            .backend()
            .particles()
            .iter()
            .zip(&after_step)
            .all(|(now, before)| now.position[1] > before.position[1]));
    }

    #[test]
    fn large_counts_cover_the_partial_group() {
        let mut controller = host(100_000);
        controller.step(0.016).unwrap();
        assert_eq!(controller.backend().invocations().len(), 100_000);
        assert!(controller.backend().invocations().iter().all(|&n| n == 1));
        assert_eq!(controller.render().unwrap().points, 100_000);
    }

    #[test]
    fn particles_stream_from_source_to_sink() {
        let mut controller = SimulationController::new_host(4, &scenario_config()).unwrap();
        let mut last = [0.0f32; 4];
        for _ in 0..3 {
            controller.step(1.0).unwrap();
            for (p, last) in controller.backend().particles().iter().zip(last.iter_mut()) {
                assert!(p.position[0] > *last, "{:?}", p);
                assert!(p.position[0] < 10.0, "{:?}", p);
                assert!(p.velocity[0] > 0.0, "{:?}", p);
                *last = p.position[0];
            }
        }
    }

    #[test]
    fn flow_scenario_through_the_setters() {
        let mut controller = host(4);
        controller.set_source(0.0, 0.0, 0.0).unwrap();
        controller.set_sink(10.0, 0.0, 0.0).unwrap();
        controller.set_lens_radius(1.0).unwrap();
        let sink = Vector3::new(10.0, 0.0, 0.0);
        // Every particle starts out waiting at the new source.
        let mut last = [10.0f32; 4];
        for _ in 0..3 {
            controller.step(1.0).unwrap();
            for (p, last) in controller.backend().particles().iter().zip(last.iter_mut()) {
                if p.is_waiting() {
                    assert_eq!(p.position, [0.0; 3], "{:?}", p);
                } else {
                    assert!(p.position[0] > 0.0 && p.position[0] < 10.0, "{:?}", p);
                }
                let d = Vector3::from(p.position).distance(sink);
                assert!(d <= *last, "{:?}", p);
                *last = d;
            }
        }
        // The spawn window is shorter than the elapsed time.
        assert!(controller.backend().particles().iter().all(|p| !p.is_waiting()));
    }

    #[test]
    fn waiting_particles_follow_the_source() {
        let mut controller = host(1000);
        let old_source: [f32; 3] = controller.parameters().source.into();
        controller.set_source(0.0, 0.6, 0.0).unwrap();
        for _ in 0..60 {
            controller.step(1.0 / 60.0).unwrap();
        }
        controller.render().unwrap();
        let frame = controller.backend().last_frame();
        assert!(frame.iter().all(|p| p.position != old_source));
        let waiting: Vec<_> = frame.iter().filter(|p| p.is_waiting()).collect();
        assert!(!waiting.is_empty());
        assert!(waiting.iter().all(|p| p.position == [0.0, 0.6, 0.0]));
    }

    #[test]
    fn distance_to_sink_never_grows() {
        let mut controller = SimulationController::new_host(32, &scenario_config()).unwrap();
        controller.step(0.25).unwrap();
        let sink = Vector3::new(10.0, 0.0, 0.0);
        let distances = |particles: &[Particle]| -> Vec<f32> {
            particles
                .iter()
                .map(|p| Vector3::from(p.position).distance(sink))
                .collect()
        };
        let mut last = distances(controller.backend().particles());
        for _ in 0..20 {
            controller.step(0.25).unwrap();
            let now = distances(controller.backend().particles());
            for (now, last) in now.iter().zip(&last) {
                assert!(now <= last);
            }
            last = now;
        }
    }

    #[test]
    fn invalid_counts_are_rejected() {
        let config = FermatConfig::default();
        assert_eq!(
            SimulationController::new_host(0, &config).err(),
            Some(FermatError::InvalidParticleCount(0))
        );
        assert_eq!(
            SimulationController::new_host(-5, &config).err(),
            Some(FermatError::InvalidParticleCount(-5))
        );
    }

    #[test]
    fn invalid_inputs_leave_state_untouched() {
        let mut controller = host(8);
        let parameters = *controller.parameters();
        assert_eq!(
            controller.set_source(f32::NAN, 0.0, 0.0),
            Err(FermatError::NonFiniteParameter { name: "source" })
        );
        assert!(controller.set_sink(0.0, f32::INFINITY, 0.0).is_err());
        assert!(controller.set_lens_radius(f32::NAN).is_err());
        assert!(controller.set_flow_speed(f32::NEG_INFINITY).is_err());
        assert_eq!(controller.parameters(), &parameters);

        assert_eq!(controller.step(-0.1), Err(FermatError::InvalidTimeStep(-0.1)));
        assert!(controller.step(f32::NAN).is_err());
        assert!(controller.step(f32::INFINITY).is_err());
        assert_eq!(controller.steps(), 0);
        assert!(controller.backend().invocations().iter().all(|&n| n == 0));
    }

    #[test]
    fn negative_lens_and_speed_are_accepted() {
        let mut controller = SimulationController::new_host(4, &scenario_config()).unwrap();
        controller.set_lens_radius(-1.0).unwrap();
        controller.set_flow_speed(-2.0).unwrap();
        controller.step(1.0).unwrap();
        // Frozen flow: spawned on the source and never moved.
        assert!(controller
            .backend()
            .particles()
            .iter()
            .all(|p| p.position == [0.0; 3] && p.velocity == [0.0; 3]));
    }

    #[test]
    fn zero_dt_steps_still_count() {
        let mut controller = host(4);
        let before = controller.backend().particles().to_vec();
        controller.step(0.0).unwrap();
        assert_eq!(controller.steps(), 1);
        assert_eq!(controller.backend().particles(), &before[..]);
    }

    #[test]
    fn reset_reseeds_in_place() {
        let mut controller = host(50);
        let seeded = controller.backend().particles().to_vec();
        assert!(seeded.iter().all(|p| p.is_waiting()));
        for _ in 0..10 {
            controller.step(0.5).unwrap();
        }
        assert_ne!(controller.backend().particles(), &seeded[..]);
        controller.reset();
        assert_eq!(controller.backend().particles(), &seeded[..]);
        assert_eq!(controller.particle_count(), 50);
    }

    #[test]
    fn render_refuses_an_unsynchronized_dispatch() {
        let mut controller = host(2);
        controller.dispatched += 1;
        assert_eq!(controller.render(), Err(FermatError::MisorderedCall));
    }
}
