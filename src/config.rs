use serde::{Deserialize, Serialize};

// Parameters that define a simulation run. The flow values are only the
// starting point; the controller's setters overwrite them at runtime.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct FermatConfig {
    pub particle_count: u32,
    pub fps: f64,
    // Upper bound on the frame delta handed to `step`, in seconds.
    pub max_frame_dt: f32,
    pub window_width: u32,
    pub window_height: u32,

    #[serde(default)]
    pub flow: FlowParams,

    #[serde(default)]
    pub render: RenderParams,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct FlowParams {
    pub source: [f32; 3],
    pub sink: [f32; 3],
    pub lens_radius: f32,
    pub flow_speed: f32,
    // Inside the lens the flow rate is divided by this.
    pub lens_index: f32,
    pub arrival_radius: f32,
    // Particles spawn staggered over this many seconds after a reset.
    pub spawn_window: f32,
    pub seed: u64,
}

impl Default for FlowParams {
    fn default() -> Self {
        FlowParams {
            source: [0.5, 0.0, 0.0],
            sink: [-0.5, 0.0, 0.0],
            lens_radius: 0.25,
            flow_speed: 0.8,
            lens_index: 1.5,
            arrival_radius: 0.005,
            spawn_window: 3.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct RenderParams {
    // Half-height of the visible region in world units.
    pub view_extent: f32,
    pub point_color: [f32; 4],
    pub background: [f32; 4],
}

impl Default for RenderParams {
    fn default() -> Self {
        RenderParams {
            view_extent: 1.0,
            point_color: [0.25, 0.55, 1.0, 0.6],
            background: [0.02, 0.02, 0.06, 1.0],
        }
    }
}

impl std::str::FromStr for FermatConfig {
    type Err = toml::de::Error;
    fn from_str(serialized: &str) -> Result<Self, Self::Err> {
        let params = toml::from_str(serialized)?;
        Ok(params)
    }
}

impl Default for FermatConfig {
    fn default() -> Self {
        FermatConfig {
            particle_count: 100_000,
            fps: 60.0,
            max_frame_dt: 0.1,
            window_width: 1280,
            window_height: 720,
            flow: FlowParams::default(),
            render: RenderParams::default(),
        }
    }
}

pub fn get_config_from_default_file() -> FermatConfig {
    let config_data = include_str!("../fermat_config.toml");
    match config_data.parse() {
        Ok(params) => params,
        Err(e) => {
            log::error!(
                "Failed to parse config file({}): {:?}",
                "../fermat_config.toml",
                e
            );
            FermatConfig::default()
        }
    }
}
