use std::borrow::Cow;

include!(concat!(env!("OUT_DIR"), "/shader_constants.rs"));

// Include a shader rendered by build.rs by specifying a path relative to the
// shader source directory.
#[macro_export]
macro_rules! include_shader {
    ($path:literal) => {
        include_str!(concat!(env!("OUT_DIR"), "/shaders/", $path))
    };
}

pub fn create_wgsl_module(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
) -> wgpu::ShaderModule {
    log::info!("Loading shader module: {}", label);
    device.create_shader_module(&wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
    })
}

// Number of work groups needed to give every one of `num_items` its own
// invocation. The final group is partial when the count does not divide evenly.
pub fn work_groups_for(num_items: u32) -> u32 {
    (num_items as f64 / WORK_GROUP_SIZE as f64).ceil() as u32
}
