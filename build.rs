use std::{env, error::Error, fs};

// Number of invocations per compute work group. Injected into the WGSL
// templates and into `shader_constants.rs` so both sides agree.
const WORK_GROUP_SIZE: u32 = 256;

// All shaders reside in the 'src/shaders' directory
fn generate_shaders(output_path: &str) -> std::result::Result<(), Box<dyn Error>> {
    let tera = tera::Tera::new("src/shaders/*")?;
    println!("cargo:rerun-if-changed=src/shaders/");
    let mut context = tera::Context::new();
    context.insert("work_group_size", &WORK_GROUP_SIZE);
    fs::create_dir_all(format!("{}/shaders/", output_path))?;
    for file in fs::read_dir("src/shaders")? {
        let file = file?;
        let path = file.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("wgsl") {
            continue;
        }
        let file = file.file_name();
        let file_name = file.to_str().ok_or("shader file name is not utf-8")?;
        let result = tera.render(file_name, &context)?;
        fs::write(format!("{}/shaders/{}", output_path, file_name), result)?;
        println!("cargo:rerun-if-changed=src/shaders/{}", file_name);
    }
    Ok(())
}

fn generate_constants(output_path: &str) -> std::result::Result<(), Box<dyn Error>> {
    let constants = format!(
        "/// Invocations per compute work group, shared with the WGSL kernels.\n\
         pub const WORK_GROUP_SIZE: u32 = {};\n",
        WORK_GROUP_SIZE
    );
    fs::write(format!("{}/shader_constants.rs", output_path), constants)?;
    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    let result = env::var("OUT_DIR")
        .map_err(|e| -> Box<dyn Error> { Box::new(e) })
        .and_then(|output_path| {
            generate_shaders(&output_path)?;
            generate_constants(&output_path)
        });
    if let Err(err) = result {
        // panic here for a nicer error message, otherwise it will
        // be flattened to one line for some reason
        panic!("Unable to generate shaders\n{}", err);
    }
}
