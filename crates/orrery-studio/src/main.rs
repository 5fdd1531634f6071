use anyhow::Context;

use orrery_engine::logging::{init_logging, LoggingConfig};
use orrery_sim::Application;

fn main() {
    init_logging(LoggingConfig::default());

    // Startup banner, printed before the window opens.
    println!();
    println!("  ╔════════════════════════════════════════╗");
    println!("  ║          ORRERY SOLAR SYSTEM           ║");
    println!("  ║   wgpu renderer  ·  textured spheres   ║");
    println!("  ╠════════════════════════════════════════╣");
    println!("  ║  W/A/S/D    move camera                ║");
    println!("  ║  mouse      look around, wheel zooms   ║");
    println!("  ║  Up/Down    sun rotation speed         ║");
    println!("  ║  Left/Right moon orbit speed           ║");
    println!("  ║  Esc        quit                       ║");
    println!("  ╚════════════════════════════════════════╝");
    println!();

    if let Err(e) = run() {
        log::error!("orrery runtime error: {e:#}");
        eprintln!("orrery runtime error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    Application::new()
        .title("Solar System")
        .size(1200.0, 900.0)
        .texture_dir("textures")
        .run()
        .context("solar system stopped")
}
