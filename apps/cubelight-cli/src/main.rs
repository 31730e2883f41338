use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use cubelight_input::{Action, ControlState};
use cubelight_render::{
    NagaBackend, ProgramKind, SceneDescriptor, SceneKind, SceneState, build_program_from_files,
    frame_duration,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cubelight-cli", about = "CLI tool for cubelight scenes and shaders")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Compile and link every shader program a scene uses, without a GPU
    CheckShaders {
        /// Built-in scene to check; both when omitted
        #[arg(long)]
        scene: Option<SceneKind>,
        /// Scene descriptor YAML to check instead
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the scene's shader directory
        #[arg(long)]
        shader_dir: Option<PathBuf>,
    },
    /// Print a built-in scene as YAML, as a starting point for --config
    DumpScene {
        #[arg(long, default_value = "lit")]
        scene: SceneKind,
    },
    /// Run the camera headless with a fixed set of held actions
    Simulate {
        #[arg(long, default_value = "lit")]
        scene: SceneKind,
        /// Simulated seconds
        #[arg(long, default_value = "1.0")]
        seconds: f32,
        /// Fixed frame rate
        #[arg(long, default_value = "60")]
        fps: u32,
        /// Actions held for the whole run, comma separated (e.g. move-forward,look-left)
        #[arg(long, value_delimiter = ',')]
        hold: Vec<Action>,
    },
}

fn scenes_to_check(
    scene: Option<SceneKind>,
    config: Option<&Path>,
) -> anyhow::Result<Vec<SceneDescriptor>> {
    if let Some(path) = config {
        let scene = SceneDescriptor::load(path)
            .with_context(|| format!("load scene {}", path.display()))?;
        return Ok(vec![scene]);
    }
    Ok(match scene {
        Some(kind) => vec![SceneDescriptor::builtin(kind)],
        None => vec![SceneDescriptor::lit(), SceneDescriptor::skybox()],
    })
}

/// Build every program of `scene`; returns how many failed.
fn check_scene(scene: &SceneDescriptor) -> usize {
    let mut failures = 0;
    for program in scene.programs() {
        let (vs, fs) = scene.shader_paths(program);
        let result = build_program_from_files(&mut NagaBackend, program.label(), &vs, &fs)
            .map_err(anyhow::Error::from)
            .and_then(|built| {
                built
                    .check_vertex_layouts(&program.vertex_layouts())
                    .map_err(|problems| anyhow::anyhow!("vertex inputs:\n{problems}"))
            });
        match result {
            Ok(()) => println!("  ok    {:<8} {}", program.label(), vs.display()),
            Err(e) => {
                failures += 1;
                println!("  FAIL  {:<8} {e:#}", program.label());
            }
        }
    }
    failures
}

/// Held actions grouped into look and move, or "idle".
fn describe_controls(controls: &ControlState) -> String {
    if controls.is_idle() {
        return "idle".to_string();
    }
    let (look, movement): (Vec<Action>, Vec<Action>) = controls.actions().partition(|a| a.is_look());
    let join = |actions: &[Action]| {
        if actions.is_empty() {
            "-".to_string()
        } else {
            actions.iter().map(|a| a.name()).collect::<Vec<_>>().join(",")
        }
    };
    format!("look={} move={}", join(&look), join(&movement))
}

fn simulate(kind: SceneKind, seconds: f32, fps: u32, hold: &[Action]) -> SceneState {
    let scene = SceneDescriptor::builtin(kind);
    let mut state = SceneState::new(&scene, 640, 480);
    let dt = frame_duration(fps).as_secs_f32();
    let frames = (seconds.max(0.0) * fps.max(1) as f32).round() as u32;
    let controls = ControlState::from_actions(hold.iter().copied());
    tracing::debug!(
        "simulating {frames} frames at dt={dt:.4} holding {}",
        describe_controls(&controls)
    );
    state.simulate(&controls, dt, frames);
    state
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("cubelight-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", cubelight_common::crate_info());
            println!("input: {}", cubelight_input::crate_info());
            println!("render: {}", cubelight_render::crate_info());
            println!("render-wgpu: {}", cubelight_render_wgpu::crate_info());
            let programs: Vec<_> = ProgramKind::ALL
                .iter()
                .map(|p| format!("{} ({}, {})", p.label(), p.vertex_file(), p.fragment_file()))
                .collect();
            println!("programs: {}", programs.join("; "));
        }
        Commands::CheckShaders {
            scene,
            config,
            shader_dir,
        } => {
            let mut failures = 0;
            for mut scene in scenes_to_check(scene, config.as_deref())? {
                if let Some(dir) = &shader_dir {
                    scene.shader_dir = dir.clone();
                }
                println!("scene '{}' ({}):", scene.name, scene.shader_dir.display());
                failures += check_scene(&scene);
            }
            if failures > 0 {
                bail!("{failures} shader program(s) failed to build");
            }
            println!("all shader programs build");
        }
        Commands::DumpScene { scene } => {
            print!("{}", SceneDescriptor::builtin(scene).to_yaml()?);
        }
        Commands::Simulate {
            scene,
            seconds,
            fps,
            hold,
        } => {
            println!(
                "held: {}",
                describe_controls(&ControlState::from_actions(hold.iter().copied()))
            );
            let state = simulate(scene, seconds, fps, &hold);
            let cam = &state.camera;
            let dir = cam.forward();
            println!(
                "eye=({:.3}, {:.3}, {:.3}) yaw={:.2} pitch={:.2} look=({:.3}, {:.3}, {:.3})",
                cam.position.x, cam.position.y, cam.position.z, cam.yaw, cam.pitch, dir.x, dir.y, dir.z
            );
            if let Some(spot) = state.lights.map(|l| l.spot) {
                println!(
                    "spot: position=({:.3}, {:.3}, {:.3})",
                    spot.position.x, spot.position.y, spot.position.z
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_list_parses() {
        let cli = Cli::parse_from([
            "cubelight-cli",
            "simulate",
            "--hold",
            "move-forward,look-up",
        ]);
        match cli.command {
            Commands::Simulate { hold, .. } => {
                assert_eq!(hold, vec![Action::MoveForward, Action::LookUp]);
            }
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn held_actions_are_grouped() {
        assert_eq!(describe_controls(&ControlState::default()), "idle");
        let controls = ControlState::from_actions([Action::MoveForward, Action::LookLeft]);
        assert_eq!(describe_controls(&controls), "look=look-left move=move-forward");
        let controls = ControlState::from_actions([Action::StrafeRight]);
        assert_eq!(describe_controls(&controls), "look=- move=strafe-right");
    }

    #[test]
    fn simulate_forward_one_second() {
        let state = simulate(SceneKind::Lit, 1.0, 60, &[Action::MoveForward]);
        assert!((state.camera.position.z + 10.0).abs() < 1e-3);
        assert!(state.camera.position.x.abs() < 1e-3);
    }

    #[test]
    fn simulate_look_up_clamps() {
        let state = simulate(SceneKind::Skybox, 10.0, 30, &[Action::LookUp]);
        assert_eq!(state.camera.pitch, cubelight_render::PITCH_LIMIT);
    }

    #[test]
    fn default_check_covers_both_scenes() {
        let scenes = scenes_to_check(None, None).unwrap();
        let names: Vec<_> = scenes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["lit", "skybox"]);
    }

    #[test]
    fn shipped_shaders_pass_check() {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/shaders");
        for mut scene in scenes_to_check(None, None).unwrap() {
            scene.shader_dir = dir.clone();
            assert_eq!(check_scene(&scene), 0);
        }
    }
}
