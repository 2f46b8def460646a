//! Rig export utility
//!
//! Converts a glTF/GLB asset (or an existing export) into the chunked
//! binary rig format the viewer can load without the importer.
//!
//! Usage:
//!     export_rig [OPTIONS] <INPUT> <OUTPUT_DIR>
//!
//! Options:
//!     --clip <N>              Export only animation clip N (default: every clip)
//!     --no-animation          Export the hierarchy and meshes only
//!     --policy <POLICY>       Duplicate track policy: last_wins or reject (default: last_wins)
//!     -h, --help              Show this help message

use std::env;
use std::path::PathBuf;
use std::time::Instant;

use skinrig::animation::DuplicateTrackPolicy;
use skinrig::core::logging;
use skinrig::export::{export_scene, ExportedRig};
use skinrig::import;

fn print_help() {
    eprintln!("export_rig - Rig export utility");
    eprintln!();
    eprintln!("Usage: export_rig [OPTIONS] <INPUT> <OUTPUT_DIR>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("    --clip <N>              Export only animation clip N (default: every clip)");
    eprintln!("    --no-animation          Export the hierarchy and meshes only");
    eprintln!("    --policy <POLICY>       Duplicate track policy: last_wins or reject (default: last_wins)");
    eprintln!("    -h, --help              Show this help message");
    eprintln!();
    eprintln!("Example:");
    eprintln!("    export_rig assets/model.glb ./export/model");
    eprintln!("    export_rig --clip 2 --policy reject assets/walk.gltf ./export/walk");
}

#[derive(Clone, Copy, Debug)]
enum ClipSelection {
    All,
    One(usize),
    None,
}

impl ClipSelection {
    fn indices(self, available: usize) -> Vec<usize> {
        match self {
            ClipSelection::All => (0..available).collect(),
            ClipSelection::One(clip) => vec![clip],
            ClipSelection::None => Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Args {
    input: PathBuf,
    output_dir: PathBuf,
    clips: ClipSelection,
    policy: DuplicateTrackPolicy,
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() {
        return Err("Missing input asset".to_string());
    }

    let mut clips = ClipSelection::All;
    let mut policy = DuplicateTrackPolicy::default();
    let mut positional: Vec<PathBuf> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--clip" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --clip".to_string());
                }
                clips = ClipSelection::One(args[i].parse().map_err(|_| format!("Invalid clip: {}", args[i]))?);
            }
            "--no-animation" => {
                clips = ClipSelection::None;
            }
            "--policy" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing value for --policy".to_string());
                }
                policy = match args[i].to_lowercase().as_str() {
                    "last_wins" => DuplicateTrackPolicy::LastWins,
                    "reject" => DuplicateTrackPolicy::Reject,
                    other => return Err(format!("Unknown policy: {}. Valid policies: last_wins, reject", other)),
                };
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            path => {
                if positional.len() == 2 {
                    return Err(format!("Unexpected argument: {}", path));
                }
                positional.push(PathBuf::from(path));
            }
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    let input = positional.next().ok_or("Missing input asset")?;
    let output_dir = positional.next().ok_or("Missing output directory")?;

    Ok(Args {
        input,
        output_dir,
        clips,
        policy,
    })
}

fn main() {
    logging::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    };

    println!("Rig Export Utility");
    println!("==================");
    println!("Input: {}", args.input.display());
    println!("Output directory: {}", args.output_dir.display());
    match args.clips {
        ClipSelection::All => println!("Clips: all"),
        ClipSelection::One(clip) => println!("Clips: {}", clip),
        ClipSelection::None => println!("Clips: none"),
    }
    println!();

    let start = Instant::now();

    let scene = match import::load_asset(&args.input) {
        Ok(scene) => scene,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let clips = args.clips.indices(scene.animations.len());
    let summary = match export_scene(&scene, &clips, args.policy, &args.output_dir) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: failed to export: {}", e);
            std::process::exit(1);
        }
    };

    // Read the files back so a broken export is caught here, not in the viewer
    if let Err(e) = ExportedRig::load(&args.output_dir) {
        eprintln!("Error: export does not load back: {}", e);
        std::process::exit(1);
    }

    println!(
        "Exported {} nodes, {} clips, {} tracks ({} keys), {} meshes in {:.2}s",
        summary.nodes,
        summary.clips,
        summary.tracks,
        summary.keys,
        summary.meshes,
        start.elapsed().as_secs_f64()
    );
}
