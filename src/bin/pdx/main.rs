//! pdx CLI - Tool for inspecting and converting Clausewitz .mesh/.anim files.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use pdx_mesh::binary::IArchive;
use pdx_mesh::text::{render_tree, to_json_string, tree_to_json};
use pdx_mesh::{AssetFile, ReadOptions};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Extensions picked up when converting a directory.
const ASSET_EXTENSIONS: &[&str] = &["mesh", "anim"];

#[derive(Clone, Copy, Debug, PartialEq)]
enum OutFormat {
    Txt,
    Json,
}

impl OutFormat {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "txt" => Some(OutFormat::Txt),
            "json" => Some(OutFormat::Json),
            _ => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            OutFormat::Txt => "txt",
            OutFormat::Json => "json",
        }
    }
}

fn init_logging(level: &str) {
    // RUST_LOG wins over the command-line verbosity.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut strict = false;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            "--strict" => strict = true,
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);
    let options = ReadOptions { strict, ..ReadOptions::default() };

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "info" | "i" => require_arg(&filtered_args, "info <file>").and_then(|f| cmd_info(f, options)),
        "tree" | "t" => require_arg(&filtered_args, "tree <file>").and_then(|f| cmd_tree(f, options)),
        "json" | "j" => {
            let model = filtered_args.iter().any(|&s| s == "--model" || s == "-m");
            require_arg(&filtered_args, "json <file> [--model]").and_then(|f| cmd_json(f, model, options))
        }
        "convert" | "c" => parse_convert(&filtered_args[1..]).and_then(|c| cmd_convert(&c, options)),
        "copy" | "cp" => {
            if filtered_args.len() < 3 {
                Err("usage: pdx-cli copy <in> <out>".to_string())
            } else {
                cmd_copy(filtered_args[1], filtered_args[2], options)
            }
        }
        "version" | "--version" | "-V" => {
            println!(
                "pdx-cli {} (built {} {})",
                env!("CARGO_PKG_VERSION"),
                env!("PDX_BUILD_DATE"),
                env!("PDX_BUILD_TIME")
            );
            Ok(())
        }
        "help" | "h" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        // A bare file path is the same as `info`.
        path if Path::new(path).is_file() => cmd_info(path, options),
        other => Err(format!("unknown command: {}", other)),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn print_help() {
    println!("pdx-cli - Clausewitz .mesh/.anim toolkit");
    println!();
    println!("USAGE:");
    println!("    pdx-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info    <file>                   Show a summary of the decoded asset");
    println!("    t, tree    <file>                   Dump the raw object/property tree");
    println!("    j, json    <file> [--model]         Print the tree (or object model) as JSON");
    println!("    c, convert <path> [-o out] [-f fmt] Write txt/json dumps, recursing into directories");
    println!("    cp, copy   <in> <out>               Decode to the object model and re-encode");
    println!("    version                             Show version and build date");
    println!("    h, help                             Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Only show errors");
    println!("    --strict         Fail on the first schema problem");
    println!();
    println!("EXAMPLES:");
    println!("    pdx-cli info unit.mesh");
    println!("    pdx-cli convert gfx/models -o dumps -f json");
    println!("    pdx-cli copy unit.mesh unit_copy.mesh   # Test round-trip");
    println!();
    println!("NOTES:");
    println!("    - Passing a file directly is equivalent to 'info'");
    println!("    - RUST_LOG overrides the verbosity flags");
}

fn require_arg<'a>(args: &[&'a str], usage: &str) -> Result<&'a str, String> {
    args.get(1)
        .copied()
        .filter(|a| !a.starts_with('-'))
        .ok_or_else(|| format!("missing file argument\nUsage: pdx-cli {}", usage))
}

fn open(path: &str, options: ReadOptions) -> Result<IArchive, String> {
    IArchive::open_opts(path, options).map_err(|e| format!("failed to open {}: {}", path, e))
}

fn load(archive: &IArchive) -> Result<AssetFile, String> {
    let decoded = AssetFile::from_archive(archive).map_err(|e| e.to_string())?;
    if !decoded.warnings.is_empty() {
        warn!(path = %archive.path().display(), count = decoded.warnings.len(), "schema warnings");
    }
    Ok(decoded.value)
}

fn cmd_info(path: &str, options: ReadOptions) -> Result<(), String> {
    info!("Opening archive: {}", path);
    let archive = open(path, options)?;
    debug!(bytes = archive.size(), nodes = archive.tree().len(), "archive decoded");

    println!("File: {} ({} bytes)", path, archive.size());
    match load(&archive)? {
        AssetFile::Mesh(asset) => {
            print!("{}", asset);
            println!();
            println!(
                "Totals: {} meshes, {} vertices, {} faces, {} locators",
                asset.meshes.len(),
                asset.vertex_count(),
                asset.face_count(),
                asset.locators.len()
            );
        }
        AssetFile::Animation(track) => {
            print!("{}", track);
            println!();
            println!("Duration: {:.2}s", track.duration());
        }
    }
    Ok(())
}

fn cmd_tree(path: &str, options: ReadOptions) -> Result<(), String> {
    let archive = open(path, options)?;
    print!("{}", render_tree(archive.tree()));
    Ok(())
}

fn cmd_json(path: &str, model: bool, options: ReadOptions) -> Result<(), String> {
    let archive = open(path, options)?;
    let json = if model {
        to_json_string(&load(&archive)?, true)
    } else {
        to_json_string(&tree_to_json(archive.tree()), true)
    };
    println!("{}", json.map_err(|e| e.to_string())?);
    Ok(())
}

fn cmd_copy(input: &str, output: &str, options: ReadOptions) -> Result<(), String> {
    info!("Copying {} -> {}", input, output);
    let archive = open(input, options)?;
    let asset = load(&archive)?;
    let bytes = asset.write(output).map_err(|e| e.to_string())?;
    println!("Wrote {} {} ({} bytes)", asset.kind(), output, bytes);
    Ok(())
}

struct ConvertArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    format: OutFormat,
}

fn parse_convert(args: &[&str]) -> Result<ConvertArgs, String> {
    let usage = "usage: pdx-cli convert <path> [-o out] [-f txt|json]";
    let mut input = None;
    let mut output = None;
    let mut format = OutFormat::Txt;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match *arg {
            "-o" | "--out" => output = Some(PathBuf::from(iter.next().ok_or(usage)?)),
            "-f" | "--format" => {
                let value = iter.next().ok_or(usage)?;
                format = OutFormat::parse(value).ok_or_else(|| format!("unknown format: {}", value))?;
            }
            path => input = Some(PathBuf::from(path)),
        }
    }
    let input = input.ok_or(usage)?;
    Ok(ConvertArgs { input, output, format })
}

/// Pair every input file with its output path.
fn convert_jobs(args: &ConvertArgs) -> Result<Vec<(PathBuf, PathBuf)>, String> {
    let ext = args.format.extension();
    if args.input.is_file() {
        let out = args.output.clone().unwrap_or_else(|| args.input.clone());
        return Ok(vec![(args.input.clone(), out.with_extension(ext))]);
    }
    if !args.input.is_dir() {
        return Err(format!("no such file or directory: {}", args.input.display()));
    }

    let out_root = args.output.clone().unwrap_or_else(|| args.input.clone());
    let mut jobs: Vec<(PathBuf, PathBuf)> = WalkDir::new(&args.input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|x| x.to_str())
                .is_some_and(|x| ASSET_EXTENSIONS.contains(&x))
        })
        .filter_map(|e| {
            let relative = e.path().strip_prefix(&args.input).ok()?.to_path_buf();
            Some((e.path().to_path_buf(), out_root.join(relative).with_extension(ext)))
        })
        .collect();
    jobs.sort();
    Ok(jobs)
}

fn convert_one(input: &Path, output: &Path, format: OutFormat, options: ReadOptions) -> Result<(), String> {
    let archive = IArchive::open_opts(input, options).map_err(|e| e.to_string())?;
    let text = match format {
        OutFormat::Txt => render_tree(archive.tree()),
        OutFormat::Json => to_json_string(&tree_to_json(archive.tree()), true).map_err(|e| e.to_string())?,
    };
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    fs::write(output, text).map_err(|e| e.to_string())
}

fn cmd_convert(args: &ConvertArgs, options: ReadOptions) -> Result<(), String> {
    let jobs = convert_jobs(args)?;
    info!("Converting {} files", jobs.len());

    let failures: Vec<String> = jobs
        .par_iter()
        .filter_map(|(input, output)| {
            debug!("{} --> {}", input.display(), output.display());
            convert_one(input, output, args.format, options)
                .err()
                .map(|e| format!("{}: {}", input.display(), e))
        })
        .collect();

    for failure in &failures {
        eprintln!("  {}", failure);
    }
    println!("Converted {}/{} files", jobs.len() - failures.len(), jobs.len());
    if failures.is_empty() {
        Ok(())
    } else {
        Err(format!("{} files failed", failures.len()))
    }
}
