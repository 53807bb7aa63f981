use std::{
    env, fs,
    path::{Path, PathBuf},
    process::ExitCode,
    rc::Rc,
};

use banana_runtime::{
    environment::Env,
    host::{FsWorkspace, StdConsole, SOURCE_EXTENSION},
    interpret::Interpreter,
    run,
};
use clap::Parser;
use log::{debug, LevelFilter};

/// Runs a BananaPlus script.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// The script to run, ending in `.bp`
    file: PathBuf,
    /// Where `import "name"` finds libraries [default: <script dir>/lib]
    #[arg(long)]
    lib_dir: Option<PathBuf>,
    /// Print the value the script evaluates to
    #[arg(long)]
    print_result: bool,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(args.verbose);

    if args.file.extension().map_or(true, |ext| ext != SOURCE_EXTENSION) {
        eprintln!(
            "Expected a .{SOURCE_EXTENSION} file, got {}",
            args.file.display()
        );
        return ExitCode::FAILURE;
    }
    let source = match fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read {}: {e}", args.file.display());
            return ExitCode::FAILURE;
        }
    };

    let root = match args.file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let lib_dir = args.lib_dir.unwrap_or_else(|| root.join("lib"));
    debug!("Workspace {}, libraries in {}", root.display(), lib_dir.display());

    let mut interpreter = Interpreter::new(
        Box::new(StdConsole),
        Rc::new(FsWorkspace::new(root, lib_dir)),
    );
    match run(&script_name(&args.file), &source, &mut interpreter, &Env::new()) {
        Ok(value) => {
            if args.print_result {
                println!("{value}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", e.traceback());
            ExitCode::FAILURE
        }
    }
}

fn init_logger(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn script_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}
