/// Meshpad Terminal - interactive mesh editor in the terminal
///
/// Controls:
///   - 1/2/3: Add cube, sphere, cylinder
///   - Tab: Cycle edit mode, M: cycle gizmo mode
///   - Arrows, PgUp/PgDn: Drag the gizmo or the active vertex
///   - [ / ]: Previous/next vertex, Enter: commit vertex edits
///   - X: Subdivide, P: Export STL, C: Compile the --scad file
///   - WASD: Orbit, O: Toggle projection, Q/ESC: Quit
use clap::Parser;
use meshpad_core::compile::{CompileWorker, OpenScadCli};
use meshpad_core::{Editor, EditorConfig};
use meshpad_terminal::{import_file, TerminalApp};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meshpad-terminal")]
#[command(about = "Create, transform, vertex-edit, subdivide and export meshes", long_about = None)]
#[command(version)]
struct Cli {
    /// STL file to import at startup
    #[arg(name = "STL")]
    stl: Option<PathBuf>,

    /// Editor configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// OpenSCAD source compiled on the C key
    #[arg(long)]
    scad: Option<PathBuf>,

    /// OpenSCAD executable
    #[arg(long, default_value = "openscad")]
    openscad: PathBuf,

    /// Directory exports are written to
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,

    /// Log file (the terminal itself is taken by the editor)
    #[arg(long, default_value = "meshpad.log")]
    log_file: PathBuf,
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file)?;

    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
        None => EditorConfig::default(),
    };
    let policy = config.compile;

    let mut app = TerminalApp::new(Editor::new(config))?.with_export_dir(&cli.export_dir);

    if let Some(path) = &cli.stl {
        println!("Loading STL file: {}", path.display());
        import_file(app.editor_mut(), path)?;
    }

    if let Some(path) = &cli.scad {
        let source = std::fs::read_to_string(path)?;
        let worker = CompileWorker::spawn(OpenScadCli::new(&cli.openscad), policy)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        app = app.with_compiler(worker, source);
    }

    info!("starting terminal editor");
    app.run()?;

    println!("Thank you for using meshpad!");
    Ok(())
}

/// Log to a file, filtered by `RUST_LOG` (default `info`).
fn init_logging(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
