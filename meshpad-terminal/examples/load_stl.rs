/// Example: Load an STL file, subdivide it and open it in the terminal editor
///
/// Usage: cargo run --example load_stl -- path/to/file.stl
use std::env;
use std::io;
use std::path::Path;

use meshpad_core::{Editor, EditorConfig, ShapeKind};
use meshpad_terminal::{import_file, TerminalApp};

fn main() -> io::Result<()> {
    let args: Vec<String> = env::args().collect();
    let mut app = TerminalApp::new(Editor::new(EditorConfig::default()))?;

    match args.get(1) {
        Some(stl_path) => {
            println!("Loading STL file: {}", stl_path);
            import_file(app.editor_mut(), Path::new(stl_path))?;
        }
        None => {
            eprintln!("Usage: {} <stl-file>", args[0]);
            eprintln!("\nNo STL file provided, using default cube...");
            app.editor_mut()
                .add_shape(ShapeKind::Cube)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        }
    }

    let editor = app.editor_mut();
    editor
        .subdivide_selected()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    if let Some(mesh) = editor.selected_mesh() {
        println!("Subdivided to {} triangles", mesh.geometry.triangle_count());
    }

    println!("Starting terminal editor (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    app.run()?;

    println!("Thank you for using meshpad!");
    Ok(())
}
