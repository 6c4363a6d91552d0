/// Terminal front-end for the meshpad editor
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use meshpad_core::compile::CompileWorker;
use meshpad_core::{
    EditMode, Editor, EditorError, ModeActivation, ProjectionMode, RotationState, ShapeKind,
};
use nalgebra::{Point3, Vector3};
use std::io::{self, stdout, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, trace, warn};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Terminal cells are roughly twice as tall as they are wide
const CELL_ASPECT: f32 = 2.0;

/// Rows reserved for the status lines
const STATUS_ROWS: u16 = 2;

const ORBIT_STEP: f32 = 0.1;

/// Gizmo and vertex drag distance per key press
const NUDGE_STEP: f32 = 0.1;

/// Main application struct for the terminal editor
pub struct TerminalApp {
    editor: Editor,
    renderer: AsciiRenderer,
    orbit: RotationState,
    /// Vertex the arrow keys move in vertex mode
    active_vertex: usize,
    compiler: Option<CompileWorker>,
    scad_source: Option<String>,
    export_dir: PathBuf,
    status: String,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    /// Size the app to the current terminal.
    pub fn new(editor: Editor) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(Self::with_size(editor, width, height))
    }

    pub fn with_size(mut editor: Editor, width: u16, height: u16) -> Self {
        let (render_width, render_height) = render_size(width, height);
        editor.mount(viewport_aspect(render_width, render_height));

        Self {
            editor,
            renderer: AsciiRenderer::new(render_width, render_height),
            orbit: RotationState::new(0.3, 0.3, 0.0),
            active_vertex: 0,
            compiler: None,
            scad_source: None,
            export_dir: PathBuf::from("."),
            status: "press h for help".to_string(),
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        }
    }

    /// Enable the compile key: `source` is sent to `worker` on demand.
    pub fn with_compiler(mut self, worker: CompileWorker, source: String) -> Self {
        self.compiler = Some(worker);
        self.scad_source = Some(source);
        self
    }

    /// Directory exported files are written to.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut Editor {
        &mut self.editor
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;
        self.editor.unmount();

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }

            // Update
            self.update();

            // Render
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            }) => self.handle_key(code),
            Event::Resize(width, height) => {
                let (render_width, render_height) = render_size(width, height);
                self.renderer.resize(render_width, render_height);
                // Always mounted while the app is alive.
                let _ = self
                    .editor
                    .resize(viewport_aspect(render_width, render_height));
            }
            _ => {}
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        let result = match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
                Ok(())
            }
            KeyCode::Char('h') => {
                self.status = HELP.to_string();
                Ok(())
            }
            KeyCode::Char('1') => self.add_shape(ShapeKind::Cube),
            KeyCode::Char('2') => self.add_shape(ShapeKind::Sphere),
            KeyCode::Char('3') => self.add_shape(ShapeKind::Cylinder),
            KeyCode::Tab => {
                self.cycle_edit_mode();
                Ok(())
            }
            KeyCode::Char('m') => {
                let mode = self.editor.transform_mode().next();
                self.editor.set_transform_mode(mode);
                self.status = format!("transform mode: {mode}");
                Ok(())
            }
            KeyCode::Char('n') => self.select_next(),
            KeyCode::Left => self.nudge(Vector3::new(-1.0, 0.0, 0.0)),
            KeyCode::Right => self.nudge(Vector3::new(1.0, 0.0, 0.0)),
            KeyCode::Up => self.nudge(Vector3::new(0.0, 1.0, 0.0)),
            KeyCode::Down => self.nudge(Vector3::new(0.0, -1.0, 0.0)),
            KeyCode::PageUp => self.nudge(Vector3::new(0.0, 0.0, 1.0)),
            KeyCode::PageDown => self.nudge(Vector3::new(0.0, 0.0, -1.0)),
            KeyCode::Char('[') => {
                self.step_vertex(-1);
                Ok(())
            }
            KeyCode::Char(']') => {
                self.step_vertex(1);
                Ok(())
            }
            KeyCode::Enter => self.commit_vertices(),
            KeyCode::Char('x') => self.subdivide(),
            KeyCode::Char('p') => self.export(),
            KeyCode::Char('c') => self.compile(),
            KeyCode::Char('w') => {
                self.orbit.rotate(ORBIT_STEP, 0.0, 0.0);
                Ok(())
            }
            KeyCode::Char('s') => {
                self.orbit.rotate(-ORBIT_STEP, 0.0, 0.0);
                Ok(())
            }
            KeyCode::Char('a') => {
                self.orbit.rotate(0.0, -ORBIT_STEP, 0.0);
                Ok(())
            }
            KeyCode::Char('d') => {
                self.orbit.rotate(0.0, ORBIT_STEP, 0.0);
                Ok(())
            }
            KeyCode::Char('o') => {
                if let Some(camera) = self.editor.camera_mut() {
                    camera.mode = camera.mode.toggled();
                    self.status = match camera.mode {
                        ProjectionMode::Perspective => "perspective view".to_string(),
                        ProjectionMode::Orthographic => "orthographic view".to_string(),
                    };
                }
                Ok(())
            }
            _ => Ok(()),
        };

        if let Err(err) = result {
            warn!(%err, "editor operation failed");
            self.status = format!("error: {err}");
        }
    }

    fn add_shape(&mut self, kind: ShapeKind) -> Result<(), EditorError> {
        let id = self.editor.add_shape(kind)?;
        self.status = format!("added {kind} {id}");
        Ok(())
    }

    fn cycle_edit_mode(&mut self) {
        let mode = self.editor.edit_mode().next();
        self.active_vertex = 0;
        self.status = match self.editor.set_edit_mode(mode) {
            ModeActivation::Gizmo(Some(id)) => format!("transform mode, gizmo on {id}"),
            ModeActivation::Gizmo(None) => "transform mode, nothing selected".to_string(),
            ModeActivation::VertexSession { mesh, vertex_count } => {
                format!("vertex mode, {vertex_count} vertices of {mesh}")
            }
            ModeActivation::Idle => "vertex mode, nothing selected".to_string(),
            ModeActivation::NotYetSupported(mode) => format!("{mode} mode is not supported yet"),
        };
    }

    fn select_next(&mut self) -> Result<(), EditorError> {
        let ids = self.editor.scene().map(|s| s.ids()).unwrap_or_default();
        let Some(first) = ids.first().copied() else {
            return Err(EditorError::NothingSelected);
        };
        let next = self
            .editor
            .selection()
            .and_then(|current| ids.iter().position(|id| *id == current))
            .and_then(|i| ids.get(i + 1).copied())
            .unwrap_or(first);
        self.editor.select(next)?;
        self.active_vertex = 0;
        self.status = format!("selected {next}");
        Ok(())
    }

    /// Arrow keys: drag the gizmo or move the active vertex.
    fn nudge(&mut self, direction: Vector3<f32>) -> Result<(), EditorError> {
        match self.editor.edit_mode() {
            EditMode::Vertex => {
                let session = self
                    .editor
                    .vertex_session()
                    .ok_or(EditorError::NoVertexSession)?;
                let current = session
                    .vertex(self.active_vertex)
                    .map(|v| v.position)
                    .ok_or(EditorError::VertexOutOfRange {
                        index: self.active_vertex,
                        count: session.vertices().len(),
                    })?;
                let moved: Point3<f32> = current + direction * NUDGE_STEP;
                self.editor.move_vertex(self.active_vertex, moved)?;
                self.status = format!(
                    "vertex {} at ({:.2}, {:.2}, {:.2}), enter to commit",
                    self.active_vertex, moved.x, moved.y, moved.z
                );
                Ok(())
            }
            _ => self.editor.apply_gizmo_delta(direction * NUDGE_STEP),
        }
    }

    fn step_vertex(&mut self, delta: isize) {
        let Some(count) = self.editor.vertex_session().map(|s| s.vertices().len()) else {
            return;
        };
        if count == 0 {
            return;
        }
        self.active_vertex = (self.active_vertex as isize + delta).rem_euclid(count as isize) as usize;
        self.status = format!("vertex {} of {count}", self.active_vertex);
    }

    fn commit_vertices(&mut self) -> Result<(), EditorError> {
        let id = self.editor.commit_vertex_edits()?;
        self.status = format!("committed vertex edits to {id}");
        Ok(())
    }

    fn subdivide(&mut self) -> Result<(), EditorError> {
        let id = self.editor.subdivide_selected()?;
        self.active_vertex = 0;
        let triangles = self
            .editor
            .selected_mesh()
            .map(|m| m.geometry.triangle_count())
            .unwrap_or_default();
        self.status = format!("subdivided into {id} ({triangles} triangles)");
        Ok(())
    }

    fn export(&mut self) -> Result<(), EditorError> {
        let file = self.editor.export_stl()?;
        let path = self.export_dir.join(&file.file_name);
        match std::fs::write(&path, &file.bytes) {
            Ok(()) => {
                info!(path = %path.display(), bytes = file.bytes.len(), "wrote export");
                self.status = format!("exported {}", path.display());
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "export write failed");
                self.status = format!("error: could not write {}: {err}", path.display());
            }
        }
        Ok(())
    }

    fn compile(&mut self) -> Result<(), EditorError> {
        let (Some(worker), Some(source)) = (self.compiler.as_mut(), self.scad_source.as_ref()) else {
            self.status = "no --scad file given".to_string();
            return Ok(());
        };
        let id = worker.submit(source.clone())?;
        self.status = format!("compiling request {id}...");
        Ok(())
    }

    /// Collect finished compiles and drain the change queue.
    pub fn update(&mut self) {
        while let Some((id, result)) = self.compiler.as_mut().and_then(CompileWorker::poll) {
            match self.editor.insert_compiled(result) {
                Ok(mesh) => self.status = format!("compile {id} added {mesh}"),
                Err(err) => {
                    warn!(%id, %err, "compile failed");
                    self.status = format!("error: {err}");
                }
            }
        }

        // The whole scene is redrawn every frame, so changes are only traced.
        for change in self.editor.take_changes() {
            trace!(?change, "scene change");
        }
    }

    fn render(&mut self) -> io::Result<()> {
        let view = self.orbit.matrix();

        // Clear renderer
        self.renderer.clear();

        if let (Some(scene), Some(camera)) = (self.editor.scene(), self.editor.camera()) {
            self.renderer
                .render_scene(scene, &view, camera, self.editor.selection());

            if let (Some(session), Some(mesh)) =
                (self.editor.vertex_session(), self.editor.selected_mesh())
            {
                let model = view * mesh.transform.matrix();
                self.renderer.render_markers(
                    session.markers(),
                    &model,
                    camera,
                    Some(self.active_vertex),
                );
            }
        }

        // Output to terminal
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;

        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        queue!(
            stdout,
            cursor::MoveTo(0, self.renderer.height() as u16),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(self.mode_line()),
            cursor::MoveTo(0, self.renderer.height() as u16 + 1),
            terminal::Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Grey),
            Print(&self.status),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }

    /// First status row: modes, selection and frame rate.
    pub fn mode_line(&self) -> String {
        let selection = match self.editor.selected_mesh() {
            Some(mesh) => format!(
                "{} {} ({} tris)",
                mesh.name,
                mesh.id,
                mesh.geometry.triangle_count()
            ),
            None => "none".to_string(),
        };
        let mut line = format!("meshpad | mode: {}", self.editor.edit_mode());
        if self.editor.edit_mode() == EditMode::Transform {
            line.push_str(&format!(" ({})", self.editor.transform_mode()));
        }
        line.push_str(&format!(" | selected: {selection} | FPS: {:.1}", self.fps));
        line
    }
}

const HELP: &str = "1/2/3 add shape  tab edit mode  m gizmo mode  arrows/pgup/pgdn drag  [ ] vertex  enter commit  n next  x subdivide  p export  c compile  wasd orbit  o projection  q quit";

fn render_size(width: u16, height: u16) -> (usize, usize) {
    (
        width.max(1) as usize,
        height.saturating_sub(STATUS_ROWS).max(1) as usize,
    )
}

fn viewport_aspect(width: usize, height: usize) -> f32 {
    width as f32 / (height as f32 * CELL_ASPECT)
}

/// Read an STL file and import it into `editor`.
pub fn import_file(editor: &mut Editor, path: &Path) -> io::Result<()> {
    let data = std::fs::read(path)?;
    editor
        .import_stl(&data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(())
}
