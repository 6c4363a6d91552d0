/// ASCII rasterizer for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use meshpad_core::{vertex_edit::VertexMarkers, Camera, MeshId, Scene, SceneMesh};
use nalgebra::{Matrix4, Point3, Vector3};
use std::io::Write;

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

const MARKER_CHAR: char = 'o';

/// Faces never drop below this brightness so unlit sides stay visible
const AMBIENT: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    character: char,
    color: Color,
}

impl Cell {
    const EMPTY: Cell = Cell {
        character: ' ',
        color: Color::Reset,
    };
}

/// ASCII renderer that converts the editor scene to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    cells: Vec<Cell>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            cells: vec![Cell::EMPTY; size],
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.cells.fill(Cell::EMPTY);
    }

    /// Character at a cell, for inspection.
    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.cells[y * self.width + x].character)
    }

    /// Draw every mesh. `view` orbits the whole scene around the origin.
    pub fn render_scene(
        &mut self,
        scene: &Scene,
        view: &Matrix4<f32>,
        camera: &Camera,
        selection: Option<MeshId>,
    ) {
        for mesh in scene.iter() {
            let model = view * mesh.transform.matrix();
            self.render_mesh(mesh, &model, camera, selection == Some(mesh.id));
        }
    }

    pub fn render_mesh(
        &mut self,
        mesh: &SceneMesh,
        model_matrix: &Matrix4<f32>,
        camera: &Camera,
        selected: bool,
    ) {
        let light_dir = (camera.position - camera.target)
            .try_normalize(0.0)
            .unwrap_or_else(Vector3::z);

        for triangle in mesh.geometry.triangles() {
            let corners = mesh.geometry.triangle_positions(triangle);
            let Some(screen_coords) = self.project_triangle(&corners, model_matrix, camera) else {
                continue; // Triangle is clipped
            };

            // Flat shading from the world-space face normal
            let world = corners.map(|p| model_matrix.transform_point(&p));
            let normal = (world[1] - world[0])
                .cross(&(world[2] - world[0]))
                .try_normalize(0.0)
                .unwrap_or_else(Vector3::zeros);
            let brightness = normal.dot(&light_dir).abs().max(AMBIENT);

            let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
            let char_index = char_index.clamp(1, LUMINOSITY_RAMP.len() - 1);
            let cell = Cell {
                character: LUMINOSITY_RAMP[char_index],
                color: if selected {
                    Color::Yellow
                } else {
                    shade(mesh.material.color, brightness)
                },
            };

            self.rasterize_triangle(&screen_coords, cell);
        }
    }

    /// Draw vertex markers on top of the meshes.
    pub fn render_markers(
        &mut self,
        markers: &VertexMarkers,
        model_matrix: &Matrix4<f32>,
        camera: &Camera,
        active: Option<usize>,
    ) {
        for (i, point) in markers.points.iter().enumerate() {
            let Some((x, y, _)) =
                camera.project_to_screen(point, model_matrix, self.width as u32, self.height as u32)
            else {
                continue;
            };
            let (x, y) = (x as usize, y as usize);
            if x >= self.width || y >= self.height {
                continue;
            }
            let color = if active == Some(i) {
                Color::White
            } else {
                rgb(markers.color)
            };
            self.cells[y * self.width + x] = Cell {
                character: if active == Some(i) { '@' } else { MARKER_CHAR },
                color,
            };
        }
    }

    fn project_triangle(
        &self,
        corners: &[Point3<f32>; 3],
        model_matrix: &Matrix4<f32>,
        camera: &Camera,
    ) -> Option<[(f32, f32, f32); 3]> {
        let project = |p: &Point3<f32>| {
            camera.project_to_screen(p, model_matrix, self.width as u32, self.height as u32)
        };
        Some([project(&corners[0])?, project(&corners[1])?, project(&corners[2])?])
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], cell: Cell) {
        let [v0, v1, v2] = *coords;

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        // Scanline rasterization
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                // Barycentric coordinates
                if let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        // Interpolate depth
                        let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;

                        let idx = y as usize * self.width + x as usize;
                        if depth < self.depth_buffer[idx] {
                            self.depth_buffer[idx] = depth;
                            self.cells[idx] = cell;
                        }
                    }
                }
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for row in self.cells.chunks(self.width.max(1)) {
            for cell in row {
                writer.queue(SetForegroundColor(cell.color))?;
                writer.queue(Print(cell.character))?;
            }
            writer.queue(Print("\r\n"))?;
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

fn rgb([r, g, b]: [f32; 3]) -> Color {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::Rgb {
        r: channel(r),
        g: channel(g),
        b: channel(b),
    }
}

fn shade(color: [f32; 3], brightness: f32) -> Color {
    rgb(color.map(|c| c * brightness))
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshpad_core::config::{CameraConfig, MarkerConfig};
    use meshpad_core::scene::Material;
    use meshpad_core::{ShapeKind, VertexEditSession};

    fn setup() -> (AsciiRenderer, Camera, Scene, MeshId) {
        let renderer = AsciiRenderer::new(80, 40);
        // Terminal cells are about twice as tall as they are wide.
        let camera = Camera::new(80.0 / (40.0 * 2.0), &CameraConfig::default());
        let mut scene = Scene::new();
        let id = scene.add("cube", ShapeKind::Cube.build(), Material::new([0.0, 1.0, 0.0]));
        (renderer, camera, scene, id)
    }

    #[test]
    fn test_barycentric_center() {
        let (w0, w1, w2) = barycentric((0.0, 0.0), (3.0, 0.0), (0.0, 3.0), (1.0, 1.0)).unwrap();
        assert!((w0 - 1.0 / 3.0).abs() < 1e-5);
        assert!((w1 - 1.0 / 3.0).abs() < 1e-5);
        assert!((w2 - 1.0 / 3.0).abs() < 1e-5);
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (1.0, 1.0)).is_none());
    }

    #[test]
    fn test_cube_covers_screen_center() {
        let (mut renderer, camera, scene, id) = setup();
        renderer.render_scene(&scene, &Matrix4::identity(), &camera, None);
        // front face looks straight at the camera
        assert_eq!(renderer.char_at(40, 20), Some('@'));
        assert_eq!(renderer.char_at(0, 0), Some(' '));

        renderer.clear();
        renderer.render_scene(&scene, &Matrix4::identity(), &camera, Some(id));
        assert_eq!(renderer.cells[20 * 80 + 40].color, Color::Yellow);
    }

    #[test]
    fn test_translated_mesh_leaves_center_empty() {
        let (mut renderer, camera, mut scene, id) = setup();
        scene.get_mut(id).unwrap().transform.translation = Vector3::new(2.0, 0.0, 0.0);
        renderer.render_scene(&scene, &Matrix4::identity(), &camera, None);
        assert_eq!(renderer.char_at(40, 20), Some(' '));
    }

    #[test]
    fn test_markers_draw_over_mesh() {
        let (mut renderer, camera, scene, id) = setup();
        let mesh = scene.get(id).unwrap();
        let session = VertexEditSession::begin(id, &mesh.geometry, &MarkerConfig::default());
        renderer.render_scene(&scene, &Matrix4::identity(), &camera, None);
        renderer.render_markers(session.markers(), &Matrix4::identity(), &camera, None);

        let markers = (0..40)
            .flat_map(|y| (0..80).map(move |x| (x, y)))
            .filter(|&(x, y)| renderer.char_at(x, y) == Some(MARKER_CHAR))
            .count();
        assert!(markers >= 4);
    }

    #[test]
    fn test_draw_writes_every_row() {
        let (mut renderer, camera, scene, _) = setup();
        renderer.render_scene(&scene, &Matrix4::identity(), &camera, None);
        let mut out = Vec::new();
        renderer.draw(&mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert_eq!(text.matches("\r\n").count(), 40);
    }
}
