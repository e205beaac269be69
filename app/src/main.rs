use std::path::PathBuf;
use std::time::Instant;

use eframe::{App, Frame, NativeOptions, egui, run_native};
use egui::{Color32, ColorImage, Pos2, Stroke, TextureHandle, Vec2};
use glam::Vec3;
use landscape::utils::{preview_size, scenery_image};
use landscape::{
    DrawMode, ElevationMode, Scenery, SceneryConfig, SeamPolicy, ShaderHandle, TerrainRenderer,
    TileDrawData,
};
use landscape_storage::SceneryStore;
use log::{error, info};

// Collects where each tile sits and how it wants to be drawn
#[derive(Default)]
struct TileOutlines {
    tiles: Vec<(Vec3, DrawMode)>,
}

impl TerrainRenderer for TileOutlines {
    fn draw_tile(&mut self, _shader: ShaderHandle, tile: TileDrawData<'_>) {
        let origin = tile.placement.transform_point3(Vec3::ZERO);
        self.tiles.push((origin, tile.draw_mode));
    }
}

struct SceneryApp {
    cfg: SceneryConfig,
    // slider is for n; resolution = 2^n + 1
    exp: u32,

    scenery: Option<Scenery>,
    texture: Option<TextureHandle>,
    // Last RGB preview and its pixel size
    last_rgb: Option<Vec<u8>>,
    last_size: (usize, usize),

    last_duration: Option<f32>,
    status_message: String,
    store_root: PathBuf,
}

impl Default for SceneryApp {
    fn default() -> Self {
        let cfg = SceneryConfig::fractal(3, 3, 2025);
        Self {
            exp: (cfg.resolution - 1).ilog2(),
            cfg,
            scenery: None,
            texture: None,
            last_rgb: None,
            last_size: (0, 0),
            last_duration: None,
            status_message: String::new(),
            store_root: PathBuf::from("stored_sceneries"),
        }
    }
}

impl SceneryApp {
    fn generate(&mut self, ctx: &egui::Context) {
        let start = Instant::now();
        self.cfg.resolution = (1 << self.exp) + 1;

        match Scenery::build(&self.cfg) {
            Ok(scenery) => {
                let size = preview_size(&scenery);
                let rgb = scenery_image(&scenery);
                let color_image = ColorImage::from_rgb([size.0, size.1], &rgb);
                self.texture =
                    Some(ctx.load_texture("scenery", color_image, egui::TextureOptions::NEAREST));
                self.last_rgb = Some(rgb);
                self.last_size = size;
                self.scenery = Some(scenery);

                let ms = start.elapsed().as_secs_f32() * 1000.0;
                self.last_duration = Some(ms);
                self.status_message = format!("Generated in {:.2} ms (seed {})", ms, self.cfg.seed);
                info!("{}", self.status_message);
            }
            Err(e) => {
                error!("scenery build failed: {}", e);
                self.status_message = format!("Build failed: {}", e);
            }
        }
        ctx.request_repaint();
    }

    fn load_config(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Scenery config", &["toml"])
            .pick_file()
        else {
            return;
        };
        match SceneryConfig::load(&path) {
            Ok(cfg) => {
                // the slider only offers 2^n+1 grids
                self.exp = (cfg.resolution - 1).max(2).ilog2().clamp(4, 9);
                let builds_at = (1usize << self.exp) + 1;
                self.status_message = if builds_at == cfg.resolution {
                    format!("Loaded {}", path.display())
                } else {
                    format!(
                        "Loaded {} (resolution {} will build as {})",
                        path.display(),
                        cfg.resolution,
                        builds_at
                    )
                };
                info!("{}", self.status_message);
                self.cfg = cfg;
            }
            Err(e) => self.status_message = format!("Config error: {}", e),
        }
    }

    fn save_png(&mut self) {
        let Some(rgb) = &self.last_rgb else {
            return;
        };
        let filename = format!("scenery_{}.png", self.cfg.seed);
        let (w, h) = self.last_size;
        self.status_message =
            match image::save_buffer(&filename, rgb, w as u32, h as u32, image::ColorType::Rgb8) {
                Ok(()) => format!("Saved {}", filename),
                Err(e) => format!("PNG error: {}", e),
            };
    }

    fn export_assets(&mut self) {
        let Some(scenery) = &self.scenery else {
            return;
        };
        let name = format!("scenery_{}", scenery.config().seed);
        let result =
            SceneryStore::init(&self.store_root).and_then(|store| store.create(&name, scenery));
        self.status_message = match result {
            Ok(m) => format!(
                "Exported {} tiles to {}",
                m.tiles.len(),
                self.store_root.join(&name).display()
            ),
            Err(e) => {
                error!("export of {:?} failed: {}", name, e);
                format!("Export error: {}", e)
            }
        };
    }

    fn controls(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        ui.heading("Scenery Generator");
        ui.separator();

        ui.label("Elevation");
        egui::ComboBox::from_label("Source")
            .selected_text(format!("{:?}", self.cfg.elevation))
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut self.cfg.elevation, ElevationMode::Flat, "Flat");
                ui.selectable_value(
                    &mut self.cfg.elevation,
                    ElevationMode::HeightMaps,
                    "Height maps",
                );
                ui.selectable_value(&mut self.cfg.elevation, ElevationMode::Fractal, "Fractal");
            });

        ui.horizontal(|ui| {
            ui.label("Tiles");
            ui.add(egui::Slider::new(&mut self.cfg.width, 1..=8).text("wide"));
        });
        ui.horizontal(|ui| {
            ui.label("     ");
            ui.add(egui::Slider::new(&mut self.cfg.height, 1..=8).text("deep"));
        });

        let size = (1usize << self.exp) + 1;
        ui.horizontal(|ui| {
            ui.label("Resolution 2^n+1:");
            ui.add(
                egui::Slider::new(&mut self.exp, 4..=9)
                    .text(format!("{}×{}", size, size))
                    .step_by(1.0),
            );
        });

        ui.label("Tile size");
        ui.add(egui::Slider::new(&mut self.cfg.tile_size, 50.0..=1000.0));

        ui.label("Seed");
        ui.add(egui::DragValue::new(&mut self.cfg.seed).speed(1.0));

        if self.cfg.elevation == ElevationMode::HeightMaps {
            ui.checkbox(&mut self.cfg.fractal.refine_images, "Refine height maps");
        }
        if self.cfg.elevation == ElevationMode::Fractal || self.cfg.fractal.refine_images {
            ui.label("Displacement range");
            ui.add(egui::Slider::new(&mut self.cfg.fractal.range, 0.0..=200.0));
        }

        let mut shared = self.cfg.seams == SeamPolicy::Shared;
        ui.checkbox(&mut shared, "Share tile edges");
        self.cfg.seams = if shared {
            SeamPolicy::Shared
        } else {
            SeamPolicy::Independent
        };

        ui.separator();

        if ui.button("Generate Scenery").clicked() {
            self.generate(ctx);
        }
        if ui.button("Load config…").clicked() {
            self.load_config();
        }
        if ui.button("Toggle wireframe").clicked() {
            if let Some(s) = &mut self.scenery {
                s.toggle_draw_mode();
            }
        }
        if ui.button("Save PNG…").clicked() {
            self.save_png();
        }
        if ui.button("Export height maps…").clicked() {
            self.export_assets();
        }

        ui.separator();
        ui.label(&self.status_message);
    }

    fn preview(&self, ui: &mut egui::Ui) {
        let (Some(tex), Some(scenery)) = (&self.texture, &self.scenery) else {
            ui.centered_and_justified(|ui| {
                ui.label("Click “Generate Scenery” to start");
            });
            return;
        };

        // keep the aspect ratio of the tile grid
        let (w, h) = self.last_size;
        let available = ui.available_size() - Vec2::new(0.0, 24.0);
        let scale = (available.x / w as f32).min(available.y / h as f32).max(0.1);
        let response = ui.image((tex.id(), Vec2::new(w as f32 * scale, h as f32 * scale)));
        let rect = response.rect;

        let extent = Vec2::new(
            scenery.width() as f32 * scenery.tile_size(),
            scenery.height() as f32 * scenery.tile_size(),
        );
        let to_screen = |x: f32, z: f32| -> Pos2 {
            rect.min + Vec2::new(x / extent.x * rect.width(), z / extent.y * rect.height())
        };

        // wireframe tiles get their quad grid drawn over the image
        let mut outlines = TileOutlines::default();
        scenery.draw(ShaderHandle(0), &mut outlines);
        let stroke = Stroke::new(1.0, Color32::from_white_alpha(140));
        let size = scenery.tile_size();
        for (origin, mode) in &outlines.tiles {
            if *mode != DrawMode::Wireframe {
                continue;
            }
            let divisions = 8;
            for i in 0..=divisions {
                let t = size * i as f32 / divisions as f32;
                ui.painter().line_segment(
                    [to_screen(origin.x + t, origin.z), to_screen(origin.x + t, origin.z + size)],
                    stroke,
                );
                ui.painter().line_segment(
                    [to_screen(origin.x, origin.z + t), to_screen(origin.x + size, origin.z + t)],
                    stroke,
                );
            }
        }

        let probe = response.hover_pos().filter(|p| rect.contains(*p)).map(|p| {
            let d = p - rect.min;
            Vec3::new(
                d.x / rect.width() * extent.x,
                0.0,
                d.y / rect.height() * extent.y,
            )
        });
        match probe {
            Some(world) => match scenery.height_at(world) {
                Ok(height) => {
                    let index = scenery.terrain_index(world).unwrap_or_default();
                    ui.label(format!(
                        "tile {} at ({:.1}, {:.1}): height {:.2}",
                        index, world.x, world.z, height
                    ));
                }
                Err(e) => {
                    ui.label(e.to_string());
                }
            },
            None => {
                let (min, max) = scenery.min_max();
                ui.label(format!("heights {:.2} .. {:.2}", min, max));
            }
        }

        if let Some(ms) = self.last_duration {
            ui.painter().text(
                rect.right_top() + Vec2::new(-6.0, 6.0),
                egui::Align2::RIGHT_TOP,
                format!("{:.1} ms", ms),
                egui::FontId::monospace(12.0),
                Color32::WHITE,
            );
        }
    }
}

impl App for SceneryApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        egui::SidePanel::left("controls").show(ctx, |ui| {
            self.controls(ctx, ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.preview(ui);
        });
    }
}

fn main() -> eframe::Result {
    env_logger::init();

    let opts = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 640.0])
            .with_min_inner_size([400.0, 300.0]),
        ..Default::default()
    };
    run_native(
        "Scenery Generator",
        opts,
        Box::new(|_cc| Ok(Box::new(SceneryApp::default()))),
    )
}
