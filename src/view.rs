//! Per-cell view model handed to the presentation layer.
//!
//! The core never lays out buttons. It derives a [`GridView`] from the
//! current [`Configuration`] on every render and lets a [`Renderer`] decide
//! what to do with it.

use std::io::Write;

use crate::audio_engine::OutputDevice;
use crate::config::Configuration;
use crate::errors::SoundboardError;

/// One button of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct CellView {
    pub slot: usize,
    pub label: String,
    pub hotkey: Option<String>,
    pub mode: &'static str,
    pub color: String,
}

/// Snapshot of the whole grid for one render cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct GridView {
    pub rows: usize,
    pub cols: usize,
    pub font_size: i32,
    pub padding: i32,
    pub cells: Vec<CellView>,
}

impl GridView {
    pub fn from_config(config: &Configuration) -> Self {
        let cells = config
            .pads
            .iter()
            .take(config.pad_count())
            .enumerate()
            .map(|(slot, pad)| CellView {
                slot,
                label: pad.display_label(slot),
                hotkey: pad.hotkey.clone(),
                mode: pad.policy.as_mode(),
                color: pad.color.clone(),
            })
            .collect();

        Self {
            rows: config.rows(),
            cols: config.cols(),
            font_size: config.button_font_size,
            padding: config.button_padding,
            cells,
        }
    }

    /// Cells of row `row`, left to right.
    pub fn row(&self, row: usize) -> &[CellView] {
        let start = (row * self.cols).min(self.cells.len());
        let end = (start + self.cols).min(self.cells.len());
        &self.cells[start..end]
    }
}

/// Presentation layer seam.
pub trait Renderer {
    fn render(&mut self, view: &GridView);

    /// Non-fatal problem the operator should see.
    fn warn(&mut self, error: &SoundboardError);

    fn show_devices(&mut self, _devices: &[OutputDevice], _selected: Option<&str>) {}
}

/// Plain text grid for a terminal.
pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_grid(&mut self, view: &GridView) -> std::io::Result<()> {
        let width = view
            .cells
            .iter()
            .map(|cell| cell_text(cell).chars().count())
            .max()
            .unwrap_or(0);

        writeln!(self.out, "{}x{} grid", view.rows, view.cols)?;
        for row in 0..view.rows {
            let line: Vec<String> = view
                .row(row)
                .iter()
                .map(|cell| format!("{:<width$}", cell_text(cell)))
                .collect();
            writeln!(self.out, "  {}", line.join(" | ").trim_end())?;
        }
        self.out.flush()
    }
}

fn cell_text(cell: &CellView) -> String {
    let mut text = format!("{:>2} {} [{}]", cell.slot + 1, cell.label, cell.mode);
    if let Some(hotkey) = &cell.hotkey {
        text.push_str(&format!(" <{hotkey}>"));
    }
    text
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, view: &GridView) {
        if let Err(err) = self.write_grid(view) {
            log::error!("Failed to draw grid: {}", err);
        }
    }

    fn warn(&mut self, error: &SoundboardError) {
        writeln!(self.out, "warning: {error}").ok();
    }

    fn show_devices(&mut self, devices: &[OutputDevice], selected: Option<&str>) {
        let marker = |id: Option<&str>| if id == selected { "*" } else { " " };
        writeln!(self.out, "{}   system default", marker(None)).ok();
        for (i, device) in devices.iter().enumerate() {
            writeln!(self.out, "{} {} {}", marker(Some(device.id.as_str())), i + 1, device.name).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Pad, Policy};

    #[test]
    fn test_grid_view_labels_and_modes() {
        let mut config = Configuration::default();
        config.apply_grid(crate::config::GridSettings {
            rows: 2,
            cols: 3,
            font_size: 14,
            padding: 4,
        });
        config.pads[0] = Pad {
            label: Some("Airhorn".to_string()),
            hotkey: Some("Ctrl+1".to_string()),
            policy: Policy::Exclusive,
            color: "#ff0000".to_string(),
            ..Pad::default()
        };

        let view = GridView::from_config(&config);

        assert_eq!((view.rows, view.cols), (2, 3));
        assert_eq!(view.font_size, 14);
        assert_eq!(view.cells.len(), 6);
        assert_eq!(view.cells[0].label, "Airhorn");
        assert_eq!(view.cells[0].mode, "Cut");
        assert_eq!(view.cells[0].hotkey.as_deref(), Some("Ctrl+1"));
        assert_eq!(view.cells[4].label, "Pad 5");
        assert_eq!(view.cells[4].mode, "Overlap");
        assert_eq!(view.cells[4].color, "#2d2d2d");
    }

    #[test]
    fn test_rows() {
        let view = GridView::from_config(&Configuration::default());
        assert_eq!(view.row(1).len(), 4);
        assert_eq!(view.row(1)[0].slot, 4);
        assert!(view.row(9).is_empty());
    }

    #[test]
    fn test_text_renderer_output() {
        let mut config = Configuration::default();
        config.apply_grid(crate::config::GridSettings {
            rows: 1,
            cols: 2,
            font_size: 12,
            padding: 6,
        });
        config.pads[0].label = Some("Intro".to_string());
        config.pads[0].hotkey = Some("1".to_string());

        let mut renderer = TextRenderer::new(Vec::new());
        renderer.render(&GridView::from_config(&config));
        renderer.warn(&SoundboardError::MissingAsset { path: None });
        renderer.show_devices(
            &[OutputDevice {
                id: "Speakers".to_string(),
                name: "Speakers".to_string(),
            }],
            Some("Speakers"),
        );

        let text = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "1x2 grid");
        assert_eq!(lines[1], "   1 Intro [Overlap] <1> |  2 Pad 2 [Overlap]");
        assert_eq!(lines[2], "warning: audio file not found: <none assigned>");
        assert_eq!(lines[3], "    system default");
        assert_eq!(lines[4], "* 1 Speakers");
    }
}
