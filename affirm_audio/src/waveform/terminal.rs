// src/waveform/terminal.rs

use super::raster::{DrawCommand, Raster, RenderTarget};

const WAVE: char = '█';
const DIMMED: char = '░';
const HANDLE: char = '┃';
const MARKER: char = '│';

/// Rasterise draw commands onto a `cols` x `rows` character grid.
pub fn render_ascii(raster: &Raster, cols: usize, rows: usize) -> Vec<String> {
    let cols = cols.max(1);
    let rows = rows.max(4);
    let mut lines = vec![vec![' '; cols]; rows];

    let to_col = |x: f32| -> usize {
        let c = (x / raster.width as f32 * cols as f32).floor();
        (c.max(0.0) as usize).min(cols - 1)
    };
    let to_row = |y: f32| -> usize {
        let r = (y / raster.height as f32 * rows as f32).floor();
        (r.max(0.0) as usize).min(rows - 1)
    };

    for command in &raster.commands {
        match *command {
            DrawCommand::Background => {}
            DrawCommand::Segment { x, y_from, y_to } => {
                let col = to_col(x as f32);
                let (a, b) = {
                    let (r0, r1) = (to_row(y_from), to_row(y_to));
                    if r0 <= r1 { (r0, r1) } else { (r1, r0) }
                };
                for row in &mut lines[a..=b] {
                    row[col] = WAVE;
                }
            }
            DrawCommand::Mask { x, width } => {
                if width <= 0.0 {
                    continue;
                }
                let from = to_col(x);
                let end = ((x + width) / raster.width as f32 * cols as f32).ceil() as usize;
                let to = end.clamp(from + 1, cols) - 1;
                for row in lines.iter_mut() {
                    for cell in &mut row[from..=to] {
                        if *cell == WAVE {
                            *cell = DIMMED;
                        }
                    }
                }
            }
            DrawCommand::Handle { x, width, .. } => {
                let col = to_col(x + width / 2.0);
                for row in lines.iter_mut() {
                    row[col] = HANDLE;
                }
            }
            DrawCommand::Marker { x } => {
                let col = to_col(x);
                for row in lines.iter_mut() {
                    row[col] = MARKER;
                }
            }
        }
    }

    lines.into_iter().map(|row| row.into_iter().collect()).collect()
}

/// Keeps the last presented frame as text rows.
pub struct TextCanvas {
    cols: usize,
    rows: usize,
    lines: Vec<String>,
    frames: usize,
}

impl TextCanvas {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            lines: Vec::new(),
            frames: 0,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of rasters presented so far.
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl RenderTarget for TextCanvas {
    fn present(&mut self, raster: &Raster) {
        self.lines = render_ascii(raster, self.cols, self.rows);
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SampleBuffer;
    use crate::trim::TrimWindow;
    use crate::waveform::{RenderMode, WaveformRenderer};

    #[test]
    fn silence_draws_a_centre_line() {
        let buffer = SampleBuffer::silent(1, 400, 8_000).unwrap();
        let raster = WaveformRenderer::new(40, 8, 2.0).render(&buffer, RenderMode::Compact, None);
        let lines = render_ascii(&raster, 40, 8);
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[4].chars().filter(|&c| c == WAVE).count(), 40);
        assert!(lines[0].trim().is_empty());
    }

    #[test]
    fn overlay_glyphs_land_on_handle_columns() {
        let buffer = SampleBuffer::new(vec![vec![0.8; 400]], 8_000).unwrap();
        let window = TrimWindow::new(25.0, 75.0, 5.0).unwrap();
        let raster = WaveformRenderer::new(40, 8, 2.0).render(
            &buffer,
            RenderMode::Full { window },
            Some(0.5),
        );
        let mut canvas = TextCanvas::new(40, 8);
        canvas.present(&raster);

        let top: Vec<char> = canvas.lines()[0].chars().collect();
        assert_eq!(top[10], HANDLE);
        assert_eq!(top[30], HANDLE);
        assert_eq!(top[20], MARKER);

        let wave_row: Vec<char> = canvas.lines()[7].chars().collect();
        assert_eq!(wave_row[2], DIMMED);
        assert_eq!(wave_row[15], WAVE);
        assert_eq!(canvas.frames(), 1);
    }
}
