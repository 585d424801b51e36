//! Pixel display surface and the backends the binary can drive.

use std::io::{self, Write};
use tracing::{debug, info};

/// Font variants. Only their glyph widths matter to layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    /// Small proportional font for text panes
    Tiny,
    /// Tall digits for the temperature pane
    Lcd,
}

impl Font {
    /// Horizontal advance of one glyph, including the 1px gap after it.
    pub fn advance(self, c: char) -> i32 {
        match self {
            Font::Lcd => match c {
                '.' => 3,
                '1' => 4,
                _ => 6,
            },
            Font::Tiny => match c {
                '.' | ':' | '!' | '\'' | 'i' | 'l' => 2,
                '1' | ' ' => 3,
                _ => 4,
            },
        }
    }

    /// Rendered width of `text` in pixels (the trailing gap is not counted).
    pub fn text_width(self, text: &str) -> i32 {
        if text.is_empty() {
            return 0;
        }
        text.chars().map(|c| self.advance(c)).sum::<i32>() - 1
    }
}

/// A fixed-size monochrome pixel grid.
///
/// A frame is `clear`, any number of draws, then `flush`; nothing is visible
/// until `flush`.
pub trait Display: Send {
    /// `(width, height)` in pixels
    fn size(&self) -> (i32, i32);
    fn clear(&mut self);
    /// Points outside the grid are ignored.
    fn set_pixel(&mut self, x: i32, y: i32);
    fn draw_text(&mut self, x: i32, y: i32, text: &str, font: Font);
    fn flush(&mut self) -> io::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub font: Font,
}

/// In-memory frame: lit pixels plus the text runs drawn on it.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: i32,
    height: i32,
    pixels: Vec<bool>,
    texts: Vec<TextRun>,
    flushes: u64,
}

impl FrameBuffer {
    pub fn new(width: i32, height: i32) -> Self {
        FrameBuffer {
            width,
            height,
            pixels: vec![false; (width.max(0) * height.max(0)) as usize],
            texts: Vec::new(),
            flushes: 0,
        }
    }

    pub fn is_lit(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some_and(|i| self.pixels[i])
    }

    pub fn lit_pixels(&self) -> Vec<(i32, i32)> {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.is_lit(x, y))
            .collect()
    }

    #[cfg(test)]
    pub fn texts(&self) -> &[TextRun] {
        &self.texts
    }

    #[cfg(test)]
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Text runs of the frame as one line, e.g. `"ARS21CHE"`.
    pub fn summary(&self) -> String {
        self.texts
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Grid as rows of `#`/`.` with text runs overlaid one char per column.
    pub fn to_rows(&self) -> Vec<String> {
        let mut rows: Vec<Vec<char>> = (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| if self.is_lit(x, y) { '#' } else { '.' })
                    .collect()
            })
            .collect();
        for run in &self.texts {
            let Some(row) = usize::try_from(run.y).ok().and_then(|y| rows.get_mut(y)) else {
                continue;
            };
            for (offset, c) in run.text.chars().enumerate() {
                let x = run.x + offset as i32;
                if let Some(cell) = usize::try_from(x).ok().and_then(|x| row.get_mut(x)) {
                    *cell = c;
                }
            }
        }
        rows.into_iter().map(|r| r.into_iter().collect()).collect()
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if (0..self.width).contains(&x) && (0..self.height).contains(&y) {
            Some((y * self.width + x) as usize)
        } else {
            None
        }
    }
}

impl Display for FrameBuffer {
    fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = false);
        self.texts.clear();
    }

    fn set_pixel(&mut self, x: i32, y: i32) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = true;
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, font: Font) {
        self.texts.push(TextRun {
            x,
            y,
            text: text.to_string(),
            font,
        });
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Redraws the grid on stdout with ANSI escapes on every flush.
pub struct TerminalDisplay {
    frame: FrameBuffer,
}

impl TerminalDisplay {
    pub fn new(width: i32, height: i32) -> Self {
        TerminalDisplay {
            frame: FrameBuffer::new(width, height),
        }
    }
}

impl Display for TerminalDisplay {
    fn size(&self) -> (i32, i32) {
        self.frame.size()
    }

    fn clear(&mut self) {
        self.frame.clear();
    }

    fn set_pixel(&mut self, x: i32, y: i32) {
        self.frame.set_pixel(x, y);
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, font: Font) {
        self.frame.draw_text(x, y, text, font);
    }

    fn flush(&mut self) -> io::Result<()> {
        self.frame.flush()?;
        // Build the whole frame first so it goes out in one write
        let mut out = String::from("\x1b[H\x1b[2J");
        for row in self.frame.to_rows() {
            out.push_str(&row);
            out.push('\n');
        }
        let mut stdout = io::stdout().lock();
        stdout.write_all(out.as_bytes())?;
        stdout.flush()
    }
}

/// Reports frames through `tracing` instead of drawing them. Text changes are
/// logged at info, everything else at debug.
pub struct LogDisplay {
    frame: FrameBuffer,
    last_summary: String,
}

impl LogDisplay {
    pub fn new(width: i32, height: i32) -> Self {
        LogDisplay {
            frame: FrameBuffer::new(width, height),
            last_summary: String::new(),
        }
    }
}

impl Display for LogDisplay {
    fn size(&self) -> (i32, i32) {
        self.frame.size()
    }

    fn clear(&mut self) {
        self.frame.clear();
    }

    fn set_pixel(&mut self, x: i32, y: i32) {
        self.frame.set_pixel(x, y);
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, font: Font) {
        self.frame.draw_text(x, y, text, font);
    }

    fn flush(&mut self) -> io::Result<()> {
        self.frame.flush()?;
        let summary = self.frame.summary();
        if summary != self.last_summary {
            info!("Display: {}", summary);
            self.last_summary = summary;
        } else {
            debug!("Display frame ({} lit pixels)", self.frame.lit_pixels().len());
        }
        Ok(())
    }
}
