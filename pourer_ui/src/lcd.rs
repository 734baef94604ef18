//! Character display surfaces and the renderer driving them.

use pourer_core::{Display, View};

use crate::frame::{COLS, ROWS, frame_for};

type SurfaceError = Box<dyn std::error::Error + Send + Sync>;

/// A HD44780-style character display.
pub trait TextSurface {
    fn clear(&mut self) -> Result<(), SurfaceError>;
    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), SurfaceError>;
    /// Write at the cursor and advance it. Text past the last column is lost.
    fn print(&mut self, text: &str) -> Result<(), SurfaceError>;
}

impl<T: TextSurface + ?Sized> TextSurface for &mut T {
    fn clear(&mut self) -> Result<(), SurfaceError> {
        (**self).clear()
    }
    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), SurfaceError> {
        (**self).set_cursor(col, row)
    }
    fn print(&mut self, text: &str) -> Result<(), SurfaceError> {
        (**self).print(text)
    }
}

/// In-memory 16x2 screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySurface {
    grid: [[char; COLS]; ROWS],
    cursor: (usize, usize),
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self {
            grid: [[' '; COLS]; ROWS],
            cursor: (0, 0),
        }
    }
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row contents, right-padded to the full width.
    pub fn lines(&self) -> [String; ROWS] {
        self.grid.map(|r| r.iter().collect())
    }

    /// Row contents without trailing blanks.
    pub fn trimmed_lines(&self) -> [String; ROWS] {
        self.lines().map(|l| l.trim_end().to_owned())
    }
}

impl TextSurface for MemorySurface {
    fn clear(&mut self) -> Result<(), SurfaceError> {
        *self = Self::default();
        Ok(())
    }

    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), SurfaceError> {
        let (col, row) = (usize::from(col), usize::from(row));
        if row >= ROWS || col >= COLS {
            return Err(format!("cursor ({col}, {row}) outside {COLS}x{ROWS}").into());
        }
        self.cursor = (col, row);
        Ok(())
    }

    fn print(&mut self, text: &str) -> Result<(), SurfaceError> {
        let (col, row) = self.cursor;
        let Some(line) = self.grid.get_mut(row) else {
            return Ok(());
        };
        let mut written = 0;
        for (cell, ch) in line.iter_mut().skip(col).zip(text.chars()) {
            *cell = ch;
            written += 1;
        }
        self.cursor = (col + written, row);
        Ok(())
    }
}

/// Draws panel views on a character surface.
#[derive(Debug, Default)]
pub struct LcdRenderer<S> {
    surface: S,
}

impl<S: TextSurface> LcdRenderer<S> {
    pub const fn new(surface: S) -> Self {
        Self { surface }
    }

    pub const fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_inner(self) -> S {
        self.surface
    }
}

impl<S: TextSurface> Display for LcdRenderer<S> {
    fn show(&mut self, view: &View) -> Result<(), SurfaceError> {
        let frame = frame_for(view);
        self.surface.clear()?;
        for w in &frame.writes {
            self.surface.set_cursor(w.col, w.row)?;
            let room = COLS.saturating_sub(usize::from(w.col));
            let text: String = w.text.chars().take(room).collect();
            self.surface.print(&text)?;
        }
        tracing::trace!(mode = %view.mode(), "lcd redrawn");
        Ok(())
    }
}
