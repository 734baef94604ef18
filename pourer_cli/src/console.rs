//! Terminal stand-in for the 16x2 LCD.

use std::io::Write;

use pourer_core::{Display, View};
use pourer_ui::{COLS, LcdRenderer, MemorySurface};

/// Renders every view on an in-memory LCD and prints the glass to stdout,
/// boxed or as one JSON object per line.
pub struct ConsoleLcd {
    lcd: LcdRenderer<MemorySurface>,
    json: bool,
}

impl ConsoleLcd {
    pub fn new(json: bool) -> Self {
        Self {
            lcd: LcdRenderer::new(MemorySurface::new()),
            json,
        }
    }

    fn render_text(lines: &[String; 2]) -> String {
        let border = format!("+{}+", "-".repeat(COLS));
        format!("{border}\n|{}|\n|{}|\n{border}", lines[0], lines[1])
    }
}

impl Display for ConsoleLcd {
    fn show(&mut self, view: &View) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.lcd.show(view)?;
        let surface = self.lcd.surface();
        let out = if self.json {
            serde_json::json!({
                "mode": view.mode().to_string(),
                "lines": surface.trimmed_lines(),
            })
            .to_string()
        } else {
            Self::render_text(&surface.lines())
        };
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{out}")?;
        stdout.flush()?;
        Ok(())
    }
}
