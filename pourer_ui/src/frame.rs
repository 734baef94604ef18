//! View → screen text.

use pourer_core::minutes::decompose;
use pourer_core::View;

pub const COLS: usize = 16;
pub const ROWS: usize = 2;

const NEXT_ROW: &str = "-       +   Next";

/// Text placed at a cursor position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWrite {
    pub col: u8,
    pub row: u8,
    pub text: String,
}

impl TextWrite {
    fn at(col: u8, row: u8, text: impl Into<String>) -> Self {
        Self {
            col,
            row,
            text: text.into(),
        }
    }
}

/// Everything drawn for one view, applied to a cleared screen in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub writes: Vec<TextWrite>,
}

impl Frame {
    /// The two screen rows as they would appear on the glass, right-padded.
    pub fn lines(&self) -> [String; ROWS] {
        let mut grid = [[' '; COLS]; ROWS];
        for w in &self.writes {
            let Some(row) = grid.get_mut(usize::from(w.row)) else {
                continue;
            };
            for (cell, ch) in row.iter_mut().skip(usize::from(w.col)).zip(w.text.chars()) {
                *cell = ch;
            }
        }
        grid.map(|r| r.iter().collect())
    }
}

/// Build the frame for `view`.
pub fn frame_for(view: &View) -> Frame {
    let writes = match view {
        View::Calibration { step, show_end } => vec![
            TextWrite::at(0, 0, format!("Fill unit: #{step}")),
            TextWrite::at(
                0,
                1,
                if *show_end {
                    "Cancel End  Pour"
                } else {
                    "Cancel      Pour"
                },
            ),
        ],
        View::Message { text } => vec![TextWrite::at(0, 0, text.as_str())],
        View::Calibrated => vec![
            TextWrite::at(0, 0, "Calibrated"),
            TextWrite::at(0, 1, "Record Unit Pour"),
        ],
        View::SetUnits { units } => vec![
            TextWrite::at(0, 0, format!("Pour {units} units")),
            TextWrite::at(0, 1, NEXT_ROW),
        ],
        View::SetStartAt { minutes } => vec![
            TextWrite::at(0, 0, format!("Pour in {}H {}M", minutes / 60, minutes % 60)),
            TextWrite::at(0, 1, NEXT_ROW),
        ],
        View::SetEvery { minutes } => vec![
            TextWrite::at(0, 0, every_text(*minutes)),
            TextWrite::at(0, 1, "-       +   Done"),
        ],
        View::Automatic {
            units,
            remaining_min,
        } => vec![
            TextWrite::at(0, 0, countdown_text(*units, *remaining_min)),
            TextWrite::at(0, 1, "Cancel"),
        ],
        View::ShowParam { param, value } => vec![
            TextWrite::at(0, 0, param.label()),
            TextWrite::at(2, 0, param_value_text(*value)),
            TextWrite::at(0, 1, "Cancel      Next"),
        ],
        View::Unknown => vec![TextWrite::at(0, 0, "UNKNOWN MODE!")],
    };
    Frame { writes }
}

fn every_text(minutes: u32) -> String {
    match decompose(minutes) {
        (0, 0, m) => format!("Every {m} min"),
        (0, h, m) => format!("Every {h}h {m}m"),
        (d, h, m) => format!("Ev {d}D {h}h {m}m"),
    }
}

fn countdown_text(units: u8, remaining_min: Option<i64>) -> String {
    let Some(remaining) = remaining_min else {
        return format!("{units}u in --");
    };
    // mid-dispense the countdown may sit at or below zero
    let minutes = u32::try_from(remaining.max(0)).unwrap_or(u32::MAX);
    match decompose(minutes) {
        (0, 0, m) => format!("{units}u in {m}min"),
        (0, h, m) => format!("{units}u in {h}h{m}m"),
        (d, h, _) => format!("{units}u in {d}d{h}h"),
    }
}

/// Two decimals fit every realistic `a` and `b`; `c` is usually far below
/// 0.01 and would print as zero, so small magnitudes use scientific form.
fn param_value_text(value: f64) -> String {
    if value != 0.0 && value.abs() < 0.01 {
        format!("{value:.3e}")
    } else {
        format!("{value:.2}")
    }
}
