#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Textual debug rendering of a Clockrun level window.
//!
//! The dump prints one line per row from the top of the level down to the
//! floor, each prefixed with its zero-padded row index, followed by a
//! four-line ruler spelling out the absolute X of every column.

use std::fmt::Write as _;

use anyhow::{Context, Result as AnyResult};
use clockrun_core::TileCode;
use clockrun_world::{query, Level};

const RULER_DIGITS: usize = 4;
const ROW_PREFIX_WIDTH: usize = 8;

/// Output flavour of the dump.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderStyle {
    /// Tile symbols only.
    #[default]
    Plain,
    /// Tile symbols wrapped in ANSI colour escapes.
    Ansi,
}

/// ANSI foreground colour of a terminal cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    /// Empty air.
    Cyan,
    /// Ground.
    Gray,
    /// Spikes.
    Red,
    /// Clocks and the marked column.
    Yellow,
    /// Ruler digits left of the origin.
    Magenta,
    /// Ruler digits at or right of the origin.
    Green,
}

impl Color {
    /// Colour used for a tile classification.
    #[must_use]
    pub const fn for_tile(tile: TileCode) -> Self {
        match tile {
            TileCode::Blank => Color::Cyan,
            TileCode::Ground => Color::Gray,
            TileCode::Spike => Color::Red,
            TileCode::UnplacedClock | TileCode::PlacedClock => Color::Yellow,
        }
    }

    const fn escape(self) -> &'static str {
        match self {
            Color::Cyan => "\x1b[36m",
            Color::Gray => "\x1b[90m",
            Color::Red => "\x1b[31m",
            Color::Yellow => "\x1b[33m",
            Color::Magenta => "\x1b[35m",
            Color::Green => "\x1b[32m",
        }
    }
}

const RESET: &str = "\x1b[0m";

/// Renders columns `from_x..=to_x` of `level`.
///
/// `marker` highlights one column in the ruler, typically the player's. Plain
/// output adds a caret line under the ruler for it instead of a colour.
pub fn render_window(
    level: &Level,
    from_x: i32,
    to_x: i32,
    style: RenderStyle,
    marker: Option<i32>,
) -> AnyResult<String> {
    let (from_x, to_x) = (from_x.min(to_x), from_x.max(to_x));
    let rows = i32::from(query::max_height(level));
    let mut out = String::new();

    for row in (0..rows).rev() {
        let _ = write!(out, "{row:06}: ");
        for global_x in from_x..=to_x {
            let tile = query::cell_at(level, global_x, row)
                .with_context(|| format!("failed to render column {global_x}"))?;
            paint(&mut out, style, Color::for_tile(tile), tile.symbol());
        }
        out.push('\n');
    }

    for digit in 0..RULER_DIGITS {
        out.push_str(&" ".repeat(ROW_PREFIX_WIDTH));
        for global_x in from_x..=to_x {
            let padded = format!("{:04}", global_x.unsigned_abs() % 10_000);
            let symbol = padded.chars().nth(digit).unwrap_or('0');
            let color = if Some(global_x) == marker {
                Color::Yellow
            } else if global_x < 0 {
                Color::Magenta
            } else {
                Color::Green
            };
            paint(&mut out, style, color, symbol);
        }
        out.push('\n');
    }

    if style == RenderStyle::Plain {
        if let Some(marker) = marker.filter(|x| (from_x..=to_x).contains(x)) {
            out.push_str(&" ".repeat(ROW_PREFIX_WIDTH + (marker - from_x).unsigned_abs() as usize));
            out.push_str("^\n");
        }
    }
    Ok(out)
}

/// Renders the whole generated level.
pub fn render_level(level: &Level, style: RenderStyle, marker: Option<i32>) -> AnyResult<String> {
    render_window(
        level,
        query::leftmost_global_x(level),
        query::rightmost_global_x(level),
        style,
        marker,
    )
}

fn paint(out: &mut String, style: RenderStyle, color: Color, symbol: char) {
    match style {
        RenderStyle::Plain => out.push(symbol),
        RenderStyle::Ansi => {
            out.push_str(color.escape());
            out.push(symbol);
            out.push_str(RESET);
        }
    }
}
