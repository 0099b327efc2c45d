//! Character-grid rendering of wave state
//!
//! The console collaborator prints one character per cell: `?` for cells
//! still holding several candidates, `*` for contradicted cells, and the
//! caller-supplied glyph for decided cells. Masked cells render as blanks.

use crate::algorithm::TilePropagator;
use crate::model::TileId;

/// Render one z-plane of a propagator as newline-separated rows
pub fn render_plane<T, F>(propagator: &TilePropagator<T>, z: usize, glyph: F) -> String
where
    T: TileId,
    F: Fn(&T) -> char,
{
    let topology = propagator.topology();
    let mut output = String::with_capacity((topology.width() + 1) * topology.height());
    for y in 0..topology.height() {
        for x in 0..topology.width() {
            let Ok(cell) = topology.index_of(x, y, z) else {
                continue;
            };
            let character = if topology.contains(cell) {
                match propagator.wave().remaining(cell) {
                    0 => '*',
                    1 => propagator.decided_tile_index(cell).map_or('?', &glyph),
                    _ => '?',
                }
            } else {
                ' '
            };
            output.push(character);
        }
        output.push('\n');
    }
    output
}

/// Glyph mapping for small integer tiles: zero is blank, other values print
/// as themselves
pub fn digit_glyph(value: &u8) -> char {
    if *value == 0 {
        ' '
    } else {
        char::from_digit(u32::from(*value) % 10, 10).unwrap_or('#')
    }
}
