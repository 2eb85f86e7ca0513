//! Textual progress meter for sync runs.

/// Width of the bar in cells.
const METER_WIDTH: usize = 50;

/// Mood glyphs from despair to triumph, indexed by `round(fraction * 12)`.
const MOOD_GLYPHS: [&str; 13] = [
    "😱", "😨", "😰", "😯", "😦", "😧", "😑", "😕", "😐", "🙂", "😊", "😎", "🎉",
];

/// Render a one-line meter for `done` of `total` units.
///
/// Purely cosmetic. `0/0` renders as complete, and `done > total` clamps
/// to full rather than panicking.
pub fn progress_meter(done: usize, total: usize) -> String {
    let fraction = if total == 0 {
        1.0
    } else {
        (done as f64 / total as f64).clamp(0.0, 1.0)
    };
    let filled = (fraction * METER_WIDTH as f64).round() as usize;
    let glyph = MOOD_GLYPHS[(fraction * 12.0).round() as usize];
    format!(
        "[{}{}] {} {:3.0}%",
        "*".repeat(filled),
        "·".repeat(METER_WIDTH - filled),
        glyph,
        fraction * 100.0
    )
}
