/// Decimal places kept on each delta component so rebuilt sets are bit-stable.
pub const DELTA_PRECISION: i32 = 5;

/// Floor applied to the base constant before any division or power.
/// Bases with a smaller modulus are replaced by `MIN_BASE + MIN_BASE·i`.
pub const MIN_BASE: f64 = 1e-30;

/// Named colours assigned to branches by starting offset.
pub const COLOR_PALETTE: [&str; 20] = [
    "blue",
    "red",
    "green",
    "orange",
    "black",
    "purple",
    "cyan",
    "magenta",
    "yellow",
    "brown",
    "lime",
    "teal",
    "pink",
    "lavender",
    "maroon",
    "olive",
    "navy",
    "aquamarine",
    "gold",
    "coral",
];

/// Number of entries in [`COLOR_PALETTE`].
pub const PALETTE_SIZE: usize = COLOR_PALETTE.len();

/// Look up the palette index for a colour name.
pub fn color_index(name: &str) -> Option<usize> {
    COLOR_PALETTE.iter().position(|c| *c == name)
}
