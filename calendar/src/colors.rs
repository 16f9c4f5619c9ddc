// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use rand::Rng;

/// The fixed palette tasks are painted with on the calendar.
pub const TASK_PALETTE: [&str; 12] = [
    "#FF6B6B", // Coral red
    "#4ECDC4", // Turquoise
    "#45B7D1", // Sky blue
    "#FFA07A", // Light salmon
    "#98D8C8", // Mint
    "#F7DC6F", // Soft yellow
    "#BB8FCE", // Lavender
    "#85C1E2", // Light blue
    "#FF8B94", // Pink
    "#A8D8EA", // Powder blue
    "#FFD3A5", // Peach
    "#FD7272", // Salmon red
];

/// Picks a palette color uniformly at random.
pub fn random_task_color() -> String {
    pick_color(&mut rand::rng()).to_string()
}

/// Same as [`random_task_color`], drawing from the given generator.
pub fn pick_color<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    TASK_PALETTE[rng.random_range(0..TASK_PALETTE.len())]
}
