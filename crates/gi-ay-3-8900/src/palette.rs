//! The sixteen Intellivision colours as ARGB32.

pub const PALETTE: [u32; 16] = [
    0xFF00_0000, // black
    0xFF00_2DFF, // blue
    0xFFFF_3D10, // red
    0xFFC9_CFAB, // tan
    0xFF38_6B3F, // dark green
    0xFF00_A756, // green
    0xFFFA_EA50, // yellow
    0xFFFF_FCFF, // white
    0xFFBD_ACC8, // grey
    0xFF24_B8FF, // cyan
    0xFFFF_B41F, // orange
    0xFF54_6E00, // brown
    0xFFFF_4E57, // pink
    0xFFA4_96FF, // light blue
    0xFF75_CC80, // yellow-green
    0xFFB5_1A58, // purple
];
