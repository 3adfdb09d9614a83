use std::fmt::Display;

/// Index into the canvas palette. Every value is a valid color because the
/// standard palette has exactly 256 entries.
pub type ColorIndex = u8;

/// Background / empty sentinel.
pub const BACKGROUND: ColorIndex = 0;

const SYSTEM_COLORS: [(&str, [u8; 3]); 16] = [
    ("Background", [0x00, 0x00, 0x00]),
    ("Maroon", [0x80, 0x00, 0x00]),
    ("Green", [0x00, 0x80, 0x00]),
    ("Olive", [0x80, 0x80, 0x00]),
    ("Navy", [0x00, 0x00, 0x80]),
    ("Purple", [0x80, 0x00, 0x80]),
    ("Teal", [0x00, 0x80, 0x80]),
    ("Silver", [0xC0, 0xC0, 0xC0]),
    ("Grey", [0x80, 0x80, 0x80]),
    ("Red", [0xFF, 0x00, 0x00]),
    ("Lime", [0x00, 0xFF, 0x00]),
    ("Yellow", [0xFF, 0xFF, 0x00]),
    ("Blue", [0x00, 0x00, 0xFF]),
    ("Fuchsia", [0xFF, 0x00, 0xFF]),
    ("Aqua", [0x00, 0xFF, 0xFF]),
    ("White", [0xFF, 0xFF, 0xFF]),
];

const CUBE_LEVELS: [u8; 6] = [0x00, 0x5F, 0x87, 0xAF, 0xD7, 0xFF];

lazy_static::lazy_static! {
    pub static ref DEFAULT_PALETTE: Palette = Palette::standard();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteColor {
    name: String,
    r: u8,
    g: u8,
    b: u8,
}

impl PaletteColor {
    pub fn new(name: impl Into<String>, r: u8, g: u8, b: u8) -> Self {
        Self { name: name.into(), r, g, b }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Display for PaletteColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.to_hex())
    }
}

/// Fixed, ordered list of named colors. Index 0 is the background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<PaletteColor>,
}

impl Palette {
    /// 16 system colors, a 6x6x6 color cube and a 24 step grey ramp.
    pub fn standard() -> Self {
        let mut colors = Vec::with_capacity(256);
        for (name, [r, g, b]) in SYSTEM_COLORS {
            colors.push(PaletteColor::new(name, r, g, b));
        }
        for (ri, r) in CUBE_LEVELS.iter().enumerate() {
            for (gi, g) in CUBE_LEVELS.iter().enumerate() {
                for (bi, b) in CUBE_LEVELS.iter().enumerate() {
                    colors.push(PaletteColor::new(format!("Cube {ri}-{gi}-{bi}"), *r, *g, *b));
                }
            }
        }
        for step in 0..24u8 {
            let level = 8 + step * 10;
            colors.push(PaletteColor::new(format!("Grey {}", step + 1), level, level, level));
        }
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn contains(&self, index: ColorIndex) -> bool {
        (index as usize) < self.colors.len()
    }

    pub fn get(&self, index: ColorIndex) -> Option<&PaletteColor> {
        self.colors.get(index as usize)
    }

    /// Color for `index`, falling back to the background entry.
    pub fn color(&self, index: ColorIndex) -> &PaletteColor {
        self.get(index).unwrap_or(&self.colors[BACKGROUND as usize])
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColorIndex, &PaletteColor)> {
        self.colors.iter().enumerate().map(|(i, c)| (i as ColorIndex, c))
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::standard()
    }
}
