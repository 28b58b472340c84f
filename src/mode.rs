//! Graph processing modes.

/// What one graph evaluation produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProcessMode {
    /// Output a displayable terrain for the current chunk
    #[default]
    Normal,
    /// Output the coarse precomputation maps a chunk needs before fine
    /// terrain can be derived (terrain, wetness, temperature)
    Geologic,
}

impl ProcessMode {
    pub fn all() -> &'static [Self] {
        &[Self::Normal, Self::Geologic]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Normal => "Displayable terrain output",
            Self::Geologic => "Coarse precomputation maps",
        }
    }
}

impl std::fmt::Display for ProcessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Geologic => write!(f, "geologic"),
        }
    }
}
