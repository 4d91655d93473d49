/// Fixed checkpoints reported while a deck is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Rasterize,
    Narrate,
    Synthesize,
    Composite,
    Complete,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Rasterize,
        Stage::Narrate,
        Stage::Synthesize,
        Stage::Composite,
        Stage::Complete,
    ];

    pub fn fraction(self) -> f64 {
        match self {
            Stage::Rasterize => 0.1,
            Stage::Narrate => 0.3,
            Stage::Synthesize => 0.6,
            Stage::Composite => 0.8,
            Stage::Complete => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Rasterize => "Parsing PPT slides...",
            Stage::Narrate => "Generating transcripts...",
            Stage::Synthesize => "Generating speech audio...",
            Stage::Composite => "Creating video...",
            Stage::Complete => "Complete!",
        }
    }

    /// Event code suffix, e.g. `pipeline.stage.narrate`.
    pub fn code(self) -> &'static str {
        match self {
            Stage::Rasterize => "rasterize",
            Stage::Narrate => "narrate",
            Stage::Synthesize => "synthesize",
            Stage::Composite => "composite",
            Stage::Complete => "complete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoints_increase_to_one() {
        let fractions: Vec<f64> = Stage::ALL.iter().map(|s| s.fraction()).collect();
        assert!(fractions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(fractions.last(), Some(&1.0));
    }
}
