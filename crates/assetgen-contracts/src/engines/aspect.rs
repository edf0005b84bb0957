use serde::{Serialize, Serializer};

/// Canonical aspect-ratio labels accepted by the fast engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AspectRatio {
    Square,
    Widescreen,
    Tall,
    Standard,
    StandardPortrait,
    Classic,
    ClassicPortrait,
}

impl AspectRatio {
    /// Candidate order; earlier entries win exact ties.
    pub const ALL: [AspectRatio; 7] = [
        AspectRatio::Square,
        AspectRatio::Widescreen,
        AspectRatio::Tall,
        AspectRatio::Standard,
        AspectRatio::StandardPortrait,
        AspectRatio::Classic,
        AspectRatio::ClassicPortrait,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Widescreen => "16:9",
            Self::Tall => "9:16",
            Self::Standard => "4:3",
            Self::StandardPortrait => "3:4",
            Self::Classic => "3:2",
            Self::ClassicPortrait => "2:3",
        }
    }

    pub fn dims(&self) -> (u32, u32) {
        match self {
            Self::Square => (1, 1),
            Self::Widescreen => (16, 9),
            Self::Tall => (9, 16),
            Self::Standard => (4, 3),
            Self::StandardPortrait => (3, 4),
            Self::Classic => (3, 2),
            Self::ClassicPortrait => (2, 3),
        }
    }

    pub fn ratio(&self) -> f64 {
        let (w, h) = self.dims();
        f64::from(w) / f64::from(h)
    }

    /// Label whose ratio is nearest to `width / height`.
    pub fn closest(width: u32, height: u32) -> Self {
        let target = f64::from(width) / f64::from(height);
        let mut best = Self::ALL[0];
        let mut best_diff = (best.ratio() - target).abs();
        for candidate in Self::ALL.iter().skip(1) {
            let diff = (candidate.ratio() - target).abs();
            if diff < best_diff {
                best = *candidate;
                best_diff = diff;
            }
        }
        best
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AspectRatio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
