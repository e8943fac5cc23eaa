use log::info;

pub const MIN_DIFFICULTY: u32 = 1;
pub const MAX_DIFFICULTY: u32 = 8;
pub const DEFAULT_DIFFICULTY: u32 = 2;

/// Number of leading zero hex digits a block hash must carry.
///
/// Always within [`MIN_DIFFICULTY`, `MAX_DIFFICULTY`]; out-of-range inputs
/// are clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Difficulty(u32);

impl Difficulty {
    pub fn new(value: u32) -> Difficulty {
        let clamped = value.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        if clamped != value {
            info!("Difficulty {value} out of range, clamped to {clamped}");
        }
        Difficulty(clamped)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// The zero prefix a satisfying hash starts with.
    pub fn target_prefix(self) -> String {
        "0".repeat(self.0 as usize)
    }

    pub fn is_satisfied_by(self, hash: &str) -> bool {
        let required = self.0 as usize;
        hash.len() >= required && hash.bytes().take(required).all(|b| b == b'0')
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty(DEFAULT_DIFFICULTY)
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
