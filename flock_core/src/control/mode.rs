// flock_core/src/control/mode.rs

/// The operating mode selected by the external mode switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    /// Consensus-driven motion.
    Autonomous(u8),
    /// Manual pass-through; carries the raw mode code for telemetry.
    Manual(u8),
}

impl OperatingMode {
    /// Classifies a raw mode code. Codes in `autonomous_codes` enable
    /// autonomous control, every other code selects manual pass-through.
    pub fn from_code(code: u8, autonomous_codes: &[u8]) -> Self {
        if autonomous_codes.contains(&code) {
            OperatingMode::Autonomous(code)
        } else {
            OperatingMode::Manual(code)
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            OperatingMode::Autonomous(code) | OperatingMode::Manual(code) => *code,
        }
    }

    pub fn is_autonomous(&self) -> bool {
        matches!(self, OperatingMode::Autonomous(_))
    }
}

impl Default for OperatingMode {
    /// Agents boot in manual mode 0 until the mode switch says otherwise.
    fn default() -> Self {
        OperatingMode::Manual(0)
    }
}
