use core::fmt;

/// Reason execution trapped.
///
/// A trap unwinds the running [`Instance`](https://docs.rs/wembed) to its
/// host boundary, clearing every stack it owns. It is always recoverable:
/// the instance stays alive, in a trapped state, until the host calls
/// `restart()`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrapCode {
    /// `unreachable` instruction executed.
    Unreachable,
    /// Out-of-bounds memory access.
    MemoryAccessOutOfBounds,
    /// Attempt to divide by zero.
    DivisionByZero,
    /// Attempt to do signed division `MIN_VALUE / -1`.
    IntegerOverflow,
    /// Attempt to truncate a NaN or an out-of-range float into an integer.
    InvalidConversionToInt,
    /// Stack overflowed.
    StackOverflow,
}

impl TrapCode {
    /// Message that describes this trap code, in the style `wasm-interp` and
    /// other reference tooling uses for diagnostics.
    pub fn trap_message(&self) -> &'static str {
        match self {
            TrapCode::Unreachable => "unreachable",
            TrapCode::MemoryAccessOutOfBounds => "out of bounds memory access",
            TrapCode::DivisionByZero => "integer divide by zero",
            TrapCode::IntegerOverflow => "integer overflow",
            TrapCode::InvalidConversionToInt => "invalid conversion to integer",
            TrapCode::StackOverflow => "call stack exhausted",
        }
    }
}

impl fmt::Display for TrapCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.trap_message())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TrapCode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_non_empty() {
        for code in [
            TrapCode::Unreachable,
            TrapCode::MemoryAccessOutOfBounds,
            TrapCode::DivisionByZero,
            TrapCode::IntegerOverflow,
            TrapCode::InvalidConversionToInt,
            TrapCode::StackOverflow,
        ] {
            assert!(!code.trap_message().is_empty());
        }
    }
}
