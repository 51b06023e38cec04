use thiserror::Error;

use crate::infra::Cell;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("layout has no hostage")]
    MissingHostage,

    #[error("layout has no exits")]
    MissingExits,

    #[error("layout has no agent start cell")]
    MissingAgentStart,

    #[error("no fire ignition cell configured")]
    MissingIgnition,

    #[error("cell {cell} is outside the {width}x{height} grid")]
    OutOfBounds { cell: Cell, width: i32, height: i32 },

    #[error("cell {cell} cannot hold the {what}")]
    Blocked { cell: Cell, what: &'static str },

    #[error("malformed layout at line {line}: {reason}")]
    Layout { line: usize, reason: String },

    #[error("invalid value {value:?} for {key}")]
    InvalidConfig { key: String, value: String },

    #[error("could not format trace timestamp: {0}")]
    Timestamp(String),

    #[error("trace file error: {0}")]
    Io(#[from] std::io::Error),
}
