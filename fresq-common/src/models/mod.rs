// File: fresq-common/src/models/mod.rs
pub mod code;
pub mod grid;
pub mod tier;
pub mod ticket;

pub use code::{
    CellState, ClaimOutcome, ClaimRejection, Code, CodeSource, CodeStats, PaintOutcome,
    PaintRejection, PaintedCell,
};
pub use grid::{CanvasSnapshot, GridConfig, Palette};
pub use tier::{GridExpansion, Tier, TierProgress, TierUpgrade};
pub use ticket::{
    NewPackConfig, NewTicket, PackConfig, PackStats, PackUpdate, Ticket, TicketConfirmation,
    TicketStats, TicketStatus,
};
