pub mod admin_service;
pub mod canvas_service;
pub mod ticket_service;
pub mod tier_service;

pub use admin_service::{AdminService, AdminStats};
pub use canvas_service::CanvasService;
pub use ticket_service::TicketService;
pub use tier_service::TierService;
