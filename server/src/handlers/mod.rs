pub mod dashboard_handlers;
pub mod draft_handlers;
