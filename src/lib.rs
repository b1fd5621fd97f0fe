pub mod ai;
pub mod api_router;
pub mod approvals;
pub mod audit;
pub mod budgets;
pub mod clients;
pub mod config;
pub mod identity;
pub mod intake;
pub mod qa;
pub mod reporting;
pub mod shared;
