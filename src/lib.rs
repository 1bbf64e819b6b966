pub mod backup;
pub mod commands;
pub mod doctor;
pub mod error;
pub mod logging;
pub mod mappings;
pub mod paths;
pub mod planner;
pub mod profiles;
pub mod reconciler;
pub mod state;
pub mod switch;
pub mod ui;

#[cfg(test)]
pub mod test_utils;
