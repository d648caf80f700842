pub mod day_type;
pub mod dedupe;
pub mod marker;
pub mod models;
pub mod places;
pub mod wall_clock;
