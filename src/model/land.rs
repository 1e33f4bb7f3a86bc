//! Land parcels: the external entity the engine schedules against.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

/// A managed crop parcel with a planting/harvest schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Land {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub active: bool,

    /// When the crop was last harvested (or planted, for a first cycle).
    pub previous_harvest_date: Option<Date>,

    /// Days between consecutive harvests for this land's crop.
    pub cycle_days: Option<i64>,

    /// Precomputed next harvest date, refreshed by harvest runs.
    pub next_harvest_date: Option<Date>,

    /// The user who owns the land. Receives its harvest notifications.
    pub creator_user_id: i64,
}

/// Fields for inserting a new land.
#[derive(Debug, Clone)]
pub struct NewLand {
    pub name: String,
    pub code: String,
    pub previous_harvest_date: Option<Date>,
    pub cycle_days: Option<i64>,
    pub creator_user_id: i64,
}
