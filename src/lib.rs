pub mod math;
pub mod model;
pub mod io;

pub use model::error::ModelError;
pub use model::layout::{Cohort, Compartment, ModelLayout, ParamLayout, StateLayout};
pub use model::mspeirv::{MspeirvModel, MspeirvState};
pub use model::named::NamedVector;
pub use model::params::MspeirvParams;
pub use model::rates::{rates, rates_into};
pub use model::sia::{apply_sia, apply_sia_in_place, Campaign, CampaignSchedule};
