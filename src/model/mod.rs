pub mod error;
pub mod layout;
pub mod mspeirv;
pub mod named;
pub mod params;
pub mod rates;
pub mod sia;
