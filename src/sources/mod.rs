pub mod data_gov;
pub mod traits;

pub use data_gov::{DataGovClient, LiveAvailability};
pub use traits::{AvailabilitySource, FetchError};
