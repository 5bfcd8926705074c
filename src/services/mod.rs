pub mod rights_service;

pub use rights_service::{RightsService, RightsServiceError};
