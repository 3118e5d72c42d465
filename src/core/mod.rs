pub mod intake;
pub mod policy;
pub mod workflow;

pub use crate::domain::model::{Claim, Claimant, ReimbursementOutcome};
pub use crate::domain::ports::{ConfigProvider, PaymentNetwork, TaskAgent};
pub use crate::utils::error::Result;
