pub mod claim;
pub mod intake;
pub mod notification;

pub use claim::{new_claim_id, Claim, ClaimStatus, ClaimSummary, Completion};
pub use intake::{IntakeRequest, IntakeResponse, ListClaimsQuery, UploadCredential};
pub use notification::{
    BatchReport, FinalizeOutcome, NotificationEnvelope, NotificationFailure, UploadNotification,
};
