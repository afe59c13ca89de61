pub mod approval_step;
pub mod attachment;
pub mod line_item;
pub mod requisition;

pub use approval_step::{ApprovalStep, ApproverRole, StepStatus, APPROVAL_CHAIN};
pub use attachment::{Attachment, AttachmentCategory};
pub use line_item::LineItem;
pub use requisition::{ApprovalStatus, Requisition, RequisitionPatch};
