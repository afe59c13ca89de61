// Approval workflow
pub mod approval;

// Line items and totals
pub mod ledger;

// Supporting documents
pub mod attachments;

// Post-approval purchasing records
pub mod procurement;

// Reporting
pub mod dashboard;
