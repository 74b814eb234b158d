pub mod csv_import;
pub mod email;
pub mod gateway;
pub mod invoicing;
pub mod iugu;
pub mod reconciliation;
pub mod schedule;
pub mod split;
