pub mod general;
pub mod invoice;
pub mod reconciliation;
pub mod schedule;
pub mod split;
pub mod webhook;
