// Ticket-export pipeline: tabular consolidation and record updates

pub mod classify;
pub mod merge;
pub mod processor;
pub mod schema;
pub mod storage;
pub mod table;
pub mod tasks;
