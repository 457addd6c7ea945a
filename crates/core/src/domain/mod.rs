pub mod contract;
pub mod decision;
