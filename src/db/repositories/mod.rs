pub mod blocks;
pub mod deadline;
