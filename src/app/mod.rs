// Collaborator boundaries consumed by the pipeline
pub mod ports;
