pub mod doctor;
pub mod generate;
pub mod ingest;
pub mod onboard;
pub mod run;
