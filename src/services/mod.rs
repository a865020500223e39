pub mod genie;

pub use genie::{
    AnalysisReport, AnalysisTarget, ConnectionStatus, GenieError, GenieService, QueryDescriptor,
    QueryResult,
};
