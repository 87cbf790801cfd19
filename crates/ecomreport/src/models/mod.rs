pub mod report;

pub use report::{
    OutputMode, REPORT_SCHEMA_VERSION, ReportEnvelope, ScalarSummary, StepOutput, StepRecord,
    json_schema,
};
