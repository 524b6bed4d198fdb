//! Testing utilities and harness for Ripple

pub mod reconciler;
pub mod rule;
pub mod tree;

pub use reconciler::{RecordingReconciler, RenderLog, RenderRecord, RenderScript, ScriptTable};
pub use rule::{run_test_rule, ManualTrigger, TestRule};

pub mod prelude {
    pub use crate::reconciler::*;
    pub use crate::rule::*;
    pub use crate::tree;
}
