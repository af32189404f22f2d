//! Parameter-space search over simulation runs.

pub mod walkforward;

pub use walkforward::{
    CancelToken, ParamStability, WalkForwardConfig, WalkForwardOptimizer, WalkForwardResult,
    Window, WindowRecord,
};
