pub mod normalize;
pub mod prompt;
pub mod registry;
pub mod validate;

pub use normalize::{normalize, parse_from_first_brace, NormalizedResult};
pub use prompt::{build, PromptPayload, NO_TEXT_PLACEHOLDER};
pub use registry::{
    ActionRegistry, ActionTemplate, Addendum, RenderOptions, FALLBACK_ACTION,
};
pub use validate::{validate, EditRequest, RequestDefaults, TEXT_REQUIRED};
