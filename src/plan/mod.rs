//! Planning pipeline: categorization, project detection, template rendering
//! and conflict resolution feeding the plan builder.

pub mod builder;
pub mod category;
pub mod conflict;
pub mod project;
pub mod template;

pub use builder::PlanBuilder;
pub use category::Categorizer;
pub use conflict::{ConflictResolver, PromptChoice, PromptResponder, Resolution};
pub use project::ProjectDetector;
pub use template::{render_filename, render_structure};
