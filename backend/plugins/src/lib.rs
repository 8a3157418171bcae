pub mod manifest;
pub mod protocol;
pub mod registry;
pub mod scaffold;
pub mod service;
pub mod store;
pub mod template;
pub mod templates;
pub mod validation;

pub use manifest::{PluginEntry, PluginManifest, PluginSource, Upsert};
pub use protocol::{dispatch, handle_line, serve, ErrorCode, ProtocolError, Request, Response};
pub use registry::{ManifestLoadResult, PluginOpResult, PluginRegistry};
pub use scaffold::{ScaffoldPipeline, ScaffoldState};
pub use service::{PluginService, ScaffoldOutcome};
pub use store::ManifestStore;
pub use template::{render, render_escaped, Escape, TemplateContext};
pub use templates::{BuiltinTemplates, DirectoryTemplates, FileKind, TemplateSource};
pub use validation::{validate_entry, validate_manifest, ValidationError, ValidationIssue};
