//! Template location, loading, rendering, and copying
//!
//! - `root` / `resolver` / `selector`: find candidate templates across roots
//! - `fetcher`: download remote candidates into the cache
//! - `manifest`: load and render `template.yaml`
//! - `engine` / `pattern`: substitution engines and file globs
//! - `copier`: write the rendered tree into the project
//! - `version`: tool/template compatibility warnings

pub mod copier;
pub mod engine;
pub mod fetcher;
pub mod manifest;
pub mod pattern;
pub mod resolver;
pub mod root;
pub mod selector;
pub mod version;

pub use copier::{copy_template, ConflictPolicy, CopyOptions, WriteStatus, WrittenFile};
pub use engine::{Engine, Scope};
pub use fetcher::RemoteFetcher;
pub use manifest::{LoadedTemplate, TemplateContent, MANIFEST_FILE};
pub use resolver::{PathResolver, ProbeOutcome, ResolvedCandidate};
pub use root::{effective_roots, RootLocation};
pub use selector::{select, SelectedPath};
pub use version::check_compatibility;
