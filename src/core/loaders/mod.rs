pub mod archive;
pub mod context;
pub mod forge;
pub mod installer;
pub mod literal;
pub mod processor;
pub mod profile;
pub mod schedule;

pub use context::InstallContext;
pub use installer::{is_installed, InstallKey, InstallRequest, InstallResult, ModLoader, ModLoaderInstaller};
pub use literal::{parse_literal, parse_literal_plain, parse_options, replace_tokens, ProcessorOptions};
pub use processor::{JavaProcessorRunner, ProcessorRunner};
pub use profile::{merge_documents, Processor};
