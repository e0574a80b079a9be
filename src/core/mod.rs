// ─── Game Launch Core ───
// Turns a declarative version description into a running game process.
//
// Architecture:
//   core/
//     version/    — Version JSON model, OS rules, manifest store
//     maven/      — Artifact coordinates → library paths
//     downloader/ — Mirror-aware downloads with SHA-1 validation
//     loaders/    — Literal grammar + forge-like installer pipeline
//     launch/     — Templating, classpath, native bootstrap, process spawn
//     java/       — Runtime descriptor + search paths
//     auth/       — Account collaborator
//     state/      — Orchestrator with single-flight guards

pub mod auth;
pub mod downloader;
pub mod error;
pub mod http;
pub mod java;
pub mod launch;
pub mod loaders;
pub mod maven;
pub mod paths;
pub mod progress;
pub mod settings;
pub mod state;
pub mod version;
