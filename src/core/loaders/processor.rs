// ─── Processor Execution ───
// Runs an installer's processors in declaration order, skipping any whose
// declared outputs are already on disk with the expected SHA-1.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::literal::{parse_literal_plain, parse_options};
use super::profile::Processor;
use crate::core::downloader::file_sha1;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::classpath::join_classpath;
use crate::core::maven::MavenArtifact;

pub const CLIENT_SIDE: &str = "client";
pub const DOWNLOAD_MOJMAPS_TASK: &str = "DOWNLOAD_MOJMAPS";

/// A resolved `java -cp <classpath> <main> <args…>` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorInvocation {
    pub jar: String,
    pub classpath: Vec<PathBuf>,
    pub main_class: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl ProcessorInvocation {
    /// Arguments after the java binary.
    pub fn java_args(&self) -> Vec<String> {
        let mut argv = vec![
            "-cp".to_string(),
            join_classpath(&self.classpath),
            self.main_class.clone(),
        ];
        argv.extend(self.args.iter().cloned());
        argv
    }
}

#[async_trait]
pub trait ProcessorRunner: Send + Sync {
    /// Exit code of the tool, `None` when it died from a signal.
    async fn run(&self, invocation: &ProcessorInvocation) -> LauncherResult<Option<i32>>;
}

/// Runs processors with a Java runtime's `bin/java`.
pub struct JavaProcessorRunner {
    java: PathBuf,
}

impl JavaProcessorRunner {
    pub fn new(java: impl Into<PathBuf>) -> Self {
        Self { java: java.into() }
    }
}

#[async_trait]
impl ProcessorRunner for JavaProcessorRunner {
    async fn run(&self, invocation: &ProcessorInvocation) -> LauncherResult<Option<i32>> {
        let output = Command::new(&self.java)
            .args(invocation.java_args())
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| LauncherError::JavaExecution(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            debug!("[{}] stdout:\n{}", invocation.jar, stdout.trim_end());
        }
        if !output.status.success() && !stderr.trim().is_empty() {
            warn!("[{}] stderr:\n{}", invocation.jar, stderr.trim_end());
        }

        Ok(output.status.code())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorSummary {
    pub executed: usize,
    pub skipped: usize,
}

/// Run every client-side processor against the game root `root`.
///
/// `on_step(done, total)` is called after each processor, run or skipped.
pub async fn run_processors(
    processors: &[Processor],
    vars: &HashMap<String, String>,
    root: &Path,
    runner: &dyn ProcessorRunner,
    on_step: &(dyn Fn(usize, usize) + Send + Sync),
) -> LauncherResult<ProcessorSummary> {
    let mut summary = ProcessorSummary::default();
    let total = processors.len();

    for (index, processor) in processors.iter().enumerate() {
        let ran = run_processor(processor, vars, root, runner).await?;
        if ran {
            summary.executed += 1;
        } else {
            summary.skipped += 1;
        }
        on_step(index + 1, total);
    }

    info!(
        "Processors finished: {} executed, {} skipped",
        summary.executed, summary.skipped
    );
    Ok(summary)
}

/// `Ok(false)` when the processor was skipped.
async fn run_processor(
    processor: &Processor,
    vars: &HashMap<String, String>,
    root: &Path,
    runner: &dyn ProcessorRunner,
) -> LauncherResult<bool> {
    if !processor.is_side(CLIENT_SIDE) {
        debug!("Skipping non-client processor {}", processor.jar);
        return Ok(false);
    }

    let options = parse_options(root, &processor.args, vars)?;
    if options.get("task") == Some(DOWNLOAD_MOJMAPS_TASK) {
        debug!("Skipping {} (mappings are downloaded up front)", processor.jar);
        return Ok(false);
    }

    let outputs = resolve_outputs(processor, vars, root)?;
    if !outputs.is_empty() && missing_outputs(&outputs).await? == 0 {
        info!("Outputs of {} already present, skipping", processor.jar);
        return Ok(false);
    }

    let libraries = root.join("libraries");
    let jar = library_file(&libraries, &processor.jar)?;
    if !jar.is_file() {
        return Err(LauncherError::MissingProcessorDependency(jar));
    }

    let manifest_jar = jar.clone();
    let main_class = tokio::task::spawn_blocking(move || read_main_class_from_jar(&manifest_jar))
        .await
        .map_err(|e| LauncherError::Other(format!("Task join error: {e}")))??;
    if main_class.trim().is_empty() {
        return Err(LauncherError::InvalidInstaller(format!(
            "Main-Class missing in processor jar {}",
            jar.display()
        )));
    }

    let mut classpath = Vec::with_capacity(processor.classpath.len() + 1);
    for coord in &processor.classpath {
        let entry = library_file(&libraries, coord)?;
        if !entry.is_file() {
            return Err(LauncherError::MissingProcessorDependency(entry));
        }
        classpath.push(entry);
    }
    classpath.push(jar);

    let args = processor
        .args
        .iter()
        .map(|arg| required_literal(root, arg, vars))
        .collect::<LauncherResult<Vec<_>>>()?;

    let invocation = ProcessorInvocation {
        jar: processor.jar.clone(),
        classpath,
        main_class,
        args,
        cwd: root.to_path_buf(),
    };

    info!(
        "Running processor {} with main class {}",
        invocation.jar, invocation.main_class
    );
    debug!("Processor args: {:?}", invocation.args);

    let code = runner.run(&invocation).await?;
    if code != Some(0) {
        return Err(LauncherError::ProcessorFailed {
            jar: processor.jar.clone(),
            code,
        });
    }

    verify_outputs(&outputs).await?;
    Ok(true)
}

/// `(path, expected sha1)` pairs; keys resolve against `root`.
fn resolve_outputs(
    processor: &Processor,
    vars: &HashMap<String, String>,
    root: &Path,
) -> LauncherResult<Vec<(PathBuf, String)>> {
    processor
        .outputs()
        .map(|(key, value)| {
            let path = required_literal(root, key, vars)?;
            let sha1 = required_literal(root, value, vars)?;
            Ok((root.join(path), sha1))
        })
        .collect()
}

/// Count outputs that are absent or wrong. Wrong ones are deleted.
async fn missing_outputs(outputs: &[(PathBuf, String)]) -> LauncherResult<usize> {
    let mut missing = 0;
    for (path, expected) in outputs {
        if !path.is_file() {
            missing += 1;
            continue;
        }
        let actual = file_sha1(path).await?;
        if !actual.eq_ignore_ascii_case(expected) {
            warn!(
                "Stale processor output {:?} (expected {}, got {}), deleting",
                path, expected, actual
            );
            remove_file(path).await?;
            missing += 1;
        }
    }
    Ok(missing)
}

async fn verify_outputs(outputs: &[(PathBuf, String)]) -> LauncherResult<()> {
    for (path, expected) in outputs {
        if !path.is_file() {
            return Err(LauncherError::OutputMissing(path.clone()));
        }
        let actual = file_sha1(path).await?;
        if !actual.eq_ignore_ascii_case(expected) {
            remove_file(path).await?;
            return Err(LauncherError::Sha1Mismatch {
                path: path.clone(),
                expected: expected.clone(),
                actual,
            });
        }
    }
    Ok(())
}

async fn remove_file(path: &Path) -> LauncherResult<()> {
    tokio::fs::remove_file(path)
        .await
        .map_err(|e| LauncherError::io(path, e))
}

fn required_literal(root: &Path, literal: &str, vars: &HashMap<String, String>) -> LauncherResult<String> {
    parse_literal_plain(root, literal, vars)?.ok_or_else(|| LauncherError::MissingVariable {
        key: literal.trim_matches(|c| c == '{' || c == '}').to_string(),
        pattern: literal.to_string(),
    })
}

fn library_file(libraries: &Path, coord: &str) -> LauncherResult<PathBuf> {
    let artifact = MavenArtifact::parse(coord)?;
    Ok(libraries.join(artifact.local_path()))
}

/// `Main-Class` from a jar's `META-INF/MANIFEST.MF`, continuation lines
/// folded in. Empty when the attribute is absent.
pub fn read_main_class_from_jar(path: &Path) -> LauncherResult<String> {
    let file = std::fs::File::open(path).map_err(|e| LauncherError::io(path, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut manifest = archive.by_name("META-INF/MANIFEST.MF").map_err(|e| {
        LauncherError::InvalidInstaller(format!("Manifest not found in {}: {}", path.display(), e))
    })?;

    let mut text = String::new();
    manifest
        .read_to_string(&mut text)
        .map_err(|e| LauncherError::io(path, e))?;

    Ok(main_class_attribute(&text).unwrap_or_default())
}

fn main_class_attribute(manifest: &str) -> Option<String> {
    let mut main_class: Option<String> = None;
    let mut in_main_class = false;

    for line in manifest.lines() {
        if let Some(rest) = line.strip_prefix(' ') {
            if in_main_class {
                if let Some(value) = &mut main_class {
                    value.push_str(rest.trim_end());
                }
            }
            continue;
        }

        in_main_class = false;
        if let Some((key, value)) = line.split_once(':') {
            if key.trim() == "Main-Class" {
                main_class = Some(value.trim().to_string());
                in_main_class = true;
            }
        }
    }

    main_class
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records invocations and writes fixed content to chosen output paths,
    /// standing in for the real tool.
    #[derive(Clone, Default)]
    pub struct FakeRunner {
        pub calls: Arc<Mutex<Vec<ProcessorInvocation>>>,
        pub writes: Vec<(PathBuf, Vec<u8>)>,
        pub exit_code: i32,
    }

    impl FakeRunner {
        pub fn writing(writes: Vec<(PathBuf, Vec<u8>)>) -> Self {
            Self {
                writes,
                ..Self::default()
            }
        }

        pub fn count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ProcessorRunner for FakeRunner {
        async fn run(&self, invocation: &ProcessorInvocation) -> LauncherResult<Option<i32>> {
            self.calls.lock().unwrap().push(invocation.clone());
            for (path, bytes) in &self.writes {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).unwrap();
                }
                std::fs::write(path, bytes).unwrap();
            }
            Ok(Some(self.exit_code))
        }
    }

    /// A jar with a manifest naming `main_class`.
    pub fn write_tool_jar(path: &Path, main_class: &str) {
        let manifest = format!("Manifest-Version: 1.0\r\nMain-Class: {}\r\n\r\n", main_class);
        crate::core::loaders::archive::testing::write_zip(
            path,
            &[("META-INF/MANIFEST.MF", manifest.as_bytes())],
        );
    }
}
