mod artifact;

pub use artifact::{compare_versions, MavenArtifact};

/// Repositories consulted when a library carries no explicit download URL.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net";
pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";
pub const FORGE_MAVEN: &str = "https://maven.minecraftforge.net";
pub const NEOFORGE_MAVEN: &str = "https://maven.neoforged.net/releases";

/// Mirror list for a library coordinate, most specific repository first.
pub fn mirror_urls(artifact: &MavenArtifact, preferred_repo: Option<&str>) -> Vec<String> {
    let mut urls = Vec::new();
    if let Some(repo) = preferred_repo {
        urls.push(artifact.url(repo));
    }
    for repo in [MOJANG_LIBRARIES, FORGE_MAVEN, NEOFORGE_MAVEN, MAVEN_CENTRAL] {
        let url = artifact.url(repo);
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}
