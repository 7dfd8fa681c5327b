use crate::types::{FileCategory, FileClassification};

/// Classify a path into a category and risk tier.
///
/// Pure function of the path string: `\` is normalized to `/`, matching is
/// case-insensitive, and unrecognized or empty paths fall through to
/// [`FileCategory::Other`] rather than failing.
pub fn classify(path: &str) -> FileClassification {
    let normalized = path.replace('\\', "/");
    let category = categorize(&normalized.to_lowercase());
    FileClassification {
        path: normalized,
        category,
        tier: category.tier(),
    }
}

/// Category inference over a lowercased, slash-normalized path.
/// Critical categories are matched first so e.g. `migrations/setup.test.sql`
/// never downgrades to `test`.
fn categorize(path: &str) -> FileCategory {
    let name = file_name(path);
    let ext = extension(name);

    // env files: `.env`, `.env.local`, `config/.env.production`
    if name.starts_with(".env") {
        return FileCategory::Env;
    }

    // key material and credential files
    if matches!(ext, "pem" | "key" | "p12" | "pfx" | "jks" | "keystore")
        || name.starts_with("id_rsa")
        || name.starts_with("id_ed25519")
        || name.contains("credential")
        || name.contains("secret")
        || has_segment(path, "secrets")
    {
        return FileCategory::SecretCandidates;
    }

    if has_segment(path, "migrations") || has_segment(path, "migrate") {
        return FileCategory::Migrations;
    }

    if path.contains(".github/workflows/")
        || path.contains(".circleci/")
        || matches!(
            name,
            ".gitlab-ci.yml" | ".travis.yml" | "jenkinsfile" | "azure-pipelines.yml"
        )
    {
        return FileCategory::CiConfig;
    }

    if matches!(
        name,
        "package.json"
            | "package-lock.json"
            | "yarn.lock"
            | "pnpm-lock.yaml"
            | "cargo.lock"
            | "go.mod"
            | "go.sum"
            | "gemfile"
            | "gemfile.lock"
            | "poetry.lock"
            | "requirements.txt"
            | "pipfile"
            | "pipfile.lock"
    ) {
        return FileCategory::Dependencies;
    }

    if name == "dockerfile"
        || name.starts_with("docker-compose")
        || matches!(ext, "tf" | "tfvars")
        || has_segment(path, "terraform")
        || has_segment(path, "k8s")
        || has_segment(path, "kubernetes")
        || has_segment(path, "helm")
    {
        return FileCategory::Infrastructure;
    }

    if matches!(
        name,
        "makefile"
            | "cmakelists.txt"
            | "cargo.toml"
            | "build.gradle"
            | "build.gradle.kts"
            | "pom.xml"
            | "tsconfig.json"
            | "setup.py"
            | "pyproject.toml"
    ) || name.starts_with("webpack.config")
        || name.starts_with("vite.config")
        || name.starts_with("rollup.config")
        || name.starts_with("babel.config")
    {
        return FileCategory::BuildConfig;
    }

    // test files before source: `foo.test.ts` has a source extension too
    if name.contains(".test.")
        || name.contains(".spec.")
        || name.starts_with("test_")
        || has_segment(path, "tests")
        || has_segment(path, "test")
        || has_segment(path, "__tests__")
    {
        return FileCategory::Test;
    }

    if matches!(ext, "md" | "rst" | "adoc" | "txt") || has_segment(path, "docs") {
        return FileCategory::Documentation;
    }

    if matches!(
        ext,
        "rs" | "ts"
            | "tsx"
            | "js"
            | "jsx"
            | "mjs"
            | "cjs"
            | "py"
            | "go"
            | "java"
            | "rb"
            | "c"
            | "h"
            | "cpp"
            | "hpp"
            | "cc"
            | "cs"
            | "php"
            | "swift"
            | "kt"
            | "scala"
            | "vue"
            | "svelte"
    ) {
        return FileCategory::Source;
    }

    if matches!(ext, "json" | "yaml" | "yml" | "toml" | "ini" | "cfg" | "conf" | "properties") {
        return FileCategory::Config;
    }

    FileCategory::Other
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => "",
    }
}

fn has_segment(path: &str, segment: &str) -> bool {
    path.split('/').any(|s| s == segment)
}
