//! Test fixtures for profiles, histories and engines

#![allow(dead_code)]

use perfcheck::check::DegradationChecker;
use perfcheck::config::ConfigStack;
use perfcheck::engine::HistoryEngine;
use perfcheck::profile::Profile;
use perfcheck::store::FsProfileStore;
use perfcheck::vcs::InMemoryRepository;
use std::path::Path;
use std::process::Command;

/// Every applicable rule runs: linear regression, then average amount
pub const ALL_RULES: &str = r#"
[degradation]
apply = "all"

[[degradation.strategies]]
method = "lreg"

[[degradation.strategies]]
method = "aat"
"#;

/// Only the first applicable rule runs
pub const FIRST_RULE: &str = r#"
[degradation]
apply = "first"

[[degradation.strategies]]
method = "lreg"

[[degradation.strategies]]
method = "aat"
"#;

/// `(uid, structure size, amount)` samples
pub type Samples = Vec<(String, f64, f64)>;

/// Samples with the same amount at sizes 1..=n
pub fn constant_samples(uid: &str, amount: f64, n: usize) -> Samples {
    (1..=n).map(|x| (uid.to_string(), x as f64, amount)).collect()
}

/// Samples growing by `slope` per unit of size, at sizes 1..=n
pub fn linear_samples(uid: &str, slope: f64, n: usize) -> Samples {
    (1..=n)
        .map(|x| (uid.to_string(), x as f64, slope * x as f64))
        .collect()
}

/// Profile JSON for `cmd` collected by `collector`
pub fn profile_json(cmd: &str, collector: &str, samples: &[(String, f64, f64)]) -> String {
    let resources: Vec<serde_json::Value> = samples
        .iter()
        .map(|(uid, size, amount)| {
            serde_json::json!({
                "amount": amount,
                "uid": uid,
                "type": "mixed",
                "structure-unit-size": size,
            })
        })
        .collect();
    serde_json::json!({
        "header": {"cmd": cmd, "workload": "default"},
        "collector_info": {"name": collector},
        "postprocessors": [{"name": "regression_analysis"}],
        "resources": resources,
    })
    .to_string()
}

/// Profile for `cmd` collected by the `time` collector
pub fn profile(cmd: &str, samples: &[(String, f64, f64)]) -> Profile {
    Profile::from_json(&profile_json(cmd, "time", samples)).expect("fixture profile must parse")
}

/// Configuration stack with one local scope
pub fn config(toml: &str) -> ConfigStack {
    let mut config = ConfigStack::new();
    config.push_toml("local", toml).expect("fixture config must parse");
    config
}

/// History where every commit has the previous one as parent
pub fn linear_history(checksums: &[&str]) -> InMemoryRepository {
    let mut repo = InMemoryRepository::new();
    let mut parent: Option<&str> = None;
    for checksum in checksums {
        let parents: Vec<&str> = parent.into_iter().collect();
        repo.add_commit(checksum, &parents);
        parent = Some(*checksum);
    }
    repo
}

/// a - b - d
///   \ c /
pub fn diamond() -> InMemoryRepository {
    let mut repo = InMemoryRepository::new();
    repo.add_commit("a", &[])
        .add_commit("b", &["a"])
        .add_commit("c", &["a"])
        .add_commit("d", &["b", "c"]);
    repo
}

/// Engine over `repo` storing into `root`
pub fn engine<V: perfcheck::vcs::VersionControl>(
    repo: V,
    root: &Path,
    toml: &str,
) -> HistoryEngine<V, FsProfileStore> {
    let checker = DegradationChecker::from_config(&config(toml)).expect("fixture checker");
    HistoryEngine::new(repo, FsProfileStore::open(root), checker)
}

/// Write `.perfcheck/config.toml` under `root`
pub fn write_config(root: &Path, toml: &str) -> anyhow::Result<()> {
    let dir = root.join(".perfcheck");
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("config.toml"), toml)?;
    Ok(())
}

/// Initialize a git repository with `count` empty commits, returning their checksums
pub fn init_git_repo(root: &Path, count: usize) -> anyhow::Result<Vec<String>> {
    let git = |args: &[&str]| -> anyhow::Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(root)
            .args(["-c", "user.name=perfcheck", "-c", "user.email=perfcheck@example.com"])
            .args(args)
            .output()?;
        anyhow::ensure!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    };

    git(&["init", "-q"])?;
    let mut checksums = Vec::new();
    for i in 0..count {
        git(&["commit", "-q", "--allow-empty", "-m", &format!("commit {}", i)])?;
        checksums.push(git(&["rev-parse", "HEAD"])?);
    }
    Ok(checksums)
}
