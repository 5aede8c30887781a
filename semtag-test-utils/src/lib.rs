//! semtag Test Utilities
//!
//! Shared test infrastructure for the semtag workspace:
//! - Proptest generators for core types
//! - Throwaway git repositories with deterministic commit dates
//! - Assertions over tags and file headers

pub use semtag_core::{
    Component, ComponentId, ComponentStatus, ComponentType, FileHeader, SemVer, TagNamespace,
    Timestamp, VersionHistoryEntry,
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::process::Command;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for semtag types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_component_type() -> impl Strategy<Value = ComponentType> {
        proptest::sample::select(ComponentType::ALL.to_vec())
    }

    pub fn arb_namespace() -> impl Strategy<Value = TagNamespace> {
        prop_oneof![Just(TagNamespace::Components), Just(TagNamespace::Logic)]
    }

    /// Release version (no prerelease).
    pub fn arb_semver() -> impl Strategy<Value = SemVer> {
        (0u64..30, 0u64..30, 0u64..30).prop_map(|(a, b, c)| SemVer::new(a, b, c))
    }

    /// Version with an optional `rc.N` prerelease.
    pub fn arb_semver_any() -> impl Strategy<Value = SemVer> {
        (arb_semver(), proptest::option::of(0u64..5)).prop_map(|(mut v, pre)| {
            v.pre = pre.map(|n| format!("rc.{}", n));
            v
        })
    }

    /// Valid component name.
    pub fn arb_component_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,10}(-[a-z0-9]{1,6}){0,2}"
    }

    /// Environment token that never looks like a version.
    pub fn arb_environment() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,10}"
    }

    pub fn arb_component_id() -> impl Strategy<Value = ComponentId> {
        "[0-9a-f]{8}".prop_filter_map("valid id", |s| ComponentId::parse(&s).ok())
    }

    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // 2020-2030
        (1577836800i64..1893456000i64).prop_map(|secs| {
            DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    pub fn arb_commit_id() -> impl Strategy<Value = String> {
        "[0-9a-f]{40}"
    }

    pub fn arb_history_entry(path: String) -> impl Strategy<Value = VersionHistoryEntry> {
        (arb_semver(), arb_commit_id(), arb_timestamp(), "[a-z ]{0,20}").prop_map(
            move |(version, commit, timestamp, message)| VersionHistoryEntry {
                version,
                commit,
                timestamp,
                path: path.clone(),
                message,
            },
        )
    }

    pub fn arb_component() -> impl Strategy<Value = Component> {
        (
            arb_component_id(),
            arb_component_name(),
            arb_component_type(),
            arb_semver(),
        )
            .prop_map(|(id, name, component_type, version)| {
                let path = format!("{}/{}.txt", component_type.plural(), name);
                Component::new(id, name, component_type, path, version)
            })
    }
}

// ============================================================================
// GIT FIXTURES
// ============================================================================

pub mod fixtures {
    //! Temporary git repositories.
    //!
    //! Commits get fixed, increasing dates (one hour apart from 2024-01-01)
    //! unless a date is given, so history searches are reproducible.

    use super::*;

    /// True if a `git` binary is on PATH.
    pub fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Start of the fixture clock.
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// A scratch repository, deleted on drop.
    pub struct FixtureRepo {
        dir: tempfile::TempDir,
        remote: Option<tempfile::TempDir>,
        commits: i64,
    }

    impl FixtureRepo {
        /// Initialise a repository. None when git is unavailable.
        pub fn new() -> Option<Self> {
            if !git_available() {
                return None;
            }
            let dir = tempfile::tempdir().ok()?;
            let repo = Self {
                dir,
                remote: None,
                commits: 0,
            };
            repo.git(&["init", "-q"]);
            repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
            repo.git(&["config", "user.name", "Fixture"]);
            repo.git(&["config", "user.email", "fixture@example.com"]);
            repo.git(&["config", "commit.gpgsign", "false"]);
            repo.git(&["config", "tag.gpgsign", "false"]);
            Some(repo)
        }

        /// Initialise a repository with a bare `origin` remote.
        pub fn with_remote() -> Option<Self> {
            let mut repo = Self::new()?;
            let remote = tempfile::tempdir().ok()?;
            run_git(remote.path(), &["init", "-q", "--bare"], &[]);
            let url = remote.path().display().to_string();
            repo.git(&["remote", "add", "origin", &url]);
            repo.remote = Some(remote);
            Some(repo)
        }

        pub fn root(&self) -> &Path {
            self.dir.path()
        }

        pub fn path(&self, rel: &str) -> PathBuf {
            self.root().join(rel)
        }

        pub fn write(&self, rel: &str, contents: &str) {
            let path = self.path(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create fixture dir");
            }
            std::fs::write(path, contents).expect("write fixture file");
        }

        pub fn read(&self, rel: &str) -> String {
            std::fs::read_to_string(self.path(rel)).expect("read fixture file")
        }

        pub fn remove(&self, rel: &str) {
            std::fs::remove_file(self.path(rel)).expect("remove fixture file");
        }

        pub fn rename(&self, from: &str, to: &str) {
            let dest = self.path(to);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).expect("create fixture dir");
            }
            std::fs::rename(self.path(from), dest).expect("rename fixture file");
        }

        /// Stage everything and commit on the fixture clock. Returns the
        /// new commit id.
        pub fn commit(&mut self, message: &str) -> String {
            self.commits += 1;
            let date = epoch() + Duration::hours(self.commits);
            self.commit_at(message, date)
        }

        pub fn commit_at(&mut self, message: &str, date: DateTime<Utc>) -> String {
            let stamp = date.to_rfc3339();
            let env = [
                ("GIT_AUTHOR_DATE", stamp.as_str()),
                ("GIT_COMMITTER_DATE", stamp.as_str()),
            ];
            run_git(self.root(), &["add", "-A"], &[]);
            run_git(
                self.root(),
                &["commit", "-q", "--allow-empty", "-m", message],
                &env,
            );
            self.head()
        }

        /// Date the next `commit` call will use.
        pub fn next_commit_date(&self) -> DateTime<Utc> {
            epoch() + Duration::hours(self.commits + 1)
        }

        pub fn head(&self) -> String {
            self.git(&["rev-parse", "HEAD"])
        }

        /// Commit a tag points at, or None when the tag is absent.
        pub fn tag_commit(&self, tag: &str) -> Option<String> {
            let out = Command::new("git")
                .args(["rev-parse", "--verify", "--quiet"])
                .arg(format!("refs/tags/{}^{{commit}}", tag))
                .current_dir(self.root())
                .output()
                .ok()?;
            out.status
                .success()
                .then(|| String::from_utf8_lossy(&out.stdout).trim().to_string())
        }

        pub fn tags(&self) -> Vec<String> {
            self.git(&["tag", "--list"])
                .lines()
                .map(str::to_string)
                .collect()
        }

        /// Tags present on the bare remote.
        pub fn remote_tags(&self) -> Vec<String> {
            let Some(remote) = &self.remote else {
                return Vec::new();
            };
            run_git(remote.path(), &["tag", "--list"], &[])
                .lines()
                .map(str::to_string)
                .collect()
        }

        /// Run git in the fixture and return trimmed stdout. Panics on failure.
        pub fn git(&self, args: &[&str]) -> String {
            run_git(self.root(), args, &[])
        }
    }

    fn run_git(dir: &Path, args: &[&str], env: &[(&str, &str)]) -> String {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(dir);
        for (k, v) in env {
            cmd.env(k, v);
        }
        let out = cmd.output().expect("spawn git");
        assert!(
            out.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8_lossy(&out.stdout).trim().to_string()
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over repository state.

    use super::fixtures::FixtureRepo;

    /// Assert `tag` exists and resolves to `commit`.
    pub fn assert_tag_at(repo: &FixtureRepo, tag: &str, commit: &str) {
        match repo.tag_commit(tag) {
            Some(actual) => assert_eq!(actual, commit, "tag {} points elsewhere", tag),
            None => panic!("tag {} does not exist", tag),
        }
    }

    pub fn assert_no_tag(repo: &FixtureRepo, tag: &str) {
        assert!(repo.tag_commit(tag).is_none(), "tag {} should not exist", tag);
    }

    /// Assert the file at `rel` carries a header with `version`.
    pub fn assert_header_version(repo: &FixtureRepo, rel: &str, version: &str) {
        let content = repo.read(rel);
        let (_, header) = semtag_core::find_header(&content, semtag_core::DEFAULT_SCAN_LINES)
            .unwrap_or_else(|| panic!("{} has no header", rel));
        assert_eq!(header.version.to_string(), version, "header version of {}", rel);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::generators::*;
    use proptest::prelude::*;
    use semtag_core::{validate_component_name, validate_environment};

    #[test]
    fn test_fixture_commits_are_dated_in_order() {
        let Some(mut repo) = FixtureRepo::new() else {
            return;
        };
        repo.write("a.txt", "one");
        let first = repo.commit("first");
        repo.write("a.txt", "two");
        let second = repo.commit("second");
        assert_ne!(first, second);
        let dates = repo.git(&["log", "--format=%aI"]);
        let lines: Vec<&str> = dates.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0] > lines[1]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_generated_names_are_valid(name in arb_component_name()) {
            prop_assert!(validate_component_name(&name).is_ok());
        }

        #[test]
        fn prop_generated_environments_are_valid(env in arb_environment()) {
            prop_assert!(validate_environment(&env).is_ok());
        }
    }
}
