//! History inference and repair

use chrono::Duration;
use semtag_core::{SemVer, SemtagResult, VersionHistoryEntry};
use semtag_git::{CommitInfo, GitRepo};

/// Commits touching `path` in which `path` exists, oldest first.
pub fn commits_with_path(git: &GitRepo, path: &str) -> SemtagResult<Vec<CommitInfo>> {
    let mut commits = Vec::new();
    for commit in git.path_log(path)?.into_iter().rev() {
        if git.path_exists_at(&commit.id, path)? {
            commits.push(commit);
        }
    }
    Ok(commits)
}

/// One entry per commit: the oldest is `1.0.0`, each later one a patch
/// bump.
pub fn infer_history(path: &str, commits: &[CommitInfo]) -> Vec<VersionHistoryEntry> {
    let initial = SemVer::initial();
    commits
        .iter()
        .zip(initial.patch..)
        .map(|(commit, patch)| VersionHistoryEntry {
            version: SemVer::new(initial.major, initial.minor, patch),
            commit: commit.id.clone(),
            timestamp: commit.timestamp,
            path: path.to_string(),
            message: commit.subject.clone(),
        })
        .collect()
}

/// Replacement commit for an entry whose commit lacks its path: the
/// closest commit within `window` of the entry's timestamp, or for `1.0.0`
/// the first commit of the path.
pub fn relocate<'c>(
    entry: &VersionHistoryEntry,
    commits: &'c [CommitInfo],
    window: Duration,
) -> Option<&'c CommitInfo> {
    let in_window = commits
        .iter()
        .map(|c| (c, (c.timestamp - entry.timestamp).abs()))
        .filter(|(_, distance)| *distance <= window)
        .min_by(|(a, da), (b, db)| da.cmp(db).then_with(|| a.timestamp.cmp(&b.timestamp)))
        .map(|(c, _)| c);
    if in_window.is_some() {
        return in_window;
    }
    if entry.version == SemVer::initial() {
        return commits.first();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn commit(id: &str, hour: u32) -> CommitInfo {
        CommitInfo {
            id: id.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            subject: format!("commit {}", id),
        }
    }

    fn entry(version: SemVer, hour: u32) -> VersionHistoryEntry {
        VersionHistoryEntry {
            version,
            commit: "deadbeef".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            path: "prompts/a.md".to_string(),
            message: String::new(),
        }
    }

    #[test]
    fn test_infer_history_numbers_commits() {
        let commits = vec![commit("a", 1), commit("b", 2), commit("c", 3)];
        let history = infer_history("prompts/a.md", &commits);
        let versions: Vec<String> = history.iter().map(|e| e.version.to_string()).collect();
        assert_eq!(versions, vec!["1.0.0", "1.0.1", "1.0.2"]);
        assert_eq!(history[2].commit, "c");
        assert_eq!(history[0].message, "commit a");
        assert!(infer_history("x", &[]).is_empty());
    }

    #[test]
    fn test_relocate_picks_closest_in_window() {
        let commits = vec![commit("a", 1), commit("b", 5), commit("c", 9)];
        let found = relocate(&entry(SemVer::new(1, 2, 0), 6), &commits, Duration::hours(2));
        assert_eq!(found.map(|c| c.id.as_str()), Some("b"));
    }

    #[test]
    fn test_relocate_outside_window() {
        let commits = vec![commit("a", 1)];
        let far = entry(SemVer::new(1, 2, 0), 20);
        assert!(relocate(&far, &commits, Duration::hours(2)).is_none());
        let initial = entry(SemVer::initial(), 20);
        assert_eq!(
            relocate(&initial, &commits, Duration::hours(2)).map(|c| c.id.as_str()),
            Some("a")
        );
    }
}
