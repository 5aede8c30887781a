use semtag_git::{GitRepo, PushStatus};
use semtag_test_utils::fixtures::FixtureRepo;

fn open(fixture: &FixtureRepo) -> GitRepo {
    GitRepo::open(fixture.root()).expect("open fixture")
}

#[test]
fn annotated_tags_list_and_describe() {
    let Some(mut fixture) = FixtureRepo::new() else {
        return;
    };
    fixture.write("prompts/a.md", "hello\n");
    let commit = fixture.commit("add a");
    let git = open(&fixture);

    git.create_annotated_tag("components/prompts/a/v1.0.0", &commit, "release a", false)
        .unwrap();
    git.create_annotated_tag("components/prompts/ab/v1.0.0", &commit, "release ab", false)
        .unwrap();

    assert_eq!(
        git.list_tags("components/prompts/a").unwrap(),
        vec!["components/prompts/a/v1.0.0".to_string()]
    );
    assert_eq!(git.list_tags("components").unwrap().len(), 2);

    let details = git
        .tag_details("components/prompts/a/v1.0.0")
        .unwrap()
        .unwrap();
    assert!(details.annotated);
    assert_eq!(details.commit, commit);
    assert_eq!(details.author, "Fixture");
    assert_eq!(details.message, "release a");
    assert!(details.date.is_some());

    assert!(git.tag_details("components/prompts/a/v9.9.9").unwrap().is_none());
}

#[test]
fn lightweight_tags_report_commit_author() {
    let Some(mut fixture) = FixtureRepo::new() else {
        return;
    };
    fixture.write("a.txt", "x");
    let commit = fixture.commit("first commit");
    fixture.git(&["tag", "components/configs/a/v1.0.0"]);
    let details = open(&fixture)
        .tag_details("components/configs/a/v1.0.0")
        .unwrap()
        .unwrap();
    assert!(!details.annotated);
    assert_eq!(details.commit, commit);
    assert_eq!(details.message, "first commit");
}

#[test]
fn creating_existing_tag_without_force_fails() {
    let Some(mut fixture) = FixtureRepo::new() else {
        return;
    };
    fixture.write("a.txt", "x");
    let first = fixture.commit("one");
    fixture.write("a.txt", "y");
    let second = fixture.commit("two");
    let git = open(&fixture);

    git.create_annotated_tag("t/x/y/prod", &first, "m", false).unwrap();
    assert!(git.create_annotated_tag("t/x/y/prod", &second, "m", false).is_err());
    git.create_annotated_tag("t/x/y/prod", &second, "m", true).unwrap();
    assert_eq!(git.tag_commit("t/x/y/prod").unwrap(), Some(second));
}

#[test]
fn path_history_and_existence() {
    let Some(mut fixture) = FixtureRepo::new() else {
        return;
    };
    fixture.write("queries/a.sql", "select 1;\n");
    let c1 = fixture.commit("add");
    fixture.write("queries/a.sql", "select 2;\n");
    let c2 = fixture.commit("edit");
    fixture.rename("queries/a.sql", "queries/b.sql");
    let c3 = fixture.commit("move");
    let git = open(&fixture);

    let log: Vec<String> = git
        .path_log("queries/a.sql")
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(log, vec![c3.clone(), c2.clone(), c1.clone()]);
    assert!(git.path_exists_at(&c1, "queries/a.sql").unwrap());
    assert!(!git.path_exists_at(&c3, "queries/a.sql").unwrap());
    assert!(git.path_exists_at(&c3, "queries/b.sql").unwrap());
    assert_eq!(git.list_files().unwrap(), vec!["queries/b.sql".to_string()]);
}

#[test]
fn push_reports_rejected_version_tag() {
    let Some(mut fixture) = FixtureRepo::with_remote() else {
        return;
    };
    fixture.write("a.txt", "x");
    let first = fixture.commit("one");
    fixture.write("a.txt", "y");
    let second = fixture.commit("two");
    let git = open(&fixture);
    let tag = "components/prompts/a/v1.0.0";

    git.create_annotated_tag(tag, &first, "m", false).unwrap();
    assert_eq!(git.push_tag("origin", tag, false).unwrap(), PushStatus::Pushed);

    git.create_annotated_tag(tag, &second, "m", true).unwrap();
    assert!(matches!(
        git.push_tag("origin", tag, false).unwrap(),
        PushStatus::Rejected { .. }
    ));
    assert_eq!(git.push_tag("origin", tag, true).unwrap(), PushStatus::Pushed);

    git.delete_remote_tag("origin", tag).unwrap();
    assert!(fixture.remote_tags().is_empty());
}
