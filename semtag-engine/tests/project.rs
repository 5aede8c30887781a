use semtag_core::{ComponentType, RegistryError, SemVer, SemtagConfig, SemtagError};
use semtag_engine::Project;
use semtag_test_utils::assertions::{assert_header_version, assert_tag_at};
use semtag_test_utils::fixtures::FixtureRepo;

#[test]
fn init_creates_config_and_registry_once() {
    let Some(fixture) = FixtureRepo::new() else {
        return;
    };
    let (_, outcome) = Project::init(fixture.root()).unwrap();
    assert!(outcome.config_created);
    assert!(outcome.registry_created);
    assert!(fixture.path(".semtag/config.toml").is_file());
    assert!(fixture.path(".semtag/registry.json").is_file());

    let config = SemtagConfig::from_path(&fixture.path(".semtag/config.toml")).unwrap();
    assert_eq!(config, SemtagConfig::default());

    let (project, again) = Project::init(fixture.root()).unwrap();
    assert!(!again.config_created);
    assert!(!again.registry_created);
    assert!(project.load_registry().unwrap().is_empty());
}

#[test]
fn add_registers_with_inferred_type_and_stamps_header() {
    let Some(mut fixture) = FixtureRepo::new() else {
        return;
    };
    fixture.write("queries/orders.sql", "select 1;\n");
    fixture.commit("add orders");
    fixture.write("queries/orders.sql", "select 2;\n");
    fixture.commit("change orders");
    let project = Project::open(fixture.root()).unwrap();

    let component = project
        .add(&fixture.path("queries/orders.sql"), None, None)
        .unwrap();
    assert_eq!(component.name, "orders");
    assert_eq!(component.component_type, ComponentType::Query);
    assert_eq!(component.path, "queries/orders.sql");
    assert_eq!(component.version, SemVer::new(1, 0, 1));
    assert_eq!(component.history.len(), 2);
    assert_header_version(&fixture, "queries/orders.sql", "1.0.1");

    let stored = project.component("orders").unwrap();
    assert_eq!(stored.id, component.id);
    assert_eq!(project.component(component.id.as_str()).unwrap().name, "orders");
}

#[test]
fn add_honours_explicit_name_and_type() {
    let Some(mut fixture) = FixtureRepo::new() else {
        return;
    };
    fixture.write("misc/planner.txt", "plan\n");
    fixture.commit("add planner");
    let project = Project::open(fixture.root()).unwrap();

    let component = project
        .add(
            std::path::Path::new("misc/planner.txt"),
            Some("planner-agent"),
            Some(ComponentType::Agent),
        )
        .unwrap();
    assert_eq!(component.name, "planner-agent");
    assert_eq!(component.component_type, ComponentType::Agent);
    assert!(fixture.read("misc/planner.txt").starts_with("# semtag: "));

    let err = project
        .add(std::path::Path::new("misc/planner.txt"), None, None)
        .unwrap_err();
    assert!(matches!(err, SemtagError::Validation(_)));

    fixture.write("misc/other.txt", "x\n");
    let err = project
        .add(std::path::Path::new("misc/other.txt"), Some("planner-agent"), None)
        .unwrap_err();
    assert!(matches!(
        err,
        SemtagError::Registry(RegistryError::DuplicateName { .. })
    ));
    let err = project
        .add(std::path::Path::new("misc/other.txt"), Some("Bad_Name"), None)
        .unwrap_err();
    assert!(matches!(err, SemtagError::Validation(_)));
}

#[test]
fn unknown_component_is_reported() {
    let Some(fixture) = FixtureRepo::new() else {
        return;
    };
    let project = Project::open(fixture.root()).unwrap();
    let err = project.component("nope").unwrap_err();
    assert!(matches!(
        err,
        SemtagError::Registry(RegistryError::ComponentNotFound { .. })
    ));
}

#[test]
fn release_records_history_and_stamps_header() {
    let Some(mut fixture) = FixtureRepo::new() else {
        return;
    };
    fixture.write("prompts/greeting.prompt", "Say hi\n");
    fixture.commit("add greeting");
    let project = Project::open(fixture.root()).unwrap();
    project
        .add(&fixture.path("prompts/greeting.prompt"), None, None)
        .unwrap();
    let head = fixture.commit("register greeting");

    let release = project
        .releases()
        .release("greeting", "1.1.0", None, Some("first real release"))
        .unwrap();
    assert!(release.recorded);
    assert!(release.header_written);
    assert_eq!(release.tag.commit, head);
    assert_tag_at(&fixture, "components/prompts/greeting/v1.1.0", &head);
    assert_header_version(&fixture, "prompts/greeting.prompt", "1.1.0");

    let greeting = project.component("greeting").unwrap();
    assert_eq!(greeting.version, SemVer::new(1, 1, 0));
    let entry = greeting.history.last().unwrap();
    assert_eq!(entry.commit, head);
    assert_eq!(entry.message, "first real release");

    let err = project
        .releases()
        .release("greeting", "1.1.0", None, None)
        .unwrap_err();
    assert!(matches!(err, SemtagError::Tag(_)));
}
