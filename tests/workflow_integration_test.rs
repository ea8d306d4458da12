use legal_workflow::catalog::Catalog;
use legal_workflow::config::{InputType, WorkflowDefinition};

#[test]
fn test_load_builtin_workflow_file() {
    let workflow_path = concat!(env!("CARGO_MANIFEST_DIR"), "/workflows/contract-review.toml");
    let workflow = WorkflowDefinition::from_file(workflow_path).expect("Failed to load workflow");

    assert_eq!(workflow.id(), "contract-review");
    assert_eq!(workflow.title(), "Contract Review");
    assert_eq!(workflow.category(), "contracts");
    assert_eq!(workflow.steps().len(), 4);

    let steps = workflow.steps();
    assert_eq!(steps[0].id(), "summary");
    assert_eq!(steps[1].input_type(), InputType::PreviousOutput);
    assert!(steps[2].is_optional());
    assert_eq!(steps[3].id(), "redlines");
}

#[test]
fn test_workflow_roundtrip_with_real_file() {
    let workflow_path = concat!(env!("CARGO_MANIFEST_DIR"), "/workflows/due-diligence.toml");

    // Load workflow from file
    let original = WorkflowDefinition::from_file(workflow_path).expect("Failed to load workflow");

    // Convert to string
    let toml_string = original.to_toml().expect("Failed to serialize");

    // Parse back from string
    let restored = WorkflowDefinition::from_toml(&toml_string).expect("Failed to parse");

    assert_eq!(restored, original);
}

#[test]
fn test_user_workflow_overrides_builtin() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("contract-review.toml"),
        r#"
[workflow]
id = "contract-review"
title = "Firm Contract Review"

[[steps]]
id = "read"
title = "Read"
prompt_instruction = "Read the contract."
"#,
    )
    .unwrap();

    let mut catalog = Catalog::builtin().unwrap();
    let builtin_count = catalog.len();
    catalog.load_dir(dir.path()).unwrap();

    assert_eq!(catalog.len(), builtin_count);
    let workflow = catalog.get("contract-review").unwrap();
    assert_eq!(workflow.title(), "Firm Contract Review");
    assert_eq!(workflow.steps()[0].input_type(), InputType::Text);
}
