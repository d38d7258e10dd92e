//! Tests for UpdateService: node and branch insertion end to end against scripted tools
#![cfg(unix)]

mod common;

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use common::{FakeTools, BASELINE_PLAN};
use halpatch::application::rewriter::{UPDATE_SECTION_TITLE, VALIDATION_SECTION_TITLE};
use halpatch::application::services::{HalToolchain, UpdateService};
use halpatch::application::{ApplicationError, UpdateOptions};
use halpatch::config::Settings;
use halpatch::domain::{
    Assembly, AssemblyMap, DomainError, ExecutionPlan, Invocation, PlanSection, UpdateRequest,
};
use halpatch::infrastructure::traits::RealFileSystem;
use halpatch::infrastructure::InfraError;
use halpatch::util::testing::init_test_setup;

const NODE_TREE: &str = "((human:0.006,chimp:0.0065)Anc1:0.1,(Anc3:0.5,gorilla:0.2)Anc2:0.3)Anc0;";

fn settings(dir: &Path) -> Settings {
    Settings {
        out_dir: dir.join("steps"),
        jobstore_dir: dir.join("jobstore"),
        prepare_options: "--maxCores 2".into(),
        ..Settings::default()
    }
}

fn assemblies(entries: &[(&str, f64)]) -> AssemblyMap {
    let mut map = AssemblyMap::new();
    for (name, weight) in entries {
        map.insert(
            *name,
            Assembly {
                weight: *weight,
                path: format!("{name}.fa"),
            },
        );
    }
    map
}

fn service(tools: Arc<FakeTools>) -> UpdateService {
    init_test_setup();
    let toolchain = Arc::new(HalToolchain::new(Arc::new(RealFileSystem), tools));
    UpdateService::new(toolchain).with_header(vec!["generated by : halpatch test".into()])
}

fn section<'a>(plan: &'a ExecutionPlan, title: &str) -> &'a PlanSection {
    plan.sections
        .iter()
        .find(|s| s.title == title)
        .unwrap_or_else(|| panic!("missing section {title}"))
}

fn commands(section: &PlanSection) -> Vec<&Invocation> {
    section.invocations().collect()
}

// ============================================================
// node insertion
// ============================================================

#[test]
fn given_childless_genome_when_adding_leaf_then_one_replace_and_one_validate() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(NODE_TREE, BASELINE_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("L", 2.5)]),
        &settings(temp.path()),
        temp.path(),
    );
    let request = UpdateRequest::Node {
        genome: "Anc3".into(),
    };

    // Act
    let plan = service(tools.clone()).plan(&request, &opts).unwrap();

    // Assert
    let updates = commands(section(&plan, UPDATE_SECTION_TITLE));
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].program, "halReplaceGenome");
    let out_hal = temp.path().join("steps/Anc3.hal").display().to_string();
    assert_eq!(
        updates[0].args,
        vec![
            "--bottomAlignmentFile",
            out_hal.as_str(),
            "--topAlignmentFile",
            "in.hal",
            "in.hal",
            "Anc3",
            "--hdf5InMemory"
        ]
    );

    let validations = commands(section(&plan, VALIDATION_SECTION_TITLE));
    assert_eq!(validations.len(), 1);
    assert_eq!(
        validations[0].to_string(),
        "halValidate --genome Anc3 in.hal --hdf5InMemory"
    );
}

#[test]
fn given_childless_genome_when_adding_leaf_then_seq_file_holds_patch_and_sequences() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(NODE_TREE, BASELINE_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("L", 2.5)]),
        &settings(temp.path()),
        temp.path(),
    );

    // Act
    service(tools.clone())
        .plan(&UpdateRequest::Node { genome: "Anc3".into() }, &opts)
        .unwrap();

    // Assert
    let seq_file = std::fs::read_to_string(&opts.seq_file_in).unwrap();
    assert_eq!(seq_file, "(L:2.5)Anc3;\nAnc3 steps/Anc3.fa\nL L.fa\n");
    assert!(temp.path().join("steps/Anc3.fa").is_file());

    let prepare = tools.calls_to("cactus-prepare");
    assert_eq!(prepare.len(), 1);
    assert!(prepare[0].contains("--maxCores 2 --outHal"));
    assert!(prepare[0].ends_with("steps/Anc3.hal"));
}

#[test]
fn given_genome_with_children_when_adding_leaves_then_existing_children_kept_first() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(NODE_TREE, BASELINE_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("L", 2.5), ("M", 1.0)]),
        &settings(temp.path()),
        temp.path(),
    );

    // Act
    let plan = service(tools.clone())
        .plan(&UpdateRequest::Node { genome: "Anc1".into() }, &opts)
        .unwrap();

    // Assert
    let seq_file = std::fs::read_to_string(&opts.seq_file_in).unwrap();
    assert_eq!(
        seq_file.lines().next().unwrap(),
        "(human:0.006,chimp:0.0065,L:2.5,M:1.0)Anc1;"
    );
    let extracted: Vec<_> = tools
        .calls_to("hal2fasta")
        .iter()
        .map(|c| c.split_whitespace().nth(2).unwrap().to_string())
        .collect();
    assert_eq!(extracted, vec!["human", "chimp", "Anc1"]);

    // existing children need no preprocessing
    let text = plan.to_string();
    assert!(text.contains("--inputNames L --logInfo"));
}

#[test]
fn given_plan_when_adding_to_node_then_rewritten_for_update() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(NODE_TREE, BASELINE_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("L", 2.5)]),
        &settings(temp.path()),
        temp.path(),
    );

    // Act
    let plan = service(tools)
        .plan(&UpdateRequest::Node { genome: "Anc3".into() }, &opts)
        .unwrap();

    // Assert
    let text = plan.to_string();
    assert!(text.starts_with("## generated by : halpatch test\n"));
    assert!(!text.contains("cactus commit"));
    assert!(!text.contains("halAppendSubtree"));
    assert!(text.contains("> steps/Anc3.fa.2"));
    assert!(text.contains("--root Anc3 --includeRoot"));
}

#[test]
fn given_unknown_genome_when_adding_to_node_then_not_found() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(NODE_TREE, BASELINE_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("L", 2.5)]),
        &settings(temp.path()),
        temp.path(),
    );

    // Act
    let result = service(tools.clone()).plan(&UpdateRequest::Node { genome: "Anc9".into() }, &opts);

    // Assert
    let err = result.unwrap_err();
    assert_eq!(err.as_domain(), Some(&DomainError::NotFound("Anc9".into())));
    assert!(tools.calls_to("cactus-prepare").is_empty());
}

#[test]
fn given_new_leaf_named_like_tree_node_when_adding_to_node_then_duplicate() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(NODE_TREE, BASELINE_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("gorilla", 2.5)]),
        &settings(temp.path()),
        temp.path(),
    );

    // Act
    let result = service(tools).plan(&UpdateRequest::Node { genome: "Anc1".into() }, &opts);

    // Assert
    assert_eq!(
        result.unwrap_err().as_domain(),
        Some(&DomainError::DuplicateGenome("gorilla".into()))
    );
}

#[test]
fn given_failing_planner_when_adding_to_node_then_tool_failed() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools =
        Arc::new(FakeTools::new(NODE_TREE, BASELINE_PLAN).failing("cactus-prepare", 2, "bad seq file"));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("L", 2.5)]),
        &settings(temp.path()),
        temp.path(),
    );

    // Act
    let result = service(tools).plan(&UpdateRequest::Node { genome: "Anc3".into() }, &opts);

    // Assert
    match result.unwrap_err() {
        ApplicationError::OperationFailed { source, .. } => {
            match source.downcast_ref::<InfraError>() {
                Some(InfraError::ToolFailed {
                    program,
                    exit_code,
                    stderr,
                }) => {
                    assert_eq!(program, "cactus-prepare");
                    assert_eq!(*exit_code, Some(2));
                    assert_eq!(stderr, "bad seq file");
                }
                other => panic!("unexpected source: {other:?}"),
            }
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

// ============================================================
// branch insertion
// ============================================================

const BRANCH_TREE: &str = "((human:0.006,chimp:0.0065)Anc1:2.0,gorilla:0.2)Anc0;";

fn branch(top: f64, forced: Option<f64>) -> UpdateRequest {
    UpdateRequest::branch("Anc0", "Anc1", Some("NewAnc".into()), top, forced)
}

#[test]
fn given_single_leaf_when_adding_to_branch_then_add_to_branch_only() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(BRANCH_TREE, BASELINE_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("L", 2.5)]),
        &settings(temp.path()),
        temp.path(),
    );

    // Act
    let plan = service(tools.clone()).plan(&branch(0.5, None), &opts).unwrap();

    // Assert
    let seq_file = std::fs::read_to_string(&opts.seq_file_in).unwrap();
    assert_eq!(
        seq_file.lines().next().unwrap(),
        "(gorilla:0.2,(Anc1:1.5,L:2.5)NewAnc:0.5)Anc0;"
    );

    let updates = commands(section(&plan, UPDATE_SECTION_TITLE));
    assert_eq!(updates.len(), 1);
    let steps = temp.path().join("steps");
    assert_eq!(
        updates[0].to_string(),
        format!(
            "halAddToBranch in.hal {}/NewAnc.hal {}/Anc0.hal Anc0 NewAnc Anc1 L 0.5 2.5 --hdf5InMemory",
            steps.display(),
            steps.display()
        )
    );

    let validated: Vec<_> = commands(section(&plan, VALIDATION_SECTION_TITLE))
        .iter()
        .map(|inv| inv.args[1].clone())
        .collect();
    assert_eq!(validated, vec!["Anc0", "NewAnc", "Anc1", "L"]);
}

#[test]
fn given_several_leaves_when_adding_to_branch_then_replace_folds_the_rest() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(BRANCH_TREE, BASELINE_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("L", 2.5), ("M", 1.0)]),
        &settings(temp.path()),
        temp.path(),
    );

    // Act
    let plan = service(tools).plan(&branch(0.5, None), &opts).unwrap();

    // Assert
    let updates = commands(section(&plan, UPDATE_SECTION_TITLE));
    let programs: Vec<_> = updates.iter().map(|inv| inv.program.as_str()).collect();
    assert_eq!(programs, vec!["halAddToBranch", "halReplaceGenome"]);
    assert_eq!(updates[0].args[6], "L");
    assert_eq!(updates[1].args[5], "NewAnc");

    let validated: Vec<_> = commands(section(&plan, VALIDATION_SECTION_TITLE))
        .iter()
        .map(|inv| inv.args[1].clone())
        .collect();
    assert_eq!(validated, vec!["Anc0", "NewAnc", "Anc1", "L", "M"]);
}

#[test]
fn given_branch_when_adding_then_extracts_child_siblings_and_parent() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(BRANCH_TREE, BASELINE_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("L", 2.5)]),
        &settings(temp.path()),
        temp.path(),
    );

    // Act
    service(tools.clone()).plan(&branch(0.5, None), &opts).unwrap();

    // Assert
    let seq_file = std::fs::read_to_string(&opts.seq_file_in).unwrap();
    let names: Vec<_> = seq_file
        .lines()
        .skip(1)
        .map(|l| l.split_whitespace().next().unwrap())
        .collect();
    assert_eq!(names, vec!["Anc1", "L", "gorilla", "Anc0"]);
}

#[test]
fn given_top_longer_than_branch_when_adding_to_branch_then_length_overflow() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(BRANCH_TREE, BASELINE_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("L", 2.5)]),
        &settings(temp.path()),
        temp.path(),
    );

    // Act
    let result = service(tools.clone()).plan(&branch(3.0, None), &opts);

    // Assert
    assert_eq!(
        result.unwrap_err().as_domain(),
        Some(&DomainError::LengthOverflow {
            top: 3.0,
            original: 2.0
        })
    );
    assert!(tools.calls_to("hal2fasta").is_empty());
}

#[test]
fn given_forced_bottom_length_when_adding_to_branch_then_used_verbatim() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(BRANCH_TREE, BASELINE_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("L", 2.5)]),
        &settings(temp.path()),
        temp.path(),
    );

    // Act
    service(tools).plan(&branch(3.0, Some(4.0)), &opts).unwrap();

    // Assert
    let seq_file = std::fs::read_to_string(&opts.seq_file_in).unwrap();
    assert_eq!(
        seq_file.lines().next().unwrap(),
        "(gorilla:0.2,(Anc1:4.0,L:2.5)NewAnc:3.0)Anc0;"
    );
}

#[test]
fn given_non_adjacent_pair_when_adding_to_branch_then_invalid_branch() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(BRANCH_TREE, BASELINE_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("L", 2.5)]),
        &settings(temp.path()),
        temp.path(),
    );
    let request = UpdateRequest::branch("Anc0", "human", None, 0.001, None);

    // Act
    let result = service(tools).plan(&request, &opts);

    // Assert
    assert_eq!(
        result.unwrap_err().as_domain(),
        Some(&DomainError::InvalidBranch {
            parent: "Anc0".into(),
            child: "human".into()
        })
    );
}

#[test]
fn given_missing_child_when_adding_to_branch_then_not_found() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(BRANCH_TREE, BASELINE_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("L", 2.5)]),
        &settings(temp.path()),
        temp.path(),
    );
    let request = UpdateRequest::branch("Anc0", "bonobo", None, 0.1, None);

    // Act
    let result = service(tools).plan(&request, &opts);

    // Assert
    assert_eq!(
        result.unwrap_err().as_domain(),
        Some(&DomainError::NotFound("bonobo".into()))
    );
}

#[test]
fn given_new_genome_named_like_ancestor_when_adding_to_branch_then_duplicate() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(BRANCH_TREE, BASELINE_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("NewAnc", 1.0)]),
        &settings(temp.path()),
        temp.path(),
    );

    // Act
    let result = service(tools.clone()).plan(&branch(0.5, None), &opts);

    // Assert
    assert_eq!(
        result.unwrap_err().as_domain(),
        Some(&DomainError::DuplicateGenome("NewAnc".into()))
    );
    assert!(tools.calls_to("hal2fasta").is_empty());
    assert!(tools.calls_to("cactus-prepare").is_empty());
}

const BRANCH_PLAN: &str = "\
## generated by : cactus-prepare steps/seq_file.in --outDir steps

## Preprocessor
cactus-preprocess jobstore/0 steps/seq_file.in steps/seq_file.out --inputNames Anc1 gorilla L --logInfo
cactus-preprocess jobstore/1 steps/seq_file.in steps/seq_file.out --inputNames Anc1 gorilla --logInfo

## Alignment

### Round 0
cactus-blast jobstore/2 steps/seq_file.out steps/NewAnc.cigar --root NewAnc
cactus-align jobstore/3 steps/seq_file.out steps/NewAnc.cigar steps/NewAnc.hal --root NewAnc
hal2fasta steps/NewAnc.hal NewAnc --hdf5InMemory > steps/NewAnc.fa

### Round 1
cactus-blast jobstore/4 steps/seq_file.out steps/Anc0.cigar --root Anc0
cactus-align jobstore/5 steps/seq_file.out steps/Anc0.cigar steps/Anc0.hal --root Anc0
hal2fasta steps/Anc0.hal Anc0 --hdf5InMemory > steps/Anc0.fa
";

#[test]
fn given_child_and_siblings_in_preprocessing_when_adding_to_branch_then_only_new_genomes_remain() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let tools = Arc::new(FakeTools::new(BRANCH_TREE, BRANCH_PLAN));
    let opts = UpdateOptions::new(
        "in.hal",
        assemblies(&[("L", 2.5)]),
        &settings(temp.path()),
        temp.path(),
    );

    // Act
    let plan = service(tools).plan(&branch(0.5, None), &opts).unwrap();

    // Assert
    let preprocess: Vec<String> = commands(section(&plan, "Preprocessor"))
        .iter()
        .map(|inv| inv.to_string())
        .collect();
    assert_eq!(
        preprocess,
        vec![
            "cactus-preprocess jobstore/0 steps/seq_file.in steps/seq_file.out --inputNames L --logInfo"
        ]
    );
    let round0 = commands(section(&plan, "Round 0"));
    assert!(!round0[0].to_string().contains("--includeRoot"));
}
