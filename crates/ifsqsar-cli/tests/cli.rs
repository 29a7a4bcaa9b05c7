use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn ifsqsar() -> Command {
    Command::cargo_bin("ifsqsar").unwrap()
}

#[test]
fn predict_writes_a_rows_table_to_stdout() {
    ifsqsar()
        .args(["predict", "-s", "O", "-m", "Vf", "--values", "insmi,qsarpred"])
        .assert()
        .success()
        .stdout("insmi\tVf qsarpred\nO\t0.1673\n");
}

#[test]
fn predict_emits_json_when_asked() {
    let output = ifsqsar()
        .args(["predict", "-s", "CCO,c1ccccc1", "-m", "logKow", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["rows"].as_array().unwrap().len(), 2);
    assert!(json["columns"]
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c == "logKow qsarpred"));
}

#[test]
fn unknown_models_fail_with_a_message() {
    ifsqsar()
        .args(["predict", "-s", "CCO", "-m", "logKxy"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unknown model 'logKxy'"));
}

#[test]
fn predict_requires_a_record_source() {
    ifsqsar()
        .args(["predict", "-m", "logKow"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Either --smiles or --input must be given."));
}

#[test]
fn batch_files_are_extended_into_the_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("batch.csv");
    let output = dir.path().join("results.csv");
    fs::write(&input, "name,SMILES\nwater,O\n").unwrap();

    ifsqsar()
        .args(["predict", "--input-separator", ",", "--separator", ","])
        .args(["-m", "Vf", "--values", "qsarpred"])
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(written, "name,SMILES,Vf qsarpred\nwater,O,0.1673\n");
}

#[test]
fn config_file_and_set_overrides_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("ifsqsar.toml");
    fs::write(
        &config,
        "models = [\"Vf\"]\n\n[output]\nvalues = [\"qsarpred\"]\nformat = \"json\"\n",
    )
    .unwrap();

    ifsqsar()
        .args(["predict", "-s", "O", "-S", "output.format=rows", "--no-header"])
        .arg("-c")
        .arg(&config)
        .assert()
        .success()
        .stdout("0.1673\n");
}

#[test]
fn models_lists_a_group() {
    ifsqsar()
        .args(["models", "mixture"])
        .assert()
        .success()
        .stdout(predicate::str::contains("logKsa"))
        .stdout(predicate::str::contains("logKow ").not());
}

#[test]
fn unknown_groups_are_rejected() {
    ifsqsar()
        .args(["models", "gases"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown model group 'gases'"));
}

#[test]
fn unwritable_output_names_the_destination() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("missing").join("results.tsv");

    ifsqsar()
        .args(["predict", "-s", "O", "-m", "Vf"])
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot write results to"))
        .stderr(predicate::str::contains("results.tsv"));
}

#[test]
fn failed_structures_are_summarized_on_stderr() {
    ifsqsar()
        .args(["predict", "-s", "CCO,C1CC", "-m", "Vf", "--values", "qsarpred"])
        .assert()
        .success()
        .stderr(predicate::str::contains("could not be normalized"));
}
