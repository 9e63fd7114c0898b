use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::PathBuf;

const GREETING: &str = "Hello! How can I assist you in your farming journey today?";

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

fn bin() -> Command {
    let path = assert_cmd::cargo::cargo_bin!("agrimandi");
    let mut cmd = Command::new(path);
    cmd.env_remove("AGRIMANDI_FAQ_PATH")
        .env_remove("AGRIMANDI_INTENTS")
        .env_remove("AGRIMANDI_CONTEXT_PATH")
        .env_remove("AGRIMANDI_CONFIG")
        .env_remove("RUST_LOG");
    cmd.arg("--faq-path").arg(data("faq_data.json"));
    cmd
}

fn temp_json(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn ask_greeting() {
    bin()
        .args(["ask", "hi"])
        .assert()
        .success()
        .stdout(format!("{GREETING}\n"));
}

#[test]
fn ask_matches_faq_paraphrase() {
    bin()
        .args(["ask", "whats the mandi rate for wheat"])
        .assert()
        .success()
        .stdout("₹2100 per quintal\n");
}

#[test]
fn default_faq_data_does_not_depend_on_working_directory() {
    let elsewhere = tempfile::tempdir().unwrap();
    Command::new(assert_cmd::cargo::cargo_bin!("agrimandi"))
        .env_remove("AGRIMANDI_FAQ_PATH")
        .current_dir(elsewhere.path())
        .args(["ask", "whats the mandi rate for wheat"])
        .assert()
        .success()
        .stdout("₹2100 per quintal\n");
}

#[test]
fn ask_offers_suggestions_for_near_miss() {
    let faq = temp_json(r#"{"What is the mandi rate for wheat?": "₹2100 per quintal"}"#);
    Command::new(assert_cmd::cargo::cargo_bin!("agrimandi"))
        .arg("--faq-path")
        .arg(faq.path())
        .args(["--threshold", "100", "ask", "whats the mandi rate for wheat"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Did you mean:"))
        .stdout(predicate::str::contains("What is the mandi rate for wheat?"));
}

#[test]
fn ask_falls_back_to_context() {
    bin()
        .args(["ask", "What does AgriMandi provide?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("The AgriMandi system helps farmers"));
}

#[test]
fn intents_file_enables_templates() {
    bin()
        .arg("--intents")
        .arg(data("intents.json"))
        .args(["ask", "I want to sell my cotton"])
        .assert()
        .success()
        .stdout(predicate::str::contains("'Sell Crops' section"));
}

#[test]
fn repl_exit_prints_farewell() {
    bin()
        .write_stdin("hello\nexit\nhello again\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome to AgriMandi"))
        .stdout(predicate::str::contains(GREETING))
        .stdout(predicate::str::contains("Thank you! Stay safe and keep farming"));
}

#[test]
fn repl_end_of_input_ends_session() {
    bin()
        .write_stdin("whats the mandi rate for wheat\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("₹2100 per quintal"))
        .stdout(predicate::str::contains("Session ended. Goodbye!"));
}

#[test]
fn missing_faq_file_fails_fast() {
    Command::new(assert_cmd::cargo::cargo_bin!("agrimandi"))
        .args(["--faq-path", "/nonexistent/faq_data.json", "ask", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: load FAQ data"));
}

#[test]
fn malformed_faq_file_fails_fast() {
    let faq = temp_json(r#"{"What is the mandi rate?": 2100}"#);
    Command::new(assert_cmd::cargo::cargo_bin!("agrimandi"))
        .arg("--faq-path")
        .arg(faq.path())
        .args(["ask", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a string"));
}

#[test]
fn eval_reports_pass_rate() {
    bin()
        .arg("eval")
        .arg("--cases")
        .arg(data("eval_cases.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("total=7 passed=7 failed=0"))
        .stdout(predicate::str::contains("case=faq-wheat-rate passed=true stage=Faq"));
}

#[test]
fn eval_fails_below_required_pass_rate() {
    let cases = temp_json(
        r#"[{"case_id": "wrong", "question": "hi", "expected_stage": "faq"}]"#,
    );
    bin()
        .arg("eval")
        .arg("--cases")
        .arg(cases.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("meets_threshold=false"))
        .stderr(predicate::str::contains("below the required"));
}
