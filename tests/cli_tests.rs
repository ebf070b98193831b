use anyhow::Result;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

// Run the built binary inside `dir` with logging disabled
fn run_tool(dir: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_test-task"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()?;
    Ok(output)
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[cfg(unix)]
#[test]
fn test_reports_child_exit_code() -> Result<()> {
    let dir = TempDir::new()?;
    let output = run_tool(dir.path(), &["-q", "-t", "sh", "-a", "-c", "-a", "exit 7"])?;

    // The tool's own status does not follow the child's
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout_of(&output),
        "Arguments: [\"-c\", \"exit 7\"]\nExit code: 7\n"
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_legacy_flag_spelling() -> Result<()> {
    let dir = TempDir::new()?;
    let output = run_tool(dir.path(), &["-q", "-cmd", "sh", "-arg", r#"["-c", "exit 0"]"#])?;

    assert_eq!(output.status.code(), Some(0));
    let stdout = stdout_of(&output);
    assert!(stdout.ends_with("Exit code: 0\n"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_child_inherits_stdout() -> Result<()> {
    let dir = TempDir::new()?;
    let output = run_tool(dir.path(), &["-q", "-t", "sh", "-a", r#"["-c", "echo from-child"]"#])?;

    let stdout = stdout_of(&output);
    let echo = stdout.find("Arguments:").unwrap_or(usize::MAX);
    let child = stdout.find("from-child").unwrap_or(usize::MAX);
    let code = stdout.find("Exit code: 0").unwrap_or(usize::MAX);
    assert!(echo < child && child < code, "unexpected order: {stdout}");
    Ok(())
}

#[test]
fn test_missing_executable_reports_error() -> Result<()> {
    let dir = TempDir::new()?;
    let output = run_tool(dir.path(), &["-q", "-t", "definitely-not-a-real-program-4f7c2"])?;

    assert_eq!(output.status.code(), Some(0));
    let stdout = stdout_of(&output);
    assert!(stdout.contains("executable not found: definitely-not-a-real-program-4f7c2"));
    assert!(!stdout.contains("Exit code"));
    Ok(())
}

#[test]
fn test_missing_taskname_runs_nothing() -> Result<()> {
    let dir = TempDir::new()?;
    let marker = dir.path().join("marker");
    let output = run_tool(dir.path(), &["-q", "-a", r#"["-c", "touch marker"]"#])?;

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("task name is required"));
    assert!(stdout_of(&output).is_empty());
    assert!(!marker.exists());
    Ok(())
}

#[test]
fn test_blank_taskname_runs_nothing() -> Result<()> {
    let dir = TempDir::new()?;
    let output = run_tool(dir.path(), &["-q", "-t", "  ", "-a", "touch marker"])?;

    assert_eq!(output.status.code(), Some(2));
    assert!(!dir.path().join("marker").exists());
    Ok(())
}

#[test]
fn test_undecodable_argument_reports_on_stdout() -> Result<()> {
    let dir = TempDir::new()?;
    let output = run_tool(dir.path(), &["-q", "-t", "sh", "-a", r#"["-c", 5]"#])?;

    assert_eq!(output.status.code(), Some(0));
    let stdout = stdout_of(&output);
    assert!(stdout.starts_with("Arguments:"));
    assert!(stdout.contains("failed to decode argument"));
    assert!(stdout.contains("element 1 is not a string: 5"));
    assert!(!stdout.contains("Exit code"));
    assert!(String::from_utf8_lossy(&output.stderr).is_empty());
    Ok(())
}

#[test]
fn test_legacy_flag_text_passes_through_as_argument() -> Result<()> {
    let dir = TempDir::new()?;
    let output = run_tool(dir.path(), &["-q", "-t", "Log", "-a", "-arg", "-a", "-cmd=x"])?;

    assert_eq!(
        stdout_of(&output),
        "Arguments: [\"-arg\", \"-cmd=x\"]\nlog: -arg\nlog: -cmd=x\nExit code: 0\n"
    );
    Ok(())
}

#[test]
fn test_builtin_log() -> Result<()> {
    let dir = TempDir::new()?;
    let output = run_tool(dir.path(), &["-q", "-t", "Log", "-a", r#"["first", "second"]"#])?;

    assert_eq!(
        stdout_of(&output),
        "Arguments: [\"first\", \"second\"]\nlog: first\nlog: second\nExit code: 0\n"
    );
    Ok(())
}

#[test]
fn test_list_builtins() -> Result<()> {
    let dir = TempDir::new()?;

    let output = run_tool(dir.path(), &["-q", "--list"])?;
    let stdout = stdout_of(&output);
    assert!(stdout.starts_with("Built-in tasks:"));
    for name in ["NoOp", "Sleep", "Log"] {
        assert!(stdout.contains(name));
    }

    let output = run_tool(dir.path(), &["-q", "--list", "--json"])?;
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(entries.as_array().map(Vec::len), Some(3));
    assert_eq!(entries[0]["name"], "NoOp");
    Ok(())
}
