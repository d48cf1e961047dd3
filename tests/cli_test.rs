use anyhow::Result;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn lambdafs() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lambdafs"))
}

#[test]
fn test_summary_goes_to_stdout_when_piped() -> Result<()> {
    let work = TempDir::new()?;
    let input = work.path().join("notes.txt");
    fs::write(&input, b"line of notes\n".repeat(200))?;

    let output = lambdafs().arg(&input).output()?;
    assert!(output.status.success(), "{output:?}");
    assert!(work.path().join("notes.txt.br").is_file());

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Compressed '"), "{stdout:?}");
    assert!(stdout.contains("to 'notes.txt.br'"), "{stdout:?}");
    assert!(stdout.trim_end().ends_with("MiB)."), "{stdout:?}");
    Ok(())
}

#[test]
fn test_missing_argument_and_missing_path() -> Result<()> {
    let output = lambdafs().output()?;
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8(output.stderr)?.trim(),
        "ERROR: You must specify a path to compress."
    );

    let work = TempDir::new()?;
    let output = lambdafs().arg(work.path().join("absent")).output()?;
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8(output.stderr)?.trim(),
        "ERROR: The provided path doesn't exist."
    );
    Ok(())
}
