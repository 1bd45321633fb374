// Guard extraction & bench loop integration tests
//
// Everything runs against temporary directories - no external db_bench
// binary needed (the loop tests use a stub shell script).

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use guard_bench::bench::{run_loop, BenchConfig};
use guard_bench::guards::extract_guards;

/// Helper: write `content` into a fresh temp dir and return (dir, log path).
fn write_log(content: &str) -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let log = dir.path().join("tmp.txt");
    fs::write(&log, content)?;
    Ok((dir, log))
}

const SAMPLE_LOG: &str = "\
LevelDB:    version 1.2
--- level 0 files[ 4 7 ]
Guard Key: 0x1a2bccccccccccccccccc size 12
Guard Key: (bad)
--- level 1 files[ 2 ]
Guard Key: 0xffccccccccccccccccc size 3
fillrandom   :  4.581 micros/op
";

#[test]
fn test_extract_order_and_content() -> Result<()> {
    let (dir, log) = write_log(SAMPLE_LOG)?;
    let out = dir.path().join("guards.txt");

    let count = extract_guards(&log, &out)?;
    assert_eq!(count, 4);

    let written = fs::read_to_string(&out)?;
    assert_eq!(
        written,
        "--- level 0 files[ 4 7 ]\n6699\n--- level 1 files[ 2 ]\n255\n"
    );
    Ok(())
}

#[test]
fn test_output_never_longer_than_input() -> Result<()> {
    let (dir, log) = write_log(SAMPLE_LOG)?;
    let out = dir.path().join("guards.txt");
    extract_guards(&log, &out)?;

    let in_lines = SAMPLE_LOG.lines().count();
    let out_lines = fs::read_to_string(&out)?.lines().count();
    assert!(out_lines <= in_lines);
    Ok(())
}

#[test]
fn test_extract_is_idempotent() -> Result<()> {
    let (dir, log) = write_log(SAMPLE_LOG)?;
    let out = dir.path().join("guards.txt");

    extract_guards(&log, &out)?;
    let first = fs::read_to_string(&out)?;
    extract_guards(&log, &out)?;
    let second = fs::read_to_string(&out)?;

    // output is truncated, not appended, each run
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.txt");
    let out = dir.path().join("guards.txt");
    assert!(extract_guards(&missing, &out).is_err());
}

#[test]
fn test_malformed_guard_line_aborts_pass() -> Result<()> {
    let (dir, log) = write_log("--- level 0 files[ 1 ]\nGuard Key: 0xff size 1\n")?;
    let out = dir.path().join("guards.txt");
    assert!(extract_guards(&log, &out).is_err());
    Ok(())
}

// ---------------------------------------------------------------------------
// Bench loop tests (unix only: the stub db_bench is a shell script)
// ---------------------------------------------------------------------------

/// Write an executable stub that prints a fixed db_bench-style report.
#[cfg(unix)]
fn write_stub_db_bench(dir: &TempDir) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.path().join("db_bench");
    fs::write(
        &path,
        "#!/bin/sh\n\
         echo 'LevelDB:    version 1.2'\n\
         echo 'fillrandom   :  4.581 micros/op'\n\
         echo 'readrandom   :  8.191 micros/op'\n\
         echo 'seekrandom   : 12.002 micros/op'\n\
         echo '--- level 0 files[ 4 ]'\n",
    )?;
    let mut perms = fs::metadata(&path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms)?;
    Ok(path)
}

#[cfg(unix)]
fn stub_config(dir: &TempDir, iterations: usize) -> Result<BenchConfig> {
    Ok(BenchConfig {
        db_bench: write_stub_db_bench(dir)?,
        db_dir: dir.path().join("db"),
        num: 500_000,
        reads: 100_000,
        iterations,
        out_dir: dir.path().join("out"),
    })
}

#[cfg(unix)]
#[test]
fn test_run_loop_groups_by_op() -> Result<()> {
    let dir = TempDir::new()?;
    let cfg = stub_config(&dir, 2)?;

    let results_path = run_loop(&cfg)?;
    assert_eq!(
        results_path.file_name().unwrap().to_str().unwrap(),
        "results500000100000"
    );

    let written = fs::read_to_string(&results_path)?;
    // each op block: one line per iteration, then a blank separator
    assert_eq!(
        written,
        "fillrandom   :  4.581 micros/op\n\
         fillrandom   :  4.581 micros/op\n\
         \n\
         readrandom   :  8.191 micros/op\n\
         readrandom   :  8.191 micros/op\n\
         \n\
         seekrandom   : 12.002 micros/op\n\
         seekrandom   : 12.002 micros/op\n\
         \n"
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_run_loop_writes_metadata() -> Result<()> {
    let dir = TempDir::new()?;
    let cfg = stub_config(&dir, 1)?;
    run_loop(&cfg)?;

    let metadata = fs::read_to_string(cfg.out_dir.join("metadata.json"))?;
    assert!(metadata.contains("\"version\""));
    assert!(metadata.contains("\"iterations\": 1"));
    assert!(metadata.contains("--num=500000"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_run_loop_missing_binary_fails() {
    let dir = TempDir::new().unwrap();
    let cfg = BenchConfig {
        db_bench: dir.path().join("no-such-db_bench"),
        db_dir: dir.path().join("db"),
        num: 1,
        reads: 1,
        iterations: 1,
        out_dir: dir.path().join("out"),
    };
    assert!(run_loop(&cfg).is_err());
}

#[cfg(unix)]
#[test]
fn test_run_loop_failing_binary_fails() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new()?;
    let path = dir.path().join("db_bench");
    fs::write(&path, "#!/bin/sh\necho boom >&2\nexit 1\n")?;
    let mut perms = fs::metadata(&path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms)?;

    let cfg = BenchConfig {
        db_bench: path,
        db_dir: dir.path().join("db"),
        num: 1,
        reads: 1,
        iterations: 1,
        out_dir: dir.path().join("out"),
    };
    assert!(run_loop(&cfg).is_err());
    Ok(())
}
