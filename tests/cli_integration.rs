use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TestDir {
    path: PathBuf,
}

impl TestDir {
    fn new(tag: &str) -> Self {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let path = std::env::temp_dir().join(format!(
            "svgdrawable_cli_{tag}_{}_{}",
            std::process::id(),
            ts
        ));
        fs::create_dir_all(&path).expect("create temp test dir");
        Self { path }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path.join(name);
        fs::write(&path, contents).expect("write test input");
        path
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_svgdrawable(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_svgdrawable"))
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("run svgdrawable")
}

const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24">
  <rect x="2" y="2" width="20" height="20" fill="#3366ff"/>
</svg>"##;

const BROKEN: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24">
  <use href="#missing"/>
  <path d="M0 0L4 4"/>
</svg>"##;

#[test]
fn converts_next_to_the_input() {
    let dir = TestDir::new("single");
    dir.write("square.svg", SQUARE);

    let output = run_svgdrawable(&["square.svg"], &dir.path);
    assert!(output.status.success(), "process failed: {output:?}");

    let xml = fs::read_to_string(dir.path.join("square.xml")).expect("read output");
    assert!(xml.starts_with("<vector xmlns:android="));
    assert!(xml.contains("android:pathData=\"M2,2H22V22H2Z\""));
    assert!(xml.contains("android:fillColor=\"#3366ff\""));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[svgdrawable] wrote"), "stderr: {stderr}");
}

#[test]
fn out_dir_and_scale_apply_to_every_input() {
    let dir = TestDir::new("batch");
    dir.write("a.svg", SQUARE);
    dir.write("b.svg", SQUARE);

    let output = run_svgdrawable(&["a.svg", "b.svg", "-o", "out", "--scale", "2", "-q"], &dir.path);
    assert!(output.status.success(), "process failed: {output:?}");
    assert!(output.stderr.is_empty(), "quiet run printed: {output:?}");

    for name in ["a.xml", "b.xml"] {
        let xml = fs::read_to_string(dir.path.join("out").join(name)).expect("read output");
        assert!(xml.contains("android:width=\"48dp\""), "{name}: {xml}");
        assert!(xml.contains("android:viewportWidth=\"24\""));
    }
}

#[test]
fn diagnostics_set_the_exit_code() {
    let dir = TestDir::new("errors");
    dir.write("broken.svg", BROKEN);
    dir.write("good.svg", SQUARE);

    let output = run_svgdrawable(&["good.svg", "broken.svg"], &dir.path);
    assert_eq!(output.status.code(), Some(1), "{output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("broken.svg: ERROR @ line 2: Referenced id not found"),
        "stderr: {stderr}"
    );
    assert!(dir.path.join("good.xml").is_file());
}

#[test]
fn explicit_output_file() {
    let dir = TestDir::new("explicit");
    dir.write("square.svg", SQUARE);

    let output = run_svgdrawable(
        &["square.svg", "--output", "ic_square.xml", "--digits", "2"],
        &dir.path,
    );
    assert!(output.status.success(), "process failed: {output:?}");
    assert!(dir.path.join("ic_square.xml").is_file());
    assert!(!dir.path.join("square.xml").exists());
}

#[test]
fn usage_errors_exit_with_two() {
    let dir = TestDir::new("usage");
    dir.write("a.svg", SQUARE);
    dir.write("b.svg", SQUARE);

    let output = run_svgdrawable(&["a.svg", "b.svg", "--output", "x.xml"], &dir.path);
    assert_eq!(output.status.code(), Some(2), "{output:?}");

    let output = run_svgdrawable(&[], &dir.path);
    assert_eq!(output.status.code(), Some(2), "{output:?}");

    let output = run_svgdrawable(&["a.svg", "--scale", "0"], &dir.path);
    assert_eq!(output.status.code(), Some(2), "{output:?}");
}

#[test]
fn missing_input_fails() {
    let dir = TestDir::new("missing");
    let output = run_svgdrawable(&["nope.svg"], &dir.path);
    assert_eq!(output.status.code(), Some(1), "{output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nope.svg: io error"), "stderr: {stderr}");
}
