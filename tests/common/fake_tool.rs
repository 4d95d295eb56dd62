//! A shell script that stands in for `terraform` in integration tests.
//!
//! It keeps a marker file in its working directory as its "state", echoes the
//! variable file back as an output, and appends one line per invocation to
//! `$FAKE_TF_LOG`. Setting `FAKE_TF_FAIL=<command>` makes that command fail.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tempfile::TempDir;

// Written once per test binary: writing an executable while another test
// thread forks can fail with "text file busy".
static SCRIPT_DIR: LazyLock<TempDir> = LazyLock::new(|| {
    let dir = TempDir::new().expect("script dir");
    let binary = dir.path().join("fake-terraform");
    fs::write(&binary, SCRIPT).expect("write script");
    make_executable(&binary);
    dir
});

const SCRIPT: &str = r#"#!/bin/sh
cmd="$1"
shift
varfile=""
for arg in "$@"; do
  case "$arg" in
    -var-file=*) varfile="${arg#-var-file=}" ;;
  esac
done
if [ -n "$FAKE_TF_LOG" ]; then
  echo "$cmd $* automation=$TF_IN_AUTOMATION region=$AWS_DEFAULT_REGION" >> "$FAKE_TF_LOG"
fi
if [ "$FAKE_TF_FAIL" = "$cmd" ]; then
  echo "Error: simulated $cmd failure (AccessDenied)" >&2
  exit 1
fi
case "$cmd" in
  init)
    echo "Terraform has been successfully initialized!"
    ;;
  apply)
    if [ -n "$varfile" ]; then cp "$varfile" .fake-vars.json; else echo "{}" > .fake-vars.json; fi
    touch .fake-applied
    echo "fake_resource.main: Creation complete after 0s"
    echo "Apply complete! Resources: 2 added, 0 changed, 0 destroyed."
    ;;
  destroy)
    if [ -f .fake-applied ]; then
      rm -f .fake-applied .fake-vars.json
      echo "Destroy complete! Resources: 2 destroyed."
    else
      echo "Destroy complete! Resources: 0 destroyed."
    fi
    ;;
  output)
    if [ -f .fake-applied ]; then
      printf '{"vars":{"value":%s,"sensitive":false},"bucket_arn":{"value":"arn:aws:s3:::fake-bucket","sensitive":false},"subnets":{"value":["subnet-a","subnet-b"],"sensitive":false},"db_password":{"value":"hunter2","sensitive":true},"optional_arn":{"value":null,"sensitive":false}}\n' "$(cat .fake-vars.json)"
    else
      echo "{}"
    fi
    ;;
  *)
    echo "unknown command $cmd" >&2
    exit 2
    ;;
esac
"#;

/// The shared fake binary plus a private module directory and call log.
pub struct FakeTool {
    pub dir: TempDir,
    pub binary: PathBuf,
    pub module: PathBuf,
    pub log: PathBuf,
}

impl FakeTool {
    pub fn new() -> Self {
        let binary = SCRIPT_DIR.path().join("fake-terraform");
        let dir = TempDir::new().expect("temp dir");

        let module = dir.path().join("modules").join("aws").join("s3-state");
        fs::create_dir_all(&module).expect("module dir");
        fs::write(module.join("main.tf"), "# fake module\n").expect("main.tf");

        let log = dir.path().join("calls.log");
        Self {
            dir,
            binary,
            module,
            log,
        }
    }

    pub fn modules_root(&self) -> PathBuf {
        self.dir.path().join("modules")
    }

    /// Lines appended by the script, one per invocation.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// First word of each call: `init`, `apply`, ...
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|line| line.split_whitespace().next().map(str::to_string))
            .collect()
    }

    /// Whether the module directory itself holds applied state.
    pub fn is_applied(&self) -> bool {
        Self::is_applied_in(&self.module)
    }

    /// Whether `dir` (the module or a private copy of it) holds applied state.
    pub fn is_applied_in(dir: &Path) -> bool {
        dir.join(".fake-applied").exists()
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
