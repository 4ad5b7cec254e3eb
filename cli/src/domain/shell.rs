//! Shell quoting and the inline scripts run on the remote host.
//!
//! Every script is plain POSIX `sh`, fed to `sh -s` over SSH. Values taken
//! from configuration or the filesystem are always passed through [`quote`].

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::config::ContainerRuntime;

/// Prefix of the remote temp dir created by the prepare step.
pub const REMOTE_TMP_PREFIX: &str = "/tmp/pushbox.";

/// Name of the install log inside the remote temp dir.
pub const REMOTE_LOG_NAME: &str = "install.log";

/// Lines of the remote log printed after a failure.
pub const DIAGNOSTIC_TAIL_LINES: u32 = 40;

/// Suffix for staged copies inside the container before the rename.
pub const STAGING_SUFFIX: &str = ".pushbox-new";

static SAFE_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9@%+=:,./_-]+$").expect("valid regex")
});

static REMOTE_TMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^/tmp/pushbox\.[A-Za-z0-9]{6,}$").expect("valid regex")
});

/// Quotes `value` for a POSIX shell.
///
/// Words made only of safe characters are returned unchanged; anything else
/// is wrapped in single quotes with embedded quotes written as `'\''`.
#[must_use]
pub fn quote(value: &str) -> String {
    if SAFE_WORD_RE.is_match(value) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Picks the temp dir path out of the prepare step's stdout.
///
/// Only the last non-empty line counts; login banners may precede it.
#[must_use]
pub fn parse_remote_tmp_dir(stdout: &str) -> Option<String> {
    let line = stdout.lines().map(str::trim).rfind(|l| !l.is_empty())?;
    REMOTE_TMP_RE.is_match(line).then(|| line.to_string())
}

/// Step 1: verify the runtime and container, create a private temp dir and
/// print its path.
#[must_use]
pub fn prepare_script(runtime: ContainerRuntime, container: &str) -> String {
    let rt = runtime.program();
    let ctr = quote(container);
    format!(
        "set -eu\n\
         command -v {rt} >/dev/null 2>&1 || {{ echo 'pushbox: {rt} not found on remote host' >&2; exit 127; }}\n\
         running=$({rt} inspect -f '{{{{.State.Running}}}}' {ctr} 2>/dev/null || true)\n\
         [ \"$running\" = true ] || {{ printf 'pushbox: container %s is not running\\n' {ctr} >&2; exit 3; }}\n\
         dir=$(mktemp -d {REMOTE_TMP_PREFIX}XXXXXX)\n\
         chmod 700 \"$dir\"\n\
         printf '%s\\n' \"$dir\"\n"
    )
}

/// Step 3: copy each uploaded file into the container and swap it into place.
///
/// Files are installed in the order given, each staged under a hidden name
/// and renamed over the target so readers never see a partial file. Output
/// is logged to `install.log` in the temp dir, echoed back, and the temp dir
/// is removed only when every command succeeded.
#[must_use]
pub fn install_script(
    runtime: ContainerRuntime,
    container: &str,
    container_path: &str,
    tmp_dir: &str,
    file_names: &[&str],
) -> String {
    let rt = runtime.program();
    let ctr = quote(container);
    let mut body = String::new();
    body.push_str(&format!(
        "  echo {}\n",
        quote(&format!("pushbox: installing into {container}:{container_path}"))
    ));
    body.push_str(&format!(
        "  {rt} exec {ctr} mkdir -p {}\n",
        quote(container_path)
    ));
    for name in file_names {
        let staged = format!("{container_path}/.{name}{STAGING_SUFFIX}");
        let target = format!("{container_path}/{name}");
        body.push_str(&format!(
            "  {rt} cp \"$T\"/{} {}\n",
            quote(name),
            quote(&format!("{container}:{staged}"))
        ));
        body.push_str(&format!(
            "  {rt} exec {ctr} mv -f {} {}\n",
            quote(&staged),
            quote(&target)
        ));
        body.push_str(&format!(
            "  echo {}\n",
            quote(&format!("pushbox: replaced {target}"))
        ));
    }

    format!(
        "T={tmp}\n\
         LOG=\"$T/{REMOTE_LOG_NAME}\"\n\
         (\n  set -e\n{body}) >\"$LOG\" 2>&1\n\
         rc=$?\n\
         cat \"$LOG\"\n\
         if [ \"$rc\" -eq 0 ]; then rm -rf \"$T\"; fi\n\
         exit \"$rc\"\n",
        tmp = quote(tmp_dir),
    )
}

/// Command printing the tail of the remote install log, ignoring absence.
#[must_use]
pub fn tail_log_command(tmp_dir: &str) -> String {
    format!(
        "tail -n {DIAGNOSTIC_TAIL_LINES} {} 2>/dev/null || true",
        quote(&format!("{tmp_dir}/{REMOTE_LOG_NAME}"))
    )
}
