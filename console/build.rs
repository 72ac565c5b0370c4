//! Stamps deployctl with the commit and time it was built from

use std::process::Command;

use chrono::Utc;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn main() {
    let mut git_hash = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".into());
    if git(&["status", "--porcelain", "--untracked-files=no"]).is_some() {
        git_hash.push_str("-dirty");
    }

    println!("cargo:rustc-env=DEPLOYCTL_GIT_HASH={}", git_hash);
    println!(
        "cargo:rustc-env=DEPLOYCTL_BUILD_TIME={}",
        Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    );

    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/index");
}
